//! Paragraph-level placeholder handling for WordprocessingML parts.
//!
//! The XML is streamed with `quick-xml`; every `w:p` is buffered until it closes,
//! the text of its `w:t` nodes is handed to [`crate::placeholder`] as one segment
//! group, and the paragraph is written back with only those text nodes changed.
//! Everything outside paragraphs passes through untouched.

use std::collections::BTreeSet;

use quick_xml::events::{BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::TemplateError;
use crate::placeholder::{self, substitute_segments};

const PARAGRAPH: &[u8] = b"w:p";
const TEXT: &[u8] = b"w:t";

/// Summary of a substitution pass over a part.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubstitutionReport {
    pub replaced: usize,
    pub unresolved: BTreeSet<String>,
}

/// Rewrite the text segments of every paragraph in `xml`.
///
/// `edit` receives the `w:t` texts of one paragraph and returns whether it changed
/// them. Returns `None` when no paragraph changed.
fn rewrite_paragraphs<F>(xml: &str, part: &str, mut edit: F) -> Result<Option<String>, TemplateError>
where
    F: FnMut(&mut Vec<String>) -> bool,
{
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + 256));
    let mut buffered: Vec<Event<'_>> = Vec::new();
    let mut depth = 0usize;
    let mut changed = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| TemplateError::xml(part, e))?;
        if matches!(event, Event::Eof) {
            break;
        }

        let opens = matches!(&event, Event::Start(e) if e.name().as_ref() == PARAGRAPH);
        let closes = matches!(&event, Event::End(e) if e.name().as_ref() == PARAGRAPH);

        if opens {
            depth += 1;
        }
        if depth == 0 {
            writer
                .write_event(event)
                .map_err(|e| TemplateError::xml(part, e))?;
            continue;
        }

        buffered.push(event);
        if closes {
            depth -= 1;
            if depth == 0 {
                changed |= flush_paragraph(&mut buffered, &mut writer, part, &mut edit)?;
            }
        }
    }

    if depth != 0 {
        return Err(TemplateError::xml(part, "unterminated paragraph"));
    }
    if !changed {
        return Ok(None);
    }
    String::from_utf8(writer.into_inner())
        .map(Some)
        .map_err(|e| TemplateError::xml(part, e))
}

fn flush_paragraph<F>(
    buffered: &mut Vec<Event<'_>>,
    writer: &mut Writer<Vec<u8>>,
    part: &str,
    edit: &mut F,
) -> Result<bool, TemplateError>
where
    F: FnMut(&mut Vec<String>) -> bool,
{
    let mut in_text = false;
    let mut slots = Vec::new();
    let mut segments = Vec::new();
    for (index, event) in buffered.iter().enumerate() {
        match event {
            Event::Start(e) if e.name().as_ref() == TEXT => in_text = true,
            Event::End(e) if e.name().as_ref() == TEXT => in_text = false,
            Event::Text(text) if in_text => {
                let unescaped = text.unescape().map_err(|e| TemplateError::xml(part, e))?;
                slots.push(index);
                segments.push(unescaped.into_owned());
            }
            _ => {}
        }
    }

    let modified = !segments.is_empty() && edit(&mut segments);

    for (index, event) in buffered.drain(..).enumerate() {
        let replacement = if modified {
            slots.iter().position(|&slot| slot == index)
        } else {
            None
        };
        let result = match replacement {
            Some(segment) => writer.write_event(Event::Text(BytesText::new(&segments[segment]))),
            None => writer.write_event(event),
        };
        result.map_err(|e| TemplateError::xml(part, e))?;
    }
    Ok(modified)
}

/// Names of all `${…}` tokens in the paragraphs of `xml`.
pub fn placeholders(xml: &str, part: &str) -> Result<BTreeSet<String>, TemplateError> {
    let mut names = BTreeSet::new();
    rewrite_paragraphs(xml, part, |segments| {
        let joined = segments.concat();
        names.extend(placeholder::tokens(&joined).into_iter().map(|t| t.name.to_string()));
        false
    })?;
    Ok(names)
}

/// Drop characters XML 1.0 does not allow in text content.
fn xml_safe(value: String) -> String {
    let allowed = |c: &char| {
        matches!(c, '\t' | '\n' | '\r')
            || ('\u{20}'..='\u{D7FF}').contains(c)
            || ('\u{E000}'..='\u{FFFD}').contains(c)
            || *c >= '\u{10000}'
    };
    if value.chars().all(|c| allowed(&c)) {
        value
    } else {
        value.chars().filter(allowed).collect()
    }
}

/// Substitute tokens resolved by `resolve`; unknown tokens stay and are reported.
/// Resolved values are stripped of characters XML cannot carry.
///
/// Returns the rewritten XML (or the input unchanged) plus the report.
pub fn substitute<F>(xml: &str, part: &str, mut resolve: F) -> Result<(String, SubstitutionReport), TemplateError>
where
    F: FnMut(&str) -> Option<String>,
{
    let mut report = SubstitutionReport::default();
    let rewritten = rewrite_paragraphs(xml, part, |segments| {
        let outcome = substitute_segments(segments, |name: &str| resolve(name).map(xml_safe));
        report.replaced += outcome.replaced;
        report.unresolved.extend(outcome.unresolved);
        outcome.replaced > 0
    })?;
    Ok((rewritten.unwrap_or_else(|| xml.to_string()), report))
}
