//! `${name}` token scanning and substitution over run-split text.
//!
//! Word processors break a paragraph's text into runs at arbitrary points, so a
//! token such as `${invoiceNumber}` may arrive as `["${", "invoice", "Number}"]`.
//! Everything here works on the ordered text segments of one paragraph: tokens are
//! found in the concatenation, and replacements are written back into the segment
//! where the token starts. The segment count never changes, so the run structure
//! (and its formatting) survives.

/// Opening marker of a token.
pub const OPEN: &str = "${";
/// Closing marker of a token.
pub const CLOSE: char = '}';

/// A token occurrence in a text, as byte offsets (`end` is exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub name: &'a str,
    pub start: usize,
    pub end: usize,
}

fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

/// All well-formed tokens in `text`, in order. Malformed openings are skipped.
pub fn tokens(text: &str) -> Vec<Token<'_>> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(rel) = text[cursor..].find(OPEN) {
        let start = cursor + rel;
        let name_start = start + OPEN.len();
        let Some(len) = text[name_start..].find(CLOSE) else {
            break;
        };
        let name = &text[name_start..name_start + len];
        if is_valid_name(name) {
            let end = name_start + len + CLOSE.len_utf8();
            found.push(Token { name, start, end });
            cursor = end;
        } else {
            cursor = name_start;
        }
    }
    found
}

/// Outcome of substituting one group of segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentOutcome {
    pub replaced: usize,
    /// Names that the resolver did not know; their tokens are left in place.
    pub unresolved: Vec<String>,
}

fn copy_range(joined: &str, bounds: &[(usize, usize)], out: &mut [String], from: usize, to: usize) {
    for (segment, &(start, end)) in bounds.iter().enumerate() {
        let lo = from.max(start);
        let hi = to.min(end);
        if lo < hi {
            out[segment].push_str(&joined[lo..hi]);
        }
    }
}

fn owner(bounds: &[(usize, usize)], pos: usize) -> usize {
    bounds
        .iter()
        .position(|&(start, end)| start <= pos && pos < end)
        .unwrap_or(0)
}

/// Replace every token in the concatenation of `segments` for which `resolve`
/// returns a value.
///
/// The value lands in the segment holding the token's `$`; the token's remaining
/// characters are removed from the segments they spanned. Segments are rewritten
/// only when at least one token was replaced.
pub fn substitute_segments<F>(segments: &mut [String], mut resolve: F) -> SegmentOutcome
where
    F: FnMut(&str) -> Option<String>,
{
    let mut outcome = SegmentOutcome::default();
    let joined = segments.concat();
    let found = tokens(&joined);
    if found.is_empty() {
        return outcome;
    }

    let mut bounds = Vec::with_capacity(segments.len());
    let mut offset = 0;
    for segment in segments.iter() {
        bounds.push((offset, offset + segment.len()));
        offset += segment.len();
    }

    let mut out = vec![String::new(); segments.len()];
    let mut pos = 0;
    for token in found {
        match resolve(token.name) {
            Some(value) => {
                copy_range(&joined, &bounds, &mut out, pos, token.start);
                out[owner(&bounds, token.start)].push_str(&value);
                pos = token.end;
                outcome.replaced += 1;
            }
            None => outcome.unresolved.push(token.name.to_string()),
        }
    }
    copy_range(&joined, &bounds, &mut out, pos, joined.len());

    if outcome.replaced > 0 {
        for (segment, text) in segments.iter_mut().zip(out) {
            *segment = text;
        }
    }
    outcome
}
