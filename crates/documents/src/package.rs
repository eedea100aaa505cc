//! WordprocessingML (`.docx`) package handling.
//!
//! A package is a ZIP container of named parts. Parts are kept in their original
//! order and rewritten with fixed timestamps, so the same input always serializes
//! to the same bytes.

use std::collections::BTreeSet;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::TemplateError;
use crate::template::{self, SubstitutionReport};

pub const MAIN_DOCUMENT: &str = "word/document.xml";
pub const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";
pub const CONTENT_TYPES: &str = "[Content_Types].xml";

pub const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMPTY_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
);

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    name: String,
    data: Vec<u8>,
}

/// An opened `.docx` package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocxPackage {
    parts: Vec<Part>,
}

pub(crate) fn attribute(element: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    element
        .attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

impl DocxPackage {
    /// Read a package from disk.
    pub fn open(path: &Path) -> Result<Self, TemplateError> {
        let bytes = std::fs::read(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(&bytes)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TemplateError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(TemplateError::package)?;
        let mut parts = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(TemplateError::package)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().to_string();
            let mut data = Vec::with_capacity(file.size() as usize);
            file.read_to_end(&mut data).map_err(TemplateError::package)?;
            parts.push(Part { name, data });
        }

        let package = Self { parts };
        if package.part(MAIN_DOCUMENT).is_none() {
            return Err(TemplateError::MissingPart(MAIN_DOCUMENT.to_string()));
        }
        Ok(package)
    }

    /// Minimal package whose body holds `body_xml` (paragraphs, tables) followed by
    /// an A4 section.
    pub fn from_document_xml(body_xml: &str) -> Self {
        let content_types = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Override PartName="/word/document.xml" ContentType="application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml"/>"#,
            r#"</Types>"#
        );
        let root_rels = concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
            r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="word/document.xml"/>"#,
            r#"</Relationships>"#
        );
        let document = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
                r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
                r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
                r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
                r#"<w:body>{}<w:sectPr><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:body></w:document>"#
            ),
            body_xml
        );

        let part = |name: &str, data: &str| Part {
            name: name.to_string(),
            data: data.as_bytes().to_vec(),
        };
        Self {
            parts: vec![
                part(CONTENT_TYPES, content_types),
                part("_rels/.rels", root_rels),
                part(MAIN_DOCUMENT, &document),
                part(DOCUMENT_RELS, EMPTY_RELATIONSHIPS),
            ],
        }
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.data.as_slice())
    }

    /// A part decoded as UTF-8 XML.
    pub fn xml_part(&self, name: &str) -> Result<&str, TemplateError> {
        let data = self
            .part(name)
            .ok_or_else(|| TemplateError::MissingPart(name.to_string()))?;
        std::str::from_utf8(data).map_err(|e| TemplateError::xml(name, e))
    }

    /// Replace a part, or append it when the package has none of that name.
    pub fn set_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|p| p.name == name) {
            Some(part) => part.data = data,
            None => self.parts.push(Part {
                name: name.to_string(),
                data,
            }),
        }
    }

    pub fn main_document(&self) -> Result<&str, TemplateError> {
        self.xml_part(MAIN_DOCUMENT)
    }

    pub fn set_main_document(&mut self, xml: String) {
        self.set_part(MAIN_DOCUMENT, xml.into_bytes());
    }

    /// Placeholder names referenced by the main document.
    pub fn placeholders(&self) -> Result<BTreeSet<String>, TemplateError> {
        template::placeholders(self.main_document()?, MAIN_DOCUMENT)
    }

    /// Substitute placeholders of the main document in place.
    pub fn substitute<F>(&mut self, resolve: F) -> Result<SubstitutionReport, TemplateError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let (xml, report) = template::substitute(self.main_document()?, MAIN_DOCUMENT, resolve)?;
        if report.replaced > 0 {
            self.set_main_document(xml);
        }
        Ok(report)
    }

    /// `(Id, Type, Target)` of every relationship of the main document.
    pub fn relationships(&self) -> Result<Vec<(String, String, String)>, TemplateError> {
        let Some(data) = self.part(DOCUMENT_RELS) else {
            return Ok(Vec::new());
        };
        let xml = std::str::from_utf8(data).map_err(|e| TemplateError::xml(DOCUMENT_RELS, e))?;
        let mut reader = Reader::from_str(xml);
        let mut found = Vec::new();
        loop {
            match reader.read_event().map_err(|e| TemplateError::xml(DOCUMENT_RELS, e))? {
                Event::Eof => break,
                Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"Relationship" => {
                    found.push((
                        attribute(&e, b"Id").unwrap_or_default(),
                        attribute(&e, b"Type").unwrap_or_default(),
                        attribute(&e, b"Target").unwrap_or_default(),
                    ));
                }
                _ => {}
            }
        }
        Ok(found)
    }

    /// Package part name a main-document relationship points at.
    pub fn resolve_relationship(&self, rel_id: &str) -> Result<Option<String>, TemplateError> {
        Ok(self
            .relationships()?
            .into_iter()
            .find(|(id, _, _)| id == rel_id)
            .map(|(_, _, target)| match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("word/{target}"),
            }))
    }

    /// Register an image relationship to `target` (relative to `word/`) and return
    /// its fresh id.
    pub fn add_image_relationship(&mut self, target: &str) -> Result<String, TemplateError> {
        let next = self
            .relationships()?
            .iter()
            .filter_map(|(id, _, _)| id.strip_prefix("rId")?.parse::<u32>().ok())
            .max()
            .unwrap_or(0)
            + 1;
        let rel_id = format!("rId{next}");

        let xml = match self.part(DOCUMENT_RELS) {
            Some(_) => self.xml_part(DOCUMENT_RELS)?.to_string(),
            None => EMPTY_RELATIONSHIPS.to_string(),
        };
        let close = xml
            .rfind("</Relationships>")
            .ok_or_else(|| TemplateError::xml(DOCUMENT_RELS, "missing </Relationships>"))?;
        let entry = format!(
            r#"<Relationship Id="{rel_id}" Type="{IMAGE_RELATIONSHIP}" Target="{}"/>"#,
            quick_xml::escape::escape(target)
        );
        let mut updated = xml;
        updated.insert_str(close, &entry);
        self.set_part(DOCUMENT_RELS, updated.into_bytes());
        Ok(rel_id)
    }

    /// Declare a default content type for a file extension, if not yet declared.
    pub fn ensure_default_content_type(&mut self, extension: &str, content_type: &str) -> Result<(), TemplateError> {
        let xml = self.xml_part(CONTENT_TYPES)?;
        let declared = [
            format!(r#"Extension="{extension}""#),
            format!(r#"Extension="{}""#, extension.to_uppercase()),
        ];
        if declared.iter().any(|needle| xml.contains(needle.as_str())) {
            return Ok(());
        }
        let close = xml
            .rfind("</Types>")
            .ok_or_else(|| TemplateError::xml(CONTENT_TYPES, "missing </Types>"))?;
        let mut updated = xml.to_string();
        updated.insert_str(
            close,
            &format!(r#"<Default Extension="{extension}" ContentType="{content_type}"/>"#),
        );
        self.set_part(CONTENT_TYPES, updated.into_bytes());
        Ok(())
    }

    /// Serialize the package back into `.docx` bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, TemplateError> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options =
            zip::write::FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        for part in &self.parts {
            writer
                .start_file(part.name.as_str(), options)
                .map_err(TemplateError::package)?;
            writer.write_all(&part.data).map_err(TemplateError::package)?;
        }
        let cursor = writer.finish().map_err(TemplateError::package)?;
        Ok(cursor.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DocxPackage {
        DocxPackage::from_document_xml(r#"<w:p><w:r><w:t>No. ${invoiceNumber}</w:t></w:r></w:p>"#)
    }

    #[test]
    fn survives_a_zip_round_trip() {
        let package = sample();
        let bytes = package.to_bytes().unwrap();
        let reopened = DocxPackage::from_bytes(&bytes).unwrap();
        assert_eq!(reopened, package);
    }

    #[test]
    fn serialization_is_deterministic() {
        assert_eq!(sample().to_bytes().unwrap(), sample().to_bytes().unwrap());
    }

    #[test]
    fn rejects_packages_without_main_document() {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("hello.txt", zip::write::FileOptions::default())
            .unwrap();
        writer.write_all(b"hi").unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        let err = DocxPackage::from_bytes(&bytes).unwrap_err();
        assert!(matches!(err, TemplateError::MissingPart(name) if name == MAIN_DOCUMENT));
        assert!(matches!(
            DocxPackage::from_bytes(b"not a zip").unwrap_err(),
            TemplateError::Package(_)
        ));
    }

    #[test]
    fn substitutes_main_document() {
        let mut package = sample();
        assert!(package.placeholders().unwrap().contains("invoiceNumber"));
        let report = package
            .substitute(|name| (name == "invoiceNumber").then(|| "FV/9".to_string()))
            .unwrap();
        assert_eq!(report.replaced, 1);
        assert!(package.main_document().unwrap().contains("No. FV/9"));
        assert!(package.placeholders().unwrap().is_empty());
    }

    #[test]
    fn allocates_fresh_relationship_ids() {
        let mut package = sample();
        let first = package.add_image_relationship("media/a.png").unwrap();
        let second = package.add_image_relationship("media/b.png").unwrap();
        assert_eq!(first, "rId1");
        assert_eq!(second, "rId2");
        assert_eq!(
            package.resolve_relationship("rId2").unwrap().as_deref(),
            Some("word/media/b.png")
        );
        assert_eq!(package.resolve_relationship("rId9").unwrap(), None);
        let (_, kind, _) = &package.relationships().unwrap()[0];
        assert_eq!(kind, IMAGE_RELATIONSHIP);
    }

    #[test]
    fn content_types_are_declared_once() {
        let mut package = sample();
        package.ensure_default_content_type("png", "image/png").unwrap();
        package.ensure_default_content_type("png", "image/png").unwrap();
        let xml = package.xml_part(CONTENT_TYPES).unwrap();
        assert_eq!(xml.matches(r#"Extension="png""#).count(), 1);
    }
}
