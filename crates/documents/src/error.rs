//! Error kinds of the document pipeline.
//!
//! One enum per stage, folded into [`DocumentError`] at the generator boundary.
//! Lookup failures keep their [`DomainError`] so callers can still tell a missing
//! record from a malformed template.

use std::path::PathBuf;

use thiserror::Error;

use factoring_core::DomainError;

pub type DocumentResult<T> = Result<T, DocumentError>;

/// Template loading, parsing and placeholder binding failures.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid document package: {0}")]
    Package(String),

    #[error("document part {0} is missing")]
    MissingPart(String),

    #[error("malformed xml in {part}: {message}")]
    Xml { part: String, message: String },

    #[error("template references unknown placeholders: {}", .0.join(", "))]
    UnknownPlaceholders(Vec<String>),

    #[error("placeholders left unresolved: {}", .0.join(", "))]
    Unresolved(Vec<String>),
}

impl TemplateError {
    pub(crate) fn xml(part: &str, err: impl core::fmt::Display) -> Self {
        Self::Xml {
            part: part.to_string(),
            message: err.to_string(),
        }
    }

    pub(crate) fn package(err: impl core::fmt::Display) -> Self {
        Self::Package(err.to_string())
    }
}

/// Barcode rendering and embedding failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BarcodeError {
    #[error("barcode text is empty")]
    Empty,

    #[error("character {0:?} cannot be encoded in Code 128 set B")]
    UnsupportedChar(char),

    #[error("barcode encoding failed: {0}")]
    Encode(String),

    #[error("barcode image encoding failed: {0}")]
    Image(String),

    #[error("failed to embed barcode: {0}")]
    Embed(String),
}

/// Conversion of the populated package into PDF.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("cannot read document: {0}")]
    Document(#[from] TemplateError),

    #[error("pdf serialization failed: {0}")]
    Pdf(String),
}

/// Top-level failure of a generation call.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Lookup(#[from] DomainError),

    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    #[error("barcode rendering failed: {0}")]
    Render(#[from] BarcodeError),

    #[error("conversion failed: {0}")]
    Conversion(#[from] ConversionError),
}

impl DocumentError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Lookup(e) if e.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_placeholders_are_listed() {
        let err = TemplateError::UnknownPlaceholders(vec!["foo".into(), "bar".into()]);
        assert_eq!(err.to_string(), "template references unknown placeholders: foo, bar");
    }

    #[test]
    fn not_found_survives_folding() {
        let err: DocumentError = DomainError::not_found("invoice", 3).into();
        assert!(err.is_not_found());
        let err: DocumentError = BarcodeError::Empty.into();
        assert!(!err.is_not_found());
    }
}
