//! Invoice document generation.
//!
//! Fills a `.docx` template with invoice data, stamps a Code 128 barcode of the
//! invoice number at the end of the body and converts the result to PDF, entirely
//! in memory. [`InvoiceDocumentGenerator`] is the entry point; the other modules are
//! the pipeline stages it orchestrates.

pub mod barcode;
pub mod config;
pub mod convert;
pub mod drawing;
pub mod error;
pub mod generator;
pub mod information;
pub mod package;
pub mod placeholder;
pub mod template;

pub use barcode::{BarcodeImage, BarcodeRenderer};
pub use config::{BarcodePolicy, GeneratorConfig};
pub use convert::PdfConverter;
pub use error::{BarcodeError, ConversionError, DocumentError, DocumentResult, TemplateError};
pub use generator::{BarcodeStatus, InvoiceDocumentGenerator, Lookups, RenderedInvoice, RenderedPdf, TemplateSource};
pub use information::{InvoiceInformation, Placeholder, Variables};
pub use package::DocxPackage;
pub use template::SubstitutionReport;
