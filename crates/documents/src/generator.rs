//! Invoice document generation pipeline.

use std::path::PathBuf;
use std::sync::Arc;

use factoring_core::InvoiceId;
use factoring_invoicing::{
    CompanyService, CustomerService, InvoiceItemService, InvoiceService, ProductService,
    UserService,
};

use crate::barcode::BarcodeRenderer;
use crate::config::{BarcodePolicy, GeneratorConfig};
use crate::convert::PdfConverter;
use crate::drawing::embed_barcode;
use crate::error::{DocumentResult, TemplateError};
use crate::information::{InvoiceInformation, Placeholder};
use crate::package::DocxPackage;

/// Where the `.docx` template comes from. Loaded afresh on every call.
#[derive(Debug, Clone)]
pub enum TemplateSource {
    Path(PathBuf),
    Bytes(Arc<[u8]>),
}

impl TemplateSource {
    pub fn load(&self) -> Result<DocxPackage, TemplateError> {
        match self {
            TemplateSource::Path(path) => DocxPackage::open(path),
            TemplateSource::Bytes(bytes) => DocxPackage::from_bytes(bytes),
        }
    }
}

/// The lookup services a generator reads from.
#[derive(Clone)]
pub struct Lookups {
    pub invoices: Arc<dyn InvoiceService>,
    pub customers: Arc<dyn CustomerService>,
    pub items: Arc<dyn InvoiceItemService>,
    pub products: Arc<dyn ProductService>,
    pub users: Arc<dyn UserService>,
    pub companies: Arc<dyn CompanyService>,
}

impl Lookups {
    /// All lookups served by one backend.
    pub fn shared<S>(service: Arc<S>) -> Self
    where
        S: InvoiceService
            + CustomerService
            + InvoiceItemService
            + ProductService
            + UserService
            + CompanyService
            + 'static,
    {
        Self {
            invoices: service.clone(),
            customers: service.clone(),
            items: service.clone(),
            products: service.clone(),
            users: service.clone(),
            companies: service,
        }
    }
}

/// Whether the invoice-number barcode made it into the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BarcodeStatus {
    Embedded,
    Missing { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInvoice {
    pub invoice_number: String,
    pub pdf: Vec<u8>,
    pub docx: Vec<u8>,
    pub barcode: BarcodeStatus,
}

/// A generated PDF with the invoice number it was rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPdf {
    pub invoice_number: String,
    pub pdf: Vec<u8>,
    pub barcode: BarcodeStatus,
}

struct Filled {
    package: DocxPackage,
    invoice_number: String,
    barcode: BarcodeStatus,
}

/// Fills the invoice template for one invoice and converts it to PDF.
///
/// Every call works on its own in-memory copy of the template, so a generator can be
/// shared between threads.
#[derive(Clone)]
pub struct InvoiceDocumentGenerator {
    template: TemplateSource,
    lookups: Lookups,
    barcode: BarcodeRenderer,
    policy: BarcodePolicy,
    converter: PdfConverter,
}

impl InvoiceDocumentGenerator {
    pub fn new(template: TemplateSource, lookups: Lookups, config: &GeneratorConfig) -> Self {
        Self {
            template,
            lookups,
            barcode: BarcodeRenderer::new(config.barcode_height_px, config.barcode_module_width_px),
            policy: config.barcode_policy,
            converter: PdfConverter::default(),
        }
    }

    /// Generator reading the template from `config.template_path`.
    pub fn from_config(lookups: Lookups, config: &GeneratorConfig) -> Self {
        Self::new(TemplateSource::Path(config.template_path.clone()), lookups, config)
    }

    /// Same template and records, with the current user and company resolved through
    /// the given services.
    pub fn with_session(&self, users: Arc<dyn UserService>, companies: Arc<dyn CompanyService>) -> Self {
        let mut generator = self.clone();
        generator.lookups.users = users;
        generator.lookups.companies = companies;
        generator
    }

    /// PDF bytes of the invoice document.
    pub fn generate_pdf(&self, invoice_id: InvoiceId) -> DocumentResult<Vec<u8>> {
        Ok(self.render_pdf(invoice_id)?.pdf)
    }

    /// The PDF alone; the populated `.docx` is never serialized.
    pub fn render_pdf(&self, invoice_id: InvoiceId) -> DocumentResult<RenderedPdf> {
        let span = tracing::info_span!("render_pdf", %invoice_id);
        let _guard = span.enter();

        let filled = self.fill(invoice_id)?;
        let pdf = self.converter.convert(&filled.package, &filled.invoice_number)?;
        tracing::info!(
            invoice_number = %filled.invoice_number,
            pdf_bytes = pdf.len(),
            barcode = ?filled.barcode,
            "invoice pdf generated"
        );
        Ok(RenderedPdf {
            invoice_number: filled.invoice_number,
            pdf,
            barcode: filled.barcode,
        })
    }

    /// The populated `.docx`, without PDF conversion.
    pub fn generate_docx(&self, invoice_id: InvoiceId) -> DocumentResult<Vec<u8>> {
        let span = tracing::info_span!("generate_docx", %invoice_id);
        let _guard = span.enter();
        let filled = self.fill(invoice_id)?;
        Ok(filled.package.to_bytes()?)
    }

    pub fn render(&self, invoice_id: InvoiceId) -> DocumentResult<RenderedInvoice> {
        let span = tracing::info_span!("render_invoice", %invoice_id);
        let _guard = span.enter();

        let filled = self.fill(invoice_id)?;
        let docx = filled.package.to_bytes()?;
        let pdf = self.converter.convert(&filled.package, &filled.invoice_number)?;

        tracing::info!(
            invoice_number = %filled.invoice_number,
            pdf_bytes = pdf.len(),
            barcode = ?filled.barcode,
            "invoice document generated"
        );
        Ok(RenderedInvoice {
            invoice_number: filled.invoice_number,
            pdf,
            docx,
            barcode: filled.barcode,
        })
    }

    fn fill(&self, invoice_id: InvoiceId) -> DocumentResult<Filled> {
        let mut package = self.template.load()?;
        let bound = Placeholder::bind_all(&package.placeholders()?)?;
        tracing::debug!(placeholders = bound.len(), "template bound");

        let information = self.gather(invoice_id)?;
        let variables = information.variables()?;

        let report = package.substitute(|name| variables.get(name).map(str::to_string))?;
        if !report.unresolved.is_empty() {
            return Err(TemplateError::Unresolved(report.unresolved.into_iter().collect()).into());
        }
        tracing::debug!(replaced = report.replaced, "placeholders substituted");

        let invoice_number = information.invoice_number().to_string();
        let barcode = self.stamp_barcode(&mut package, &invoice_number)?;
        Ok(Filled {
            package,
            invoice_number,
            barcode,
        })
    }

    fn gather(&self, invoice_id: InvoiceId) -> DocumentResult<InvoiceInformation> {
        let lookups = &self.lookups;
        let invoice = lookups.invoices.invoice(invoice_id)?;
        let customer = lookups.customers.customer(invoice.customer_id)?;
        let item = lookups.items.item_for_invoice(invoice_id)?;
        let product = lookups.products.product(item.product_id)?;
        let currency = lookups.invoices.invoice_currency_code(invoice_id)?;
        let payment_method = lookups.invoices.invoice_payment_method(invoice_id)?;
        let user = lookups.users.current_user()?;
        let company = lookups.companies.current_user_company()?;
        Ok(InvoiceInformation {
            invoice,
            customer,
            item,
            product,
            currency,
            payment_method,
            user,
            company,
        })
    }

    fn stamp_barcode(&self, package: &mut DocxPackage, invoice_number: &str) -> DocumentResult<BarcodeStatus> {
        let stamped = self
            .barcode
            .render(invoice_number)
            .and_then(|image| embed_barcode(package, &image, &format!("Invoice {invoice_number}")));
        match (stamped, self.policy) {
            (Ok(()), _) => Ok(BarcodeStatus::Embedded),
            (Err(e), BarcodePolicy::Required) => Err(e.into()),
            (Err(e), BarcodePolicy::BestEffort) => {
                tracing::warn!(%invoice_number, error = %e, "barcode skipped");
                Ok(BarcodeStatus::Missing { reason: e.to_string() })
            }
        }
    }
}
