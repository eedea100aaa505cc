use std::path::PathBuf;
use std::sync::Arc;

use factoring_core::{CompanyId, CustomerId, DomainError, InvoiceId, InvoiceItemId, ProductId, UserId};
use factoring_documents::{
    BarcodeError, BarcodePolicy, BarcodeStatus, DocumentError, DocxPackage, GeneratorConfig,
    InvoiceDocumentGenerator, Lookups, TemplateError, TemplateSource,
};
use factoring_invoicing::{InMemoryDirectory, InvoiceService, InvoiceItemService, Session, UserService};

const DEMO_DATA: &str = include_str!("../../../assets/demo-data.json");

fn template_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../assets/templates/invoice_template.docx")
}

fn directory() -> Arc<InMemoryDirectory> {
    Arc::new(InMemoryDirectory::from_json(DEMO_DATA).unwrap())
}

fn generator_with(directory: Arc<InMemoryDirectory>, policy: BarcodePolicy) -> InvoiceDocumentGenerator {
    let config = GeneratorConfig {
        template_path: template_path(),
        barcode_policy: policy,
        ..GeneratorConfig::default()
    };
    InvoiceDocumentGenerator::from_config(Lookups::shared(directory), &config)
}

fn generator() -> InvoiceDocumentGenerator {
    generator_with(directory(), BarcodePolicy::Required)
}

fn id(raw: i64) -> InvoiceId {
    InvoiceId::new(raw).unwrap()
}

fn pdf_text(pdf: &[u8]) -> String {
    let doc = lopdf::Document::load_mem(pdf).unwrap();
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages).unwrap()
}

/// Insert a copy of invoice 1 under `new_id`, edited by `edit`.
fn clone_invoice(directory: &InMemoryDirectory, new_id: i64, edit: impl FnOnce(&mut factoring_invoicing::Invoice)) {
    let mut invoice = directory.invoice(id(1)).unwrap();
    invoice.id = id(new_id);
    invoice.invoice_number = format!("FV/TEST/{new_id}");
    edit(&mut invoice);
    directory.insert_invoice(invoice);
}

fn clone_item(directory: &InMemoryDirectory, invoice_id: i64, edit: impl FnOnce(&mut factoring_invoicing::InvoiceItem)) {
    let mut item = directory.item_for_invoice(id(1)).unwrap();
    item.id = InvoiceItemId::new(100 + invoice_id).unwrap();
    item.invoice_id = id(invoice_id);
    edit(&mut item);
    directory.insert_item(item);
}

#[test]
fn pdf_contains_the_invoice_fields() {
    let rendered = generator().render(id(1)).unwrap();
    assert_eq!(rendered.invoice_number, "FV/2024/05/001");
    assert_eq!(rendered.barcode, BarcodeStatus::Embedded);
    assert!(rendered.pdf.starts_with(b"%PDF"));

    let text = pdf_text(&rendered.pdf);
    for expected in [
        "Invoice no. FV/2024/05/001",
        "Amount to pay: 5535.00 PLN",
        "Payment deadline: 2024-05-20",
        "Payment method: Bank transfer",
        "Jan Kowalski",
        "Kowalski Logistics Sp. z o.o.",
        "Silesia Factoring S.A.",
        "Issued by: Anna Nowak",
        "PL61109010140000071219812874",
    ] {
        assert!(text.contains(expected), "missing {expected:?} in:\n{text}");
    }
}

#[test]
fn pdf_only_rendering_matches_the_full_render() {
    let generator = generator();
    let full = generator.render(id(1)).unwrap();
    let pdf_only = generator.render_pdf(id(1)).unwrap();
    assert_eq!(pdf_only.invoice_number, full.invoice_number);
    assert_eq!(pdf_only.barcode, full.barcode);
    assert_eq!(pdf_only.pdf, full.pdf);
    assert_eq!(generator.generate_pdf(id(1)).unwrap(), full.pdf);
}

#[test]
fn populated_docx_has_no_tokens_and_carries_the_barcode() {
    let rendered = generator().render(id(1)).unwrap();
    let package = DocxPackage::from_bytes(&rendered.docx).unwrap();
    assert!(package.placeholders().unwrap().is_empty());
    assert!(!package.main_document().unwrap().contains("${"));
    assert!(package.part("word/media/barcode1.png").is_some());
    // the template's own styles relationship is kept
    assert_eq!(package.relationships().unwrap().len(), 2);

    let docx = generator().generate_docx(id(1)).unwrap();
    assert_eq!(docx, rendered.docx);
}

#[test]
fn paid_invoices_show_nothing_to_pay() {
    let text = pdf_text(&generator().generate_pdf(id(2)).unwrap());
    assert!(text.contains("Amount to pay: 0.00 EUR"));
    assert!(text.contains("Payment method: Card"));
}

#[test]
fn generation_is_deterministic() {
    let generator = generator();
    assert_eq!(generator.render(id(1)).unwrap(), generator.render(id(1)).unwrap());
}

#[test]
fn missing_invoice_is_not_found() {
    let err = generator().generate_pdf(id(404)).unwrap_err();
    assert!(err.is_not_found());
    assert!(matches!(
        err,
        DocumentError::Lookup(DomainError::NotFound { entity: "invoice", .. })
    ));
}

#[test]
fn missing_related_records_fail_the_whole_document() {
    let directory = directory();
    clone_invoice(&directory, 10, |invoice| invoice.customer_id = CustomerId::new(99).unwrap());
    clone_invoice(&directory, 11, |_| {});
    clone_invoice(&directory, 12, |_| {});
    clone_item(&directory, 12, |item| item.product_id = ProductId::new(99).unwrap());
    let generator = generator_with(directory, BarcodePolicy::Required);

    for (invoice, entity) in [(10, "customer"), (11, "invoice item"), (12, "product")] {
        match generator.render(id(invoice)) {
            Err(DocumentError::Lookup(DomainError::NotFound { entity: found, .. })) => {
                assert_eq!(found, entity, "invoice {invoice}")
            }
            other => panic!("invoice {invoice}: expected {entity} not found, got {other:?}"),
        }
    }

    // a signed-in user whose company record is gone
    let directory = self::directory();
    let mut user = directory.current_user().unwrap();
    user.id = UserId::new(3).unwrap();
    user.company_id = CompanyId::new(99).unwrap();
    directory.insert_user(user);
    directory.sign_in(UserId::new(3).unwrap());
    let generator = generator_with(directory, BarcodePolicy::Required);
    assert!(matches!(
        generator.render(id(1)),
        Err(DocumentError::Lookup(DomainError::NotFound { entity: "company", .. }))
    ));
}

#[test]
fn session_selects_the_acting_user_and_company() {
    let directory = directory();
    let generator = generator_with(directory.clone(), BarcodePolicy::Required);
    let session = Arc::new(Session::new(directory, UserId::new(2).unwrap()));
    let text = pdf_text(&generator.with_session(session.clone(), session).generate_pdf(id(1)).unwrap());
    assert!(text.contains("Issued by: Piotr Zielinski"));
    assert!(text.contains("Wielkopolska Finance Sp. z o.o."));
    assert!(!text.contains("Silesia Factoring"));
}

#[test]
fn concurrent_calls_do_not_cross_contaminate() {
    let generator = generator();
    let results: Vec<(i64, String)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let generator = &generator;
                let invoice = 1 + (n % 2);
                scope.spawn(move || (invoice, pdf_text(&generator.generate_pdf(id(invoice)).unwrap())))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (invoice, text) in results {
        let (own, other) = if invoice == 1 {
            ("FV/2024/05/001", "FV/2024/05/002")
        } else {
            ("FV/2024/05/002", "FV/2024/05/001")
        };
        assert!(text.contains(own));
        assert!(!text.contains(other));
    }
}

#[test]
fn unknown_template_tokens_are_rejected_before_lookups() {
    let template = DocxPackage::from_document_xml(
        "<w:p><w:r><w:t>${invoiceNumber} ${iban}</w:t></w:r></w:p>",
    );
    let bytes: Arc<[u8]> = template.to_bytes().unwrap().into();
    // an empty directory fails every lookup, so only the template check can answer
    let generator = InvoiceDocumentGenerator::new(
        TemplateSource::Bytes(bytes),
        Lookups::shared(Arc::new(InMemoryDirectory::new())),
        &GeneratorConfig::default(),
    );
    match generator.render(id(1)) {
        Err(DocumentError::Template(TemplateError::UnknownPlaceholders(names))) => {
            assert_eq!(names, vec!["iban".to_string()])
        }
        other => panic!("expected unknown placeholder error, got {other:?}"),
    }
}

#[test]
fn unreadable_template_is_a_template_error() {
    let config = GeneratorConfig {
        template_path: PathBuf::from("does/not/exist.docx"),
        ..GeneratorConfig::default()
    };
    let generator = InvoiceDocumentGenerator::from_config(Lookups::shared(directory()), &config);
    assert!(matches!(
        generator.render(id(1)),
        Err(DocumentError::Template(TemplateError::Read { .. }))
    ));
}

#[test]
fn barcode_policy_decides_on_unencodable_numbers() {
    let directory = directory();
    clone_invoice(&directory, 20, |invoice| invoice.invoice_number = "FV/ŁĘŻ/20".into());
    clone_item(&directory, 20, |_| {});

    let strict = generator_with(directory.clone(), BarcodePolicy::Required);
    assert!(matches!(
        strict.render(id(20)),
        Err(DocumentError::Render(BarcodeError::UnsupportedChar('Ł')))
    ));

    let lenient = generator_with(directory, BarcodePolicy::BestEffort);
    let rendered = lenient.render(id(20)).unwrap();
    assert!(matches!(rendered.barcode, BarcodeStatus::Missing { .. }));
    let package = DocxPackage::from_bytes(&rendered.docx).unwrap();
    assert!(package.part("word/media/barcode1.png").is_none());
    assert!(pdf_text(&rendered.pdf).contains("FV/LEZ/20"));
}
