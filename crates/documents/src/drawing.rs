//! Inline image embedding into the main document.

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::barcode::BarcodeImage;
use crate::error::BarcodeError;
use crate::package::{DocxPackage, MAIN_DOCUMENT, attribute};

const NS_WP: &str = "http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing";
const NS_A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
const NS_PIC: &str = "http://schemas.openxmlformats.org/drawingml/2006/picture";
const NS_R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

fn embed_err(err: impl core::fmt::Display) -> BarcodeError {
    BarcodeError::Embed(err.to_string())
}

/// Largest `wp:docPr` id in the document.
fn max_drawing_id(xml: &str) -> Result<u32, BarcodeError> {
    let mut reader = Reader::from_str(xml);
    let mut max = 0;
    loop {
        match reader.read_event().map_err(embed_err)? {
            Event::Eof => return Ok(max),
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"wp:docPr" => {
                if let Some(id) = attribute(&e, b"id").and_then(|v| v.parse::<u32>().ok()) {
                    max = max.max(id);
                }
            }
            _ => {}
        }
    }
}

/// Byte offset at which a new last body paragraph goes: before the body-level
/// `w:sectPr` when there is one, else before `</w:body>`.
fn body_insertion_point(xml: &str) -> Option<usize> {
    let body_end = xml.rfind("</w:body>")?;
    let head = &xml[..body_end];
    let last_block = [head.rfind("</w:p>"), head.rfind("</w:tbl>")]
        .into_iter()
        .flatten()
        .max()
        .unwrap_or(0);
    Some(match head[last_block..].find("<w:sectPr") {
        Some(offset) => last_block + offset,
        None => body_end,
    })
}

fn inline_paragraph(rel_id: &str, drawing_id: u32, name: &str, description: &str, (cx, cy): (u64, u64)) -> String {
    let descr = escape(description);
    format!(
        concat!(
            r#"<w:p><w:r><w:drawing>"#,
            r#"<wp:inline xmlns:wp="{ns_wp}" distT="0" distB="0" distL="0" distR="0">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:docPr id="{id}" name="{name}" descr="{descr}"/>"#,
            r#"<a:graphic xmlns:a="{ns_a}"><a:graphicData uri="{ns_pic}">"#,
            r#"<pic:pic xmlns:pic="{ns_pic}">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="{id}" name="{name}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip xmlns:r="{ns_r}" r:embed="{rel_id}"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline>"#,
            r#"</w:drawing></w:r></w:p>"#
        ),
        ns_wp = NS_WP,
        ns_a = NS_A,
        ns_pic = NS_PIC,
        ns_r = NS_R,
        cx = cx,
        cy = cy,
        id = drawing_id,
        name = name,
        descr = descr,
        rel_id = rel_id,
    )
}

/// Append `image` as the last body paragraph of the main document.
///
/// Adds the media part, its relationship and the `png` content type. The package is
/// left untouched when any step fails.
pub fn embed_barcode(package: &mut DocxPackage, image: &BarcodeImage, description: &str) -> Result<(), BarcodeError> {
    let mut staged = package.clone();

    let media_name = (1..)
        .map(|n| format!("barcode{n}.png"))
        .find(|name| staged.part(&format!("word/media/{name}")).is_none())
        .ok_or_else(|| embed_err("no free media name"))?;

    let xml = staged.main_document().map_err(embed_err)?.to_string();
    let at = body_insertion_point(&xml)
        .ok_or_else(|| embed_err(format!("{MAIN_DOCUMENT} has no body")))?;
    let drawing_id = max_drawing_id(&xml)? + 1;

    let rel_id = staged
        .add_image_relationship(&format!("media/{media_name}"))
        .map_err(embed_err)?;
    staged
        .ensure_default_content_type("png", "image/png")
        .map_err(embed_err)?;
    staged.set_part(&format!("word/media/{media_name}"), image.png.clone());

    let paragraph = inline_paragraph(&rel_id, drawing_id, &media_name, description, image.extent_emu());
    let mut updated = xml;
    updated.insert_str(at, &paragraph);
    staged.set_main_document(updated);

    *package = staged;
    tracing::debug!(%rel_id, media = %media_name, "embedded barcode image");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::barcode::BarcodeRenderer;
    use crate::package::CONTENT_TYPES;

    fn image() -> BarcodeImage {
        BarcodeRenderer::default().render("FV/1/2024").unwrap()
    }

    #[test]
    fn inserts_before_the_section_properties() {
        let mut package =
            DocxPackage::from_document_xml("<w:p><w:r><w:t>Total</w:t></w:r></w:p>");
        embed_barcode(&mut package, &image(), "Invoice FV/1/2024").unwrap();

        let xml = package.main_document().unwrap();
        let drawing = xml.find("<w:drawing>").unwrap();
        assert!(xml.find("Total").unwrap() < drawing);
        assert!(drawing < xml.rfind("<w:sectPr").unwrap());
        assert!(xml.contains(r#"r:embed="rId1""#));
        assert!(xml.contains(r#"descr="Invoice FV/1/2024""#));

        assert_eq!(package.part("word/media/barcode1.png"), Some(image().png.as_slice()));
        assert_eq!(
            package.resolve_relationship("rId1").unwrap().as_deref(),
            Some("word/media/barcode1.png")
        );
        assert!(package.xml_part(CONTENT_TYPES).unwrap().contains(r#"Extension="png""#));
    }

    #[test]
    fn repeated_embedding_uses_fresh_names_and_ids() {
        let mut package = DocxPackage::from_document_xml("<w:p/>");
        embed_barcode(&mut package, &image(), "a").unwrap();
        embed_barcode(&mut package, &image(), "b").unwrap();

        let xml = package.main_document().unwrap();
        assert!(xml.contains(r#"<wp:docPr id="1""#));
        assert!(xml.contains(r#"<wp:docPr id="2""#));
        assert!(package.part("word/media/barcode2.png").is_some());
        assert_eq!(package.relationships().unwrap().len(), 2);
    }

    #[test]
    fn appends_before_body_end_without_section() {
        let mut package = DocxPackage::from_document_xml("");
        let xml = concat!(
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">"#,
            r#"<w:body><w:p><w:r><w:t>x</w:t></w:r></w:p></w:body></w:document>"#
        );
        package.set_main_document(xml.to_string());
        embed_barcode(&mut package, &image(), "x").unwrap();
        assert!(package.main_document().unwrap().ends_with("</w:drawing></w:r></w:p></w:body></w:document>"));
    }

    #[test]
    fn failures_leave_the_package_untouched() {
        let mut package = DocxPackage::from_document_xml("");
        package.set_main_document("<w:document/>".to_string());
        let before = package.clone();
        assert!(matches!(
            embed_barcode(&mut package, &image(), "x"),
            Err(BarcodeError::Embed(_))
        ));
        assert_eq!(package, before);
    }
}
