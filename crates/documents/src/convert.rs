//! In-memory `.docx` to PDF conversion.
//!
//! The main document is flattened into a sequence of text lines and inline images,
//! then laid out top to bottom on A4 pages in Helvetica. Paragraph and run
//! formatting is not reproduced; table rows become one line with their cells side by
//! side. Only PNG images are drawn.

use std::io::Cursor;

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat, dictionary};
use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{ConversionError, TemplateError};
use crate::package::{DocxPackage, MAIN_DOCUMENT, attribute};

const EMU_PER_POINT: u64 = 12_700;
const CELL_GAP: &str = "   ";
const TAB: &str = "    ";
const FONT: &str = "F1";
/// Average Helvetica glyph width as a fraction of the font size.
const GLYPH_WIDTH: f64 = 0.55;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Block {
    Text(String),
    Image { rel_id: String, cx: u64, cy: u64 },
}

#[derive(Default)]
struct Flattener {
    blocks: Vec<Block>,
    line: String,
    in_run: usize,
    in_text: bool,
    paragraph_had_image: bool,
    table_depth: usize,
    cell: String,
    row: Vec<String>,
    extent: Option<(u64, u64)>,
}

impl Flattener {
    fn push_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        if self.table_depth > 0 {
            if !self.cell.is_empty() && !line.is_empty() {
                self.cell.push(' ');
            }
            self.cell.push_str(&line);
        } else {
            self.blocks.push(Block::Text(line));
        }
    }

    fn start(&mut self, name: &[u8], element: &quick_xml::events::BytesStart<'_>, empty: bool) {
        match name {
            b"w:p" if !empty => self.paragraph_had_image = false,
            b"w:p" => {
                if self.table_depth == 0 {
                    self.blocks.push(Block::Text(String::new()));
                }
            }
            b"w:r" if !empty => self.in_run += 1,
            b"w:t" if !empty => self.in_text = true,
            b"w:tab" if self.in_run > 0 => self.line.push_str(TAB),
            b"w:br" | b"w:cr" if self.in_run > 0 => self.push_line(),
            b"w:tbl" if !empty => self.table_depth += 1,
            b"w:tr" if !empty && self.table_depth == 1 => self.row.clear(),
            b"w:tc" if !empty && self.table_depth == 1 => self.cell.clear(),
            b"wp:extent" => {
                let size = |key: &[u8]| attribute(element, key).and_then(|v| v.parse::<u64>().ok());
                self.extent = size(b"cx").zip(size(b"cy"));
            }
            b"a:blip" => {
                if let Some(rel_id) = attribute(element, b"r:embed") {
                    if !self.line.is_empty() {
                        self.push_line();
                    }
                    let (cx, cy) = self.extent.take().unwrap_or((0, 0));
                    if self.table_depth > 0 {
                        tracing::debug!(%rel_id, "skipping image inside table");
                    } else {
                        self.blocks.push(Block::Image { rel_id, cx, cy });
                        self.paragraph_had_image = true;
                    }
                }
            }
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"w:p" => {
                if !(self.paragraph_had_image && self.line.is_empty()) {
                    self.push_line();
                }
            }
            b"w:r" => self.in_run = self.in_run.saturating_sub(1),
            b"w:t" => self.in_text = false,
            b"w:tc" if self.table_depth == 1 => {
                let cell = std::mem::take(&mut self.cell);
                self.row.push(cell);
            }
            b"w:tr" if self.table_depth == 1 => {
                let row = std::mem::take(&mut self.row);
                self.blocks.push(Block::Text(row.join(CELL_GAP).trim_end().to_string()));
            }
            b"w:tbl" => self.table_depth = self.table_depth.saturating_sub(1),
            _ => {}
        }
    }
}

fn flatten(xml: &str) -> Result<Vec<Block>, TemplateError> {
    let mut reader = Reader::from_str(xml);
    let mut state = Flattener::default();
    loop {
        match reader.read_event().map_err(|e| TemplateError::xml(MAIN_DOCUMENT, e))? {
            Event::Eof => break,
            Event::Start(e) => state.start(e.name().as_ref(), &e, false),
            Event::Empty(e) => state.start(e.name().as_ref(), &e, true),
            Event::End(e) => state.end(e.name().as_ref()),
            Event::Text(text) if state.in_text => {
                let text = text.unescape().map_err(|e| TemplateError::xml(MAIN_DOCUMENT, e))?;
                state.line.push_str(&text);
            }
            _ => {}
        }
    }
    Ok(state.blocks)
}

/// Encode text for a WinAnsi Type 1 font. Polish letters lose their diacritics;
/// anything else outside Latin-1 becomes `?`.
pub fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            'ą' => b'a',
            'ć' => b'c',
            'ę' => b'e',
            'ł' => b'l',
            'ń' => b'n',
            'ś' => b's',
            'ź' | 'ż' => b'z',
            'Ą' => b'A',
            'Ć' => b'C',
            'Ę' => b'E',
            'Ł' => b'L',
            'Ń' => b'N',
            'Ś' => b'S',
            'Ź' | 'Ż' => b'Z',
            '\u{2013}' | '\u{2014}' => b'-',
            '\u{201C}' | '\u{201D}' | '\u{201E}' => b'"',
            '\u{2018}' | '\u{2019}' => b'\'',
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            _ => b'?',
        })
        .collect()
}

/// Greedy word wrap on an estimated glyph width.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    if text.chars().count() <= max_chars {
        return vec![text.to_string()];
    }
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut len = 0;
    for word in text.split(' ') {
        let word_len = word.chars().count();
        if len > 0 && len + 1 + word_len > max_chars {
            lines.push(std::mem::take(&mut line));
            len = 0;
        }
        if len > 0 {
            line.push(' ');
            len += 1;
        }
        let mut chars = word.chars().peekable();
        while chars.peek().is_some() {
            if len == max_chars {
                lines.push(std::mem::take(&mut line));
                len = 0;
            }
            if let Some(c) = chars.next() {
                line.push(c);
                len += 1;
            }
        }
    }
    lines.push(line);
    lines
}

struct DecodedImage {
    width: u32,
    height: u32,
    color_space: &'static str,
    data: Vec<u8>,
}

fn decode_png(bytes: &[u8]) -> Result<DecodedImage, png::DecodingError> {
    let mut decoder = png::Decoder::new(Cursor::new(bytes));
    decoder.set_transformations(png::Transformations::EXPAND | png::Transformations::STRIP_16);
    let mut reader = decoder.read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;
    buf.truncate(info.buffer_size());

    let (color_space, channels, keep) = match info.color_type {
        png::ColorType::Grayscale => ("DeviceGray", 1, 1),
        png::ColorType::GrayscaleAlpha => ("DeviceGray", 2, 1),
        png::ColorType::Rgba => ("DeviceRGB", 4, 3),
        png::ColorType::Rgb | png::ColorType::Indexed => ("DeviceRGB", 3, 3),
    };
    let data = if channels == keep {
        buf
    } else {
        buf.chunks_exact(channels)
            .flat_map(|px| px[..keep].iter().copied())
            .collect()
    };
    Ok(DecodedImage {
        width: info.width,
        height: info.height,
        color_space,
        data,
    })
}

/// Accumulates content-stream operations page by page.
struct Layout {
    width: i64,
    height: i64,
    margin: i64,
    font_size: i64,
    leading: i64,
    pages: Vec<Vec<Operation>>,
    current: Vec<Operation>,
    y: i64,
}

impl Layout {
    fn new(converter: &PdfConverter) -> Self {
        Self {
            width: converter.page_width,
            height: converter.page_height,
            margin: converter.margin,
            font_size: converter.font_size,
            leading: converter.leading,
            pages: Vec::new(),
            current: Vec::new(),
            y: converter.page_height - converter.margin,
        }
    }

    fn content_width(&self) -> i64 {
        self.width - 2 * self.margin
    }

    fn reserve(&mut self, height: i64) {
        let fresh_page = self.y == self.height - self.margin;
        if self.y - height < self.margin && !fresh_page {
            self.pages.push(std::mem::take(&mut self.current));
            self.y = self.height - self.margin;
        }
        self.y -= height;
    }

    fn text(&mut self, line: &str) {
        self.reserve(self.leading);
        if line.trim().is_empty() {
            return;
        }
        self.current.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![Object::Name(FONT.as_bytes().to_vec()), Object::Integer(self.font_size)]),
            Operation::new("Td", vec![Object::Integer(self.margin), Object::Integer(self.y)]),
            Operation::new("Tj", vec![Object::String(win_ansi(line), StringFormat::Literal)]),
            Operation::new("ET", vec![]),
        ]);
    }

    fn content_height(&self) -> i64 {
        self.height - 2 * self.margin
    }

    /// Draws the image scaled down, keeping its aspect ratio, to fit the content area.
    fn image(&mut self, name: &str, width: i64, height: i64) {
        let (mut width, mut height) = (width.max(1), height.max(1));
        if width > self.content_width() {
            height = (height * self.content_width() / width).max(1);
            width = self.content_width();
        }
        if height > self.content_height() {
            width = (width * self.content_height() / height).max(1);
            height = self.content_height();
        }
        self.reserve(height);
        self.current.extend([
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(width),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(height),
                    Object::Integer(self.margin),
                    Object::Integer(self.y),
                ],
            ),
            Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ]);
        self.y -= self.leading / 2;
    }

    fn finish(mut self) -> Vec<Vec<Operation>> {
        if !self.current.is_empty() || self.pages.is_empty() {
            self.pages.push(self.current);
        }
        self.pages
    }
}

/// Renders a [`DocxPackage`] as a PDF document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfConverter {
    page_width: i64,
    page_height: i64,
    margin: i64,
    font_size: i64,
    leading: i64,
}

impl Default for PdfConverter {
    fn default() -> Self {
        // A4 in points
        Self {
            page_width: 595,
            page_height: 842,
            margin: 50,
            font_size: 10,
            leading: 14,
        }
    }
}

impl PdfConverter {
    fn max_chars(&self) -> usize {
        let width = (self.page_width - 2 * self.margin) as f64;
        (width / (self.font_size as f64 * GLYPH_WIDTH)).max(1.0) as usize
    }

    fn image_xobject(&self, package: &DocxPackage, rel_id: &str) -> Result<Option<Stream>, ConversionError> {
        let Some(part) = package.resolve_relationship(rel_id)? else {
            tracing::warn!(%rel_id, "image relationship not found; skipping");
            return Ok(None);
        };
        let Some(bytes) = package.part(&part) else {
            tracing::warn!(%part, "image part missing; skipping");
            return Ok(None);
        };
        let image = match decode_png(bytes) {
            Ok(image) => image,
            Err(e) => {
                tracing::warn!(%part, error = %e, "unsupported image; skipping");
                return Ok(None);
            }
        };
        let dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => image.color_space,
            "BitsPerComponent" => 8i64,
        };
        Ok(Some(Stream::new(dict, image.data)))
    }

    /// Convert the package's main document to PDF bytes, with `title` in the
    /// document information.
    pub fn convert(&self, package: &DocxPackage, title: &str) -> Result<Vec<u8>, ConversionError> {
        let blocks = flatten(package.main_document()?)?;
        let mut doc = Document::with_version("1.5");
        let mut layout = Layout::new(self);
        let mut xobjects = Dictionary::new();
        let max_chars = self.max_chars();

        for block in &blocks {
            match block {
                Block::Text(text) => {
                    for line in wrap(text, max_chars) {
                        layout.text(&line);
                    }
                }
                Block::Image { rel_id, cx, cy } => {
                    let Some(stream) = self.image_xobject(package, rel_id)? else {
                        continue;
                    };
                    let (width, height) = if *cx > 0 && *cy > 0 {
                        ((cx / EMU_PER_POINT) as i64, (cy / EMU_PER_POINT) as i64)
                    } else {
                        let px = |key: &[u8]| stream.dict.get(key).and_then(Object::as_i64).unwrap_or(1);
                        (px(b"Width"), px(b"Height"))
                    };
                    let name = format!("Im{}", xobjects.len() + 1);
                    let id = doc.add_object(stream);
                    xobjects.set(name.clone(), id);
                    layout.image(&name, width, height);
                }
            }
        }

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { FONT => font_id },
            "XObject" => xobjects,
        });

        let pages_id: ObjectId = doc.new_object_id();
        let mut kids = Vec::new();
        for operations in layout.finish() {
            let content = Content { operations }
                .encode()
                .map_err(|e| ConversionError::Pdf(e.to_string()))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, content));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(Object::Reference(page_id));
        }
        let page_count = kids.len();
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count as i64,
                "MediaBox" => vec![
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(self.page_width),
                    Object::Integer(self.page_height),
                ],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Title" => Object::String(win_ansi(title), StringFormat::Literal),
            "Producer" => Object::string_literal("factoring-documents"),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        let mut pdf = Vec::new();
        doc.save_to(&mut pdf)
            .map_err(|e| ConversionError::Pdf(e.to_string()))?;
        tracing::debug!(pages = page_count, bytes = pdf.len(), "converted document to pdf");
        Ok(pdf)
    }
}
