//! Code 128 barcode rendering to PNG.

use barcoders::sym::code128::Code128;
use png::{BitDepth, ColorType, Encoder, PixelDimensions, Unit};

use crate::error::BarcodeError;

pub const DEFAULT_HEIGHT_PX: u32 = 80;
pub const DEFAULT_MODULE_WIDTH_PX: u32 = 2;
/// Resolution the image is tagged with and sized for when embedded.
pub const RESOLUTION_DPI: u32 = 160;

const EMU_PER_INCH: u64 = 914_400;
/// Character-set B selector understood by `barcoders`.
const CHARSET_B: char = 'Ɓ';

/// A rendered barcode, ready to be embedded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BarcodeImage {
    pub png: Vec<u8>,
    pub width_px: u32,
    pub height_px: u32,
}

impl BarcodeImage {
    /// Size in EMU at [`RESOLUTION_DPI`], as `(cx, cy)`.
    pub fn extent_emu(&self) -> (u64, u64) {
        let emu = |px: u32| u64::from(px) * EMU_PER_INCH / u64::from(RESOLUTION_DPI);
        (emu(self.width_px), emu(self.height_px))
    }
}

/// Renders printable-ASCII text as a 1-bit Code 128 (set B) PNG without quiet zone.
///
/// Only the bars are drawn. No human-readable line is printed under them, since the
/// invoice number already appears as text in the document the barcode is stamped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarcodeRenderer {
    height_px: u32,
    module_width_px: u32,
}

impl Default for BarcodeRenderer {
    fn default() -> Self {
        Self {
            height_px: DEFAULT_HEIGHT_PX,
            module_width_px: DEFAULT_MODULE_WIDTH_PX,
        }
    }
}

impl BarcodeRenderer {
    pub fn new(height_px: u32, module_width_px: u32) -> Self {
        Self {
            height_px: height_px.max(1),
            module_width_px: module_width_px.max(1),
        }
    }

    pub fn height_px(&self) -> u32 {
        self.height_px
    }

    pub fn module_width_px(&self) -> u32 {
        self.module_width_px
    }

    /// Bar pattern of `text`, one entry per module (`1` is a bar).
    pub fn encode_modules(&self, text: &str) -> Result<Vec<u8>, BarcodeError> {
        if text.is_empty() {
            return Err(BarcodeError::Empty);
        }
        if let Some(c) = text.chars().find(|c| !(' '..='~').contains(c)) {
            return Err(BarcodeError::UnsupportedChar(c));
        }
        let symbol = Code128::new(format!("{CHARSET_B}{text}"))
            .map_err(|e| BarcodeError::Encode(format!("{e:?}")))?;
        Ok(symbol.encode())
    }

    pub fn render(&self, text: &str) -> Result<BarcodeImage, BarcodeError> {
        let modules = self.encode_modules(text)?;
        let width_px = u32::try_from(modules.len())
            .ok()
            .and_then(|n| n.checked_mul(self.module_width_px))
            .ok_or_else(|| BarcodeError::Image("barcode too wide".to_string()))?;

        // 1-bit grayscale: 0 is black, rows packed MSB first.
        let stride = (width_px as usize).div_ceil(8);
        let mut row = vec![0xFFu8; stride];
        for (x, _) in modules
            .iter()
            .flat_map(|&m| std::iter::repeat_n(m, self.module_width_px as usize))
            .enumerate()
            .filter(|&(_, m)| m == 1)
        {
            row[x / 8] &= !(0x80 >> (x % 8));
        }
        let raw = row.repeat(self.height_px as usize);

        let pixels_per_meter = (f64::from(RESOLUTION_DPI) / 0.0254).round() as u32;
        let mut png = Vec::new();
        {
            let mut encoder = Encoder::new(&mut png, width_px, self.height_px);
            encoder.set_color(ColorType::Grayscale);
            encoder.set_depth(BitDepth::One);
            encoder.set_pixel_dims(Some(PixelDimensions {
                xppu: pixels_per_meter,
                yppu: pixels_per_meter,
                unit: Unit::Meter,
            }));
            let image_err = |e: png::EncodingError| BarcodeError::Image(e.to_string());
            let mut writer = encoder.write_header().map_err(image_err)?;
            writer.write_image_data(&raw).map_err(image_err)?;
            writer.finish().map_err(image_err)?;
        }

        tracing::debug!(text, width_px, height_px = self.height_px, "rendered barcode");
        Ok(BarcodeImage {
            png,
            width_px,
            height_px: self.height_px,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_non_ascii_text() {
        let renderer = BarcodeRenderer::default();
        assert_eq!(renderer.render("").unwrap_err(), BarcodeError::Empty);
        assert_eq!(
            renderer.render("FV/1/Łódź").unwrap_err(),
            BarcodeError::UnsupportedChar('Ł')
        );
        assert_eq!(
            renderer.render("tab\there").unwrap_err(),
            BarcodeError::UnsupportedChar('\t')
        );
    }

    #[test]
    fn renders_a_png_sized_by_modules() {
        let renderer = BarcodeRenderer::default();
        let modules = renderer.encode_modules("FV/12/2024").unwrap();
        // start, data, checksum and stop symbols; stop symbol is 13 modules
        assert_eq!((modules.len() - 13) % 11, 0);
        assert_eq!(modules.first(), Some(&1));

        let image = renderer.render("FV/12/2024").unwrap();
        assert_eq!(image.width_px, modules.len() as u32 * DEFAULT_MODULE_WIDTH_PX);
        assert_eq!(image.height_px, DEFAULT_HEIGHT_PX);
        assert_eq!(&image.png[1..4], b"PNG");

        let decoder = png::Decoder::new(image.png.as_slice());
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!((info.width, info.height), (image.width_px, image.height_px));
        assert_eq!(info.bit_depth, BitDepth::One);
        assert_eq!(info.color_type, ColorType::Grayscale);
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = BarcodeRenderer::new(40, 1);
        assert_eq!(renderer.render("ABC-123").unwrap(), renderer.render("ABC-123").unwrap());
        assert_ne!(renderer.render("ABC-123").unwrap(), renderer.render("ABC-124").unwrap());
    }

    #[test]
    fn extent_follows_resolution() {
        let image = BarcodeImage {
            png: Vec::new(),
            width_px: 320,
            height_px: 80,
        };
        assert_eq!(image.extent_emu(), (1_828_800, 457_200));
    }

    #[test]
    fn zero_dimensions_are_clamped() {
        let renderer = BarcodeRenderer::new(0, 0);
        assert_eq!((renderer.height_px(), renderer.module_width_px()), (1, 1));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn printable_ascii_renders_identically(text in "[ -~]{1,24}", module in 1u32..4) {
                let renderer = BarcodeRenderer::new(20, module);
                let first = renderer.render(&text).unwrap();
                prop_assert_eq!(first.width_px % module, 0);
                prop_assert_eq!(first, renderer.render(&text).unwrap());
            }
        }
    }
}
