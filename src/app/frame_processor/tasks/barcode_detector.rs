// SPDX-License-Identifier: GPL-3.0-only

//! 1-D barcode reader backed by rxing
//!
//! Uses the multi-format reader over a hybrid binarizer. The reader also
//! understands 2-D symbologies; whatever it returns is reported as a barcode.

use super::CodeReader;
use image::GrayImage;
use rxing::Reader;
use rxing::common::HybridBinarizer;
use tracing::{debug, trace};

#[derive(Debug, Default, Clone, Copy)]
pub struct BarcodeDetector;

impl BarcodeDetector {
    pub fn new() -> Self {
        Self
    }
}

impl CodeReader for BarcodeDetector {
    fn name(&self) -> &'static str {
        "barcode"
    }

    fn read(&self, image: &GrayImage) -> Option<String> {
        let (width, height) = image.dimensions();
        let source = rxing::Luma8LuminanceSource::new(image.as_raw().clone(), width, height);
        let mut bitmap = rxing::BinaryBitmap::new(HybridBinarizer::new(source));
        let mut reader = rxing::MultiFormatReader::default();

        match reader.decode(&mut bitmap) {
            Ok(result) => {
                let text = result.getText().to_string();
                debug!(
                    format = ?result.getBarcodeFormat(),
                    content = %text,
                    "Decoded barcode"
                );
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                trace!(error = %e, "No barcode found");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    const L: [&str; 10] = [
        "0001101", "0011001", "0010011", "0111101", "0100011", "0110001", "0101111", "0111011",
        "0110111", "0001011",
    ];
    const G: [&str; 10] = [
        "0100111", "0110011", "0011011", "0100001", "0011101", "0111001", "0000101", "0010001",
        "0001001", "0010111",
    ];
    const R: [&str; 10] = [
        "1110010", "1100110", "1101100", "1000010", "1011100", "1001110", "1010000", "1000100",
        "1001000", "1110100",
    ];
    const PARITY: [&str; 10] = [
        "LLLLLL", "LLGLGG", "LLGGLG", "LLGGGL", "LGLLGG", "LGGLLG", "LGGGLL", "LGLGLG", "LGLGGL",
        "LGGLGL",
    ];

    /// Render an EAN-13 symbol, 3 px per module, with quiet zones
    fn render_ean13(digits: &str) -> GrayImage {
        let d: Vec<usize> = digits.bytes().map(|b| (b - b'0') as usize).collect();
        let mut bits = String::from("0000000000101");
        for (i, parity) in PARITY[d[0]].chars().enumerate() {
            let table = if parity == 'L' { &L } else { &G };
            bits.push_str(table[d[i + 1]]);
        }
        bits.push_str("01010");
        for &digit in &d[7..13] {
            bits.push_str(R[digit]);
        }
        bits.push_str("1010000000000");

        let bits: Vec<bool> = bits.chars().map(|c| c == '1').collect();
        GrayImage::from_fn(bits.len() as u32 * 3, 60, |x, _| {
            Luma([if bits[(x / 3) as usize] { 0 } else { 255 }])
        })
    }

    #[test]
    fn test_reads_ean13() {
        let image = render_ean13("4006381333931");
        assert_eq!(
            BarcodeDetector::new().read(&image).as_deref(),
            Some("4006381333931")
        );
    }

    #[test]
    fn test_blank_image_reads_nothing() {
        let image = GrayImage::from_pixel(120, 40, Luma([255]));
        assert_eq!(BarcodeDetector::new().read(&image), None);
    }
}
