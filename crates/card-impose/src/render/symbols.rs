//! Barcode and QR symbol encoding.
//!
//! Symbols are regenerated from the resolved value for every record; nothing
//! here is cached.

use barcoders::sym::code39::Code39;
use barcoders::sym::code128::Code128;
use barcoders::sym::ean13::EAN13;
use card_template::BarcodeFormat;
use qrcode::{EcLevel, QrCode};

/// Encode `data` as linear barcode modules; `true` is a bar
pub fn encode_barcode(format: BarcodeFormat, data: &str) -> Result<Vec<bool>, String> {
    let encoded = match format {
        BarcodeFormat::Code128 => {
            // Character set B covers upper/lower case, digits and punctuation
            Code128::new(format!("\u{0181}{}", data))
                .map_err(|e| format!("Code 128 cannot encode {:?}: {}", data, e))?
                .encode()
        }
        BarcodeFormat::Code39 => Code39::new(data.to_uppercase())
            .map_err(|e| format!("Code 39 cannot encode {:?}: {}", data, e))?
            .encode(),
        BarcodeFormat::Ean13 => EAN13::new(data)
            .map_err(|e| format!("EAN-13 cannot encode {:?}: {}", data, e))?
            .encode(),
    };
    Ok(encoded.into_iter().map(|module| module == 1).collect())
}

/// Square module grid of a QR code, quiet zone included
#[derive(Debug, Clone, PartialEq)]
pub struct QrMatrix {
    width: usize,
    dark: Vec<bool>,
}

impl QrMatrix {
    /// Modules per side
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn is_dark(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.width && self.dark[y * self.width + x]
    }
}

/// Encode `data` as a QR code surrounded by `margin` light modules
pub fn encode_qr(data: &str, margin: u32) -> Result<QrMatrix, String> {
    let code = QrCode::with_error_correction_level(data, EcLevel::M)
        .map_err(|e| format!("QR code generation failed: {}", e))?;

    let inner = code.width();
    let margin = margin as usize;
    let width = inner + margin * 2;
    let mut dark = vec![false; width * width];
    for qy in 0..inner {
        for qx in 0..inner {
            if code[(qx, qy)] == qrcode::Color::Dark {
                dark[(qy + margin) * width + qx + margin] = true;
            }
        }
    }
    Ok(QrMatrix { width, dark })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code128_has_bars() {
        let bars = encode_barcode(BarcodeFormat::Code128, "S-001").unwrap();
        assert!(bars.iter().any(|&b| b));
        assert!(bars[0], "symbols start with a bar");
    }

    #[test]
    fn test_code39_accepts_lowercase_input() {
        assert!(encode_barcode(BarcodeFormat::Code39, "abc123").is_ok());
    }

    #[test]
    fn test_ean13_rejects_letters() {
        assert!(encode_barcode(BarcodeFormat::Ean13, "hello").is_err());
        assert!(encode_barcode(BarcodeFormat::Ean13, "750103131130").is_ok());
    }

    #[test]
    fn test_different_values_differ() {
        let a = encode_barcode(BarcodeFormat::Code128, "A1").unwrap();
        let b = encode_barcode(BarcodeFormat::Code128, "B2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_qr_quiet_zone() {
        let qr = encode_qr("https://example.com/id/42", 2).unwrap();
        assert!(qr.width() >= 21 + 4);
        for i in 0..qr.width() {
            assert!(!qr.is_dark(i, 0));
            assert!(!qr.is_dark(0, i));
            assert!(!qr.is_dark(i, qr.width() - 1));
        }
        // Finder pattern corner just inside the quiet zone
        assert!(qr.is_dark(2, 2));
    }
}
