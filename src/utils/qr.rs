use image::{GrayImage, ImageFormat, Luma};
use qrcode::{Color, QrCode};
use std::io::Cursor;

use crate::utils::error::AppError;

const MODULE_PIXELS: u32 = 8;
const QUIET_ZONE_MODULES: u32 = 4;

const BLACK: Luma<u8> = Luma([0]);
const WHITE: Luma<u8> = Luma([255]);

/// Renders `url` as a QR code PNG suitable for scanning from a phone
/// screen. Modules are scaled up and surrounded by the standard quiet zone.
pub fn voucher_png(url: &str) -> Result<Vec<u8>, AppError> {
    let code = QrCode::new(url.as_bytes())
        .map_err(|e| AppError::Internal(format!("QR encoding failed: {}", e)))?;

    let modules = code.width() as u32;
    let side = (modules + 2 * QUIET_ZONE_MODULES) * MODULE_PIXELS;
    let colors = code.to_colors();

    let img = GrayImage::from_fn(side, side, |x, y| {
        let mx = (x / MODULE_PIXELS).checked_sub(QUIET_ZONE_MODULES);
        let my = (y / MODULE_PIXELS).checked_sub(QUIET_ZONE_MODULES);
        match (mx, my) {
            (Some(mx), Some(my)) if mx < modules && my < modules => {
                match colors[(my * modules + mx) as usize] {
                    Color::Dark => BLACK,
                    Color::Light => WHITE,
                }
            }
            _ => WHITE,
        }
    });

    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| AppError::Internal(format!("PNG encoding failed: {}", e)))?;
    Ok(buffer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

    #[test]
    fn voucher_is_a_png() {
        let bytes = voucher_png("http://localhost:3000/booking/BKS1").unwrap();
        assert_eq!(&bytes[..8], &PNG_MAGIC);
    }

    #[test]
    fn voucher_is_square_with_quiet_zone() {
        let bytes = voucher_png("http://localhost:3000/booking/BKS1").unwrap();
        let img = image::load_from_memory(&bytes).unwrap();
        assert_eq!(img.width(), img.height());
        // Smallest QR is 21 modules plus 8 quiet-zone modules
        assert!(img.width() >= (21 + 8) * MODULE_PIXELS);
    }

    #[test]
    fn corner_pixels_are_white() {
        let bytes = voucher_png("http://localhost:3000/booking/BKE7").unwrap();
        let img = image::load_from_memory(&bytes).unwrap().to_luma8();
        assert_eq!(img.get_pixel(0, 0), &WHITE);
        let edge = img.width() - 1;
        assert_eq!(img.get_pixel(edge, edge), &WHITE);
    }
}
