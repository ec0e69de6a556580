use image::{DynamicImage, GrayImage, Luma};
use qrcode::{Color, EcLevel, QrCode};
use thiserror::Error;

use super::raster::{ImageError, RasterImage};

/// Pixels per QR module in the raster handed to the PDF encoder.
const MODULE_PX: u32 = 8;
/// Quiet zone around the symbol, in modules.
const QUIET_ZONE: u32 = 4;

#[derive(Debug, Error)]
pub enum QrError {
    #[error("QR encode error: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("QR raster error: {0}")]
    Raster(#[from] ImageError),
}

/// `<base>/certificados?code=<code>`, with the code percent-encoded and any
/// trailing slashes of `base` dropped.
pub fn verification_url(base: &str, code: &str) -> String {
    format!(
        "{}/certificados?code={}",
        base.trim_end_matches('/'),
        urlencoding::encode(code)
    )
}

/// Encodes `payload` as a QR symbol and rasterizes it with a white quiet zone.
pub fn encode_qr(payload: &str) -> Result<RasterImage, QrError> {
    let code = QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::M)?;
    let modules = code.to_colors();
    let module_count = code.width() as u32;
    let size = (module_count + 2 * QUIET_ZONE) * MODULE_PX;

    let mut img = GrayImage::from_pixel(size, size, Luma([255u8]));
    for (i, color) in modules.iter().enumerate() {
        if *color != Color::Dark {
            continue;
        }
        let x = (i as u32 % module_count + QUIET_ZONE) * MODULE_PX;
        let y = (i as u32 / module_count + QUIET_ZONE) * MODULE_PX;
        for dy in 0..MODULE_PX {
            for dx in 0..MODULE_PX {
                img.put_pixel(x + dx, y + dy, Luma([0u8]));
            }
        }
    }

    Ok(RasterImage::from_dynamic(&DynamicImage::ImageLuma8(img))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn verification_url_format() {
        assert_eq!(
            verification_url("https://ritmoderever.com", "RR-0A1B2C3D4E"),
            "https://ritmoderever.com/certificados?code=RR-0A1B2C3D4E"
        );
    }

    #[test]
    fn verification_url_trims_trailing_slash() {
        assert_eq!(
            verification_url("https://shop.test/app/", "RR-1"),
            "https://shop.test/app/certificados?code=RR-1"
        );
    }

    #[test]
    fn verification_url_encodes_code() {
        assert_eq!(
            verification_url("https://shop.test", "RR 1/2&x"),
            "https://shop.test/certificados?code=RR%201%2F2%26x"
        );
    }

    #[test]
    fn qr_raster_is_square_with_quiet_zone() {
        let raster = encode_qr("https://shop.test/certificados?code=RR-0A1B2C3D4E").unwrap();
        assert_eq!(raster.width, raster.height);
        assert_eq!(raster.width % MODULE_PX, 0);

        let img = image::load_from_memory(&raster.png).unwrap().to_rgb8();
        // quiet zone corner is white, finder pattern corner is dark
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        let edge = QUIET_ZONE * MODULE_PX;
        assert_eq!(img.get_pixel(edge, edge).0, [0, 0, 0]);
    }
}
