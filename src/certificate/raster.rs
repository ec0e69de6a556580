//! Product image fetching and the format guard in front of the PDF encoder.
//!
//! genpdf can only embed JPEG and PNG data without an alpha channel, so every
//! image that reaches a page goes through [`RasterImage`]: decoded, checked,
//! flattened onto white and re-encoded as an RGB PNG.

use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("image fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("image fetch failed: {0}")]
    Network(String),

    #[error("image server answered HTTP {0}")]
    Status(u16),

    #[error("unsupported image type: {0}")]
    UnsupportedType(String),

    #[error("failed to decode image: {0}")]
    Decode(String),

    #[error("image larger than {limit} bytes")]
    TooLarge { limit: usize },

    #[error("invalid image dimensions {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Raw response of an image download.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError>;
}

/// Default cap on a downloaded image body.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Downloads images with a shared reqwest client.
pub struct HttpImageFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("certificados/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, timeout, max_bytes))
    }

    fn with_client(client: reqwest::Client, timeout: Duration, max_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_bytes,
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ImageError {
        if e.is_timeout() {
            ImageError::Timeout(self.timeout)
        } else {
            ImageError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, ImageError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let too_large = ImageError::TooLarge {
            limit: self.max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > self.max_bytes as u64)
        {
            return Err(too_large);
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        // Content-Length can be absent or wrong, so the body is capped as it streams.
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| self.transport_error(e))? {
            if bytes.len() + chunk.len() > self.max_bytes {
                return Err(too_large);
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedImage {
            bytes,
            content_type,
        })
    }
}

/// True for the declared media types the PDF encoder can embed.
pub fn is_embeddable_media_type(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    matches!(
        essence.as_str(),
        "image/jpeg" | "image/jpg" | "image/pjpeg" | "image/png"
    )
}

/// An RGB PNG plus its pixel size, ready to hand to the PDF encoder.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_len", &self.png.len())
            .finish()
    }
}

impl RasterImage {
    /// Decodes JPEG or PNG bytes. Other formats are rejected even when the
    /// decoder would understand them.
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let format =
            image::guess_format(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        if !matches!(format, ImageFormat::Jpeg | ImageFormat::Png) {
            return Err(ImageError::UnsupportedType(format!("{:?}", format)));
        }

        let decoded = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| ImageError::Decode(e.to_string()))?;
        Self::from_dynamic(&decoded)
    }

    pub fn from_dynamic(source: &DynamicImage) -> Result<Self, ImageError> {
        let (width, height) = (source.width(), source.height());
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidDimensions { width, height });
        }

        let rgba = source.to_rgba8();
        let flattened = RgbImage::from_fn(width, height, |x, y| {
            let [r, g, b, a] = rgba.get_pixel(x, y).0;
            let alpha = u16::from(a);
            let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha)) / 255) as u8;
            Rgb([blend(r), blend(g), blend(b)])
        });

        let mut png = Vec::new();
        DynamicImage::ImageRgb8(flattened)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        Ok(Self { png, width, height })
    }
}

/// Fetches `url` within `timeout` and turns the response into an embeddable
/// raster. A missing or non-JPEG/PNG content type is rejected like a failed
/// download.
pub async fn load_product_image(
    fetcher: &dyn ImageFetcher,
    url: &str,
    timeout: Duration,
) -> Result<RasterImage, ImageError> {
    let fetched = tokio::time::timeout(timeout, fetcher.fetch(url))
        .await
        .map_err(|_| ImageError::Timeout(timeout))??;

    match fetched.content_type.as_deref() {
        Some(ct) if is_embeddable_media_type(ct) => {}
        Some(ct) => return Err(ImageError::UnsupportedType(ct.to_string())),
        None => return Err(ImageError::UnsupportedType("missing content type".to_string())),
    }

    RasterImage::decode(&fetched.bytes)
}
