use chrono::NaiveDate;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use super::raster::{load_product_image, ImageFetcher, RasterImage};
use super::layout::{
    compose_page, AssetSlot, BannerBlock, BodyBlock, BodyLine, Edge, HeaderBlock, ImageBlock,
    PageBlocks, PageLayout, QrBlock, SignatureBlock, A4,
};
use super::qr::{encode_qr, verification_url};
use crate::config::RenderConfig;

/// Everything printed on one certificate page.
#[derive(Debug, Clone)]
pub struct CertificateParams<'a> {
    pub order_name: &'a str,
    pub code: &'a str,
    pub title: &'a str,
    pub sku: Option<&'a str>,
    pub unit_index: u32,
    pub unit_count: u32,
    pub titular: Option<&'a str>,
    pub image_url: Option<&'a str>,
    pub issued_on: NaiveDate,
}

/// Artwork shared by every page of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct PageAssets {
    pub header: AssetSlot,
    pub footer: AssetSlot,
    pub signature: AssetSlot,
}

#[cfg(test)]
impl PageAssets {
    pub(crate) fn none() -> Self {
        Self {
            header: AssetSlot::Absent,
            footer: AssetSlot::Absent,
            signature: AssetSlot::Absent,
        }
    }
}

pub struct CertificateRenderer {
    config: RenderConfig,
    images: Arc<dyn ImageFetcher>,
}

impl CertificateRenderer {
    pub fn new(config: RenderConfig, images: Arc<dyn ImageFetcher>) -> Self {
        Self { config, images }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.config.image_fetch_timeout_ms)
    }

    /// Lays out one certificate page. Asset failures end up as visible
    /// placeholders on the page; this never fails.
    pub async fn render_page(
        &self,
        params: &CertificateParams<'_>,
        assets: &PageAssets,
    ) -> PageLayout {
        let labels = self.config.locale.labels();

        let image = match params.image_url {
            Some(url) => match load_product_image(self.images.as_ref(), url, self.image_timeout()).await {
                Ok(raster) => Some(raster),
                Err(e) => {
                    warn!("Product image {} unavailable for {}: {}", url, params.code, e);
                    None
                }
            },
            None => None,
        };

        let url = verification_url(&self.config.verify_base_url, params.code);
        let qr = match encode_qr(&url) {
            Ok(raster) => Some(raster),
            Err(e) => {
                warn!("QR generation failed for {}: {}", params.code, e);
                None
            }
        };

        let header = HeaderBlock {
            brand: &self.config.brand,
            title: labels.title,
            subtitle: format!(
                "{} {} \u{b7} {} {}",
                labels.order, params.order_name, labels.code, params.code
            ),
        };

        let title = if params.title.trim().is_empty() {
            labels.untitled
        } else {
            params.title
        };
        let mut lines = vec![
            BodyLine::new(labels.statement, 13),
            BodyLine::new(format!("\u{201c}{}\u{201d}", title), 18).emphasized(),
        ];
        if let Some(sku) = params.sku {
            lines.push(BodyLine::new(format!("{}: {}", labels.sku, sku), 11).muted());
        }
        lines.push(
            BodyLine::new(
                format!(
                    "{} {} {} {}",
                    labels.unit, params.unit_index, labels.of, params.unit_count
                ),
                11,
            )
            .muted(),
        );
        if let Some(titular) = params.titular.filter(|t| !t.trim().is_empty()) {
            lines.push(BodyLine::new(format!("{}: {}", labels.holder, titular), 12));
        }
        lines.push(
            BodyLine::new(
                format!("{}: {}", labels.issued, labels.format_date(params.issued_on)),
                10,
            )
            .muted(),
        );

        let body = BodyBlock { lines };
        let image_block = ImageBlock {
            image: image.as_ref(),
            unavailable: labels.image_unavailable,
        };
        let qr_block = QrBlock {
            qr: qr.as_ref(),
            url: &url,
            unavailable: labels.qr_unavailable,
        };
        let signature = SignatureBlock {
            captions: [labels.art_direction, labels.curation],
            signature: &assets.signature,
            unavailable: labels.signature_unavailable,
        };
        let top_banner = BannerBlock {
            asset: &assets.header,
            edge: Edge::Top,
            unavailable: labels.header_unavailable,
        };
        let bottom_banner = BannerBlock {
            asset: &assets.footer,
            edge: Edge::Bottom,
            unavailable: labels.footer_unavailable,
        };

        compose_page(
            A4,
            &PageBlocks {
                top_banner: &top_banner,
                header: &header,
                body: &body,
                image: &image_block,
                qr: &qr_block,
                signature: &signature,
                bottom_banner: &bottom_banner,
            },
        )
    }

    /// Reads the configured header, footer and signature artwork.
    pub async fn load_assets(&self) -> PageAssets {
        PageAssets {
            header: load_asset("Header", self.config.header_path.as_deref()).await,
            footer: load_asset("Footer", self.config.footer_path.as_deref()).await,
            signature: load_asset("Signature", self.config.signature_path.as_deref()).await,
        }
    }
}

async fn load_asset(kind: &str, path: Option<&Path>) -> AssetSlot {
    let Some(path) = path else {
        return AssetSlot::Absent;
    };

    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("{} asset {} unreadable: {}", kind, path.display(), e);
            return AssetSlot::Unavailable;
        }
    };

    match RasterImage::decode(&bytes) {
        Ok(raster) => AssetSlot::Ready(raster),
        Err(e) => {
            warn!("{} asset {} unusable: {}", kind, path.display(), e);
            AssetSlot::Unavailable
        }
    }
}
