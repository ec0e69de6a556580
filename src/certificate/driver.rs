use chrono::NaiveDate;
use tracing::info;

use super::code::generate_code;
use super::layout::PageLayout;
use super::render::{CertificateParams, CertificateRenderer};
use crate::order::{LineItem, Order};

/// One physical item that gets its own page.
#[derive(Debug, Clone, Copy)]
pub struct CertificateUnit<'a> {
    pub line_item: &'a LineItem,
    pub unit_index: u32,
    pub unit_count: u32,
}

/// Number of certificates for a line item: the quantity, but at least one.
pub fn units_for(quantity: i64) -> u32 {
    quantity.clamp(1, i64::from(u32::MAX)) as u32
}

/// Units of an order in line-item order, then unit order.
pub fn certificate_units(order: &Order) -> impl Iterator<Item = CertificateUnit<'_>> {
    order.line_items.iter().flat_map(|item| {
        let count = units_for(item.quantity);
        (1..=count).map(move |unit_index| CertificateUnit {
            line_item: item,
            unit_index,
            unit_count: count,
        })
    })
}

/// Laid-out pages waiting for the PDF encoder.
#[derive(Debug, Clone, Default)]
pub struct CertificateDocument {
    pub title: String,
    pages: Vec<PageLayout>,
}

impl CertificateDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    /// Adds a page. The encoder only breaks between pages, so this is the
    /// same call for the first page and every later one.
    pub fn append_page(&mut self, page: PageLayout) {
        self.pages.push(page);
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn pages(&self) -> &[PageLayout] {
        &self.pages
    }

    pub fn into_pages(self) -> Vec<PageLayout> {
        self.pages
    }
}

/// Renders one page per unit of `order`.
pub async fn render_order(
    renderer: &CertificateRenderer,
    order: &Order,
    titular: Option<&str>,
    issued_on: NaiveDate,
) -> CertificateDocument {
    let labels = renderer.config().locale.labels();
    let mut document = CertificateDocument::new(format!("{} {}", labels.title, order.name));
    let assets = renderer.load_assets().await;

    for unit in certificate_units(order) {
        let item = unit.line_item;
        let code = generate_code(&order.id, &item.id, unit.unit_index);
        let params = CertificateParams {
            order_name: &order.name,
            code: &code,
            title: &item.title,
            sku: item.sku.as_deref(),
            unit_index: unit.unit_index,
            unit_count: unit.unit_count,
            titular,
            image_url: item.image_url.as_deref(),
            issued_on,
        };
        document.append_page(renderer.render_page(&params, &assets).await);
    }

    info!(
        "Rendered {} certificate page(s) for order {}",
        document.page_count(),
        order.name
    );
    document
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::raster::tests::{png_bytes, StaticFetcher};
    use crate::certificate::render::tests::config;
    use crate::pdf::tests::{bundled_fonts, pdf_page_count};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    fn item(id: &str, quantity: i64) -> LineItem {
        LineItem {
            id: id.to_string(),
            title: format!("Obra {}", id),
            sku: Some(format!("SKU-{}", id)),
            quantity,
            image_url: Some(format!("https://cdn.test/{}.png", id)),
        }
    }

    fn order(quantities: &[i64]) -> Order {
        Order {
            id: "gid://shopify/Order/77".to_string(),
            name: "#1077".to_string(),
            line_items: quantities
                .iter()
                .enumerate()
                .map(|(i, q)| item(&format!("item{}", i + 1), *q))
                .collect(),
            currency: Some("COP".to_string()),
            created_at: None,
        }
    }

    fn issued() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 5).unwrap()
    }

    fn subtitle_code(page: &PageLayout) -> String {
        page.texts()
            .find_map(|t| t.text.split("Código ").nth(1).map(str::to_string))
            .expect("subtitle with code")
    }

    #[test]
    fn quantities_are_clamped_to_one() {
        assert_eq!(units_for(3), 3);
        assert_eq!(units_for(1), 1);
        assert_eq!(units_for(0), 1);
        assert_eq!(units_for(-4), 1);
    }

    #[test]
    fn units_follow_item_then_unit_order() {
        let order = order(&[2, 1, 3]);
        let units: Vec<(&str, u32)> = certificate_units(&order)
            .map(|u| (u.line_item.id.as_str(), u.unit_index))
            .collect();
        assert_eq!(
            units,
            vec![
                ("item1", 1),
                ("item1", 2),
                ("item2", 1),
                ("item3", 1),
                ("item3", 2),
                ("item3", 3),
            ]
        );
    }

    #[tokio::test]
    async fn one_page_per_unit_in_order() {
        let renderer = CertificateRenderer::new(
            config(),
            Arc::new(StaticFetcher::ok(png_bytes(20, 10), "image/png")),
        );
        let order = order(&[2, 1, 3]);
        let document = render_order(&renderer, &order, Some("Ana"), issued()).await;

        assert_eq!(document.page_count(), 6);
        let codes: Vec<String> = document.pages().iter().map(subtitle_code).collect();
        let expected: Vec<String> = [
            ("item1", 1),
            ("item1", 2),
            ("item2", 1),
            ("item3", 1),
            ("item3", 2),
            ("item3", 3),
        ]
        .iter()
        .map(|(id, unit)| generate_code(&order.id, id, *unit))
        .collect();
        assert_eq!(codes, expected);
        assert!(document.pages()[5].has_text("Unidad 3 de 3"));
        assert!(document.pages()[2].has_text("\u{201c}Obra item2\u{201d}"));
    }

    #[tokio::test]
    async fn codes_are_stable_across_renders() {
        let renderer = CertificateRenderer::new(config(), Arc::new(StaticFetcher::failing("offline")));
        let order = order(&[2]);
        let first = render_order(&renderer, &order, None, issued()).await;
        let second = render_order(&renderer, &order, None, issued()).await;
        let a: Vec<String> = first.pages().iter().map(subtitle_code).collect();
        let b: Vec<String> = second.pages().iter().map(subtitle_code).collect();
        assert_eq!(a, b);
        assert_ne!(a[0], a[1]);
    }

    #[tokio::test]
    async fn webp_images_keep_full_page_count() {
        let renderer = CertificateRenderer::new(
            config(),
            Arc::new(StaticFetcher::ok(png_bytes(4, 4), "image/webp")),
        );
        let document = render_order(&renderer, &order(&[2, 1, 3]), Some("Ana"), issued()).await;
        assert_eq!(document.page_count(), 6);
        assert!(document
            .pages()
            .iter()
            .all(|p| p.has_text("Imagen no disponible")));
    }

    #[tokio::test]
    async fn encoded_pdf_has_one_page_per_unit() {
        for content_type in ["image/png", "image/webp"] {
            let renderer = CertificateRenderer::new(
                config(),
                Arc::new(StaticFetcher::ok(png_bytes(20, 10), content_type)),
            );
            let document = render_order(&renderer, &order(&[2, 1, 3]), Some("Ana"), issued()).await;
            let pdf = crate::pdf::render_to_vec(document, bundled_fonts()).unwrap();
            assert_eq!(pdf_page_count(&pdf), 6, "{}", content_type);
        }
    }

    #[tokio::test]
    async fn network_failures_keep_full_page_count() {
        let renderer = CertificateRenderer::new(config(), Arc::new(StaticFetcher::failing("connection reset")));
        let document = render_order(&renderer, &order(&[2, 1, 3]), None, issued()).await;
        assert_eq!(document.page_count(), 6);
        assert!(document.pages().iter().all(|p| p.has_text("Imagen no disponible")));
    }

    #[tokio::test]
    async fn timeouts_keep_full_page_count() {
        let fetcher = StaticFetcher {
            delay: Some(Duration::from_secs(30)),
            ..StaticFetcher::ok(png_bytes(4, 4), "image/png")
        };
        let mut cfg = config();
        cfg.image_fetch_timeout_ms = 10;
        let renderer = CertificateRenderer::new(cfg, Arc::new(fetcher));
        let document = render_order(&renderer, &order(&[1, 2]), None, issued()).await;
        assert_eq!(document.page_count(), 3);
        assert!(document.pages().iter().all(|p| p.has_text("Imagen no disponible")));
    }

    #[tokio::test]
    async fn zero_and_negative_quantities_get_one_page() {
        let renderer = CertificateRenderer::new(config(), Arc::new(StaticFetcher::failing("offline")));
        let document = render_order(&renderer, &order(&[0, -2, 2]), None, issued()).await;
        assert_eq!(document.page_count(), 4);
    }
}
