use axum::{
    extract::State,
    response::{Html, IntoResponse, Response},
    Form,
};
use chrono::Datelike;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};
use tera::Context;
use tracing::info;

use super::api::{download_filename, pdf_response};
use crate::certificate::render_order;
use crate::error::AppError;
use crate::state::AppState;

pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut ctx = Context::new();
    ctx.insert("brand", &state.config.brand);
    ctx.insert("default_shop", &state.config.default_shop);
    ctx.insert("year", &chrono::Local::now().year());
    Html(crate::templates::render("index.html", &ctx))
}

#[derive(Debug, Default, Deserialize)]
pub struct GenerateForm {
    pub shop: Option<String>,
    pub order_name: Option<String>,
    pub titular: Option<String>,
}

/// A validated certificate request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateRequest {
    pub shop: String,
    pub order_name: String,
    pub titular: String,
}

fn is_valid_shop(shop: &str) -> bool {
    static SHOP: OnceLock<Regex> = OnceLock::new();
    SHOP.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9-]*\.myshopify\.com$").expect("static pattern")
    })
    .is_match(shop)
}

fn trimmed(value: Option<String>) -> String {
    value.map(|v| v.trim().to_string()).unwrap_or_default()
}

impl GenerateForm {
    pub fn validate(self, default_shop: &str) -> Result<CertificateRequest, AppError> {
        let order_name = trimmed(self.order_name);
        let titular = trimmed(self.titular);
        if order_name.is_empty() || titular.is_empty() {
            return Err(AppError::Validation(
                "Faltan datos en el formulario: número de orden y nombre del titular son obligatorios."
                    .to_string(),
            ));
        }

        let shop = match trimmed(self.shop) {
            s if s.is_empty() => default_shop.trim().to_string(),
            s => s,
        };
        if !is_valid_shop(&shop) {
            return Err(AppError::Validation(format!(
                "Tienda inválida: '{}'",
                shop
            )));
        }

        Ok(CertificateRequest {
            shop,
            order_name,
            titular,
        })
    }
}

pub async fn generate(
    State(state): State<Arc<AppState>>,
    Form(form): Form<GenerateForm>,
) -> Result<Response, AppError> {
    let request = form.validate(&state.config.default_shop)?;
    let order = state
        .orders
        .fetch_order(&request.shop, &request.order_name)
        .await?;

    if order.line_items.is_empty() {
        return Err(AppError::EmptyOrder(order.name));
    }

    let issued_on = chrono::Local::now().date_naive();
    let document = render_order(&state.renderer, &order, Some(request.titular.as_str()), issued_on).await;
    let pages = document.page_count();

    let fonts = state.fonts.clone();
    let pdf = tokio::task::spawn_blocking(move || crate::pdf::render_to_vec(document, fonts))
        .await
        .map_err(|e| AppError::Internal(format!("render task failed: {}", e)))??;

    let display_name = if order.name.trim().is_empty() {
        &request.order_name
    } else {
        &order.name
    };
    let labels = state.renderer.config().locale.labels();
    let filename = download_filename(labels.filename_prefix, display_name);

    info!(
        "Sending {} ({} page(s), {} bytes) for {}",
        filename,
        pages,
        pdf.len(),
        request.shop
    );
    Ok(pdf_response(pdf, &filename))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::certificate::raster::tests::png_bytes;
    use crate::certificate::raster::{FetchedImage, ImageError, ImageFetcher};
    use crate::certificate::CertificateRenderer;
    use crate::config::Config;
    use crate::order::{LineItem, Order, OrderError, OrderProvider};
    use crate::pdf::tests::{bundled_fonts, pdf_page_count};
    use async_trait::async_trait;
    use axum::http::{header, StatusCode};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn form(shop: Option<&str>, order: Option<&str>, titular: Option<&str>) -> GenerateForm {
        GenerateForm {
            shop: shop.map(str::to_string),
            order_name: order.map(str::to_string),
            titular: titular.map(str::to_string),
        }
    }

    #[test]
    fn valid_request_is_trimmed() {
        let req = form(None, Some("  #1042 "), Some(" Ana Gómez "))
            .validate("tienda-1.myshopify.com")
            .unwrap();
        assert_eq!(
            req,
            CertificateRequest {
                shop: "tienda-1.myshopify.com".into(),
                order_name: "#1042".into(),
                titular: "Ana Gómez".into(),
            }
        );
    }

    #[test]
    fn explicit_shop_wins_over_default() {
        let req = form(Some("otra.myshopify.com"), Some("#1"), Some("Ana"))
            .validate("tienda.myshopify.com")
            .unwrap();
        assert_eq!(req.shop, "otra.myshopify.com");
    }

    #[test]
    fn missing_fields_are_rejected() {
        for f in [
            form(None, None, Some("Ana")),
            form(None, Some("#1"), None),
            form(None, Some("   "), Some("Ana")),
        ] {
            assert!(matches!(
                f.validate("tienda.myshopify.com"),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn shop_domain_is_checked() {
        assert!(is_valid_shop("tienda.myshopify.com"));
        assert!(is_valid_shop("t1-x.myshopify.com"));
        assert!(!is_valid_shop("-tienda.myshopify.com"));
        assert!(!is_valid_shop("tienda.example.com"));
        assert!(!is_valid_shop("evil.com/.myshopify.com"));
        assert!(!is_valid_shop(""));

        assert!(matches!(
            form(None, Some("#1"), Some("Ana")).validate(""),
            Err(AppError::Validation(_))
        ));
    }

    enum Reply {
        Found(Order),
        Missing,
        Rejected,
    }

    struct FakeOrders {
        reply: Reply,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl OrderProvider for FakeOrders {
        async fn fetch_order(&self, _shop: &str, order_name: &str) -> Result<Order, OrderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Reply::Found(order) => Ok(order.clone()),
                Reply::Missing => Err(OrderError::NotFound(order_name.to_string())),
                Reply::Rejected => Err(OrderError::Unauthorized(401)),
            }
        }
    }

    struct CountingImages {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ImageFetcher for CountingImages {
        async fn fetch(&self, _url: &str) -> Result<FetchedImage, ImageError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedImage {
                bytes: png_bytes(20, 10),
                content_type: Some("image/png".to_string()),
            })
        }
    }

    struct Harness {
        state: Arc<AppState>,
        orders: Arc<FakeOrders>,
        image_calls: Arc<AtomicUsize>,
    }

    fn harness(reply: Reply) -> Harness {
        let config = Arc::new(Config::for_tests());
        let orders = Arc::new(FakeOrders {
            reply,
            calls: AtomicUsize::new(0),
        });
        let image_calls = Arc::new(AtomicUsize::new(0));
        let renderer = CertificateRenderer::new(
            config.render_config(),
            Arc::new(CountingImages {
                calls: image_calls.clone(),
            }),
        );
        let state = Arc::new(AppState {
            config,
            orders: orders.clone(),
            renderer: Arc::new(renderer),
            fonts: bundled_fonts(),
        });
        Harness {
            state,
            orders,
            image_calls,
        }
    }

    fn order_with(quantities: &[i64]) -> Order {
        Order {
            id: "gid://shopify/Order/5512".to_string(),
            name: "#1042".to_string(),
            line_items: quantities
                .iter()
                .enumerate()
                .map(|(i, q)| LineItem {
                    id: format!("gid://shopify/LineItem/{}", i + 1),
                    title: format!("Obra {}", i + 1),
                    sku: None,
                    quantity: *q,
                    image_url: Some(format!("https://cdn.test/{}.png", i + 1)),
                })
                .collect(),
            currency: None,
            created_at: None,
        }
    }

    async fn status_of(h: &Harness, f: GenerateForm) -> StatusCode {
        match generate(State(h.state.clone()), Form(f)).await {
            Ok(response) => response.status(),
            Err(e) => e.into_response().status(),
        }
    }

    #[tokio::test]
    async fn generate_sends_one_pdf_page_per_unit() {
        let h = harness(Reply::Found(order_with(&[2, 1])));
        let response = match generate(
            State(h.state.clone()),
            Form(form(None, Some("#1042"), Some("Ana Gómez"))),
        )
        .await
        {
            Ok(response) => response,
            Err(e) => panic!("generate failed: {}", e),
        };

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/pdf"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Certificado--1042.pdf\""
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.starts_with(b"%PDF"));
        assert_eq!(pdf_page_count(&body), 3);
        assert_eq!(h.image_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn missing_order_is_404_before_rendering() {
        let h = harness(Reply::Missing);
        let status = status_of(&h, form(None, Some("#9"), Some("Ana"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(h.orders.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.image_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_credentials_are_502_before_rendering() {
        let h = harness(Reply::Rejected);
        let status = status_of(&h, form(None, Some("#9"), Some("Ana"))).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(h.image_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn order_without_items_is_422() {
        let h = harness(Reply::Found(order_with(&[])));
        let status = status_of(&h, form(None, Some("#1042"), Some("Ana"))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(h.image_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn invalid_form_never_reaches_the_provider() {
        let h = harness(Reply::Found(order_with(&[1])));
        let status = status_of(&h, form(Some("evil.example.com"), Some("#1"), Some("Ana"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(h.orders.calls.load(Ordering::SeqCst), 0);
    }
}
