mod certificate;
mod config;
mod error;
mod order;
mod pdf;
mod routes;
mod state;
mod templates;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::certificate::{CertificateRenderer, HttpImageFetcher};
use crate::order::HttpOrderProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "certificados=info,tower_http=info".into()),
        )
        .init();

    let config = config::Config::from_env()?;
    let config = Arc::new(config);

    let fonts = pdf::load_fonts(config.font_dir.as_deref(), config.font_family.as_deref())?;

    let orders = HttpOrderProvider::new(
        &config.app_url,
        config.internal_api_key.clone(),
        Duration::from_millis(config.order_fetch_timeout_ms),
    )?;
    let images = HttpImageFetcher::new(
        Duration::from_millis(config.image_fetch_timeout_ms),
        config.image_max_bytes,
    )?;
    let renderer = CertificateRenderer::new(config.render_config(), Arc::new(images));

    for (kind, path) in [
        ("Header", &config.header_path),
        ("Footer", &config.footer_path),
        ("Signature", &config.signature_path),
    ] {
        if let Some(path) = path {
            tracing::info!("{} asset: {}", kind, path.display());
        }
    }

    let state = Arc::new(state::AppState {
        config: config.clone(),
        orders: Arc::new(orders),
        renderer: Arc::new(renderer),
        fonts,
    });

    let app = Router::new()
        .route("/", get(routes::index))
        .route("/generate", post(routes::generate))
        .route("/healthz", get(routes::healthz))
        .nest_service(
            "/static",
            tower_http::services::ServeDir::new(&config.static_dir),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("{} certificates listening on http://{}", config.brand, addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
