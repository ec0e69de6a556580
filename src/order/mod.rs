//! Orders as delivered by the main storefront app.

mod client;

pub use client::HttpOrderProvider;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: String,
    pub name: String,
    pub line_items: Vec<LineItem>,
    pub currency: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    pub id: String,
    pub title: String,
    pub sku: Option<String>,
    /// Raw quantity from the provider; 0 when it was missing or not a number.
    pub quantity: i64,
    /// Variant image, falling back to the product's featured image.
    pub image_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    NotFound(String),

    #[error("order service rejected credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("order service error: HTTP {status} {body}")]
    Upstream { status: u16, body: String },

    #[error("order service unreachable: {0}")]
    Network(#[from] reqwest::Error),

    #[error("order lookup timed out")]
    Timeout,

    #[error("malformed order payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait OrderProvider: Send + Sync {
    async fn fetch_order(&self, shop: &str, order_name: &str) -> Result<Order, OrderError>;
}
