use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

use super::{LineItem, Order, OrderError, OrderProvider};

/// Looks orders up through the main app's internal `order-data` endpoint.
pub struct HttpOrderProvider {
    client: Client,
    endpoint: Url,
    api_key: SecretString,
}

impl HttpOrderProvider {
    pub fn new(app_url: &Url, api_key: SecretString, timeout: Duration) -> Result<Self, OrderError> {
        let client = Client::builder().timeout(timeout).build()?;
        let endpoint = app_url
            .join("/api/order-data")
            .map_err(|e| OrderError::Malformed(format!("invalid app url: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    fn request_url(&self, shop: &str, order_name: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("shop", shop)
            .append_pair("order_name", order_name);
        url
    }
}

#[async_trait]
impl OrderProvider for HttpOrderProvider {
    async fn fetch_order(&self, shop: &str, order_name: &str) -> Result<Order, OrderError> {
        let url = self.request_url(shop, order_name);
        info!("Fetching order {} for {}", order_name, shop);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    OrderError::Timeout
                } else {
                    OrderError::Network(e)
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        match status {
            s if s.is_success() => {}
            StatusCode::NOT_FOUND => return Err(OrderError::NotFound(order_name.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(OrderError::Unauthorized(status.as_u16()))
            }
            _ => {
                error!("Order service returned {} for {}", status, order_name);
                return Err(OrderError::Upstream {
                    status: status.as_u16(),
                    body: text,
                });
            }
        }

        parse_envelope(&text, order_name)
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: bool,
    data: Option<OrderNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderNode {
    id: String,
    name: String,
    currency_code: Option<String>,
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    line_items: Connection<LineItemNode>,
}

#[derive(Debug, Deserialize)]
struct Connection<T> {
    #[serde(default = "Vec::new")]
    edges: Vec<Edge<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

#[derive(Debug, Deserialize)]
struct Edge<T> {
    node: T,
}

#[derive(Debug, Deserialize)]
struct LineItemNode {
    id: String,
    title: Option<String>,
    sku: Option<String>,
    #[serde(default)]
    quantity: serde_json::Value,
    variant: Option<VariantNode>,
    product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
struct VariantNode {
    image: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductNode {
    featured_image: Option<ImageNode>,
}

#[derive(Debug, Deserialize)]
struct ImageNode {
    url: Option<String>,
}

fn parse_envelope(body: &str, order_name: &str) -> Result<Order, OrderError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| OrderError::Malformed(e.to_string()))?;

    match envelope.data {
        Some(node) if envelope.ok => Ok(node.into()),
        _ => Err(OrderError::NotFound(order_name.to_string())),
    }
}

/// Integer quantity of a JSON value; anything unusable becomes 0.
fn quantity_of(value: &serde_json::Value) -> i64 {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

impl From<LineItemNode> for LineItem {
    fn from(node: LineItemNode) -> Self {
        let non_empty = |url: Option<String>| url.filter(|u| !u.trim().is_empty());
        let variant_image = node.variant.and_then(|v| v.image).and_then(|i| non_empty(i.url));
        let featured_image = node
            .product
            .and_then(|p| p.featured_image)
            .and_then(|i| non_empty(i.url));

        LineItem {
            quantity: quantity_of(&node.quantity),
            id: node.id,
            title: node.title.unwrap_or_default(),
            sku: node.sku.filter(|s| !s.trim().is_empty()),
            image_url: variant_image.or(featured_image),
        }
    }
}

impl From<OrderNode> for Order {
    fn from(node: OrderNode) -> Self {
        Order {
            id: node.id,
            name: node.name,
            line_items: node.line_items.edges.into_iter().map(|e| e.node.into()).collect(),
            currency: node.currency_code,
            created_at: node.created_at,
        }
    }
}
