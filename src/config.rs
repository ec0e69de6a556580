use secrecy::SecretString;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

use crate::certificate::raster::MAX_IMAGE_BYTES;
use crate::certificate::Locale;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is not a valid URL: {source}")]
    InvalidUrl {
        name: &'static str,
        source: url::ParseError,
    },

    #[error("CERT_LOCALE: {0}")]
    Locale(String),
}

/// What the certificate renderer needs to know, independent of HTTP.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    pub brand: String,
    pub verify_base_url: String,
    pub image_fetch_timeout_ms: u64,
    pub locale: Locale,
    pub signature_path: Option<PathBuf>,
    pub header_path: Option<PathBuf>,
    pub footer_path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub brand: String,
    pub default_shop: String,
    pub app_url: Url,
    pub internal_api_key: SecretString,
    pub verify_base_url: String,
    pub image_fetch_timeout_ms: u64,
    pub image_max_bytes: usize,
    pub order_fetch_timeout_ms: u64,
    pub locale: Locale,
    pub font_dir: Option<PathBuf>,
    pub font_family: Option<String>,
    pub signature_path: Option<PathBuf>,
    pub header_path: Option<PathBuf>,
    pub footer_path: Option<PathBuf>,
    pub static_dir: PathBuf,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// An explicitly configured path, or `assets/<default>` when that file exists.
fn asset_path(base_dir: &Path, name: &str, default: &str) -> Option<PathBuf> {
    match var(name) {
        Some(p) => Some(base_dir.join(p)),
        None => Some(base_dir.join("assets").join(default)).filter(|p| p.exists()),
    }
}

fn parse_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    var(name).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let app_url_raw = var("SHOPIFY_APP_URL").ok_or(ConfigError::Missing("SHOPIFY_APP_URL"))?;
        let app_url = Url::parse(&app_url_raw).map_err(|source| ConfigError::InvalidUrl {
            name: "SHOPIFY_APP_URL",
            source,
        })?;

        let internal_api_key = var("INTERNAL_API_KEY")
            .map(SecretString::from)
            .ok_or(ConfigError::Missing("INTERNAL_API_KEY"))?;

        let verify_base_url = match var("VERIFY_BASE_URL") {
            Some(raw) => {
                Url::parse(&raw).map_err(|source| ConfigError::InvalidUrl {
                    name: "VERIFY_BASE_URL",
                    source,
                })?;
                raw
            }
            None => app_url_raw,
        };

        let locale = match var("CERT_LOCALE") {
            Some(raw) => raw.parse().map_err(ConfigError::Locale)?,
            None => Locale::default(),
        };

        let base_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let signature_path = asset_path(&base_dir, "SIGNATURE_PATH", "firma.png");
        let header_path = asset_path(&base_dir, "HEADER_PATH", "header.png");
        let footer_path = asset_path(&base_dir, "FOOTER_PATH", "footer.png");
        let static_dir = base_dir.join(var("STATIC_DIR").unwrap_or_else(|| "public".to_string()));

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or("PORT", 3001),
            brand: var("BRAND_NAME").unwrap_or_else(|| "RITMODEREVER".to_string()),
            default_shop: var("DEFAULT_SHOP").unwrap_or_default(),
            app_url,
            internal_api_key,
            verify_base_url,
            image_fetch_timeout_ms: parse_or("IMAGE_FETCH_TIMEOUT_MS", 3000),
            image_max_bytes: parse_or("IMAGE_MAX_BYTES", MAX_IMAGE_BYTES),
            order_fetch_timeout_ms: parse_or("ORDER_FETCH_TIMEOUT_MS", 5000),
            locale,
            font_dir: var("FONT_DIR").map(PathBuf::from),
            font_family: var("FONT_FAMILY"),
            signature_path,
            header_path,
            footer_path,
            static_dir,
        })
    }

    pub fn render_config(&self) -> RenderConfig {
        RenderConfig {
            brand: self.brand.clone(),
            verify_base_url: self.verify_base_url.clone(),
            image_fetch_timeout_ms: self.image_fetch_timeout_ms,
            locale: self.locale,
            signature_path: self.signature_path.clone(),
            header_path: self.header_path.clone(),
            footer_path: self.footer_path.clone(),
        }
    }
}

#[cfg(test)]
impl Config {
    pub(crate) fn for_tests() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            brand: "RITMODEREVER".to_string(),
            default_shop: "tienda.myshopify.com".to_string(),
            app_url: Url::parse("https://app.test").unwrap(),
            internal_api_key: SecretString::from("key".to_string()),
            verify_base_url: "https://ritmoderever.test".to_string(),
            image_fetch_timeout_ms: 200,
            image_max_bytes: MAX_IMAGE_BYTES,
            order_fetch_timeout_ms: 200,
            locale: Locale::Es,
            font_dir: None,
            font_family: None,
            signature_path: None,
            header_path: None,
            footer_path: None,
            static_dir: PathBuf::from("public"),
        }
    }
}
