use genpdf::fonts::{FontData, FontFamily};
use std::sync::Arc;

use crate::certificate::CertificateRenderer;
use crate::config::Config;
use crate::order::OrderProvider;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub orders: Arc<dyn OrderProvider>,
    pub renderer: Arc<CertificateRenderer>,
    pub fonts: FontFamily<FontData>,
}
