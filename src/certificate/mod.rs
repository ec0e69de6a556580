//! Certificate codes, page layout and per-unit pagination.

pub mod code;
pub mod driver;
pub mod labels;
pub mod layout;
pub mod qr;
pub mod raster;
pub mod render;

pub use driver::{render_order, CertificateDocument};
pub use labels::Locale;
pub use raster::HttpImageFetcher;
pub use render::CertificateRenderer;
