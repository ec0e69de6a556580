mod api;
mod pages;

pub use api::healthz;
pub use pages::{generate, index};
