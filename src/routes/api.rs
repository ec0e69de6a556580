use axum::{
    http::header,
    response::{IntoResponse, Response},
};
use regex::Regex;
use std::sync::OnceLock;

pub async fn healthz() -> &'static str {
    "ok"
}

/// Replaces every run of characters outside `[a-zA-Z0-9]` with one hyphen.
pub fn sanitize_filename(name: &str) -> String {
    static DISALLOWED: OnceLock<Regex> = OnceLock::new();
    DISALLOWED
        .get_or_init(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static pattern"))
        .replace_all(name, "-")
        .into_owned()
}

pub fn download_filename(prefix: &str, order_name: &str) -> String {
    format!("{}-{}.pdf", prefix, sanitize_filename(order_name))
}

/// Attachment response for a finished PDF.
pub fn pdf_response(pdf: Vec<u8>, filename: &str) -> Response {
    (
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        pdf,
    )
        .into_response()
}
