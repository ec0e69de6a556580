use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tera::Context;
use thiserror::Error;

use crate::order::OrderError;
use crate::pdf::PdfError;

/// Errors a request can end with before any PDF byte is sent.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Order(#[from] OrderError),

    #[error("order {0} has no line items")]
    EmptyOrder(String),

    #[error("{0}")]
    Pdf(#[from] PdfError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Order(OrderError::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Order(_) => StatusCode::BAD_GATEWAY,
            Self::EmptyOrder(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Pdf(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Certificate generation failed");
        } else {
            tracing::warn!(error = %self, "Certificate request rejected");
        }

        let mut ctx = Context::new();
        ctx.insert("message", &self.to_string());
        ctx.insert("status", &status.as_u16());
        let body = crate::templates::render("error.html", &ctx);

        (status, Html(body)).into_response()
    }
}
