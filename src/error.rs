//! Error handling for the HTTP layer

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::pricing::PricingError;

/// Application error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Pricing(#[from] PricingError),

    #[error("Invalid request body: {0}")]
    BadRequest(String),
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Pricing(PricingError::InvalidCandidate { .. })
            | AppError::Pricing(PricingError::PaymentAdjustmentOutOfRange(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Pricing(PricingError::UnknownCatalog(_))
            | AppError::Pricing(PricingError::UnknownPaymentMethod(_)) => StatusCode::NOT_FOUND,
            AppError::Pricing(PricingError::PaymentMethodDisabled(_)) => StatusCode::CONFLICT,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        warn!("Request rejected ({}): {}", status.as_u16(), self);

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
