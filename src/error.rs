// region:    --- Imports
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

// endregion: --- Imports

// region:    --- Error Types
/// Rejections caused by the caller's input. Never leave state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("missing required fields")]
    MissingFields,

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("amount must be a positive whole number")]
    InvalidAmount,

    #[error("phone number must be 0 followed by 9 digits")]
    InvalidPhoneNumber,

    #[error("bidder name parts must be at most {max} characters")]
    BidderNameTooLong { max: usize },

    #[error("bid must be higher than current price ({current_price})")]
    BidTooLow { current_price: i64 },

    #[error("auction is closed")]
    AuctionClosed,

    #[error("invalid listing: {0}")]
    InvalidListing(String),

    #[error("unknown category: {0}")]
    UnknownCategory(i64),

    #[error("category already exists: {0}")]
    DuplicateCategory(String),
}

impl ValidationError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingFields => "MISSING_FIELDS",
            ValidationError::MalformedBody(_) => "INVALID_BODY",
            ValidationError::InvalidAmount => "INVALID_AMOUNT",
            ValidationError::InvalidPhoneNumber => "INVALID_PHONE",
            ValidationError::BidderNameTooLong { .. } => "INVALID_NAME",
            ValidationError::BidTooLow { .. } => "LOW_BID",
            ValidationError::AuctionClosed => "ALREADY_ENDED",
            ValidationError::InvalidListing(_) => "INVALID_LISTING",
            ValidationError::UnknownCategory(_) => "UNKNOWN_CATEGORY",
            ValidationError::DuplicateCategory(_) => "DUPLICATE_CATEGORY",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl AppError {
    pub fn listing_not_found(listing_id: i64) -> Self {
        AppError::NotFound(format!("listing {}", listing_id))
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(e) => e.code(),
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Storage(_) => "STORAGE",
            AppError::Config(_) => "CONFIG",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
// endregion: --- Error Types

// region:    --- Response Mapping
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Storage(_) | AppError::Config(_) => {
                error!("{:<12} --> {}", "Error", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };

        let mut body = json!({
            "error": message,
            "code": code,
        });
        if let AppError::Validation(ValidationError::BidTooLow { current_price }) = &self {
            body["current_price"] = json!(current_price);
        }

        (status, Json(body)).into_response()
    }
}
// endregion: --- Response Mapping
