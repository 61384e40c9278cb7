use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use log::error;
use serde_json::json;
use thiserror::Error;

/// Error taxonomy shared by every handler. Validation and conflict errors
/// carry a client-facing message; `Failed` is logged server-side and surfaced
/// as an opaque 500.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{message}")]
    InvalidInput {
        message: String,
        details: Vec<String>,
    },
    #[error("Invalid category")]
    InvalidCategory,
    #[error("Post already liked")]
    AlreadyLiked,
    #[error("Post not liked")]
    NotLiked,
    #[error("Post already bookmarked")]
    AlreadyBookmarked,
    #[error("Post not bookmarked")]
    NotBookmarked,
    #[error("Comments are disabled for this post")]
    CommentsDisabled,
    #[error("Storage service unavailable")]
    StorageUnavailable,
    #[error("Internal error")]
    Failed(#[from] anyhow::Error),
}

impl ApiError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidInput { .. }
            | Self::InvalidCategory
            | Self::AlreadyLiked
            | Self::NotLiked
            | Self::AlreadyBookmarked
            | Self::NotBookmarked
            | Self::CommentsDisabled => StatusCode::BAD_REQUEST,
            Self::StorageUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Failed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = match &self {
            ApiError::Failed(e) => {
                error!("request failed: {e:#}");
                json!({ "error": "Internal server error" })
            }
            ApiError::InvalidInput { message, details } if !details.is_empty() => {
                json!({ "error": message, "details": details })
            }
            other => json!({ "error": other.to_string() }),
        };
        (status, Json(body)).into_response()
    }
}

impl From<diesel::result::Error> for ApiError {
    fn from(e: diesel::result::Error) -> Self {
        match e {
            diesel::result::Error::NotFound => ApiError::NotFound("Record"),
            other => ApiError::Failed(anyhow::Error::new(other).context("database error")),
        }
    }
}

/// The backing store's unique constraint is the sole arbiter of concurrent
/// pair uniqueness; callers translate this into the matching conflict error.
pub fn is_unique_violation(e: &diesel::result::Error) -> bool {
    matches!(
        e,
        diesel::result::Error::DatabaseError(
            diesel::result::DatabaseErrorKind::UniqueViolation,
            _,
        )
    )
}
