//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod health;
pub mod merchants;
pub mod subscriptions;

// Re-export all handlers for use in router
pub use health::*;
pub use merchants::*;
pub use subscriptions::*;

use axum::{extract::rejection::JsonRejection, http::StatusCode};
use tracing::debug;

use crate::AppError;

/// Map a JSON extraction failure to a sanitized client error
pub(crate) fn json_rejection(rejection: JsonRejection) -> AppError {
    debug!(error = %rejection, "Rejected request body");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::payload_too_large("Request body too large")
    } else {
        AppError::bad_request("Invalid request body")
    }
}
