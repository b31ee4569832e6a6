//! Merchant normalization handler

use axum::{extract::rejection::JsonRejection, Json};
use serde::{Deserialize, Serialize};

use crate::{AppError, MAX_MERCHANTS};
use tally_core::normalize_merchant;

#[derive(Debug, Deserialize)]
pub struct NormalizeRequest {
    pub merchants: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct NormalizedMerchant {
    pub merchant: String,
    pub normalized: String,
}

/// POST /api/merchants/normalize - Grouping key for each merchant name
pub async fn normalize_merchants(
    payload: Result<Json<NormalizeRequest>, JsonRejection>,
) -> Result<Json<Vec<NormalizedMerchant>>, AppError> {
    let Json(request) = payload.map_err(super::json_rejection)?;

    if request.merchants.len() > MAX_MERCHANTS {
        return Err(AppError::bad_request(&format!(
            "At most {} merchants per request",
            MAX_MERCHANTS
        )));
    }

    let normalized = request
        .merchants
        .into_iter()
        .map(|merchant| {
            let normalized = normalize_merchant(&merchant);
            NormalizedMerchant {
                merchant,
                normalized,
            }
        })
        .collect();

    Ok(Json(normalized))
}
