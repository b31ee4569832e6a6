//! Subscription detection handler

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::{AppError, AppState};
use tally_core::{
    build_detector, run_detection, source::NullSink, InMemorySource, SubscriptionCandidate,
    Transaction,
};

/// Detection request body
#[derive(Debug, Deserialize)]
pub struct DetectRequest {
    pub transactions: Vec<Transaction>,
    /// Ask the AI backend first; ignored when none is configured
    #[serde(default)]
    pub use_ai: bool,
}

/// POST /api/subscriptions/detect - Ranked subscription candidates
pub async fn detect_subscriptions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DetectRequest>, JsonRejection>,
) -> Result<Json<Vec<SubscriptionCandidate>>, AppError> {
    let Json(request) = payload.map_err(super::json_rejection)?;

    let ai = if request.use_ai { state.ai.clone() } else { None };
    let detector = build_detector(&state.config, ai);
    let count = request.transactions.len();
    let source = InMemorySource::new(request.transactions);

    let candidates = run_detection(&source, detector.as_ref(), &NullSink).await?;

    info!(
        transactions = count,
        subscriptions = candidates.len(),
        use_ai = request.use_ai,
        "Detect request served"
    );

    Ok(Json(candidates))
}
