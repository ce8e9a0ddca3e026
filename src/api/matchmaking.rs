use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use crate::auth::Identity;
use crate::error::{AppError, Result};
use crate::models::{EnqueueOutcome, EnqueueRequest, MatchStatus};
use crate::state::AppState;

/// Matchmaking routes
pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/enqueue", post(enqueue))
        .route("/status", get(status))
        .route("/cancel", post(cancel))
}

/// Region tags are free-form but bounded; lowercased so "EU" and "eu"
/// land in the same bucket.
fn normalize_region(region: Option<String>) -> Result<Option<String>> {
    let Some(region) = region else {
        return Ok(None);
    };

    let trimmed = region.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if trimmed.len() > 32 {
        return Err(AppError::BadRequest(
            "Region tag must be at most 32 characters".to_string(),
        ));
    }

    Ok(Some(trimmed.to_lowercase()))
}

/// POST /api/v1/match/enqueue - Join the waiting pool, pairing inline
async fn enqueue(
    State(state): State<AppState>,
    Identity(identity): Identity,
    Json(request): Json<EnqueueRequest>,
) -> Result<Json<EnqueueOutcome>> {
    let region = normalize_region(request.region)?;

    let outcome = state
        .matchmaker
        .enqueue(&identity, request.wants_video, region)?;

    Ok(Json(outcome))
}

/// GET /api/v1/match/status - Poll until paired
async fn status(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<MatchStatus>> {
    match state.matchmaker.check_status(&identity)? {
        MatchStatus::NotFound => Err(AppError::NotFound(format!(
            "No pending request or open match for {}",
            identity
        ))),
        status => Ok(Json(status)),
    }
}

/// POST /api/v1/match/cancel - Withdraw a pending request
async fn cancel(
    State(state): State<AppState>,
    Identity(identity): Identity,
) -> Result<Json<serde_json::Value>> {
    let cancelled = state.matchmaker.cancel(&identity)?;
    Ok(Json(serde_json::json!({ "cancelled": cancelled })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_region() {
        assert_eq!(normalize_region(None).unwrap(), None);
        assert_eq!(normalize_region(Some("  ".to_string())).unwrap(), None);
        assert_eq!(
            normalize_region(Some(" EU ".to_string())).unwrap(),
            Some("eu".to_string())
        );
        assert!(normalize_region(Some("x".repeat(33))).is_err());
    }
}
