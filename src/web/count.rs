//! Public account count endpoint

use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::warn;

use super::{ApiError, AppState};
use crate::accounts::ServiceError;

/// GET /api/users/{principalId}/accounts/count
///
/// Every failure answers 400 with a JSON body, store errors and
/// undecodable path segments included.
pub async fn account_count(
    State(state): State<AppState>,
    principal_id: Result<Path<String>, PathRejection>,
) -> Response {
    let principal_id = match principal_id {
        Ok(Path(principal_id)) => principal_id,
        Err(rejection) => {
            warn!("Rejected account count path: {}", rejection.body_text());
            return ApiError::bad_request("principalId is malformed").into_response();
        }
    };

    match state.service.count_for(&principal_id).await {
        Ok(count) => (
            StatusCode::OK,
            [(header::CACHE_CONTROL, "no-store")],
            Json(count),
        )
            .into_response(),
        Err(ServiceError::Validation(message)) => ApiError::bad_request(message).into_response(),
        Err(e) => {
            warn!(principal = %principal_id, "Account count failed: {}", e);
            ApiError::bad_request(e.to_string()).into_response()
        }
    }
}
