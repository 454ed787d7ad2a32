use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::error;

use crate::accounts::ServiceError;

/// Body of every JSON error reply
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// API error type
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn unauthenticated() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Not authenticated")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Unauthenticated => Self::unauthenticated(),
            ServiceError::IdentityUnavailable(reason) => {
                error!("Identity provider unavailable: {}", reason);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Identity provider unavailable",
                )
            }
            ServiceError::Validation(message) => Self::bad_request(message),
            ServiceError::Store(e) => {
                error!("Store failure: {}", e);
                Self::internal("Internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    #[test]
    fn test_service_error_status_mapping() {
        let cases = [
            (ServiceError::Unauthenticated, StatusCode::UNAUTHORIZED),
            (
                ServiceError::IdentityUnavailable("timeout".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ServiceError::Validation("principalId is required".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ServiceError::Store(StoreError::Database("locked".into())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status, status);
        }
    }

    #[test]
    fn test_store_detail_not_leaked() {
        let err = ApiError::from(ServiceError::Store(StoreError::Database(
            "no such table: accounts".into(),
        )));
        assert_eq!(err.message, "Internal error");
    }
}
