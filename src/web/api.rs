//! JSON account API

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::{ApiError, AppState, Caller};
use crate::accounts::{AccountInput, ActionReply, AddOutcome, DeleteOutcome};
use crate::store::Account;

/// HTTP status for an add outcome
pub fn add_status(outcome: &AddOutcome) -> StatusCode {
    match outcome {
        AddOutcome::Added { .. } => StatusCode::CREATED,
        AddOutcome::Invalid { .. } => StatusCode::BAD_REQUEST,
        AddOutcome::LimitReached { .. } => StatusCode::FORBIDDEN,
        AddOutcome::EntitlementUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        AddOutcome::CreationFailed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// HTTP status for a delete outcome
pub fn delete_status(outcome: DeleteOutcome) -> StatusCode {
    match outcome {
        DeleteOutcome::Deleted => StatusCode::OK,
        DeleteOutcome::NotFoundOrNotAllowed => StatusCode::NOT_FOUND,
    }
}

/// GET /api/accounts
pub async fn list(
    State(state): State<AppState>,
    Caller(ctx): Caller,
) -> Result<Json<Vec<Account>>, ApiError> {
    let accounts = state.service.list_accounts(&ctx).await?;
    Ok(Json(accounts))
}

/// POST /api/accounts
pub async fn create(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    input: Result<Json<AccountInput>, JsonRejection>,
) -> Result<(StatusCode, Json<ActionReply>), ApiError> {
    let Json(input) = input.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let outcome = state.service.add_account(&ctx, &input).await?;
    Ok((add_status(&outcome), Json(ActionReply::from(&outcome))))
}

/// DELETE /api/accounts/{id}
pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Path(id): Path<String>,
) -> Result<(StatusCode, Json<ActionReply>), ApiError> {
    let outcome = state.service.delete_account(&ctx, &id).await?;
    Ok((delete_status(outcome), Json(ActionReply::from(outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entitlement::{EntitlementError, Limit};
    use crate::store::AccountStore;
    use crate::testing::MockEntitlements;
    use crate::web::test_support::*;
    use axum::body::Body;
    use axum::http::header;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn account_body(name: &str, number: &str) -> serde_json::Value {
        json!({ "name": name, "accountNumber": number })
    }

    #[tokio::test]
    async fn test_create_returns_created_with_usage() {
        let t = test_app(MockEntitlements::bounded(2));
        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("Checking", "1234"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(true));
        assert_eq!(body["account"]["name"], json!("Checking"));
        assert_eq!(body["account"]["accountNumber"], json!("1234"));
        assert_eq!(body["account"]["ownerId"], json!("u1"));
        assert_eq!(body["usage"], json!({ "used": 1, "limit": 2 }));
    }

    #[tokio::test]
    async fn test_create_at_limit_is_forbidden() {
        let t = test_app(MockEntitlements::bounded(2));
        t.store.inner.create("u1", "A", "1").await.unwrap();
        t.store.inner.create("u1", "B", "2").await.unwrap();

        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("C", "3"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["ok"], json!(false));
        assert_eq!(body["code"], json!("LIMIT_REACHED"));
        assert_eq!(body["usage"], json!({ "used": 2, "limit": 2 }));
        assert_eq!(t.store.inner.count("u1").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_create_invalid_input_is_bad_request() {
        let t = test_app(MockEntitlements::bounded(2));
        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("  ", "1234"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["code"], json!("VALIDATION_ERROR"));
        assert_eq!(body["message"], json!("Name is required"));
        assert_eq!(t.entitlements.calls(), 0);
        assert_eq!(t.store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_rejects_unreadable_body_as_json() {
        let t = test_app(MockEntitlements::bounded(2));

        let malformed = request("POST", "/api/accounts", Some("u1"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"name\": "))
            .unwrap();
        let no_content_type = request("POST", "/api/accounts", Some("u1"))
            .body(Body::from(account_body("Checking", "1").to_string()))
            .unwrap();

        for req in [malformed, no_content_type] {
            let response = t.app.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(
                response.headers()[header::CONTENT_TYPE],
                "application/json"
            );
            assert!(body_json(response).await["error"].is_string());
        }
        assert_eq!(t.store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_create_entitlement_failure_is_unavailable() {
        let t = test_app(MockEntitlements::returning(Err(EntitlementError::Status {
            status: 500,
            body: "boom".to_string(),
        })));
        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("Checking", "1234"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body = body_json(response).await;
        assert_eq!(body["code"], json!("ENTITLEMENT_ERROR"));
        assert_eq!(t.store.create_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_unbounded_ignores_usage() {
        let t = test_app(MockEntitlements::returning(Ok(Limit::Unbounded)));
        for i in 0..3 {
            t.store.inner.create("u1", &format!("A{}", i), "1").await.unwrap();
        }
        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("D", "4"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await["usage"],
            json!({ "used": 4, "limit": null })
        );
    }

    #[tokio::test]
    async fn test_create_failure_is_internal_error() {
        let t = test_app(MockEntitlements::bounded(5));
        t.store.fail_create.store(true, Ordering::SeqCst);
        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                Some("u1"),
                &account_body("Checking", "1234"),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(response).await["code"], json!("CREATION_FAILED"));
    }

    #[tokio::test]
    async fn test_unauthenticated_requests_are_rejected() {
        let t = test_app(MockEntitlements::bounded(2));

        let response = t
            .app
            .clone()
            .oneshot(request("GET", "/api/accounts", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({ "error": "Not authenticated" })
        );

        let response = t
            .app
            .oneshot(json_request(
                "POST",
                "/api/accounts",
                None,
                &account_body("Checking", "1234"),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(t.store.total_calls(), 0);
    }

    #[tokio::test]
    async fn test_session_cookie_authenticates() {
        let t = test_app(MockEntitlements::bounded(2));
        t.store.inner.create("u1", "Checking", "1").await.unwrap();

        let response = t
            .app
            .oneshot(
                request("GET", "/api/accounts", None)
                    .header("cookie", "theme=dark; access_token=u1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_scoped() {
        let t = test_app(MockEntitlements::bounded(5));
        t.store.inner.create("u1", "Savings", "2").await.unwrap();
        t.store.inner.create("u1", "Checking", "1").await.unwrap();
        t.store.inner.create("u2", "Brokerage", "3").await.unwrap();

        let response = t
            .app
            .oneshot(request("GET", "/api/accounts", Some("u1")).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|a| a["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Checking", "Savings"]);
    }

    #[tokio::test]
    async fn test_delete_own_and_foreign() {
        let t = test_app(MockEntitlements::bounded(5));
        let mine = t.store.inner.create("u1", "Checking", "1").await.unwrap();
        let theirs = t.store.inner.create("u2", "Savings", "2").await.unwrap();

        let response = t
            .app
            .clone()
            .oneshot(
                request("DELETE", &format!("/api/accounts/{}", theirs.id), Some("u1"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await["code"],
            json!("NOT_FOUND_OR_NOT_ALLOWED")
        );
        assert_eq!(t.store.inner.count("u2").await.unwrap(), 1);

        let response = t
            .app
            .oneshot(
                request("DELETE", &format!("/api/accounts/{}", mine.id), Some("u1"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], json!("Account deleted."));
        assert_eq!(t.store.inner.count("u1").await.unwrap(), 0);
    }
}
