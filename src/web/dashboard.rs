//! Server-rendered dashboard
//!
//! Every mutation re-reads the list and renders the whole page again.

use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use std::fmt::Write as _;
use tracing::error;

use super::api::{add_status, delete_status};
use super::{AppState, Caller};
use crate::accounts::{AccountInput, ActionReply, ServiceError};
use crate::identity::Principal;
use crate::store::Account;

/// Delete form body
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    #[serde(default)]
    pub id: String,
}

/// Flash message shown above the list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub ok: bool,
    pub text: String,
}

impl From<&ActionReply> for Notice {
    fn from(reply: &ActionReply) -> Self {
        Notice {
            ok: reply.ok,
            text: reply.message.clone().unwrap_or_default(),
        }
    }
}

/// Escape text for HTML element and attribute content
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// Render the full dashboard page
pub fn render_page(accounts: &[Account], notice: Option<&Notice>) -> String {
    let mut html = String::from(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Tracked Accounts</title>\n</head>\n<body>\n<div class=\"dash-container\">\n\
         <h2 class=\"dash-title\">Tracked Accounts</h2>\n",
    );

    if let Some(notice) = notice {
        let class = if notice.ok { "notice notice-ok" } else { "notice notice-error" };
        let _ = writeln!(
            html,
            "<p class=\"{}\" role=\"status\">{}</p>",
            class,
            escape_html(&notice.text)
        );
    }

    if accounts.is_empty() {
        html.push_str("<p class=\"empty-text\">No accounts yet.</p>\n");
    } else {
        html.push_str("<ul class=\"account-list\">\n");
        for account in accounts {
            let _ = write!(
                html,
                "<li class=\"account-item\">\
                 <div class=\"account-meta\">\
                 <div class=\"account-name\">{name}</div>\
                 <div class=\"account-number\">{number}</div>\
                 </div>\
                 <form method=\"post\" action=\"/dashboard/accounts/delete\" class=\"account-actions\">\
                 <input type=\"hidden\" name=\"id\" value=\"{id}\">\
                 <button type=\"submit\" class=\"btn btn-danger\">Delete</button>\
                 </form></li>\n",
                name = escape_html(&account.name),
                number = escape_html(&account.account_number),
                id = escape_html(&account.id),
            );
        }
        html.push_str("</ul>\n");
    }

    html.push_str(
        "<div class=\"form-card\">\n<h3 class=\"form-title\">Add a new account to track</h3>\n\
         <form method=\"post\" action=\"/dashboard/accounts\" class=\"account-form\">\n\
         <label for=\"name\" class=\"label\">Name</label>\n\
         <input id=\"name\" type=\"text\" name=\"name\" required placeholder=\"Personal\" class=\"input\">\n\
         <label for=\"accountNumber\" class=\"label\">Account Number</label>\n\
         <input id=\"accountNumber\" type=\"text\" name=\"accountNumber\" required placeholder=\"001234\" class=\"input\">\n\
         <button type=\"submit\" class=\"btn btn-primary\">Add</button>\n\
         </form>\n</div>\n</div>\n</body>\n</html>\n",
    );

    html
}

fn error_page(err: ServiceError) -> Response {
    let (status, text) = match err {
        ServiceError::Unauthenticated => (StatusCode::UNAUTHORIZED, "Please sign in to view your accounts."),
        ServiceError::IdentityUnavailable(reason) => {
            error!("Identity provider unavailable: {}", reason);
            (StatusCode::SERVICE_UNAVAILABLE, "Sign-in is temporarily unavailable. Please try again.")
        }
        ServiceError::Validation(_) => (StatusCode::BAD_REQUEST, "Invalid request."),
        ServiceError::Store(e) => {
            error!("Store failure while rendering dashboard: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong. Please try again.")
        }
    };
    let body = format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>Tracked Accounts</title></head>\n\
         <body><p>{}</p></body>\n</html>\n",
        text
    );
    (status, Html(body)).into_response()
}

async fn rerender(
    state: &AppState,
    principal: &Principal,
    status: StatusCode,
    notice: Notice,
) -> Response {
    match state.service.list_for(principal).await {
        Ok(accounts) => (status, Html(render_page(&accounts, Some(&notice)))).into_response(),
        Err(e) => error_page(e),
    }
}

/// GET /dashboard
pub async fn show(State(state): State<AppState>, Caller(ctx): Caller) -> Response {
    match state.service.list_accounts(&ctx).await {
        Ok(accounts) => Html(render_page(&accounts, None)).into_response(),
        Err(e) => error_page(e),
    }
}

/// POST /dashboard/accounts
pub async fn add(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Form(input): Form<AccountInput>,
) -> Response {
    let principal = match state.service.authenticate(&ctx).await {
        Ok(principal) => principal,
        Err(e) => return error_page(e),
    };
    let outcome = match state.service.add_for(&principal, &input).await {
        Ok(outcome) => outcome,
        Err(e) => return error_page(e),
    };
    let status = if outcome.is_added() {
        StatusCode::OK
    } else {
        add_status(&outcome)
    };
    let notice = Notice::from(&ActionReply::from(&outcome));
    rerender(&state, &principal, status, notice).await
}

/// POST /dashboard/accounts/delete
pub async fn delete(
    State(state): State<AppState>,
    Caller(ctx): Caller,
    Form(form): Form<DeleteForm>,
) -> Response {
    let principal = match state.service.authenticate(&ctx).await {
        Ok(principal) => principal,
        Err(e) => return error_page(e),
    };
    let outcome = match state.service.delete_for(&principal, &form.id).await {
        Ok(outcome) => outcome,
        Err(e) => return error_page(e),
    };
    let notice = Notice::from(&ActionReply::from(outcome));
    rerender(&state, &principal, delete_status(outcome), notice).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AccountStore;
    use crate::testing::MockEntitlements;
    use crate::web::test_support::*;
    use axum::body::Body;
    use chrono::Utc;
    use std::sync::atomic::Ordering;
    use tower::ServiceExt;

    fn account(name: &str, number: &str) -> Account {
        Account {
            id: "acc-1".to_string(),
            name: name.to_string(),
            account_number: number.to_string(),
            owner_id: "u1".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<script>alert("x") & 'y'</script>"#),
            "&lt;script&gt;alert(&quot;x&quot;) &amp; &#39;y&#39;&lt;/script&gt;"
        );
        assert_eq!(escape_html("Savings 01"), "Savings 01");
    }

    #[test]
    fn test_render_empty_page() {
        let html = render_page(&[], None);
        assert!(html.contains("Tracked Accounts"));
        assert!(html.contains("No accounts yet."));
        assert!(html.contains("action=\"/dashboard/accounts\""));
    }

    #[test]
    fn test_render_escapes_account_fields() {
        let html = render_page(&[account("<b>Mine</b>", "12\"34")], None);
        assert!(html.contains("&lt;b&gt;Mine&lt;/b&gt;"));
        assert!(html.contains("12&quot;34"));
        assert!(!html.contains("<b>Mine</b>"));
        assert!(!html.contains("No accounts yet."));
    }

    #[tokio::test]
    async fn test_dashboard_requires_session() {
        let t = test_app(MockEntitlements::bounded(1));
        let response = t
            .app
            .oneshot(request("GET", "/dashboard", None).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("Please sign in"));
    }

    #[tokio::test]
    async fn test_dashboard_lists_accounts() {
        let t = test_app(MockEntitlements::bounded(3));
        t.store.inner.create("u1", "Savings", "0002").await.unwrap();
        t.store.inner.create("u1", "Checking", "0001").await.unwrap();

        let response = t
            .app
            .oneshot(request("GET", "/dashboard", Some("u1")).body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        let checking = html.find("Checking").unwrap();
        let savings = html.find("Savings").unwrap();
        assert!(checking < savings);
    }

    #[tokio::test]
    async fn test_add_form_rerenders_with_new_account() {
        let t = test_app(MockEntitlements::bounded(3));
        let response = t
            .app
            .oneshot(form_request(
                "/dashboard/accounts",
                Some("u1"),
                "name=Personal&accountNumber=001234",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(t.identity.calls.load(Ordering::SeqCst), 1);
        let html = body_text(response).await;
        assert!(html.contains("Account added."));
        assert!(html.contains("Personal"));
        assert!(html.contains("001234"));
        assert_eq!(t.store.inner.count("u1").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_form_at_limit_shows_message() {
        let t = test_app(MockEntitlements::bounded(1));
        t.store.inner.create("u1", "Existing", "1").await.unwrap();

        let response = t
            .app
            .oneshot(form_request(
                "/dashboard/accounts",
                Some("u1"),
                "name=Another&accountNumber=2",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let html = body_text(response).await;
        assert!(html.contains("tracked accounts limit (1)"));
        assert!(html.contains("Existing"));
        assert!(!html.contains("Another"));
    }

    #[tokio::test]
    async fn test_delete_form_rerenders_without_account() {
        let t = test_app(MockEntitlements::bounded(3));
        let created = t.store.inner.create("u1", "Checking", "1").await.unwrap();

        let response = t
            .app
            .oneshot(form_request(
                "/dashboard/accounts/delete",
                Some("u1"),
                &format!("id={}", created.id),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(t.identity.calls.load(Ordering::SeqCst), 1);
        let html = body_text(response).await;
        assert!(html.contains("Account deleted."));
        assert!(html.contains("No accounts yet."));
    }
}
