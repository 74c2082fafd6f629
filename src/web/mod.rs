pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod logs;
pub mod profile;
pub mod questionnaire;
pub mod session;

use crate::domain::models::ActionReply;
use crate::state::SharedState;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

async fn health() -> &'static str {
    "OK"
}

/// Action outcomes keep their `{success, message}` body; failures answer 422.
pub(crate) fn action(reply: ActionReply) -> Response {
    let status = if reply.success {
        StatusCode::OK
    } else {
        StatusCode::UNPROCESSABLE_ENTITY
    };
    (status, Json(reply)).into_response()
}

pub fn routes(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth::router(state.clone()))
        .nest("/profile", profile::router(state.clone()))
        .nest("/questionnaire", questionnaire::router(state.clone()))
        .nest("/dashboard", dashboard::router(state.clone()))
        .nest("/admin", admin::router(state.clone()))
        .nest("/logs", logs::router(state))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::domain::models::User;
    use crate::store::Store;
    use crate::web::session::sign_session;
    use axum::body::Body;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Registers a live session for `user` and returns its cookie header.
    pub async fn signed_in(state: &SharedState, user: User) -> (Uuid, String) {
        let sid = Uuid::new_v4();
        let token = sign_session(sid, &user, &state.config.session_key).unwrap();
        state.sessions.insert(sid, Store::for_user(user)).await;
        (sid, format!("session={token}"))
    }

    pub async fn send(
        state: &SharedState,
        method: &str,
        uri: &str,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            request = request.header("cookie", cookie);
        }
        let request = match body {
            Some(body) => request
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = routes(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::String(
                String::from_utf8_lossy(&bytes).into_owned(),
            ))
        };
        (status, value)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::send;
    use super::*;
    use crate::state::testing::scripted_state;

    #[tokio::test]
    async fn test_health() {
        let (state, _) = scripted_state();
        let (status, body) = send(&state, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::Value::String("OK".into()));
    }

    #[test]
    fn test_failed_action_is_unprocessable() {
        assert_eq!(action(ActionReply::failed("x")).status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(action(ActionReply::ok_silent()).status(), StatusCode::OK);
    }
}
