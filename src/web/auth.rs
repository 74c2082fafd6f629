use crate::domain::models::{ActionReply, User};
use crate::error::AppError;
use crate::services::{accounts, audit, submissions};
use crate::state::SharedState;
use crate::store::Store;
use crate::web::{action, session};
use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub admin: bool,
}

#[derive(Serialize)]
pub struct SessionResponse {
    pub success: bool,
    pub user: User,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/register", post(register))
        .route("/logout", post(logout))
        .route("/me", get(me))
        .with_state(state)
}

pub(crate) fn cookie_headers(value: &str) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(value).map_err(|e| AppError::Internal(e.into()))?,
    );
    Ok(headers)
}

async fn login(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if payload.email.trim().is_empty() || payload.password.is_empty() {
        return Err(AppError::BadRequest("Informe e-mail e senha.".to_string()));
    }

    let user = match accounts::login(&state, payload.email.trim(), &payload.password, payload.admin).await {
        Ok(user) => user,
        Err(message) => {
            return Ok((StatusCode::UNAUTHORIZED, Json(ActionReply::failed(message))).into_response())
        }
    };

    let sid = Uuid::new_v4();
    let mut store = Store::for_user(user.clone());
    store.touch(Utc::now(), session::session_expiry());
    state.sessions.insert(sid, store).await;
    submissions::load_session_data(&state, sid).await;
    if user.is_admin() {
        audit::refresh_admin_session(&state, sid).await;
    }

    let token = session::sign_session(sid, &user, &state.config.session_key)
        .map_err(|e| AppError::Internal(e.into()))?;
    let headers = cookie_headers(&session::session_cookie(&token, state.config.secure_cookies))?;
    Ok((
        headers,
        Json(SessionResponse {
            success: true,
            user,
        }),
    )
        .into_response())
}

async fn register(
    State(state): State<SharedState>,
    Json(form): Json<accounts::Registration>,
) -> Response {
    action(accounts::register(&state, &form).await)
}

async fn logout(
    State(state): State<SharedState>,
    current: Option<session::UserSession>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(current) = current {
        state.sessions.update(current.id, Store::sign_out).await;
        state.sessions.remove(current.id).await;
        tracing::info!("{} signed out", current.user.id);
    }
    let headers = cookie_headers(&session::clear_cookie(state.config.secure_cookies))?;
    Ok((headers, Json(ActionReply::ok_silent())))
}

async fn me(current: session::UserSession) -> Json<SessionResponse> {
    Json(SessionResponse {
        success: true,
        user: current.user,
    })
}
