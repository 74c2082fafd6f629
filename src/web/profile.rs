use crate::domain::models::ActionReply;
use crate::error::AppError;
use crate::services::accounts::{self, AdminUpdate};
use crate::state::SharedState;
use crate::web::auth::cookie_headers;
use crate::web::session::{self, AdminSession, UserSession};
use crate::web::action;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/password", post(change_password))
        .route("/admin", post(update_own_admin))
        .with_state(state)
}

async fn change_password(
    State(state): State<SharedState>,
    current: UserSession,
    Json(payload): Json<PasswordChange>,
) -> Response {
    if payload.current_password.is_empty() || payload.new_password.is_empty() {
        return action(ActionReply::failed("Preencha a senha atual e a nova senha."));
    }
    action(
        accounts::change_password(
            &state,
            &current.user,
            &payload.current_password,
            &payload.new_password,
        )
        .await,
    )
}

/// Updates the signed-in administrator and reissues the cookie so the
/// session carries the new details.
async fn update_own_admin(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Json(update): Json<AdminUpdate>,
) -> Result<Response, AppError> {
    let reply = accounts::update_admin(&state, &current.user, &update).await;
    if !reply.success {
        return Ok(action(reply));
    }

    let mut user = current.user.clone();
    if let Some(name) = update.name.filter(|n| !n.is_empty()) {
        user.name = name;
    }
    if let Some(email) = update.email.filter(|e| !e.is_empty()) {
        user.email = email;
    }
    if let Some(phone) = update.phone.filter(|p| !p.is_empty()) {
        user.phone = phone;
    }
    state
        .sessions
        .update(current.id, |store| store.sign_in(user.clone()))
        .await;

    let token = session::sign_session(current.id, &user, &state.config.session_key)
        .map_err(|e| AppError::Internal(e.into()))?;
    let headers = cookie_headers(&session::session_cookie(&token, state.config.secure_cookies))?;
    Ok((headers, Json(reply)).into_response())
}
