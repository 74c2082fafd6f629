use crate::domain::models::User;
use crate::error::AppError;
use crate::state::SharedState;
use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const SESSION_HOURS: i64 = 24;

pub fn session_expiry() -> DateTime<Utc> {
    Utc::now() + Duration::hours(SESSION_HOURS)
}

/// What the browser keeps between visits: the session id and the user it
/// signed in as.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sid: Uuid,
    pub user: User,
    pub exp: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid token format")]
    Invalid,
    #[error("signature mismatch")]
    Signature,
    #[error("expired")]
    Expired,
}

pub fn sign_session(sid: Uuid, user: &User, key: &[u8]) -> Result<String, SessionError> {
    let claims = SessionClaims {
        sid,
        user: user.clone(),
        exp: session_expiry().timestamp(),
    };
    let payload = serde_json::to_vec(&claims).map_err(|_| SessionError::Invalid)?;
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload);
    let sig = mac.finalize().into_bytes();
    Ok(format!(
        "{}.{}",
        general_purpose::URL_SAFE_NO_PAD.encode(&payload),
        general_purpose::URL_SAFE_NO_PAD.encode(sig)
    ))
}

pub fn verify_session(token: &str, key: &[u8]) -> Result<SessionClaims, SessionError> {
    let (payload_b64, sig_b64) = token.split_once('.').ok_or(SessionError::Invalid)?;
    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| SessionError::Invalid)?;
    let sig = general_purpose::URL_SAFE_NO_PAD
        .decode(sig_b64)
        .map_err(|_| SessionError::Invalid)?;

    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| SessionError::Invalid)?;
    mac.update(&payload);
    mac.verify_slice(&sig).map_err(|_| SessionError::Signature)?;

    let claims: SessionClaims = serde_json::from_slice(&payload).map_err(|_| SessionError::Invalid)?;
    if Utc::now().timestamp() > claims.exp {
        return Err(SessionError::Expired);
    }
    Ok(claims)
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get(axum::http::header::AUTHORIZATION) {
        if let Ok(val) = auth.to_str() {
            if let Some(bearer) = val.strip_prefix("Bearer ") {
                return Some(bearer.trim().to_string());
            }
        }
    }
    if let Some(cookie) = headers.get(axum::http::header::COOKIE) {
        if let Ok(val) = cookie.to_str() {
            for pair in val.split(';') {
                if let Some(rest) = pair.trim().strip_prefix("session=") {
                    if !rest.is_empty() {
                        return Some(rest.to_string());
                    }
                }
            }
        }
    }
    None
}

pub fn session_cookie(token: &str, secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("session={token}; HttpOnly; SameSite=Lax; Path=/{secure_flag}")
}

pub fn clear_cookie(secure: bool) -> String {
    let secure_flag = if secure { "; Secure" } else { "" };
    format!("session=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0{secure_flag}")
}

/// Signed-in browser session. The store behind `id` is recreated from the
/// cookie's user when the server no longer has it.
pub struct UserSession {
    pub id: Uuid,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for UserSession
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let shared = SharedState::from_ref(state);
        let token = extract_token(&parts.headers).ok_or(AppError::Unauthorized)?;
        let claims = verify_session(&token, &shared.config.session_key).map_err(|e| {
            tracing::warn!("Session verification failed: {}", e);
            AppError::Unauthorized
        })?;

        let expires_at = Utc
            .timestamp_opt(claims.exp, 0)
            .single()
            .unwrap_or_else(session_expiry);
        shared.sessions.ensure(claims.sid, &claims.user, expires_at).await;
        Ok(UserSession {
            id: claims.sid,
            user: claims.user,
        })
    }
}

/// Same as [`UserSession`], restricted to administrators.
pub struct AdminSession(pub UserSession);

#[async_trait]
impl<S> FromRequestParts<S> for AdminSession
where
    S: Send + Sync,
    SharedState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = UserSession::from_request_parts(parts, state).await?;
        if !session.user.is_admin() {
            return Err(AppError::Forbidden(
                "Acesso restrito a administradores.".to_string(),
            ));
        }
        Ok(AdminSession(session))
    }
}
