use crate::domain::models::ActionReply;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// Every way a webhook call can fail. None of them is fatal.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("webhook answered HTTP {status}")]
    Status { status: u16, reply: Option<String> },

    #[error("malformed webhook body: {0}")]
    Malformed(String),

    #[error("webhook did not confirm the operation")]
    Rejected { reply: Option<String> },
}

impl GatewayError {
    /// Text the webhook sent in `resposta`, when there was one.
    pub fn server_reply(&self) -> Option<&str> {
        match self {
            GatewayError::Status { reply, .. } | GatewayError::Rejected { reply } => reply
                .as_deref()
                .filter(|r| !r.trim().is_empty()),
            _ => None,
        }
    }

    pub fn is_communication(&self) -> bool {
        matches!(self, GatewayError::Transport(_) | GatewayError::Malformed(_))
    }

    /// Message shown to the user: the server's words when it spoke, the
    /// operation fallback otherwise, a communication notice on I/O trouble.
    pub fn user_message(&self, fallback: &str, communication: &str) -> String {
        if self.is_communication() {
            return communication.to_string();
        }
        self.server_reply().unwrap_or(fallback).to_string()
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("not signed in")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(err) => {
                tracing::error!("Request failed: {err:#}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(ActionReply::failed(self.to_string()))).into_response()
    }
}
