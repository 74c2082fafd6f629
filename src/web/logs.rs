use crate::domain::models::{LogEntry, LogType};
use crate::services::audit;
use crate::state::SharedState;
use crate::web::session::AdminSession;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct LogQuery {
    #[serde(rename = "type")]
    pub kind: Option<LogType>,
}

pub fn router(state: SharedState) -> Router {
    Router::new().route("/", get(list_logs)).with_state(state)
}

/// Refreshes both remote log kinds, then lists the session log newest first.
async fn list_logs(
    State(state): State<SharedState>,
    AdminSession(current): AdminSession,
    Query(query): Query<LogQuery>,
) -> Json<Vec<LogEntry>> {
    let _ = audit::fetch_approval_logs(&state, current.id).await;
    let _ = audit::fetch_login_logs(&state, current.id).await;

    let mut logs: Vec<LogEntry> = state
        .sessions
        .read(current.id, |store| {
            store
                .logs
                .iter()
                .filter(|l| query.kind.map_or(true, |k| l.kind == k))
                .cloned()
                .collect()
        })
        .await
        .unwrap_or_default();
    logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Json(logs)
}
