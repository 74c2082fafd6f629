use crate::domain::models::{LogEntry, LogType};
use crate::error::GatewayError;
use crate::services::accounts;
use crate::state::AppState;
use crate::time_utils::remote_timestamp;
use uuid::Uuid;

fn stamped(state: &AppState, id: &str, date: &str, time: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let ts = remote_timestamp(&state.config.timezone, date, time);
    if ts.is_none() {
        tracing::warn!("Skipping log {} with unreadable date '{} {}'", id, date, time);
    }
    ts
}

/// Replaces the approval entries of the session log with the remote list.
pub async fn fetch_approval_logs(state: &AppState, session_id: Uuid) -> Result<(), GatewayError> {
    let rows = state.webhook.approval_logs().await.map_err(|e| {
        tracing::error!("Failed to fetch approval logs: {}", e);
        e
    })?;

    let entries: Vec<LogEntry> = rows
        .into_iter()
        .filter_map(|row| {
            let timestamp = stamped(state, &row.id, &row.date, &row.time)?;
            Some(LogEntry {
                id: format!("log-approved-{}", row.id),
                timestamp,
                kind: LogType::UserApproval,
                message: format!(
                    "Usuário \"{}\" da empresa \"{}\" foi aprovado.",
                    row.name, row.company
                ),
                admin_id: None,
                admin_name: row.aprovado_por,
            })
        })
        .collect();

    state
        .sessions
        .update(session_id, |store| store.replace_logs(LogType::UserApproval, entries))
        .await;
    Ok(())
}

pub async fn fetch_login_logs(state: &AppState, session_id: Uuid) -> Result<(), GatewayError> {
    let rows = state.webhook.login_logs().await.map_err(|e| {
        tracing::error!("Failed to fetch login logs: {}", e);
        e
    })?;

    let entries: Vec<LogEntry> = rows
        .into_iter()
        .filter_map(|row| {
            let timestamp = stamped(state, &row.id, &row.date, &row.time)?;
            Some(LogEntry {
                id: format!("log-login-{}", row.id),
                timestamp,
                kind: LogType::UserLogin,
                message: format!(
                    "Usuário \"{}\" da empresa \"{}\" fez login.",
                    row.name, row.company
                ),
                admin_id: None,
                admin_name: None,
            })
        })
        .collect();

    state
        .sessions
        .update(session_id, |store| store.replace_logs(LogType::UserLogin, entries))
        .await;
    Ok(())
}

/// Background pass for one administrator session. Failures leave the
/// cached lists as they were.
pub async fn refresh_admin_session(state: &AppState, session_id: Uuid) {
    accounts::fetch_pending_users(state, session_id).await;
    let _ = fetch_approval_logs(state, session_id).await;
    let _ = fetch_login_logs(state, session_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{User, UserRole, UserStatus};
    use crate::services::webhook::Endpoint;
    use crate::state::testing::scripted_state;
    use crate::store::Store;
    use chrono::Utc;
    use serde_json::json;

    fn admin_store() -> Store {
        Store::for_user(User {
            id: "admin-root@triad3.io".into(),
            name: "Root".into(),
            company_name: "Triad3".into(),
            email: "root@triad3.io".into(),
            phone: String::new(),
            password_hash: None,
            role: UserRole::Admin,
            status: UserStatus::Approved,
        })
    }

    #[tokio::test]
    async fn test_approval_logs_are_converted() {
        let (state, transport) = scripted_state();
        transport.reply(
            Endpoint::ApprovalLogs,
            200,
            json!([
                { "id": 7, "nome": "Ana", "empresa": "Acme", "data": "05/03/2024", "horario": "14:30", "aprovado_por": "Root" },
                { "id": 8, "nome": "Rui", "empresa": "Beta", "data": "ontem", "horario": "?" }
            ]),
        );
        let session = Uuid::new_v4();
        state.sessions.insert(session, admin_store()).await;

        fetch_approval_logs(&state, session).await.unwrap();
        let logs = state.sessions.read(session, |s| s.logs.clone()).await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].id, "log-approved-7");
        assert_eq!(logs[0].message, "Usuário \"Ana\" da empresa \"Acme\" foi aprovado.");
        assert_eq!(logs[0].admin_name.as_deref(), Some("Root"));
        assert_eq!(logs[0].timestamp.to_rfc3339(), "2024-03-05T17:30:00+00:00");
    }

    #[tokio::test]
    async fn test_login_logs_keep_other_kinds() {
        let (state, transport) = scripted_state();
        transport.reply(
            Endpoint::LoginLogs,
            200,
            json!([{ "id": "3", "nome": "Ana", "empresa": "Acme", "data": "01/02/2024", "horario": "08:00" }]),
        );
        let session = Uuid::new_v4();
        let mut store = admin_store();
        store.push_log(LogEntry {
            id: "log-local".into(),
            timestamp: Utc::now(),
            kind: LogType::QuestionnaireSubmission,
            message: "Questionário \"Vendas\" foi enviado por Acme.".into(),
            admin_id: None,
            admin_name: None,
        });
        state.sessions.insert(session, store).await;

        fetch_login_logs(&state, session).await.unwrap();
        let ids = state
            .sessions
            .read(session, |s| s.logs.iter().map(|l| l.id.clone()).collect::<Vec<_>>())
            .await
            .unwrap();
        assert_eq!(ids, vec!["log-login-3", "log-local"]);
    }

    #[tokio::test]
    async fn test_refresh_swallows_failures() {
        let (state, transport) = scripted_state();
        transport
            .down(Endpoint::PendingUsers)
            .raw(Endpoint::ApprovalLogs, 502, "")
            .reply(Endpoint::LoginLogs, 200, json!([]));
        let session = Uuid::new_v4();
        state.sessions.insert(session, admin_store()).await;

        refresh_admin_session(&state, session).await;
        assert_eq!(transport.calls_to(Endpoint::LoginLogs).len(), 1);
        assert_eq!(state.sessions.read(session, |s| s.logs.len()).await, Some(0));
    }
}
