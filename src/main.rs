mod config;
mod crypto;
mod domain;
mod error;
mod services;
mod state;
mod store;
mod time_utils;
mod web;

use crate::config::Config;
use crate::services::audit;
use crate::services::webhook::{HttpTransport, WebhookClient};
use crate::state::SharedState;
use crate::store::SessionStore;
use anyhow::Context;
use axum::Router;
use chrono::{Duration, Utc};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let crypto = crypto::Crypto::from_base64(&config.enc_key_b64)
        .context("APP_ENC_KEY must be a base64 encoded 32-byte key")?;
    tracing::info!("Webhook service at {}", config.webhook_base_url);

    let transport = Arc::new(HttpTransport::new(config.webhook_base_url.clone()));
    let shared: SharedState = Arc::new(state::AppState {
        webhook: WebhookClient::new(transport),
        crypto: Arc::new(crypto),
        sessions: SessionStore::default(),
        config,
    });

    let scheduler = JobScheduler::new().await?;

    // Drop dead sessions, then pending users and logs for every signed-in administrator
    let shared_for_refresh = shared.clone();
    scheduler
        .add(Job::new_async(shared.config.refresh_cron.as_str(), move |_uuid, _l| {
            let state = shared_for_refresh.clone();
            Box::pin(async move {
                let idle = Duration::minutes(state.config.session_idle_minutes);
                let pruned = state.sessions.prune(Utc::now(), idle).await;
                if pruned > 0 {
                    tracing::info!("Pruned {} expired or idle sessions", pruned);
                }

                let sessions = state.sessions.admin_sessions().await;
                if sessions.is_empty() {
                    return;
                }
                tracing::info!(
                    "Refreshing {} administrator sessions of {}",
                    sessions.len(),
                    state.sessions.len().await
                );
                for session_id in sessions {
                    audit::refresh_admin_session(&state, session_id).await;
                }
            })
        })?)
        .await?;

    scheduler.start().await?;
    tracing::info!("Scheduler started: admin refresh '{}'", shared.config.refresh_cron);

    let app = Router::new()
        .merge(web::routes(shared.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = shared.config.bind_addr.clone();
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
