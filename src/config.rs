use crate::time_utils;
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use std::env;
use tracing::{info, warn};

pub const DEFAULT_WEBHOOK_BASE_URL: &str = "https://webhook.triad3.io/webhook";
const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";
const DEFAULT_REFRESH_CRON: &str = "0 */5 * * * *";
const DEFAULT_SESSION_IDLE_MINUTES: i64 = 120;

#[derive(Clone, Debug)]
pub struct Config {
    pub webhook_base_url: String,
    pub bind_addr: String,
    pub session_key: Vec<u8>,
    pub enc_key_b64: String,
    pub timezone: String,
    pub refresh_cron: String,
    /// Sessions with no request for this long are pruned by the refresh job.
    pub session_idle_minutes: i64,
    pub secure_cookies: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let webhook_base_url = try_load("WEBHOOK_BASE_URL", DEFAULT_WEBHOOK_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| {
            let port = try_load("PORT", "3000");
            format!("0.0.0.0:{port}")
        });

        let enc_key_b64 = env::var("APP_ENC_KEY").context("APP_ENC_KEY missing")?;
        let session_key_b64 = env::var("SESSION_KEY").unwrap_or_else(|_| enc_key_b64.clone());
        let session_key = general_purpose::STANDARD
            .decode(session_key_b64.trim())
            .context("SESSION_KEY must be base64")?;
        if session_key.len() < 32 {
            return Err(anyhow!("SESSION_KEY must decode to at least 32 bytes"));
        }

        let mut timezone = try_load("APP_TIMEZONE", DEFAULT_TIMEZONE);
        if !time_utils::is_valid_timezone(&timezone) {
            warn!("Invalid APP_TIMEZONE '{timezone}', falling back to {DEFAULT_TIMEZONE}");
            timezone = DEFAULT_TIMEZONE.to_string();
        }

        let refresh_cron = try_load("REFRESH_CRON", DEFAULT_REFRESH_CRON);

        let idle_raw = try_load(
            "SESSION_IDLE_MINUTES",
            &DEFAULT_SESSION_IDLE_MINUTES.to_string(),
        );
        let session_idle_minutes = match idle_raw.trim().parse::<i64>() {
            Ok(minutes) if minutes > 0 => minutes,
            _ => {
                warn!("Invalid SESSION_IDLE_MINUTES '{idle_raw}', falling back to {DEFAULT_SESSION_IDLE_MINUTES}");
                DEFAULT_SESSION_IDLE_MINUTES
            }
        };

        let secure_cookies = env::var("RAILWAY_ENVIRONMENT").is_ok()
            || env::var("RENDER").is_ok()
            || env::var("FLY_APP_NAME").is_ok()
            || env::var("PRODUCTION").is_ok();

        Ok(Self {
            webhook_base_url,
            bind_addr,
            session_key,
            enc_key_b64,
            timezone,
            refresh_cron,
            session_idle_minutes,
            secure_cookies,
        })
    }
}

fn try_load(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

#[cfg(test)]
impl Config {
    pub fn for_tests(webhook_base_url: &str) -> Self {
        Self {
            webhook_base_url: webhook_base_url.to_string(),
            bind_addr: "127.0.0.1:0".to_string(),
            session_key: vec![42u8; 32],
            enc_key_b64: general_purpose::STANDARD.encode([9u8; 32]),
            timezone: DEFAULT_TIMEZONE.to_string(),
            refresh_cron: DEFAULT_REFRESH_CRON.to_string(),
            session_idle_minutes: DEFAULT_SESSION_IDLE_MINUTES,
            secure_cookies: false,
        }
    }
}
