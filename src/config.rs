use std::env;
use std::path::PathBuf;

use crate::error::AppError;
use crate::models::location::GeoPoint;

const DEFAULT_JWT_SECRET: &str = "delivery-app-secret-key-change-in-production";

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub jwt_secret: String,
    pub token_ttl_days: i64,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub arrival_radius_meters: f64,
    pub event_buffer_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            http_port: 8000,
            log_level: "info".to_string(),
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            token_ttl_days: 30,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 10 * 1024 * 1024,
            arrival_radius_meters: 100.0,
            event_buffer_size: 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();
        let defaults = Self::default();

        let config = Self {
            http_port: parse_or_default("HTTP_PORT", defaults.http_port)?,
            log_level: env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            jwt_secret: env::var("JWT_SECRET").unwrap_or(defaults.jwt_secret),
            token_ttl_days: parse_or_default("TOKEN_TTL_DAYS", defaults.token_ttl_days)?,
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: parse_or_default("MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            arrival_radius_meters: parse_or_default(
                "ARRIVAL_RADIUS_METERS",
                defaults.arrival_radius_meters,
            )?,
            event_buffer_size: parse_or_default("EVENT_BUFFER_SIZE", defaults.event_buffer_size)?,
        };

        if config.token_ttl_days <= 0 {
            return Err(AppError::Internal("TOKEN_TTL_DAYS must be > 0".to_string()));
        }

        Ok(config)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Settings for the `courier-agent` binary.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub api_base_url: String,
    pub email: String,
    pub password: String,
    pub position: GeoPoint,
    pub go_active: bool,
    pub log_level: String,
    pub console_refresh_secs: u64,
}

impl AgentConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000/api".to_string()),
            email: required("AGENT_EMAIL")?,
            password: required("AGENT_PASSWORD")?,
            position: GeoPoint::new(
                parse_or_default("AGENT_LATITUDE", 0.0)?,
                parse_or_default("AGENT_LONGITUDE", 0.0)?,
            ),
            go_active: parse_or_default("AGENT_GO_ACTIVE", true)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            console_refresh_secs: parse_or_default("AGENT_CONSOLE_REFRESH_SECS", 15)?,
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::Internal(format!("{key} must be set")))
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
