use crate::error::AppError;
use dotenvy::dotenv;
use std::env;

/// Terms masked by the content filter when no BLOCKED_TERMS override is set.
const DEFAULT_BLOCKED_TERMS: &[&str] = &["fuck", "shit", "bitch", "시발", "병신"];

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub jwt_secret: String,
    pub blocked_terms: Vec<String>,
    pub viewer_snapshot_interval_secs: u64,
}

impl Config {
    fn parse_terms(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| AppError::Config("DATABASE_URL missing".into()))?;
        let redis_url = env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
        let port = env::var("PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8080);
        let jwt_secret =
            env::var("JWT_SECRET").map_err(|_| AppError::Config("JWT_SECRET missing".into()))?;

        let blocked_terms = match env::var("BLOCKED_TERMS") {
            Ok(value) if !value.trim().is_empty() => Self::parse_terms(&value),
            _ => DEFAULT_BLOCKED_TERMS.iter().map(|s| s.to_string()).collect(),
        };

        let viewer_snapshot_interval_secs = env::var("VIEWER_SNAPSHOT_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Self {
            database_url,
            redis_url,
            port,
            jwt_secret,
            blocked_terms,
            viewer_snapshot_interval_secs,
        })
    }

    #[cfg(test)]
    pub fn test_defaults() -> Self {
        Self {
            database_url: "postgres://localhost/test".into(),
            redis_url: "redis://127.0.0.1:6379/0".into(),
            port: 8080,
            jwt_secret: "test-secret".into(),
            blocked_terms: DEFAULT_BLOCKED_TERMS.iter().map(|s| s.to_string()).collect(),
            viewer_snapshot_interval_secs: 30,
        }
    }
}
