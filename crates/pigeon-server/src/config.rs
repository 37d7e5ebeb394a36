use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::TimeDelta;

/// Placeholder JWT secrets that should never reach production.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

const DEFAULT_SECRET: &str = "dev-secret-change-me";

/// Process-wide settings, read once at startup and handed to each component.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub messages_path: PathBuf,
    pub upload_dir: PathBuf,
    pub avatar_dir: PathBuf,
    pub jwt_secret: String,
    /// Always positive.
    pub retention: TimeDelta,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup; unset keys fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.into());

        let port: u16 = get("PIGEON_PORT", "5000")
            .parse()
            .context("PIGEON_PORT must be a port number")?;

        let retention_hours: i64 = get("PIGEON_RETENTION_HOURS", "24")
            .parse()
            .context("PIGEON_RETENTION_HOURS must be an integer")?;
        if retention_hours <= 0 {
            bail!("PIGEON_RETENTION_HOURS must be positive, got {}", retention_hours);
        }
        let retention = TimeDelta::try_hours(retention_hours)
            .context("PIGEON_RETENTION_HOURS is out of range")?;

        let max_upload_mb: usize = get("PIGEON_MAX_UPLOAD_MB", "16")
            .parse()
            .context("PIGEON_MAX_UPLOAD_MB must be an integer")?;
        let max_upload_bytes = max_upload_mb
            .checked_mul(1024 * 1024)
            .context("PIGEON_MAX_UPLOAD_MB is out of range")?;

        Ok(Self {
            host: get("PIGEON_HOST", "0.0.0.0"),
            port,
            db_path: get("PIGEON_DB_PATH", "users.db").into(),
            messages_path: get("PIGEON_MESSAGES_PATH", "messages.json").into(),
            upload_dir: get("PIGEON_UPLOAD_DIR", "static/uploads").into(),
            avatar_dir: get("PIGEON_AVATAR_DIR", "static/avatars").into(),
            jwt_secret: get("PIGEON_JWT_SECRET", DEFAULT_SECRET),
            retention,
            max_upload_bytes,
        })
    }

    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", self.host, self.port))
    }

    pub fn has_placeholder_secret(&self) -> bool {
        self.jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&self.jwt_secret.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<ServerConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        let config = config_with(&[]).unwrap();

        assert_eq!(config.port, 5000);
        assert_eq!(config.db_path, PathBuf::from("users.db"));
        assert_eq!(config.messages_path, PathBuf::from("messages.json"));
        assert_eq!(config.upload_dir, PathBuf::from("static/uploads"));
        assert_eq!(config.avatar_dir, PathBuf::from("static/avatars"));
        assert_eq!(config.retention, TimeDelta::hours(24));
        assert_eq!(config.max_upload_bytes, 16 * 1024 * 1024);
        assert!(config.has_placeholder_secret());
        assert_eq!(config.addr().unwrap().port(), 5000);
    }

    #[test]
    fn overrides_are_applied() {
        let config = config_with(&[
            ("PIGEON_HOST", "127.0.0.1"),
            ("PIGEON_PORT", "8080"),
            ("PIGEON_RETENTION_HOURS", "48"),
            ("PIGEON_MAX_UPLOAD_MB", "2"),
            ("PIGEON_JWT_SECRET", "a-real-secret"),
        ])
        .unwrap();

        assert_eq!(config.addr().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(config.retention, TimeDelta::hours(48));
        assert_eq!(config.max_upload_bytes, 2 * 1024 * 1024);
        assert!(!config.has_placeholder_secret());
    }

    #[test]
    fn non_positive_retention_is_rejected() {
        assert!(config_with(&[("PIGEON_RETENTION_HOURS", "0")]).is_err());
        assert!(config_with(&[("PIGEON_RETENTION_HOURS", "-5")]).is_err());
        assert!(config_with(&[("PIGEON_RETENTION_HOURS", "soon")]).is_err());
    }

    #[test]
    fn huge_values_are_errors_not_panics() {
        assert!(config_with(&[("PIGEON_RETENTION_HOURS", i64::MAX.to_string().as_str())]).is_err());
        assert!(config_with(&[("PIGEON_MAX_UPLOAD_MB", usize::MAX.to_string().as_str())]).is_err());
    }

    #[test]
    fn bad_port_is_rejected() {
        assert!(config_with(&[("PIGEON_PORT", "70000")]).is_err());
    }
}
