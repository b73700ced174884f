use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use fortyweeks_core::mail::{MailSettings, SesCredentials};

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-this";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Server host to bind to.
    pub host: String,
    /// Server port to bind to.
    pub port: u16,
    /// SQLite file path or `sqlite:` URL.
    pub database_url: String,
    /// Maximum database connections in the pool.
    pub db_max_connections: u32,
    /// JWT signing secret.
    pub jwt_secret: String,
    pub images_dir: PathBuf,
    pub videos_dir: PathBuf,
    /// Body limit for upload requests, in bytes.
    pub max_upload_bytes: usize,
    /// Send through SES; otherwise emails are only logged.
    pub email_enabled: bool,
    pub aws_region: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub sender_email: String,
    pub sender_name: String,
    /// Public origin used in links inside emails and share pages.
    pub base_url: String,
    pub email_queue_capacity: usize,
    pub email_timeout_secs: u64,
    pub email_max_attempts: u32,
    /// Log filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "./data/sqlite/core.db".to_string(),
            db_max_connections: 5,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            images_dir: PathBuf::from("./data/images"),
            videos_dir: PathBuf::from("./data/videos"),
            max_upload_bytes: 100 * 1024 * 1024,
            email_enabled: false,
            aws_region: "us-east-1".to_string(),
            aws_access_key_id: String::new(),
            aws_secret_access_key: String::new(),
            sender_email: "noreply@40weeks.app".to_string(),
            sender_name: "40Weeks".to_string(),
            base_url: "http://localhost:8080".to_string(),
            email_queue_capacity: 256,
            email_timeout_secs: 60,
            email_max_attempts: 1,
            log_level: "fortyweeks_api=debug,fortyweeks_core=debug,tower_http=debug".to_string(),
        }
    }
}

fn parse<T>(var: &'static str, value: String) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
        value,
    })
}

fn parse_bool(var: &'static str, value: String) -> Result<bool, ConfigError> {
    match value.trim() {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected true or false".to_string(),
        }),
    }
}

impl AppConfig {
    /// Load configuration from environment variables with sensible defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            config.host = v;
        }
        if let Some(v) = get("PORT") {
            config.port = parse("PORT", v)?;
        }
        if let Some(v) = get("DATABASE_URL") {
            config.database_url = v;
        }
        if let Some(v) = get("DATABASE_MAX_CONNECTIONS") {
            config.db_max_connections = parse("DATABASE_MAX_CONNECTIONS", v)?;
        }
        if let Some(v) = get("JWT_SECRET") {
            config.jwt_secret = v;
        }
        if let Some(v) = get("IMAGES_DIRECTORY") {
            config.images_dir = PathBuf::from(v);
        }
        if let Some(v) = get("VIDEOS_DIRECTORY") {
            config.videos_dir = PathBuf::from(v);
        }
        if let Some(v) = get("MAX_UPLOAD_BYTES") {
            config.max_upload_bytes = parse("MAX_UPLOAD_BYTES", v)?;
        }
        if let Some(v) = get("EMAIL_ENABLED") {
            config.email_enabled = parse_bool("EMAIL_ENABLED", v)?;
        }
        if let Some(v) = get("AWS_REGION") {
            config.aws_region = v;
        }
        if let Some(v) = get("AWS_ACCESS_KEY_ID") {
            config.aws_access_key_id = v;
        }
        if let Some(v) = get("AWS_SECRET_ACCESS_KEY") {
            config.aws_secret_access_key = v;
        }
        if let Some(v) = get("SENDER_EMAIL") {
            config.sender_email = v;
        }
        if let Some(v) = get("SENDER_NAME") {
            config.sender_name = v;
        }
        if let Some(v) = get("BASE_URL") {
            config.base_url = v;
        }
        if let Some(v) = get("EMAIL_QUEUE_CAPACITY") {
            config.email_queue_capacity = parse("EMAIL_QUEUE_CAPACITY", v)?;
        }
        if let Some(v) = get("EMAIL_TIMEOUT_SECS") {
            config.email_timeout_secs = parse("EMAIL_TIMEOUT_SECS", v)?;
        }
        if let Some(v) = get("EMAIL_MAX_ATTEMPTS") {
            config.email_max_attempts = parse("EMAIL_MAX_ATTEMPTS", v)?;
        }
        if let Some(v) = get("LOG_LEVEL") {
            config.log_level = v;
        }

        Ok(config)
    }

    /// Build the socket address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn mail_settings(&self) -> MailSettings {
        MailSettings {
            sender_email: self.sender_email.clone(),
            sender_name: self.sender_name.clone(),
            base_url: self.base_url.clone(),
        }
    }

    pub fn ses_credentials(&self) -> SesCredentials {
        SesCredentials {
            region: self.aws_region.clone(),
            access_key_id: self.aws_access_key_id.clone(),
            secret_access_key: self.aws_secret_access_key.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.addr(), "0.0.0.0:8080");
        assert_eq!(config.database_url, "./data/sqlite/core.db");
        assert!(!config.email_enabled);
        assert_eq!(config.max_upload_bytes, 104_857_600);
        assert_eq!(config.email_max_attempts, 1);
        assert!(config.uses_default_jwt_secret());
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("PORT", "9000"),
            ("EMAIL_ENABLED", "true"),
            ("JWT_SECRET", "s3cret"),
            ("EMAIL_MAX_ATTEMPTS", "3"),
            ("BASE_URL", "https://40weeks.app"),
        ])
        .unwrap();
        assert_eq!(config.port, 9000);
        assert!(config.email_enabled);
        assert!(!config.uses_default_jwt_secret());
        assert_eq!(config.email_max_attempts, 3);
        assert_eq!(config.mail_settings().base_url, "https://40weeks.app");
    }

    #[test]
    fn blank_values_keep_defaults() {
        let config = load(&[("PORT", "  "), ("SENDER_NAME", "")]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.sender_name, "40Weeks");
    }

    #[test]
    fn malformed_values_are_errors() {
        let err = load(&[("PORT", "eighty")]).unwrap_err();
        assert!(err.to_string().starts_with("PORT has invalid value 'eighty'"));
        assert!(load(&[("EMAIL_ENABLED", "yes please")]).is_err());
    }
}
