//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Log output format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Plain text or JSON log lines
    pub log_format: LogFormat,

    /// Supabase project URL (no trailing slash)
    pub supabase_url: String,
    /// Supabase anonymous key, sent as `apikey` on user-scoped calls
    pub supabase_anon_key: String,
    /// Supabase service role key (bypasses RLS - server only!)
    pub supabase_service_role_key: String,
    /// Supabase JWT secret for token verification
    pub supabase_jwt_secret: String,

    /// Allowed client origins for CORS (comma-separated)
    pub client_origin: String,
    /// Storage bucket holding menu item images
    pub storage_bucket: String,

    /// Timeout applied to inbound requests and outbound Supabase calls
    pub request_timeout: Duration,
    /// Per-user request quota
    pub rate_limit_per_second: u32,
    /// Capacity of each user's sale buffer
    pub max_buffer_entries: usize,
    /// Largest accepted menu image upload
    pub max_image_bytes: usize,
    /// Compare-and-swap attempts for inventory adjustments
    pub adjust_max_attempts: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &'static str| lookup(key).ok_or(ConfigError::Missing(key));

        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let log_format = match lookup("LOG_FORMAT").as_deref() {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(_) => return Err(ConfigError::Invalid("LOG_FORMAT")),
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            log_format,

            supabase_url: required("SUPABASE_URL")?.trim_end_matches('/').to_string(),
            supabase_anon_key: required("SUPABASE_ANON_KEY")?,
            supabase_service_role_key: required("SUPABASE_SERVICE_ROLE_KEY")?,
            supabase_jwt_secret: required("SUPABASE_JWT_SECRET")?,

            client_origin: required("CLIENT_ORIGIN")?,
            storage_bucket: lookup("STORAGE_BUCKET").unwrap_or_else(|| "menu-images".to_string()),

            request_timeout: Duration::from_secs(parse_or(&lookup, "REQUEST_TIMEOUT_SECS", 15)?),
            rate_limit_per_second: parse_or(&lookup, "RATE_LIMIT_PER_SECOND", 20)?,
            max_buffer_entries: parse_or(&lookup, "MAX_BUFFER_ENTRIES", 500)?,
            max_image_bytes: parse_or(&lookup, "MAX_IMAGE_BYTES", 5 * 1024 * 1024)?,
            adjust_max_attempts: parse_or(&lookup, "ADJUST_MAX_ATTEMPTS", 3)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        server_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "debug".to_string(),
        log_format: LogFormat::Text,
        supabase_url: "http://127.0.0.1:9".to_string(),
        supabase_anon_key: "anon".to_string(),
        supabase_service_role_key: "service".to_string(),
        supabase_jwt_secret: "test-secret".to_string(),
        client_origin: "http://localhost:5173".to_string(),
        storage_bucket: "menu-images".to_string(),
        request_timeout: Duration::from_secs(2),
        rate_limit_per_second: 20,
        max_buffer_entries: 3,
        max_image_bytes: 1024,
        adjust_max_attempts: 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_env() -> HashMap<&'static str, String> {
        HashMap::from([
            ("SUPABASE_URL", "https://abc.supabase.co/".to_string()),
            ("SUPABASE_ANON_KEY", "anon".to_string()),
            ("SUPABASE_SERVICE_ROLE_KEY", "service".to_string()),
            ("SUPABASE_JWT_SECRET", "secret".to_string()),
            ("CLIENT_ORIGIN", "http://localhost:5173".to_string()),
        ])
    }

    fn load(env: &HashMap<&'static str, String>) -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_optional_vars_absent() {
        let config = load(&base_env()).unwrap();
        assert_eq!(config.server_addr.port(), 8080);
        assert_eq!(config.supabase_url, "https://abc.supabase.co");
        assert_eq!(config.storage_bucket, "menu-images");
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert_eq!(config.max_buffer_entries, 500);
        assert_eq!(config.adjust_max_attempts, 3);
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn port_takes_precedence_over_server_addr() {
        let mut env = base_env();
        env.insert("PORT", "9000".to_string());
        env.insert("SERVER_ADDR", "127.0.0.1:7000".to_string());
        assert_eq!(load(&env).unwrap().server_addr.port(), 9000);
    }

    #[test]
    fn missing_required_var_is_reported() {
        let mut env = base_env();
        env.remove("SUPABASE_JWT_SECRET");
        match load(&env) {
            Err(ConfigError::Missing(key)) => assert_eq!(key, "SUPABASE_JWT_SECRET"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn malformed_numbers_and_formats_are_rejected() {
        let mut env = base_env();
        env.insert("MAX_BUFFER_ENTRIES", "lots".to_string());
        assert!(matches!(load(&env), Err(ConfigError::Invalid("MAX_BUFFER_ENTRIES"))));

        let mut env = base_env();
        env.insert("LOG_FORMAT", "xml".to_string());
        assert!(matches!(load(&env), Err(ConfigError::Invalid("LOG_FORMAT"))));
    }
}
