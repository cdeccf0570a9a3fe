//! Process configuration read once at startup from the environment.

use std::env;
use std::path::PathBuf;

use crate::error::{AppError, AppResult};

pub const ENV_JWT_SECRET: &str = "CRM_JWT_SECRET";
pub const ENV_HTTP_PORT: &str = "CRM_HTTP_PORT";
pub const ENV_MODE: &str = "CRM_ENV";
pub const ENV_ACTIVITY_LOG: &str = "CRM_ACTIVITY_LOG";
pub const ENV_ADMIN_EMAIL: &str = "CRM_ADMIN_EMAIL";
pub const ENV_ADMIN_PASSWORD: &str = "CRM_ADMIN_PASSWORD";

pub const DEFAULT_HTTP_PORT: u16 = 7878;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Development,
    Production,
}

#[derive(Clone)]
pub struct AppConfig {
    pub http_port: u16,
    pub jwt_secret: String,
    pub mode: RunMode,
    pub activity_log: Option<PathBuf>,
    /// (email, password) of an admin to seed on startup.
    pub bootstrap_admin: Option<(String, String)>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("http_port", &self.http_port)
            .field("mode", &self.mode)
            .field("activity_log", &self.activity_log)
            .field("bootstrap_admin", &self.bootstrap_admin.as_ref().map(|(e, _)| e))
            .finish_non_exhaustive()
    }
}

impl AppConfig {
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|k| env::var(k).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(get: F) -> AppResult<Self> {
        let jwt_secret = get(ENV_JWT_SECRET).filter(|s| !s.trim().is_empty()).ok_or_else(|| {
            AppError::config("missing_signing_secret".to_string(), format!("{} must be set", ENV_JWT_SECRET))
        })?;
        let http_port = match get(ENV_HTTP_PORT) {
            Some(v) => v.trim().parse::<u16>().map_err(|_| {
                AppError::config("invalid_port".to_string(), format!("{}='{}' is not a port", ENV_HTTP_PORT, v))
            })?,
            None => DEFAULT_HTTP_PORT,
        };
        let mode = match get(ENV_MODE).map(|s| s.trim().to_ascii_lowercase()) {
            Some(m) if m == "development" || m == "dev" || m == "local" => RunMode::Development,
            _ => RunMode::Production,
        };
        let activity_log = get(ENV_ACTIVITY_LOG).filter(|s| !s.trim().is_empty()).map(PathBuf::from);
        let bootstrap_admin = match (get(ENV_ADMIN_EMAIL), get(ENV_ADMIN_PASSWORD)) {
            (Some(e), Some(p)) if !e.trim().is_empty() && !p.is_empty() => Some((e, p)),
            _ => None,
        };
        Ok(Self { http_port, jwt_secret, mode, activity_log, bootstrap_admin })
    }

    /// Cookies carry `Secure` everywhere except local development.
    pub fn secure_cookies(&self) -> bool { self.mode == RunMode::Production }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let m: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| m.get(k).cloned()
    }

    #[test]
    fn missing_secret_is_fatal() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config { .. }));
        let err = AppConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, "   ")])).unwrap_err();
        assert_eq!(err.code_str(), "missing_signing_secret");
    }

    #[test]
    fn defaults() {
        let cfg = AppConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, "s")])).unwrap();
        assert_eq!(cfg.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(cfg.mode, RunMode::Production);
        assert!(cfg.secure_cookies());
        assert!(cfg.activity_log.is_none());
        assert!(cfg.bootstrap_admin.is_none());
    }

    #[test]
    fn overrides() {
        let cfg = AppConfig::from_lookup(lookup(&[
            (ENV_JWT_SECRET, "s"),
            (ENV_HTTP_PORT, "9000"),
            (ENV_MODE, "Development"),
            (ENV_ACTIVITY_LOG, "/tmp/activity.jsonl"),
            (ENV_ADMIN_EMAIL, "root@example.com"),
            (ENV_ADMIN_PASSWORD, "bootstrap-pass"),
        ]))
        .unwrap();
        assert_eq!(cfg.http_port, 9000);
        assert!(!cfg.secure_cookies());
        assert_eq!(cfg.activity_log, Some(PathBuf::from("/tmp/activity.jsonl")));
        assert_eq!(cfg.bootstrap_admin.as_ref().map(|(e, _)| e.as_str()), Some("root@example.com"));
        assert!(!format!("{cfg:?}").contains("bootstrap-pass"));
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[(ENV_JWT_SECRET, "s"), (ENV_HTTP_PORT, "http")])).unwrap_err();
        assert_eq!(err.code_str(), "invalid_port");
    }
}
