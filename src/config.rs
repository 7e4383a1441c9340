//! Gateway configuration
//!
//! Defaults first, then optional config files, then environment variables
//! with the `PORTCULLIS` prefix (`PORTCULLIS__DISPATCH__REQUEST_TIMEOUT_MS`
//! and friends).

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub dispatch: DispatchSettings,
    pub not_found: NotFoundSettings,
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    /// Whole-exchange deadline, in milliseconds. Zero disables the timeout.
    pub request_timeout_ms: u64,
    pub websocket_enabled: bool,
    pub tenant: Option<String>,
    pub zone: Option<String>,
}

impl DispatchSettings {
    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }
}

/// Response sent when no acceptor matches the request.
#[derive(Debug, Deserialize, Clone)]
pub struct NotFoundSettings {
    pub message: String,
    pub content_type: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .set_default("dispatch.request_timeout_ms", 30_000)?
            .set_default("dispatch.websocket_enabled", false)?
            .set_default("dispatch.tenant", None::<String>)?
            .set_default("dispatch.zone", None::<String>)?
            .set_default("not_found.message", "No context-path matches the request URI.")?
            .set_default("not_found.content_type", "text/plain")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "json")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{environment}")).required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("PORTCULLIS").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            dispatch: DispatchSettings {
                request_timeout_ms: 30_000,
                websocket_enabled: false,
                tenant: None,
                zone: None,
            },
            not_found: NotFoundSettings {
                message: "No context-path matches the request URI.".to_string(),
                content_type: "text/plain".to_string(),
            },
            logging: LoggingSettings {
                level: "info".to_string(),
                format: "json".to_string(),
            },
        }
    }
}
