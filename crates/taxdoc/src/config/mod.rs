use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub engine: EngineConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("TAXDOC_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("TAXDOC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("TAXDOC_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("TAXDOC_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let engine = EngineConfig::from_env()?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            engine,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Operator-tunable dials for the extraction pipeline. Rule constants (tax
/// rates, arithmetic tolerances) are not configuration; they live with the
/// rules.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Resolved confidence below which a field escalates to Layer 2.
    pub escalation_threshold: f32,
    /// Budget for one Layer-2 extractor call.
    pub layer_two_timeout: Duration,
    /// Base confidence assigned to Layer-2 candidates; the extractor does
    /// not score its own answers.
    pub layer_two_confidence: f32,
}

impl EngineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let escalation_threshold = match env::var("TAXDOC_ESCALATION_THRESHOLD") {
            Ok(raw) => raw
                .parse::<f32>()
                .ok()
                .filter(|value| (0.0..=1.0).contains(value))
                .ok_or(ConfigError::InvalidThreshold)?,
            Err(_) => defaults.escalation_threshold,
        };

        let layer_two_timeout = match env::var("TAXDOC_LAYER_TWO_TIMEOUT_MS") {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::InvalidTimeout)?,
            Err(_) => defaults.layer_two_timeout,
        };

        Ok(Self {
            escalation_threshold,
            layer_two_timeout,
            layer_two_confidence: defaults.layer_two_confidence,
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            escalation_threshold: 0.85,
            layer_two_timeout: Duration::from_secs(30),
            layer_two_confidence: 0.75,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidThreshold,
    InvalidTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "TAXDOC_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "TAXDOC_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidThreshold => {
                write!(f, "TAXDOC_ESCALATION_THRESHOLD must be a float in [0, 1]")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "TAXDOC_LAYER_TWO_TIMEOUT_MS must be a duration in milliseconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
