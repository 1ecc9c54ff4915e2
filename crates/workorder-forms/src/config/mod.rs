use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use mime::Mime;

use crate::workflows::requirements::{MatrixError, RequirementMatrix};
use crate::workflows::validation::{UploadPolicy, DEFAULT_MAX_FILE_BYTES};

const DEFAULT_MEDIA_TYPES: &str = "application/pdf,image/jpeg,image/png";

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
    pub forms: FormsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let max_upload_bytes = match env::var("FORMS_MAX_UPLOAD_BYTES") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|bytes| *bytes > 0)
                .ok_or(ConfigError::InvalidUploadLimit)?,
            Err(_) => DEFAULT_MAX_FILE_BYTES,
        };

        let accepted_media_types = parse_media_types(
            &env::var("FORMS_ACCEPTED_MEDIA_TYPES")
                .unwrap_or_else(|_| DEFAULT_MEDIA_TYPES.to_string()),
        )?;

        let requirements_path = env::var("FORMS_REQUIREMENTS_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            forms: FormsConfig {
                max_upload_bytes,
                accepted_media_types,
                requirements_path,
            },
        })
    }
}

fn parse_media_types(raw: &str) -> Result<Vec<Mime>, ConfigError> {
    let parsed: Vec<Mime> = raw
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| {
            value
                .parse::<Mime>()
                .map_err(|_| ConfigError::InvalidMediaType(value.to_string()))
        })
        .collect::<Result<_, _>>()?;

    if parsed.is_empty() {
        return Err(ConfigError::InvalidMediaType(raw.to_string()));
    }
    Ok(parsed)
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Upload limits and the requirement table source.
#[derive(Debug, Clone)]
pub struct FormsConfig {
    pub max_upload_bytes: u64,
    pub accepted_media_types: Vec<Mime>,
    pub requirements_path: Option<PathBuf>,
}

impl FormsConfig {
    pub fn upload_policy(&self) -> UploadPolicy {
        UploadPolicy::new(self.max_upload_bytes, self.accepted_media_types.clone())
    }

    /// Built-in table unless `FORMS_REQUIREMENTS_PATH` points at a JSON override.
    pub fn requirement_matrix(&self) -> Result<RequirementMatrix, MatrixError> {
        match &self.requirements_path {
            Some(path) => RequirementMatrix::load(path),
            None => Ok(RequirementMatrix::standard()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidUploadLimit,
    InvalidMediaType(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidUploadLimit => {
                write!(f, "FORMS_MAX_UPLOAD_BYTES must be a positive integer")
            }
            ConfigError::InvalidMediaType(value) => write!(
                f,
                "FORMS_ACCEPTED_MEDIA_TYPES contains an invalid media type: '{}'",
                value
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidUploadLimit
            | ConfigError::InvalidMediaType(_) => None,
        }
    }
}
