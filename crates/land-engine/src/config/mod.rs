use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::eligibility::EmptyEligibilityPolicy;

pub const CRP_RULES_FILE: &str = "crp_eligibility_rules.csv";
pub const CRP_SCHEDULE_FILE: &str = "payment_schedules_crp.csv";
pub const EQIP_SCHEDULE_FILE: &str = "payment_schedules_eqip.csv";
pub const CSP_SCHEDULE_FILE: &str = "payment_schedules_csp.csv";

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
    pub data: DataConfig,
    pub storage: StorageConfig,
    pub terrain: TerrainConfig,
    pub empty_eligibility: EmptyEligibilityPolicy,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(&var_or("APP_ENV", "development"));

        let host = var_or("APP_HOST", "127.0.0.1");
        let port = var_or("APP_PORT", "3000")
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = var_or("APP_LOG_LEVEL", "info");

        let data_dir = PathBuf::from(var_or("APP_DATA_DIR", "data"));
        let database_path = PathBuf::from(var_or("APP_DATABASE_PATH", "parcels.db"));

        let base_url = env::var("APP_TERRAIN_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let timeout_secs = var_or("APP_TERRAIN_TIMEOUT_SECS", "8")
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0)
            .ok_or(ConfigError::InvalidTimeout)?;

        let raw_policy = var_or("APP_EMPTY_ELIGIBILITY", "exclude");
        let empty_eligibility = EmptyEligibilityPolicy::parse(&raw_policy)
            .ok_or(ConfigError::InvalidEligibilityPolicy { value: raw_policy })?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            data: DataConfig::new(data_dir),
            storage: StorageConfig { database_path },
            terrain: TerrainConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
            },
            empty_eligibility,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
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
    pub ansi: bool,
}

/// Location of the rule sheet and payment schedules.
#[derive(Debug, Clone)]
pub struct DataConfig {
    pub data_dir: PathBuf,
}

impl DataConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn crp_rules(&self) -> PathBuf {
        self.data_dir.join(CRP_RULES_FILE)
    }

    pub fn crp_schedule(&self) -> PathBuf {
        self.data_dir.join(CRP_SCHEDULE_FILE)
    }

    pub fn eqip_schedule(&self) -> PathBuf {
        self.data_dir.join(EQIP_SCHEDULE_FILE)
    }

    pub fn csp_schedule(&self) -> PathBuf {
        self.data_dir.join(CSP_SCHEDULE_FILE)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub database_path: PathBuf,
}

/// Remote terrain lookup; disabled when no base URL is configured.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidTimeout,
    InvalidEligibilityPolicy { value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidTimeout => {
                write!(f, "APP_TERRAIN_TIMEOUT_SECS must be a positive whole number")
            }
            ConfigError::InvalidEligibilityPolicy { value } => write!(
                f,
                "APP_EMPTY_ELIGIBILITY must be 'exclude' or 'pass-through', got '{value}'"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidTimeout
            | ConfigError::InvalidEligibilityPolicy { .. } => None,
        }
    }
}
