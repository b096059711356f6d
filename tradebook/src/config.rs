//! Service configuration.
//!
//! Loads configuration from environment variables with sensible defaults.

use crate::error::{ServiceError, ServiceResult};
use crate::scenarios::Scenario;
use std::env;
use std::fmt;
use tradebook_domain::{AccountingBasis, TenantId};

// =============================================================================
// Configuration
// =============================================================================

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Environment (test, development, production)
    pub environment: Environment,

    /// Tenant the demonstration scenarios book under
    pub tenant_id: TenantId,

    /// Basis used when a position query names none
    pub default_basis: AccountingBasis,

    /// Decimal places shown when presenting quantities
    pub display_scale: u32,

    /// Reject bookings that reference unregistered books or assets
    pub strict_references: bool,

    /// Emit logs as JSON lines
    pub log_json: bool,

    /// Scenario(s) the binary runs
    pub scenario: Scenario,
}

/// Environment type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Development,
    Production,
}

/// Largest scale rust_decimal can represent
const MAX_DISPLAY_SCALE: u32 = 28;

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> ServiceResult<Self> {
        // Load .env file if present (ignore errors)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup (environment, map in tests).
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let environment = match lookup("TRADEBOOK_ENV") {
            Some(value) => Self::parse_environment(&value)?,
            None => defaults.environment,
        };

        let tenant_id = match lookup("TRADEBOOK_TENANT_ID") {
            Some(value) => TenantId::new(value.trim().parse::<u64>().map_err(|_| {
                ServiceError::Config(format!("Invalid TRADEBOOK_TENANT_ID: {}", value))
            })?),
            None => defaults.tenant_id,
        };

        let default_basis = match lookup("TRADEBOOK_DEFAULT_BASIS") {
            Some(value) => value.parse::<AccountingBasis>().map_err(|_| {
                ServiceError::Config(format!(
                    "Invalid TRADEBOOK_DEFAULT_BASIS: {}. Expected: Transaction Date, Settlement Date",
                    value
                ))
            })?,
            None => defaults.default_basis,
        };

        let display_scale = match lookup("TRADEBOOK_DISPLAY_SCALE") {
            Some(value) => value
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|scale| *scale <= MAX_DISPLAY_SCALE)
                .ok_or_else(|| {
                    ServiceError::Config(format!("Invalid TRADEBOOK_DISPLAY_SCALE: {}", value))
                })?,
            None => defaults.display_scale,
        };

        let strict_references = match lookup("TRADEBOOK_STRICT_REFERENCES") {
            Some(value) => Self::parse_bool("TRADEBOOK_STRICT_REFERENCES", &value)?,
            None => defaults.strict_references,
        };

        let log_json = match lookup("TRADEBOOK_LOG_JSON") {
            Some(value) => Self::parse_bool("TRADEBOOK_LOG_JSON", &value)?,
            None => defaults.log_json,
        };

        let scenario = match lookup("TRADEBOOK_SCENARIO") {
            Some(value) => value.parse::<Scenario>()?,
            None => defaults.scenario,
        };

        Ok(Self {
            environment,
            tenant_id,
            default_basis,
            display_scale,
            strict_references,
            log_json,
            scenario,
        })
    }

    /// Create test configuration.
    pub fn test() -> Self {
        Self {
            environment: Environment::Test,
            strict_references: false,
            ..Self::default()
        }
    }

    fn parse_environment(value: &str) -> ServiceResult<Environment> {
        match value.to_lowercase().as_str() {
            "test" => Ok(Environment::Test),
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ServiceError::Config(format!(
                "Invalid TRADEBOOK_ENV: {}. Expected: test, development, production",
                other
            ))),
        }
    }

    fn parse_bool(key: &str, value: &str) -> ServiceResult<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ServiceError::Config(format!("Invalid {} value: {}", key, value))),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            tenant_id: TenantId::new(1),
            default_basis: AccountingBasis::TransactionDate,
            display_scale: 6,
            strict_references: true,
            log_json: false,
            scenario: Scenario::All,
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Test => write!(f, "test"),
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
