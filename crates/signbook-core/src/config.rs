//! TOML-driven runtime configuration.
//!
//! `AppConfig` carries the handful of deployment-specific values the flows
//! need: the public base URL embedded in confirmation links, the token
//! lifetime, and the mail sender address. Load from a TOML string or file;
//! defaults suit local development.

use std::path::Path;

use serde::{Deserialize, Serialize};

use signbook_contracts::error::{SignbookError, SignbookResult};
use signbook_token::DEFAULT_EXPIRY_DAYS;

/// Longest accepted token lifetime. Anything beyond a year is operator
/// error, and unbounded values would overflow duration arithmetic.
pub const MAX_TOKEN_EXPIRY_DAYS: i64 = 365;

/// Runtime configuration for the flows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Public base URL prefixed to confirmation links. A trailing slash is
    /// tolerated and trimmed when links are built.
    pub base_url: String,

    /// Lifetime of both request kinds, in days.
    pub token_expiry_days: i64,

    /// From-address used by mail sender implementations that need one.
    pub mail_from: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            token_expiry_days: DEFAULT_EXPIRY_DAYS,
            mail_from: "Signbook <no-reply@signbook.local>".to_string(),
        }
    }
}

impl AppConfig {
    /// Parse `s` as TOML configuration.
    ///
    /// Returns `SignbookError::Config` if the TOML is malformed or does not
    /// match the expected schema.
    pub fn from_toml_str(s: &str) -> SignbookResult<Self> {
        let config: AppConfig = toml::from_str(s).map_err(|e| SignbookError::Config {
            reason: format!("failed to parse config TOML: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path` and parse it as TOML configuration.
    pub fn from_file(path: &Path) -> SignbookResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| SignbookError::Config {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }

    fn validate(&self) -> SignbookResult<()> {
        if self.base_url.trim().is_empty() {
            return Err(SignbookError::Config {
                reason: "base_url must not be empty".to_string(),
            });
        }
        if !(1..=MAX_TOKEN_EXPIRY_DAYS).contains(&self.token_expiry_days) {
            return Err(SignbookError::Config {
                reason: format!(
                    "token_expiry_days must be within 1..={}, got {}",
                    MAX_TOKEN_EXPIRY_DAYS, self.token_expiry_days
                ),
            });
        }
        Ok(())
    }

    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Identity-verification confirmation link embedding `raw_token`.
    pub fn verify_link(&self, raw_token: &str) -> String {
        format!("{}/signatory/verify/{}", self.base(), raw_token)
    }

    /// Task-signature confirmation link embedding `raw_token`.
    pub fn sign_link(&self, raw_token: &str) -> String {
        format!("{}/sign/{}", self.base(), raw_token)
    }
}
