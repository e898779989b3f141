//! Configuration for [`SecurityCore`](crate::SecurityCore).
//!
//! The issuer and the termination secret are supplied once at start-up. The
//! secret is held in [`Zeroizing`] memory and is never serialized back out.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use gradeguard_core::CoreConfig;
//!
//! let config = CoreConfig::builder()
//!     .issuer("gradeguard")
//!     .termination_secret("district-termination-secret")
//!     .token_ttl(Duration::from_secs(2 * 3600))
//!     .build()?;
//! assert_eq!(config.issuer(), "gradeguard");
//! # Ok::<(), gradeguard_core::ConfigError>(())
//! ```
//!
//! Deserialization accepts human-readable durations:
//!
//! ```
//! use gradeguard_core::CoreConfig;
//!
//! let config: CoreConfig = serde_json::from_str(r#"{
//!     "issuer": "gradeguard",
//!     "termination_secret": "district-termination-secret",
//!     "token_ttl": "2h"
//! }"#).unwrap();
//! config.validate().unwrap();
//! assert_eq!(config.token_ttl().as_secs(), 7200);
//! ```

use std::{fmt, time::Duration};

use gradeguard_crypto::DEFAULT_MAX_RETIRED;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

/// Default access token lifetime (1 hour).
pub const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(3600);

/// Minimum termination secret length in bytes.
pub const MIN_SECRET_LEN: usize = 16;

/// Errors raised while validating a [`CoreConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// A value was below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// The minimum allowed value.
        min: String,
        /// The value that was supplied.
        value: String,
    },

    /// A required text field was empty.
    #[error("{field} must not be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
}

/// Security core configuration.
///
/// Build with [`CoreConfig::builder`], or deserialize and then call
/// [`validate`](Self::validate). [`SecurityCore::new`](crate::SecurityCore::new)
/// validates again before use.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CoreConfig {
    /// Value of the `iss` claim on every issued token.
    pub(crate) issuer: String,

    /// Secret that authorizes the irreversible purge.
    #[serde(skip_serializing)]
    pub(crate) termination_secret: Zeroizing<String>,

    /// Lifetime of issued tokens.
    #[serde(with = "humantime_serde", default = "default_token_ttl")]
    pub(crate) token_ttl: Duration,

    /// Retired keys each key ring may keep before rotation is refused.
    #[serde(default = "default_max_retired_keys")]
    pub(crate) max_retired_keys: usize,
}

fn default_token_ttl() -> Duration {
    DEFAULT_TOKEN_TTL
}

fn default_max_retired_keys() -> usize {
    DEFAULT_MAX_RETIRED
}

#[bon::bon]
impl CoreConfig {
    /// Creates a new configuration, validating all fields.
    ///
    /// # Arguments
    ///
    /// * `issuer` - Token issuer. Must not be empty.
    /// * `termination_secret` - Purge secret, at least [`MIN_SECRET_LEN`] bytes.
    ///
    /// # Optional Fields
    ///
    /// * `token_ttl` - Token lifetime (default: 1 hour). Must be at least one second.
    /// * `max_retired_keys` - Retired key bound per ring (default:
    ///   [`DEFAULT_MAX_RETIRED`]). Must be at least 1.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if any field is out of range.
    #[builder]
    pub fn new(
        #[builder(into)] issuer: String,
        #[builder(with = |secret: impl Into<String>| Zeroizing::new(secret.into()))]
        termination_secret: Zeroizing<String>,
        #[builder(default = DEFAULT_TOKEN_TTL)] token_ttl: Duration,
        #[builder(default = DEFAULT_MAX_RETIRED)] max_retired_keys: usize,
    ) -> Result<Self, ConfigError> {
        let config = Self { issuer, termination_secret, token_ttl, max_retired_keys };
        config.validate()?;
        Ok(config)
    }

    /// Checks every field against its allowed range.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Empty`] if the issuer is empty
    /// - [`ConfigError::BelowMinimum`] if the secret is shorter than
    ///   [`MIN_SECRET_LEN`], the token lifetime is under one second, or
    ///   `max_retired_keys` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.issuer.is_empty() {
            return Err(ConfigError::Empty { field: "issuer" });
        }
        if self.termination_secret.len() < MIN_SECRET_LEN {
            return Err(ConfigError::BelowMinimum {
                field: "termination_secret",
                min: format!("{MIN_SECRET_LEN} bytes"),
                value: format!("{} bytes", self.termination_secret.len()),
            });
        }
        if self.token_ttl.as_secs() == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "token_ttl",
                min: "1s".into(),
                value: format!("{:?}", self.token_ttl),
            });
        }
        if self.max_retired_keys == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_retired_keys",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(())
    }

    /// Returns the token issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Returns the token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }

    /// Returns the retired key bound per ring.
    #[must_use]
    pub fn max_retired_keys(&self) -> usize {
        self.max_retired_keys
    }

    pub(crate) fn termination_secret(&self) -> &[u8] {
        self.termination_secret.as_bytes()
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("issuer", &self.issuer)
            .field("termination_secret", &"[REDACTED]")
            .field("token_ttl", &self.token_ttl)
            .field("max_retired_keys", &self.max_retired_keys)
            .finish()
    }
}
