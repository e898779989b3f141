//! Record size validation for append logs.
//!
//! Provides a configurable upper bound on the size of a single appended
//! record, catching runaway payloads before they reach the backing store.
//!
//! # Defaults
//!
//! | Limit | Default |
//! |-------|---------|
//! | `max_record_size` | 65 536 bytes (64 KiB) |

use crate::{ConfigError, StorageError};

/// Default maximum record size in bytes (64 KiB).
pub const DEFAULT_MAX_RECORD_SIZE: usize = 64 * 1024;

/// Configurable size limit for append-log records.
///
/// # Example
///
/// ```
/// use gradeguard_storage::SizeLimits;
///
/// let limits = SizeLimits::new(4096).unwrap();
/// assert_eq!(limits.max_record_size(), 4096);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeLimits {
    max_record_size: usize,
}

impl SizeLimits {
    /// Creates a size limit with the given bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if the limit is zero.
    pub fn new(max_record_size: usize) -> Result<Self, ConfigError> {
        if max_record_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_record_size",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(Self { max_record_size })
    }

    /// Returns the maximum allowed record size in bytes.
    #[must_use]
    pub fn max_record_size(&self) -> usize {
        self.max_record_size
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_record_size: DEFAULT_MAX_RECORD_SIZE }
    }
}

/// Validates a record against the given limits.
///
/// Returns `Err(StorageError::SizeLimitExceeded)` when the record is larger
/// than the configured maximum.
pub fn validate_record_size(record: &[u8], limits: &SizeLimits) -> Result<(), StorageError> {
    if record.len() > limits.max_record_size {
        return Err(StorageError::size_limit_exceeded(
            "record",
            record.len(),
            limits.max_record_size,
        ));
    }
    Ok(())
}
