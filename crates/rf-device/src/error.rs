//! Error types for device operations

use thiserror::Error;

/// Errors reported by a hardware backend
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    /// Handshake did not complete
    #[error("device connection timeout")]
    HandshakeTimeout,

    /// Hardware refused or failed a command
    #[error("command failed: {0}")]
    CommandFailed(String),
}

/// Rejected simulator settings
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    /// Failure rate is not a probability
    #[error("failure_rate must be within [0, 1], got {0}")]
    InvalidFailureRate(f64),

    /// Drift span is negative, non-finite or too large
    #[error("temperature_drift must be within [0, {max}], got {value}")]
    InvalidTemperatureDrift { value: f64, max: f64 },
}

/// Errors that can occur when operating on a device
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeviceError {
    /// Device has not completed its handshake
    #[error("device {0} is not connected")]
    Disconnected(String),

    /// Frequency outside the device's tuning range
    #[error("frequency {hz} Hz out of range [{min}, {max}] Hz")]
    FrequencyOutOfRange { hz: f64, min: f64, max: f64 },

    /// Gain outside the device's gain range
    #[error("gain {db} dB out of range [{min}, {max}] dB")]
    GainOutOfRange { db: f64, min: f64, max: f64 },

    /// Antenna name not in the supported set
    #[error("invalid antenna {0:?}")]
    InvalidAntenna(String),

    /// Hardware backend error
    #[error("hardware error: {0}")]
    Backend(#[from] BackendError),

    /// Unexpected internal failure (e.g. poisoned state lock)
    #[error("{0}")]
    Internal(String),
}

impl DeviceError {
    /// True for faults that are not a property of the request or the device
    /// state and should abort the whole operation
    pub fn is_internal(&self) -> bool {
        matches!(self, DeviceError::Internal(_))
    }

    /// True if the request was rejected by parameter validation
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DeviceError::FrequencyOutOfRange { .. }
                | DeviceError::GainOutOfRange { .. }
                | DeviceError::InvalidAntenna(_)
        )
    }
}
