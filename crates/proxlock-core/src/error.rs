//! Unified error types for the proxlock core library.
//!
//! This module provides a unified error type [`ProxlockError`] that covers every
//! failure that can stop the daemon from starting. Each module also has its own
//! specific error type (`AddressError`, `ConfigError`, `ActuatorError`) for
//! internal use.
//!
//! Once the control loop is running nothing here is raised: probe failures
//! collapse to "absent" and setting a relay line is assumed to succeed.
//!
//! # Example
//!
//! ```rust
//! use proxlock_core::error::{ProxlockError, Result};
//! use proxlock_core::DeviceAddress;
//!
//! fn parse(input: &str) -> Result<DeviceAddress> {
//!     Ok(DeviceAddress::parse(input)?)
//! }
//!
//! assert!(parse("AB:CD:EF:12:34:56").is_ok());
//! assert!(matches!(parse("nope"), Err(ProxlockError::InvalidDeviceAddress(_))));
//! ```

use thiserror::Error;

/// The unified error type for all proxlock startup failures.
#[derive(Debug, Error)]
pub enum ProxlockError {
    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The key device address is malformed.
    #[error("{0}")]
    InvalidDeviceAddress(String),

    /// One or more startup options are invalid.
    #[error("Invalid startup options: {0}")]
    InvalidOptions(String),

    // =========================================================================
    // HARDWARE ERRORS
    // =========================================================================
    /// The GPIO peripheral could not be opened.
    #[error("GPIO unavailable: {0}")]
    GpioUnavailable(String),

    /// A relay pin could not be claimed or the assignment is unusable.
    #[error("Relay pin error: {0}")]
    RelayPin(String),
}

/// A specialized [`Result`] type for proxlock operations.
pub type Result<T> = std::result::Result<T, ProxlockError>;

impl ProxlockError {
    /// Returns `true` if this error came from user-supplied options.
    #[inline]
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDeviceAddress(_) | Self::InvalidOptions(_)
        )
    }

    /// Returns `true` if this error came from the relay hardware.
    #[inline]
    #[must_use]
    pub const fn is_hardware_error(&self) -> bool {
        matches!(self, Self::GpioUnavailable(_) | Self::RelayPin(_))
    }

    /// Returns a machine-readable error code.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDeviceAddress(_) => "INVALID_DEVICE_ADDRESS",
            Self::InvalidOptions(_) => "INVALID_OPTIONS",
            Self::GpioUnavailable(_) => "GPIO_UNAVAILABLE",
            Self::RelayPin(_) => "RELAY_PIN",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::device::AddressError> for ProxlockError {
    fn from(err: crate::device::AddressError) -> Self {
        Self::InvalidDeviceAddress(err.to_string())
    }
}

impl From<crate::config::ConfigError> for ProxlockError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::InvalidDevice(e) => Self::from(e),
            other @ (ConfigError::ValidationError { .. }
            | ConfigError::MultipleValidationErrors(_)) => {
                Self::InvalidOptions(other.to_string())
            }
        }
    }
}

impl From<crate::actuator::ActuatorError> for ProxlockError {
    fn from(err: crate::actuator::ActuatorError) -> Self {
        use crate::actuator::ActuatorError;
        match err {
            ActuatorError::GpioUnavailable { .. } => Self::GpioUnavailable(err.to_string()),
            ActuatorError::PinUnavailable { .. } | ActuatorError::PinConflict(_) => {
                Self::RelayPin(err.to_string())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actuator::ActuatorError;
    use crate::config::StartupOptions;
    use crate::device::AddressError;

    #[test]
    fn test_config_error_classification() {
        assert!(ProxlockError::InvalidDeviceAddress("x".into()).is_config_error());
        assert!(ProxlockError::InvalidOptions("x".into()).is_config_error());
        assert!(!ProxlockError::GpioUnavailable("x".into()).is_config_error());
    }

    #[test]
    fn test_hardware_error_classification() {
        assert!(ProxlockError::GpioUnavailable("x".into()).is_hardware_error());
        assert!(ProxlockError::RelayPin("x".into()).is_hardware_error());
        assert!(!ProxlockError::InvalidOptions("x".into()).is_hardware_error());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ProxlockError::InvalidDeviceAddress("x".into()).error_code(),
            "INVALID_DEVICE_ADDRESS"
        );
        assert_eq!(
            ProxlockError::GpioUnavailable("x".into()).error_code(),
            "GPIO_UNAVAILABLE"
        );
    }

    #[test]
    fn test_from_address_error() {
        let err: ProxlockError = AddressError::Malformed("12:34".into()).into();
        assert!(matches!(err, ProxlockError::InvalidDeviceAddress(_)));
        assert!(err.to_string().contains("12:34"));
    }

    #[test]
    fn test_from_config_error() {
        let err = StartupOptions::new("bad").validate().unwrap_err();
        assert!(matches!(
            ProxlockError::from(err),
            ProxlockError::InvalidDeviceAddress(_)
        ));

        let options = StartupOptions {
            lock_pin: 4,
            unlock_pin: 4,
            ..StartupOptions::new("AB:CD:EF:12:34:56")
        };
        let err = ProxlockError::from(options.validate().unwrap_err());
        assert!(matches!(err, ProxlockError::InvalidOptions(_)));
    }

    #[test]
    fn test_from_actuator_error() {
        let err: ProxlockError = ActuatorError::PinConflict(4).into();
        assert!(err.is_hardware_error());
        assert_eq!(err.error_code(), "RELAY_PIN");

        let err: ProxlockError = ActuatorError::GpioUnavailable {
            message: "no /dev/gpiomem".into(),
        }
        .into();
        assert!(err.to_string().contains("/dev/gpiomem"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<ProxlockError>();
        assert_sync::<ProxlockError>();
    }
}
