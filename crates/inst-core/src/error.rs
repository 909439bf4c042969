//! Error types shared by instrument drivers.
//!
//! Drivers report failures through [`InstrumentError`]. Hardware-facing
//! problems are carried as a structured [`DriverError`] so callers can match
//! on the [`DriverErrorKind`] without parsing messages.
//!
//! ## Error Hierarchy
//!
//! - **`Driver`**: a categorised failure raised by a specific driver
//!   (communication, timeout, invalid parameter, ...).
//! - **`Configuration`**: configuration values that parse but make no sense
//!   for the requested driver.
//! - **`NotImplemented`**: an operation that is part of a capability contract
//!   but that the concrete driver does not provide. Contract defaults return
//!   this so a driver only has to implement what its hardware supports.
//!
//! Virtual drivers keep their core operations total; these errors only appear
//! on the optional parts of a contract.

use thiserror::Error;

// =============================================================================
// Driver Errors
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverErrorKind {
    Initialization,
    Configuration,
    Communication,
    Hardware,
    Timeout,
    InvalidParameter,
    Unknown,
}

impl std::fmt::Display for DriverErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            DriverErrorKind::Initialization => "initialization",
            DriverErrorKind::Configuration => "configuration",
            DriverErrorKind::Communication => "communication",
            DriverErrorKind::Hardware => "hardware",
            DriverErrorKind::Timeout => "timeout",
            DriverErrorKind::InvalidParameter => "invalid_parameter",
            DriverErrorKind::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

#[derive(Error, Debug, Clone)]
#[error("Driver '{driver_type}' {kind} error: {message}")]
pub struct DriverError {
    pub driver_type: String,
    pub kind: DriverErrorKind,
    pub message: String,
}

impl DriverError {
    pub fn new(
        driver_type: impl Into<String>,
        kind: DriverErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            driver_type: driver_type.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Convenience alias for results using the instrument error type.
pub type AppResult<T> = std::result::Result<T, InstrumentError>;

/// Primary error type for instrument drivers.
#[derive(Error, Debug)]
pub enum InstrumentError {
    /// Structured driver error with category
    #[error("{0}")]
    Driver(#[from] DriverError),

    /// Configuration validation failed.
    ///
    /// The configuration parsed but holds a value the driver cannot use
    /// (e.g. a driver type that is not registered).
    #[error("Configuration validation error: {0}")]
    Configuration(String),

    /// The operation belongs to a capability contract but this instrument
    /// does not provide it.
    ///
    /// **Recovery Strategy**: check the instrument's capabilities before
    /// calling, or fall back to an operation it does support.
    #[error("'{operation}' is not implemented for {instrument}")]
    NotImplemented {
        instrument: String,
        operation: &'static str,
    },
}

impl InstrumentError {
    /// Shorthand for [`InstrumentError::NotImplemented`].
    pub fn not_implemented(instrument: impl Into<String>, operation: &'static str) -> Self {
        Self::NotImplemented {
            instrument: instrument.into(),
            operation,
        }
    }

    /// Shorthand for an invalid-parameter [`DriverError`].
    pub fn invalid_parameter(driver_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Driver(DriverError::new(
            driver_type,
            DriverErrorKind::InvalidParameter,
            message,
        ))
    }
}
