//! Instrument Capabilities
//!
//! Instead of a deep class tree, instruments implement the small capability
//! traits they actually support:
//!
//! - every driver implements [`Instrument`] (address + identification)
//! - drivers that own a communication channel implement [`Transport`]
//! - a multimeter implements [`crate::multimeter::Multimeter`]
//! - support equipment implements [`Secondary`]
//!
//! A virtual driver composes these directly on one concrete type, e.g.
//! `Instrument + Transport + Multimeter` for a simulated DMM.
//!
//! # Design Philosophy
//!
//! Each capability trait:
//! - Is thread-safe (requires Send + Sync)
//! - Takes `&self`; drivers use interior mutability for state
//! - Focuses on ONE thing
//!
//! The synchronous traits model request/response instruments. [`Readable`] is
//! the async scalar capability handed out through
//! [`crate::driver::DeviceComponents`].
//!
//! # Example
//!
//! ```rust,ignore
//! struct Relay { address: String }
//!
//! impl Instrument for Relay {
//!     fn address(&self) -> &str { &self.address }
//!     fn category(&self) -> InstrumentCategory { InstrumentCategory::Secondary }
//! }
//!
//! impl Secondary for Relay {}
//! ```

use crate::error::AppResult;
use anyhow::Result;
use async_trait::async_trait;

/// Address sentinel selecting a virtual (hardware-free) connection.
pub const VIRTUAL_ADDRESS: &str = "VIRTUAL";

/// Identification returned by instruments that do not override [`Instrument::idn`].
pub const DEFAULT_IDN: &str = "Default IDN function not implemented, please override in subclass";

// =============================================================================
// Instrument Category
// =============================================================================

/// Where an instrument sits in the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InstrumentCategory {
    /// Signal sources (AWGs, pulsers, calibrators)
    Generator,
    /// Measurement sinks (DMMs, lock-ins, oscilloscopes)
    Measurer,
    /// Neither generates nor measures (switches, relays, support supplies)
    Secondary,
    /// Not classified
    #[default]
    Other,
}

impl InstrumentCategory {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Generator => "Generators",
            Self::Measurer => "Measurers",
            Self::Secondary => "Secondary",
            Self::Other => "Other",
        }
    }
}

// =============================================================================
// Capability Traits
// =============================================================================

/// Capability: Identification
///
/// All an instrument is required to have is an address.
///
/// # Contract
/// - `address()` is fixed for the lifetime of the driver
/// - `idn()` has no side effects
pub trait Instrument: Send + Sync {
    /// Connection identifier (VISA resource, serial port, or `VIRTUAL`).
    fn address(&self) -> &str;

    /// Identification string.
    ///
    /// Drivers should override this; the default only says they did not.
    fn idn(&self) -> String {
        DEFAULT_IDN.to_string()
    }

    /// True when the address selects the virtual connection.
    fn is_virtual(&self) -> bool {
        self.address().eq_ignore_ascii_case(VIRTUAL_ADDRESS)
    }

    /// Taxonomy category for grouping.
    fn category(&self) -> InstrumentCategory {
        InstrumentCategory::Other
    }
}

/// Capability: Communication Channel
///
/// The channel an instrument talks through. Real implementations wrap VISA
/// or serial resources; virtual ones answer locally.
///
/// # Contract
/// - `open`/`close` are idempotent
/// - `query` = `write` followed by a read of the reply
pub trait Transport: Send + Sync {
    /// Transport-level identity (the resource name it was opened with).
    fn resource_name(&self) -> &str;

    /// Open the channel.
    fn open(&self) -> AppResult<()>;

    /// Close the channel.
    fn close(&self) -> AppResult<()>;

    /// Whether the channel is currently open.
    fn is_open(&self) -> bool;

    /// Send a command without reading a reply.
    fn write(&self, command: &str) -> AppResult<()>;

    /// Send a command and return the reply.
    fn query(&self, command: &str) -> AppResult<String>;

    /// Read one pending reply.
    fn read(&self) -> AppResult<String>;
}

/// Capability: Secondary Instrument
///
/// Reserves a place in the taxonomy for instruments that neither generate nor
/// measure a primary signal. At this level nothing is known about what the
/// instrument does, so the trait adds no operations; concrete drivers bring
/// their own transport and behaviour.
pub trait Secondary: Instrument {}

/// Capability: Scalar Readout
///
/// Devices that produce single scalar values (voltmeters, power meters,
/// temperature sensors).
///
/// # Contract
/// - `read()` performs a measurement and returns the value
/// - Units are device-specific (document in implementation)
#[async_trait]
pub trait Readable: Send + Sync {
    /// Read current value
    async fn read(&self) -> Result<f64>;
}

/// Simulation boundary: an external model exposing a magnetic field.
///
/// Virtual instruments only read from it; whoever owns the model mutates it.
pub trait FieldSample: Send + Sync {
    /// Present field in oersted.
    fn current_field(&self) -> f64;
}
