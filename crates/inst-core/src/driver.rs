//! Driver Factory and Component Types
//!
//! Drivers implement [`DriverFactory`] so an instrument can be created from a
//! configuration value instead of a hard-coded constructor.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │  [instrument] table from the config file (toml::Value)   │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  DriverFactory::validate() → DriverFactory::build()      │
//! └──────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌──────────────────────────────────────────────────────────┐
//! │  DeviceComponents { instrument, transport, multimeter,   │
//! │                     readable, ... }                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example: Implementing a Driver Factory
//!
//! ```rust,ignore
//! pub struct VirtualDmmFactory;
//!
//! impl DriverFactory for VirtualDmmFactory {
//!     fn driver_type(&self) -> &'static str { "virtual_dmm" }
//!     fn name(&self) -> &'static str { "Virtual DMM" }
//!
//!     fn validate(&self, config: &toml::Value) -> anyhow::Result<()> {
//!         let _: VirtualDmmConfig = config.clone().try_into()?;
//!         Ok(())
//!     }
//!
//!     fn build(&self, config: toml::Value) -> BoxFuture<'static, anyhow::Result<DeviceComponents>> {
//!         Box::pin(async move {
//!             let cfg: VirtualDmmConfig = config.try_into()?;
//!             let dmm = Arc::new(VirtualDmm::with_options(cfg.address, cfg.options));
//!             Ok(DeviceComponents::new()
//!                 .with_instrument(dmm.clone())
//!                 .with_multimeter(dmm))
//!         })
//!     }
//! }
//! ```

use crate::capabilities::{Instrument, InstrumentCategory, Readable, Transport};
use crate::multimeter::Multimeter;
use anyhow::Result;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// =============================================================================
// Capability Enum (Runtime Introspection)
// =============================================================================

/// Runtime capability flags for device introspection.
///
/// Mirrors the capability traits as an enum for easy matching and listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Has an address and identification string
    /// Corresponds to [`crate::capabilities::Instrument`]
    Identifiable,

    /// Owns a communication channel
    /// Corresponds to [`crate::capabilities::Transport`]
    Transport,

    /// Digital multimeter measurements
    /// Corresponds to [`crate::multimeter::Multimeter`]
    Multimeter,

    /// Can read scalar values
    /// Corresponds to [`crate::capabilities::Readable`]
    Readable,
}

impl Capability {
    /// Human-readable name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Identifiable => "Identifiable",
            Self::Transport => "Transport",
            Self::Multimeter => "Multimeter",
            Self::Readable => "Readable",
        }
    }
}

// =============================================================================
// Device Components (Capability Bag)
// =============================================================================

/// Container for capability trait objects returned by drivers.
///
/// Each capability is stored separately so callers get compile-time typed
/// access without downcasting, and a driver only fills in what it implements.
#[derive(Default)]
pub struct DeviceComponents {
    /// Taxonomy category for grouping
    pub category: Option<InstrumentCategory>,

    /// Identification (every driver should set this)
    pub instrument: Option<Arc<dyn Instrument>>,

    /// Communication channel
    pub transport: Option<Arc<dyn Transport>>,

    /// DMM measurements
    pub multimeter: Option<Arc<dyn Multimeter>>,

    /// Scalar readout
    pub readable: Option<Arc<dyn Readable>>,

    /// Capability-specific metadata (units, etc.)
    pub metadata: DeviceMetadata,
}

impl DeviceComponents {
    /// Create a new empty DeviceComponents
    pub fn new() -> Self {
        Self::default()
    }

    /// Get list of capabilities this device supports
    pub fn capabilities(&self) -> Vec<Capability> {
        let mut caps = Vec::new();

        if self.instrument.is_some() {
            caps.push(Capability::Identifiable);
        }
        if self.transport.is_some() {
            caps.push(Capability::Transport);
        }
        if self.multimeter.is_some() {
            caps.push(Capability::Multimeter);
        }
        if self.readable.is_some() {
            caps.push(Capability::Readable);
        }

        caps
    }

    // Builder methods

    /// Set device category
    pub fn with_category(mut self, category: InstrumentCategory) -> Self {
        self.category = Some(category);
        self
    }

    /// Set Instrument implementation
    pub fn with_instrument(mut self, i: Arc<dyn Instrument>) -> Self {
        self.instrument = Some(i);
        self
    }

    /// Set Transport implementation
    pub fn with_transport(mut self, t: Arc<dyn Transport>) -> Self {
        self.transport = Some(t);
        self
    }

    /// Set Multimeter implementation
    pub fn with_multimeter(mut self, m: Arc<dyn Multimeter>) -> Self {
        self.multimeter = Some(m);
        self
    }

    /// Set Readable implementation
    pub fn with_readable(mut self, r: Arc<dyn Readable>) -> Self {
        self.readable = Some(r);
        self
    }

    /// Set device metadata
    pub fn with_metadata(mut self, metadata: DeviceMetadata) -> Self {
        self.metadata = metadata;
        self
    }
}

// =============================================================================
// Device Metadata
// =============================================================================

/// Extra information not captured by the trait objects themselves.
#[derive(Debug, Clone, Default)]
pub struct DeviceMetadata {
    /// For Readable devices: measurement units (e.g. "V")
    pub measurement_units: Option<String>,

    /// True when no physical hardware backs the device
    pub simulated: bool,
}

// =============================================================================
// Driver Factory Trait
// =============================================================================

/// Trait for driver factories that create device instances.
///
/// The factory is responsible for:
///
/// 1. Declaring what driver type it handles (matching the TOML `type` field)
/// 2. Validating configuration before instantiation
/// 3. Creating the driver and returning its capabilities
///
/// Factories must not hold mutable state across builds.
pub trait DriverFactory: Send + Sync + 'static {
    /// Driver type name used in the TOML config `type` field.
    fn driver_type(&self) -> &'static str;

    /// Human-readable name for documentation and error messages.
    fn name(&self) -> &'static str;

    /// List of capabilities this driver type provides.
    fn capabilities(&self) -> &'static [Capability] {
        &[]
    }

    /// Validate configuration without instantiating.
    fn validate(&self, config: &toml::Value) -> Result<()>;

    /// Instantiate the driver and return its capabilities.
    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<DeviceComponents>>;
}
