//! # Lab Instruments
//!
//! Hardware-free instrument drivers behind capability traits, plus the
//! configuration and logging needed to run them from a config file.
//!
//! ## Crate Structure
//!
//! - **[`inst_core`]**: capability traits
//!   (`Instrument`, `Transport`, `Multimeter`, `Secondary`), error types and
//!   driver-factory plumbing.
//! - **[`inst_driver_virtual`]**: the virtual DMM,
//!   the virtual transport and the magnetic sample model.
//! - **`config`**: figment-based configuration (TOML file + `LAB_INST_`
//!   environment overrides).
//! - **`logging`**: tracing subscriber setup.
//! - **`registry`**: driver type to factory lookup.
//!
//! ## Example
//!
//! ```no_run
//! use lab_instruments::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = LabConfig::load_from("config/lab.toml")?;
//! lab_instruments::logging::init_from_config(&config).map_err(anyhow::Error::msg)?;
//!
//! let device = lab_instruments::connect(&config.instrument).await?;
//! if let Some(dmm) = device.multimeter {
//!     println!("{} V", dmm.get_voltage(false)?);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod logging;
pub mod registry;

pub use inst_core;
pub use inst_driver_virtual;

use anyhow::Result;
use config::InstrumentConfig;
use inst_core::DeviceComponents;
use registry::DriverRegistry;

/// Commonly used types.
pub mod prelude {
    pub use crate::config::{InstrumentConfig, LabConfig};
    pub use crate::registry::DriverRegistry;
    pub use inst_core::{
        AppResult, DeviceComponents, Instrument, InstrumentCategory, InstrumentError, Multimeter,
        Readable, Secondary, Transport,
    };
    pub use inst_driver_virtual::{MagneticSample, VirtualDmm};
}

/// Driver types that [`connect`] can build.
pub fn available_drivers() -> Vec<&'static str> {
    DriverRegistry::with_virtual_drivers().driver_types()
}

/// Build one device from its configuration using the built-in drivers.
pub async fn connect(instrument: &InstrumentConfig) -> Result<DeviceComponents> {
    DriverRegistry::with_virtual_drivers().connect(instrument).await
}
