//! `inst-core`
//!
//! Core trait definitions and types for lab instrument drivers.
//!
//! Drivers are described by the capabilities they implement rather than by a
//! class hierarchy:
//!
//! - [`capabilities::Instrument`]: address and identification
//! - [`capabilities::Transport`]: the communication channel
//! - [`multimeter::Multimeter`]: DMM measurements
//! - [`capabilities::Secondary`]: taxonomy slot for support equipment
//! - [`capabilities::Readable`]: async scalar readout
//!
//! [`driver::DriverFactory`] builds a driver from a TOML value and hands back
//! its capabilities as [`driver::DeviceComponents`].

pub mod capabilities;
pub mod driver;
pub mod error;
pub mod multimeter;

pub use capabilities::{
    FieldSample, Instrument, InstrumentCategory, Readable, Secondary, Transport, DEFAULT_IDN,
    VIRTUAL_ADDRESS,
};
pub use driver::{Capability, DeviceComponents, DeviceMetadata, DriverFactory};
pub use error::{AppResult, DriverError, DriverErrorKind, InstrumentError};
pub use multimeter::{DmmSettings, MeasurementMode, Multimeter, SenseFunction, SenseRange, WireMode};
