//! Digital multimeter contract.
//!
//! A DMM performs measurements but does not source power. [`Multimeter`]
//! lists the operations a DMM driver may provide; every operation has a
//! default that returns [`InstrumentError::NotImplemented`], so a driver only
//! overrides what its hardware (or simulation) supports.

use crate::capabilities::Instrument;
use crate::error::{AppResult, InstrumentError};
use std::fmt;
use std::str::FromStr;

/// Base measurement function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SenseFunction {
    #[default]
    Voltage,
    Current,
    Resistance,
    Diode,
    Continuity,
    Capacitance,
}

impl SenseFunction {
    /// SCPI mnemonic
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Voltage => "VOLT",
            Self::Current => "CURR",
            Self::Resistance => "RES",
            Self::Diode => "DIOD",
            Self::Continuity => "CONT",
            Self::Capacitance => "CAP",
        }
    }

    /// Every function a generic DMM is expected to offer.
    pub fn all() -> &'static [SenseFunction] {
        &[
            Self::Voltage,
            Self::Current,
            Self::Resistance,
            Self::Diode,
            Self::Continuity,
            Self::Capacitance,
        ]
    }
}

/// Signal coupling for voltage and current functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MeasurementMode {
    #[default]
    Dc,
    Ac,
}

impl MeasurementMode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::Dc => "DC",
            Self::Ac => "AC",
        }
    }

    pub fn is_ac(&self) -> bool {
        matches!(self, Self::Ac)
    }
}

/// Wiring used for resistance measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WireMode {
    #[default]
    TwoWire,
    FourWire,
}

impl WireMode {
    pub fn mnemonic(&self) -> &'static str {
        match self {
            Self::TwoWire => "2W",
            Self::FourWire => "4W",
        }
    }
}

/// Measurement range for the active function.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SenseRange {
    #[default]
    Auto,
    Fixed(f64),
}

/// Error returned when a mnemonic does not name a known setting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {setting} '{value}'")]
pub struct ParseSettingError {
    pub setting: &'static str,
    pub value: String,
}

impl FromStr for SenseFunction {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.mnemonic().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseSettingError {
                setting: "sense function",
                value: s.to_string(),
            })
    }
}

impl FromStr for MeasurementMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DC" => Ok(Self::Dc),
            "AC" => Ok(Self::Ac),
            _ => Err(ParseSettingError {
                setting: "measurement mode",
                value: s.to_string(),
            }),
        }
    }
}

impl FromStr for WireMode {
    type Err = ParseSettingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "2W" => Ok(Self::TwoWire),
            "4W" => Ok(Self::FourWire),
            _ => Err(ParseSettingError {
                setting: "wire mode",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for SenseFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl fmt::Display for WireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

/// Snapshot of a DMM's measurement configuration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DmmSettings {
    pub sense_function: SenseFunction,
    pub measurement_mode: MeasurementMode,
    pub wire_mode: WireMode,
    pub sense_range: SenseRange,
    /// Integration time in power-line cycles
    pub nplc: f64,
}

impl Default for DmmSettings {
    fn default() -> Self {
        Self {
            sense_function: SenseFunction::Voltage,
            measurement_mode: MeasurementMode::Dc,
            wire_mode: WireMode::TwoWire,
            sense_range: SenseRange::Auto,
            nplc: 1.0,
        }
    }
}

/// Capability: Digital Multimeter
///
/// # Contract
/// - Voltages in volts, currents in amps, resistances in ohms
/// - Configuration setters affect subsequent reads only
/// - Unsupported operations return [`InstrumentError::NotImplemented`]
pub trait Multimeter: Instrument {
    /// Select the base measurement function.
    fn set_sense_function(&self, _function: SenseFunction) -> AppResult<()> {
        Err(self.unsupported("set_sense_function"))
    }

    /// Select AC or DC coupling for voltage/current.
    fn set_measurement_mode(&self, _mode: MeasurementMode) -> AppResult<()> {
        Err(self.unsupported("set_measurement_mode"))
    }

    /// Select 2-wire or 4-wire resistance.
    fn set_wire_mode(&self, _mode: WireMode) -> AppResult<()> {
        Err(self.unsupported("set_wire_mode"))
    }

    /// Set the range for the active function. `auto = true` ignores `range`.
    fn set_sense_range(&self, _range: Option<f64>, _auto: bool) -> AppResult<()> {
        Err(self.unsupported("set_sense_range"))
    }

    /// Set the integration time in power-line cycles.
    fn set_integration_time(&self, _nplc: f64) -> AppResult<()> {
        Err(self.unsupported("set_integration_time"))
    }

    /// Trigger and return one reading of the configured function.
    fn quick_read(&self) -> AppResult<f64> {
        Err(self.unsupported("quick_read"))
    }

    /// Measure a voltage. `ac` selects AC coupling.
    fn get_voltage(&self, _ac: bool) -> AppResult<f64> {
        Err(self.unsupported("get_voltage"))
    }

    /// Measure a current. `ac` selects AC coupling.
    fn get_current(&self, _ac: bool) -> AppResult<f64> {
        Err(self.unsupported("get_current"))
    }

    /// Measure a resistance. `four_wire` selects 4-wire sensing.
    fn get_resistance(&self, _four_wire: bool) -> AppResult<f64> {
        Err(self.unsupported("get_resistance"))
    }

    #[doc(hidden)]
    fn unsupported(&self, operation: &'static str) -> InstrumentError {
        InstrumentError::not_implemented(self.idn(), operation)
    }
}
