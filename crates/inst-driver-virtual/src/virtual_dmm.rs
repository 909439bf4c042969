//! Virtual digital multimeter.
//!
//! A drop-in, hardware-free DMM for tests and simulations. Voltage readings
//! come from an attached field-simulation sample when one is present and fall
//! back to a fixed value otherwise:
//!
//! - sample attached and alive: `current_field / FIELD_PER_VOLT`
//! - no sample: [`FALLBACK_VOLTAGE`]
//!
//! The sample is held as a weak reference. Whoever attaches it owns it; once
//! the owner drops it, reads quietly revert to the fallback.
//!
//! # Example
//!
//! ```rust,ignore
//! use inst_driver_virtual::{MagneticSample, VirtualDmm};
//! use inst_core::Multimeter;
//! use std::sync::Arc;
//!
//! let dmm = VirtualDmm::new();
//! assert_eq!(dmm.voltage(false), 0.0015);
//!
//! let sample = Arc::new(MagneticSample::default());
//! sample.set_field(5000.0);
//! dmm.attach_sample(&sample);
//! assert_eq!(dmm.get_voltage(false)?, 0.5);
//! ```

use crate::transport::VirtualTransport;
use anyhow::Result;
use async_trait::async_trait;
use futures::future::BoxFuture;
use inst_core::{
    AppResult, Capability, DeviceComponents, DeviceMetadata, DmmSettings, DriverFactory,
    FieldSample, Instrument, InstrumentCategory, InstrumentError, MeasurementMode, Multimeter,
    Readable, SenseFunction, SenseRange, Transport, WireMode, VIRTUAL_ADDRESS,
};
use parking_lot::RwLock;
use serde::Deserialize;
use std::sync::{Arc, Weak};

/// Identification string of the virtual DMM.
pub const VIRTUAL_DMM_IDN: &str = "Virtual DMM";

/// Reading returned when no sample is attached, in volts.
pub const FALLBACK_VOLTAGE: f64 = 0.0015;

/// Oe per volt of the field controller's analog input.
///
/// Must match the calibration used by the field-control side (1 V == 10000 Oe
/// on the reference setup). It is duplicated here, not read from there, so a
/// recalibrated controller will make virtual readings disagree silently.
pub const FIELD_PER_VOLT: f64 = 10_000.0;

const DRIVER_TYPE: &str = "virtual_dmm";

// =============================================================================
// VirtualDmmFactory - DriverFactory implementation
// =============================================================================

/// Configuration for the VirtualDmm driver.
///
/// `address` defaults to `VIRTUAL`; every other key is collected into
/// `options` and forwarded untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct VirtualDmmConfig {
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(flatten)]
    pub options: toml::Table,
}

fn default_address() -> String {
    VIRTUAL_ADDRESS.to_string()
}

impl Default for VirtualDmmConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            options: toml::Table::new(),
        }
    }
}

/// Factory for creating VirtualDmm instances.
pub struct VirtualDmmFactory;

/// Static capabilities for VirtualDmm
static VIRTUAL_DMM_CAPABILITIES: &[Capability] = &[
    Capability::Identifiable,
    Capability::Transport,
    Capability::Multimeter,
    Capability::Readable,
];

impl DriverFactory for VirtualDmmFactory {
    fn driver_type(&self) -> &'static str {
        DRIVER_TYPE
    }

    fn name(&self) -> &'static str {
        VIRTUAL_DMM_IDN
    }

    fn capabilities(&self) -> &'static [Capability] {
        VIRTUAL_DMM_CAPABILITIES
    }

    fn validate(&self, config: &toml::Value) -> Result<()> {
        let _: VirtualDmmConfig = config.clone().try_into()?;
        Ok(())
    }

    fn build(&self, config: toml::Value) -> BoxFuture<'static, Result<DeviceComponents>> {
        Box::pin(async move {
            let cfg: VirtualDmmConfig = config.try_into()?;

            let dmm = Arc::new(VirtualDmm::with_options(cfg.address, cfg.options));

            Ok(DeviceComponents::new()
                .with_category(InstrumentCategory::Measurer)
                .with_instrument(dmm.clone())
                .with_transport(dmm.clone())
                .with_multimeter(dmm.clone())
                .with_readable(dmm)
                .with_metadata(DeviceMetadata {
                    measurement_units: Some("V".to_string()),
                    simulated: true,
                }))
        })
    }
}

// =============================================================================
// VirtualDmm
// =============================================================================

/// Simulated digital multimeter.
///
/// Implements [`Instrument`], [`Transport`] and [`Multimeter`] directly; the
/// transport side delegates to an owned [`VirtualTransport`].
pub struct VirtualDmm {
    address: String,
    transport: VirtualTransport,
    options: toml::Table,
    settings: RwLock<DmmSettings>,
    mag_sample: RwLock<Option<Weak<dyn FieldSample>>>,
}

impl VirtualDmm {
    /// Virtual DMM on the `VIRTUAL` address with no options.
    pub fn new() -> Self {
        Self::with_options(VIRTUAL_ADDRESS, toml::Table::new())
    }

    /// Virtual DMM on a specific address.
    pub fn with_address(address: impl Into<String>) -> Self {
        Self::with_options(address, toml::Table::new())
    }

    /// Virtual DMM with extra configuration options.
    ///
    /// The transport is opened on `address` first, then the DMM state is set
    /// up with the same address. `options` are kept as given; this layer does
    /// not interpret or validate them.
    pub fn with_options(address: impl Into<String>, options: toml::Table) -> Self {
        let address = address.into();

        let transport = VirtualTransport::new_open(address.clone());

        if !options.is_empty() {
            tracing::debug!(
                address = %address,
                options = ?options.keys().collect::<Vec<_>>(),
                "VirtualDmm: forwarding unvalidated options"
            );
        }
        tracing::info!(address = %address, "VirtualDmm: created");

        Self {
            address,
            transport,
            options,
            settings: RwLock::new(DmmSettings::default()),
            mag_sample: RwLock::new(None),
        }
    }

    /// Options passed at construction.
    pub fn options(&self) -> &toml::Table {
        &self.options
    }

    /// Current measurement configuration.
    pub fn settings(&self) -> DmmSettings {
        *self.settings.read()
    }

    /// The owned virtual channel.
    pub fn virtual_transport(&self) -> &VirtualTransport {
        &self.transport
    }

    /// Link a field-simulation sample. Only a weak reference is kept.
    pub fn attach_sample<S>(&self, sample: &Arc<S>)
    where
        S: FieldSample + 'static,
    {
        let shared: Arc<dyn FieldSample> = sample.clone();
        *self.mag_sample.write() = Some(Arc::downgrade(&shared));
        tracing::debug!("VirtualDmm: sample attached");
    }

    /// Unlink the sample; subsequent reads use the fallback.
    pub fn detach_sample(&self) {
        if self.mag_sample.write().take().is_some() {
            tracing::debug!("VirtualDmm: sample detached");
        }
    }

    /// True while a sample is attached and still alive.
    pub fn has_sample(&self) -> bool {
        self.sample().is_some()
    }

    fn sample(&self) -> Option<Arc<dyn FieldSample>> {
        self.mag_sample.read().as_ref().and_then(Weak::upgrade)
    }

    /// Voltage reading in volts. Never fails.
    ///
    /// `ac` is accepted for contract compatibility but has no effect in either
    /// branch; AC simulation is not modelled.
    pub fn voltage(&self, ac: bool) -> f64 {
        let _ = ac;
        match self.sample() {
            Some(sample) => sample.current_field() / FIELD_PER_VOLT,
            None => FALLBACK_VOLTAGE,
        }
    }
}

impl Default for VirtualDmm {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VirtualDmm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualDmm")
            .field("address", &self.address)
            .field("settings", &self.settings())
            .field("has_sample", &self.has_sample())
            .finish()
    }
}

impl Instrument for VirtualDmm {
    fn address(&self) -> &str {
        &self.address
    }

    fn idn(&self) -> String {
        VIRTUAL_DMM_IDN.to_string()
    }

    fn category(&self) -> InstrumentCategory {
        InstrumentCategory::Measurer
    }
}

impl Transport for VirtualDmm {
    fn resource_name(&self) -> &str {
        self.transport.resource_name()
    }

    fn open(&self) -> AppResult<()> {
        self.transport.open()
    }

    fn close(&self) -> AppResult<()> {
        self.transport.close()
    }

    fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    fn write(&self, command: &str) -> AppResult<()> {
        self.transport.write(command)
    }

    fn query(&self, command: &str) -> AppResult<String> {
        self.transport.query(command)
    }

    fn read(&self) -> AppResult<String> {
        self.transport.read()
    }
}

impl Multimeter for VirtualDmm {
    fn set_sense_function(&self, function: SenseFunction) -> AppResult<()> {
        self.settings.write().sense_function = function;
        tracing::debug!(%function, "VirtualDmm: sense function set");
        Ok(())
    }

    fn set_measurement_mode(&self, mode: MeasurementMode) -> AppResult<()> {
        self.settings.write().measurement_mode = mode;
        tracing::debug!(%mode, "VirtualDmm: measurement mode set");
        Ok(())
    }

    fn set_wire_mode(&self, mode: WireMode) -> AppResult<()> {
        self.settings.write().wire_mode = mode;
        tracing::debug!(%mode, "VirtualDmm: wire mode set");
        Ok(())
    }

    fn set_sense_range(&self, range: Option<f64>, auto: bool) -> AppResult<()> {
        let new_range = match (auto, range) {
            (true, _) => SenseRange::Auto,
            (false, Some(value)) if value.is_finite() && value > 0.0 => SenseRange::Fixed(value),
            (false, Some(value)) => {
                return Err(InstrumentError::invalid_parameter(
                    DRIVER_TYPE,
                    format!("sense range must be a positive finite value, got {}", value),
                ))
            }
            (false, None) => {
                return Err(InstrumentError::invalid_parameter(
                    DRIVER_TYPE,
                    "a fixed sense range requires a value",
                ))
            }
        };
        self.settings.write().sense_range = new_range;
        tracing::debug!(range = ?new_range, "VirtualDmm: sense range set");
        Ok(())
    }

    fn set_integration_time(&self, nplc: f64) -> AppResult<()> {
        if !(nplc.is_finite() && nplc > 0.0) {
            return Err(InstrumentError::invalid_parameter(
                DRIVER_TYPE,
                format!("nplc must be a positive finite value, got {}", nplc),
            ));
        }
        self.settings.write().nplc = nplc;
        tracing::debug!(nplc, "VirtualDmm: integration time set");
        Ok(())
    }

    fn quick_read(&self) -> AppResult<f64> {
        let settings = self.settings();
        let operation = match settings.sense_function {
            SenseFunction::Voltage => {
                return Ok(self.voltage(settings.measurement_mode.is_ac()))
            }
            SenseFunction::Current => "quick_read(CURR)",
            SenseFunction::Resistance => "quick_read(RES)",
            SenseFunction::Diode => "quick_read(DIOD)",
            SenseFunction::Continuity => "quick_read(CONT)",
            SenseFunction::Capacitance => "quick_read(CAP)",
        };
        Err(InstrumentError::not_implemented(VIRTUAL_DMM_IDN, operation))
    }

    fn get_voltage(&self, ac: bool) -> AppResult<f64> {
        Ok(self.voltage(ac))
    }
}

#[async_trait]
impl Readable for VirtualDmm {
    /// Reading of the configured function (volts by default).
    async fn read(&self) -> Result<f64> {
        Ok(self.quick_read()?)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::MagneticSample;
    use tracing_test::traced_test;

    fn sample_at(field: f64) -> Arc<MagneticSample> {
        let sample = Arc::new(MagneticSample::default().with_noise_fraction(0.0));
        sample.set_field(field);
        sample
    }

    #[test]
    fn test_default_address_is_virtual() {
        let dmm = VirtualDmm::new();
        assert_eq!(dmm.address(), "VIRTUAL");
        assert!(dmm.is_virtual());
        assert!(Transport::is_open(&dmm));
        assert_eq!(dmm.resource_name(), "VIRTUAL");
    }

    #[test]
    fn test_idn_is_constant() {
        let dmm = VirtualDmm::new();
        assert_eq!(dmm.idn(), "Virtual DMM");
        dmm.get_voltage(true).unwrap();
        dmm.detach_sample();
        assert_eq!(dmm.idn(), "Virtual DMM");
    }

    #[test]
    fn test_fallback_without_sample() {
        let dmm = VirtualDmm::new();
        assert_eq!(dmm.get_voltage(false).unwrap(), 0.0015);
        assert_eq!(dmm.get_voltage(true).unwrap(), 0.0015);
    }

    #[test]
    fn test_sample_field_scaled() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(5000.0);
        dmm.attach_sample(&sample);

        assert!(dmm.has_sample());
        assert_eq!(dmm.get_voltage(false).unwrap(), 0.5);
    }

    #[test]
    fn test_ac_flag_has_no_effect() {
        let dmm = VirtualDmm::new();
        assert_eq!(dmm.voltage(true), dmm.voltage(false));

        let sample = sample_at(-1234.0);
        dmm.attach_sample(&sample);
        assert_eq!(dmm.voltage(true), dmm.voltage(false));
    }

    #[test]
    fn test_reads_follow_live_field() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(0.0);
        dmm.attach_sample(&sample);
        assert_eq!(dmm.voltage(false), 0.0);

        sample.set_field(1000.0);
        assert_eq!(dmm.voltage(false), 0.1);
    }

    #[test]
    fn test_detach_reverts_to_fallback() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(5000.0);
        dmm.attach_sample(&sample);
        dmm.detach_sample();

        assert!(!dmm.has_sample());
        assert_eq!(dmm.voltage(false), FALLBACK_VOLTAGE);
    }

    #[test]
    fn test_dropped_sample_reverts_to_fallback() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(5000.0);
        dmm.attach_sample(&sample);
        drop(sample);

        assert!(!dmm.has_sample());
        assert_eq!(dmm.voltage(false), FALLBACK_VOLTAGE);
    }

    #[test]
    fn test_unknown_options_are_kept_not_validated() {
        let mut options = toml::Table::new();
        options.insert("nplc".into(), toml::Value::Integer(10));
        options.insert("no_such_option".into(), toml::Value::Boolean(true));

        let dmm = VirtualDmm::with_options("GPIB0::22::INSTR", options);
        assert_eq!(dmm.address(), "GPIB0::22::INSTR");
        assert!(!dmm.is_virtual());
        assert_eq!(dmm.options().len(), 2);
        // Options are not interpreted.
        assert_eq!(dmm.settings().nplc, 1.0);
    }

    #[test]
    fn test_settings_update() {
        let dmm = VirtualDmm::new();
        dmm.set_sense_function(SenseFunction::Resistance).unwrap();
        dmm.set_measurement_mode(MeasurementMode::Ac).unwrap();
        dmm.set_wire_mode(WireMode::FourWire).unwrap();
        dmm.set_sense_range(Some(10.0), false).unwrap();
        dmm.set_integration_time(10.0).unwrap();

        let settings = dmm.settings();
        assert_eq!(settings.sense_function, SenseFunction::Resistance);
        assert_eq!(settings.measurement_mode, MeasurementMode::Ac);
        assert_eq!(settings.wire_mode, WireMode::FourWire);
        assert_eq!(settings.sense_range, SenseRange::Fixed(10.0));
        assert_eq!(settings.nplc, 10.0);

        dmm.set_sense_range(None, true).unwrap();
        assert_eq!(dmm.settings().sense_range, SenseRange::Auto);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let dmm = VirtualDmm::new();
        assert!(dmm.set_integration_time(0.0).is_err());
        assert!(dmm.set_integration_time(f64::NAN).is_err());
        assert!(dmm.set_sense_range(Some(-1.0), false).is_err());
        assert!(dmm.set_sense_range(None, false).is_err());
        assert_eq!(dmm.settings(), DmmSettings::default());
    }

    #[test]
    fn test_quick_read_voltage_and_unsupported() {
        let dmm = VirtualDmm::new();
        assert_eq!(dmm.quick_read().unwrap(), FALLBACK_VOLTAGE);

        dmm.set_sense_function(SenseFunction::Current).unwrap();
        assert!(matches!(
            dmm.quick_read(),
            Err(InstrumentError::NotImplemented { .. })
        ));
    }

    #[test]
    fn test_quick_read_names_each_unsimulated_function() {
        let dmm = VirtualDmm::new();
        for (function, operation) in [
            (SenseFunction::Current, "quick_read(CURR)"),
            (SenseFunction::Resistance, "quick_read(RES)"),
            (SenseFunction::Diode, "quick_read(DIOD)"),
            (SenseFunction::Continuity, "quick_read(CONT)"),
            (SenseFunction::Capacitance, "quick_read(CAP)"),
        ] {
            dmm.set_sense_function(function).unwrap();
            match dmm.quick_read() {
                Err(InstrumentError::NotImplemented { operation: op, .. }) => {
                    assert_eq!(op, operation)
                }
                other => panic!("unexpected result for {function}: {other:?}"),
            }
        }
    }

    #[test]
    fn test_constructed_transport_is_open() {
        let dmm = VirtualDmm::with_address("GPIB0::22::INSTR");
        assert!(dmm.virtual_transport().is_open());
        assert!(dmm.virtual_transport().history().is_empty());
    }

    #[test]
    fn test_current_and_resistance_not_simulated() {
        let dmm = VirtualDmm::new();
        let err = dmm.get_current(false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "'get_current' is not implemented for Virtual DMM"
        );
        assert!(dmm.get_resistance(true).is_err());
    }

    #[test]
    fn test_transport_delegation() {
        let dmm = VirtualDmm::new();
        dmm.virtual_transport().set_response("*IDN?", VIRTUAL_DMM_IDN);

        assert_eq!(dmm.query("*IDN?").unwrap(), "Virtual DMM");
        dmm.write("CONF:VOLT:DC").unwrap();
        assert_eq!(
            dmm.virtual_transport().history(),
            vec!["*IDN?", "CONF:VOLT:DC"]
        );

        Transport::close(&dmm).unwrap();
        assert!(!Transport::is_open(&dmm));
        // Closing the channel does not affect simulated readings.
        assert_eq!(dmm.voltage(false), FALLBACK_VOLTAGE);
    }

    #[tokio::test]
    async fn test_readable_reports_voltage() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(2500.0);
        dmm.attach_sample(&sample);

        let reading = Readable::read(&dmm).await.unwrap();
        assert_eq!(reading, 0.25);
    }

    #[tokio::test]
    async fn test_factory_creates_dmm() {
        let factory = VirtualDmmFactory;
        assert_eq!(factory.driver_type(), "virtual_dmm");
        assert_eq!(factory.name(), "Virtual DMM");

        let config = toml::Value::Table(toml::map::Map::new());
        let components = factory.build(config).await.unwrap();

        assert_eq!(
            components.capabilities(),
            vec![
                Capability::Identifiable,
                Capability::Transport,
                Capability::Multimeter,
                Capability::Readable,
            ]
        );
        let instrument = components.instrument.unwrap();
        assert_eq!(instrument.address(), "VIRTUAL");
        assert_eq!(instrument.idn(), "Virtual DMM");
        assert!(components.metadata.simulated);
    }

    #[tokio::test]
    async fn test_factory_forwards_unknown_options() {
        let factory = VirtualDmmFactory;
        let config: toml::Value = toml::from_str(
            r#"
            address = "virtual"
            range = "auto"
            made_up_flag = true
            "#,
        )
        .unwrap();

        factory.validate(&config).unwrap();
        let components = factory.build(config).await.unwrap();
        let dmm = components.multimeter.unwrap();
        assert_eq!(dmm.address(), "virtual");
        assert_eq!(dmm.get_voltage(false).unwrap(), FALLBACK_VOLTAGE);
    }

    #[test]
    #[traced_test]
    fn test_construction_logs_forwarded_options() {
        let mut options = toml::Table::new();
        options.insert("autozero".into(), toml::Value::Boolean(false));
        let _dmm = VirtualDmm::with_options("VIRTUAL", options);

        assert!(logs_contain("Virtual transport opened"));
        assert!(logs_contain("forwarding unvalidated options"));
        assert!(logs_contain("VirtualDmm: created"));
    }

    #[test]
    #[traced_test]
    fn test_sample_link_logged() {
        let dmm = VirtualDmm::new();
        let sample = sample_at(1.0);
        dmm.attach_sample(&sample);
        dmm.detach_sample();

        assert!(logs_contain("sample attached"));
        assert!(logs_contain("sample detached"));
    }

    #[test]
    fn test_factory_rejects_non_table() {
        let factory = VirtualDmmFactory;
        assert!(factory.validate(&toml::Value::Integer(3)).is_err());
    }
}
