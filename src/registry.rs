//! Driver registry.
//!
//! Maps the `type` field of an instrument configuration to the
//! [`DriverFactory`] that builds it.
//!
//! ```rust,ignore
//! let registry = DriverRegistry::with_virtual_drivers();
//! let components = registry.connect(&InstrumentConfig::new("virtual_dmm")).await?;
//! ```

use crate::config::InstrumentConfig;
use anyhow::Result;
use inst_core::{DeviceComponents, DriverFactory, InstrumentError};
use inst_driver_virtual::FactoryRegistry;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registry of driver factories keyed by driver type.
#[derive(Default)]
pub struct DriverRegistry {
    factories: RwLock<BTreeMap<&'static str, Arc<dyn DriverFactory>>>,
}

impl DriverRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with every virtual driver.
    pub fn with_virtual_drivers() -> Self {
        inst_driver_virtual::link();
        let registry = Self::new();
        inst_driver_virtual::register_all(&registry);
        registry
    }

    /// Registered driver types, sorted.
    pub fn driver_types(&self) -> Vec<&'static str> {
        self.factories.read().keys().copied().collect()
    }

    /// Factory for `driver_type`, if registered.
    pub fn factory(&self, driver_type: &str) -> Option<Arc<dyn DriverFactory>> {
        self.factories.read().get(driver_type).cloned()
    }

    /// Validate the instrument configuration and build the device.
    pub async fn connect(&self, instrument: &InstrumentConfig) -> Result<DeviceComponents> {
        let factory = self.factory(&instrument.r#type).ok_or_else(|| {
            InstrumentError::Configuration(format!(
                "unknown instrument type '{}' (available: {})",
                instrument.r#type,
                self.driver_types().join(", ")
            ))
        })?;

        let config = instrument.to_driver_config();
        factory.validate(&config)?;

        tracing::info!(
            driver = factory.driver_type(),
            address = %instrument.address,
            "connecting instrument"
        );
        factory.build(config).await
    }
}

impl FactoryRegistry for DriverRegistry {
    fn register_factory(&self, factory: Box<dyn DriverFactory>) {
        let driver_type = factory.driver_type();
        tracing::debug!(driver_type, "registering driver factory");
        self.factories.write().insert(driver_type, Arc::from(factory));
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("driver_types", &self.driver_types())
            .finish()
    }
}
