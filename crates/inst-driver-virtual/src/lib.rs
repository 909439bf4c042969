//! Virtual Instrument Drivers
//!
//! Hardware-free stand-ins for lab instruments. Every operation completes
//! immediately and none of them touch a bus, so these drivers run in CI and
//! in offline simulations.
//!
//! # Available Drivers
//!
//! - [`VirtualDmm`] - Digital multimeter whose voltage tracks an attached
//!   field-simulation sample, with a fixed fallback reading
//! - [`VirtualTransport`] - Communication channel that records commands and
//!   answers queries from a canned table
//! - [`MagneticSample`] - Shared AMR sample model read by virtual instruments
//!
//! # Driver Factory Pattern
//!
//! ```rust,ignore
//! use inst_driver_virtual::{register_all, FactoryRegistry};
//!
//! let registry = MyRegistry::default();
//! register_all(&registry);
//! ```

mod rng;
pub mod simulation;
pub mod transport;
mod virtual_dmm;

pub use rng::SimRng;
pub use simulation::{MagneticSample, DEFAULT_NOISE_FRACTION};
pub use transport::{VirtualTransport, UNKNOWN_QUERY_PREFIX};
pub use virtual_dmm::{
    VirtualDmm, VirtualDmmConfig, VirtualDmmFactory, FALLBACK_VOLTAGE, FIELD_PER_VOLT,
    VIRTUAL_DMM_IDN,
};

/// Force the linker to include this crate's driver factories.
#[inline(never)]
pub fn link() {
    std::hint::black_box(std::any::TypeId::of::<VirtualDmm>());
    std::hint::black_box(std::any::TypeId::of::<VirtualTransport>());
}

/// Register all virtual driver factories with a registry.
pub fn register_all(registry: &impl FactoryRegistry) {
    registry.register_factory(Box::new(VirtualDmmFactory));
}

/// Trait for registries that can accept driver factories.
///
/// Lets this crate feed any registry without depending on it.
pub trait FactoryRegistry {
    /// Register a driver factory.
    fn register_factory(&self, factory: Box<dyn inst_core::DriverFactory>);
}
