//! Magnetic sample model for synthetic magneto-transport data.
//!
//! The sample is shared between virtual instruments: a field controller or a
//! rotation stage mutates it, a virtual DMM or lock-in reads it. State lives
//! behind a lock so every handle can be an `Arc<MagneticSample>`.
//!
//! Resistance follows the simplified anisotropic magnetoresistance (AMR) law
//!
//! ```text
//! R(θ) = R⊥ + (R∥ − R⊥) · cos²(θ − φ)
//! R⊥   = r_base
//! R∥   = r_base · (1 + amr_ratio)
//! ```
//!
//! plus a small noise term.

use crate::rng::SimRng;
use inst_core::FieldSample;
use parking_lot::RwLock;

/// Default relative noise on resistance readings.
pub const DEFAULT_NOISE_FRACTION: f64 = 1e-4;

/// Scale from ohms to the lock-in voltage range (~100 µV for 100 Ω).
const VOLTS_PER_OHM: f64 = 1e-6;

#[derive(Debug, Clone, Copy, Default)]
struct SampleState {
    /// degrees
    current_angle: f64,
    /// Oe
    current_field: f64,
}

/// Simulated magnetic thin-film sample.
#[derive(Debug)]
pub struct MagneticSample {
    name: String,
    r_base: f64,
    amr_ratio: f64,
    phi_offset: f64,
    noise_fraction: f64,
    state: RwLock<SampleState>,
    rng: SimRng,
}

impl MagneticSample {
    /// Create a sample.
    ///
    /// # Arguments
    /// * `r_base` - Resistance perpendicular to the magnetisation, in ohms
    /// * `amr_ratio` - (R∥ − R⊥) / R⊥
    /// * `phi_offset` - Angle offset in degrees
    pub fn new(r_base: f64, amr_ratio: f64, phi_offset: f64) -> Self {
        Self {
            name: "virtual_magnetic_sample".to_string(),
            r_base,
            amr_ratio,
            phi_offset,
            noise_fraction: DEFAULT_NOISE_FRACTION,
            state: RwLock::new(SampleState::default()),
            rng: SimRng::default(),
        }
    }

    /// Override the relative noise level. `0.0` makes readings exact.
    ///
    /// Negative or non-finite fractions are treated as `0.0`.
    pub fn with_noise_fraction(mut self, fraction: f64) -> Self {
        self.noise_fraction = if fraction.is_finite() {
            fraction.max(0.0)
        } else {
            0.0
        };
        self
    }

    /// Seed the noise generator for reproducible runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimRng::new(Some(seed));
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_field(&self, field_oe: f64) {
        self.state.write().current_field = field_oe;
    }

    pub fn current_field(&self) -> f64 {
        self.state.read().current_field
    }

    pub fn set_angle(&self, degrees: f64) {
        self.state.write().current_angle = degrees;
    }

    /// Rotate by `delta` degrees (negative rotates backwards).
    pub fn rotate_by(&self, delta: f64) {
        self.state.write().current_angle += delta;
    }

    pub fn current_angle(&self) -> f64 {
        self.state.read().current_angle
    }

    /// Return to the 0° home position.
    pub fn reset_angle(&self) {
        self.set_angle(0.0);
    }

    /// Resistance at `angle` degrees, or at the current angle when `None`.
    ///
    /// The field does not enter this model; only the angle between current
    /// and magnetisation does.
    pub fn resistance_at(&self, angle: Option<f64>) -> f64 {
        let theta = angle.unwrap_or_else(|| self.current_angle()).to_radians();
        let phi = self.phi_offset.to_radians();

        let r_perp = self.r_base;
        let r_par = self.r_base * (1.0 + self.amr_ratio);
        let resistance = r_perp + (r_par - r_perp) * (theta - phi).cos().powi(2);

        resistance + self.rng.noise(self.r_base * self.noise_fraction)
    }

    /// Resistance at the current angle.
    pub fn resistance(&self) -> f64 {
        self.resistance_at(None)
    }

    /// Lock-in style voltage response, proportional to resistance.
    pub fn voltage_response(&self) -> f64 {
        self.resistance() * VOLTS_PER_OHM
    }
}

impl Default for MagneticSample {
    fn default() -> Self {
        Self::new(100.0, 0.02, 0.0)
    }
}

impl FieldSample for MagneticSample {
    fn current_field(&self) -> f64 {
        MagneticSample::current_field(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> MagneticSample {
        MagneticSample::default().with_noise_fraction(0.0)
    }

    #[test]
    fn test_defaults() {
        let sample = MagneticSample::default();
        assert_eq!(sample.name(), "virtual_magnetic_sample");
        assert_eq!(sample.current_field(), 0.0);
        assert_eq!(sample.current_angle(), 0.0);
    }

    #[test]
    fn test_amr_extremes() {
        let sample = quiet();
        assert!((sample.resistance_at(Some(0.0)) - 102.0).abs() < 1e-9);
        assert!((sample.resistance_at(Some(90.0)) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_phi_offset_shifts_maximum() {
        let sample = MagneticSample::new(50.0, 0.1, 30.0).with_noise_fraction(0.0);
        assert!((sample.resistance_at(Some(30.0)) - 55.0).abs() < 1e-9);
        assert!((sample.resistance_at(Some(120.0)) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rotation_tracks_angle() {
        let sample = quiet();
        sample.rotate_by(45.0);
        sample.rotate_by(-15.0);
        assert!((sample.current_angle() - 30.0).abs() < 1e-12);

        sample.reset_angle();
        assert_eq!(sample.current_angle(), 0.0);
    }

    #[test]
    fn test_noise_stays_small() {
        let sample = MagneticSample::default().with_seed(42);
        for _ in 0..100 {
            let r = sample.resistance_at(Some(0.0));
            assert!((r - 102.0).abs() <= 100.0 * DEFAULT_NOISE_FRACTION + 1e-9);
        }
    }

    #[test]
    fn test_non_finite_parameters_do_not_panic() {
        let sample = MagneticSample::default().with_noise_fraction(f64::INFINITY);
        assert!((sample.resistance_at(Some(0.0)) - 102.0).abs() < 1e-9);

        let sample = MagneticSample::default().with_noise_fraction(f64::NAN);
        assert!((sample.resistance_at(Some(90.0)) - 100.0).abs() < 1e-9);

        let sample = MagneticSample::new(f64::NAN, 0.02, 0.0);
        assert!(sample.resistance().is_nan());

        let sample = MagneticSample::new(f64::INFINITY, 0.02, 0.0);
        assert!(!sample.resistance().is_finite());
    }

    #[test]
    fn test_voltage_response_scales_resistance() {
        let sample = quiet();
        sample.set_angle(90.0);
        assert!((sample.voltage_response() - 100.0e-6).abs() < 1e-15);
    }

    #[test]
    fn test_field_sample_impl() {
        let sample = quiet();
        sample.set_field(2500.0);
        let field: &dyn FieldSample = &sample;
        assert_eq!(field.current_field(), 2500.0);
    }
}
