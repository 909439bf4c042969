//! Seeded RNG wrapper for reproducible simulation noise.

use parking_lot::Mutex;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seeded random number generator shared behind `&self`.
pub struct SimRng {
    inner: Mutex<ChaCha8Rng>,
}

impl SimRng {
    /// Create a new RNG with optional seed.
    /// If seed is None, uses a random seed from the OS.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            inner: Mutex::new(rng),
        }
    }

    /// Generate a random f64 value in the range [0.0, 1.0)
    pub fn next_f64(&self) -> f64 {
        self.inner.lock().gen()
    }

    /// Symmetric noise in `[-scale, scale)`.
    ///
    /// Zero, negative or non-finite scales yield exactly 0.0.
    pub fn noise(&self, scale: f64) -> f64 {
        if !scale.is_finite() || scale <= 0.0 {
            return 0.0;
        }
        self.inner.lock().gen_range(-scale..scale)
    }
}

impl Default for SimRng {
    fn default() -> Self {
        Self::new(None)
    }
}

impl std::fmt::Debug for SimRng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimRng")
            .field("inner", &"<Mutex<ChaCha8Rng>>")
            .finish()
    }
}
