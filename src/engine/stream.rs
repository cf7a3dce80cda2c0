//! Seeded pseudo-random stream and the polarizing transform.
//!
//! A seed string is digested with BLAKE3 and the 32-byte digest keys a
//! ChaCha8 generator. Both are portable, so the same seed yields the same
//! sequence on every platform and every run.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Deterministic float source keyed by a seed string.
#[derive(Debug, Clone)]
pub struct SeededStream {
    rng: ChaCha8Rng,
}

impl SeededStream {
    pub fn new(seed: &str) -> Self {
        let digest = blake3::hash(seed.as_bytes());
        Self {
            rng: ChaCha8Rng::from_seed(*digest.as_bytes()),
        }
    }

    /// Next draw in the half-open interval [0, 1).
    pub fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Next integer in `0..n`, computed as `floor(next_f64() * n)`.
    ///
    /// Returns 0 when `n` is 0.
    pub fn next_below(&mut self, n: u32) -> u32 {
        if n == 0 {
            return 0;
        }
        let v = (self.next_f64() * f64::from(n)).floor() as u32;
        v.min(n - 1)
    }

    /// Draw one value and polarize it.
    pub fn next_polarized(&mut self) -> u8 {
        polarize(self.next_f64())
    }
}

/// Map a uniform draw in [0, 1) to a bimodal score in [0, 100).
///
/// Lower half: `floor((1 - (1 - 2r)^3) * 40)`, landing in [0, 40).
/// Upper half: `floor(60 + sqrt(2r - 1) * 40)`, landing in [60, 100).
pub fn polarize(r: f64) -> u8 {
    let r = if r.is_nan() { 0.0 } else { r.clamp(0.0, 1.0) };
    let value = if r < 0.5 {
        ((1.0 - (1.0 - 2.0 * r).powi(3)) * 40.0).floor()
    } else {
        (60.0 + (2.0 * r - 1.0).sqrt() * 40.0).floor()
    };
    // 60 + 40 * (1 - ulp) can round up to exactly 100.
    (value as u8).min(99)
}
