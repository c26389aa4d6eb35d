// =============================================================================
// Seeded randomness — every Genetic Engine draw goes through here
// =============================================================================
//
// The Genetic Engine never reaches for a global random source. Every entry
// point that needs randomness takes an `&mut Rng` so a fixed seed reproduces
// an entire run bit-for-bit in tests, and so tests never share RNG state.
//
// =============================================================================

use rand::Rng as _;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uuid::Uuid;

/// Seedable generator injected into every Genetic Engine operation.
///
/// Wraps `ChaCha8Rng` rather than exposing it directly so callers depend on
/// this crate's surface, not on `rand_chacha`.
pub struct Rng(ChaCha8Rng);

impl Rng {
    /// Build a generator from an explicit seed. Use in tests for
    /// reproducible cycles.
    pub fn from_seed(seed: u64) -> Self {
        Self(ChaCha8Rng::seed_from_u64(seed))
    }

    /// Build a generator seeded from OS entropy. Used outside tests.
    pub fn from_entropy() -> Self {
        Self(ChaCha8Rng::from_entropy())
    }

    /// Uniform float in `[lo, hi)`. Returns `lo` if `hi <= lo`.
    pub fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        if hi <= lo {
            return lo;
        }
        self.0.gen_range(lo..hi)
    }

    /// Uniform integer in `[lo, hi]` inclusive.
    pub fn uniform_usize(&mut self, lo: usize, hi: usize) -> usize {
        if hi <= lo {
            return lo;
        }
        self.0.gen_range(lo..=hi)
    }

    /// `true` with probability `p` (clamped to `[0,1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.0.gen::<f64>() < p.clamp(0.0, 1.0)
    }

    /// Pick a uniformly random element from a non-empty slice.
    pub fn choose<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let idx = self.uniform_usize(0, items.len() - 1);
        items.get(idx)
    }

    /// Fisher-Yates shuffle in place.
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.uniform_usize(0, i);
            items.swap(i, j);
        }
    }

    /// Draw a v4 UUID through this generator rather than the OS, so that a
    /// seeded run reproduces genome ids bit-for-bit too.
    pub fn uuid(&mut self) -> Uuid {
        let mut bytes = [0u8; 16];
        self.0.fill(&mut bytes);
        uuid::Builder::from_random_bytes(bytes).into_uuid()
    }
}

/// Clamp `v` into `[lo, hi]`, tolerating an inverted range.
pub fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    let (lo, hi) = if lo <= hi { (lo, hi) } else { (hi, lo) };
    v.max(lo).min(hi)
}

/// Perturb `v` by a uniform factor in `(1 - spread, 1 + spread)`, then clamp
/// into the field's documented envelope. This is the "mutate-by-factor"
/// idiom used by every mutable scalar gene.
pub fn mutate_by_factor(rng: &mut Rng, v: f64, spread: f64, lo: f64, hi: f64) -> f64 {
    let factor = 1.0 + rng.uniform(-spread, spread);
    clamp(v * factor, lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_reproduces_same_sequence() {
        let mut a = Rng::from_seed(42);
        let mut b = Rng::from_seed(42);
        let seq_a: Vec<f64> = (0..10).map(|_| a.uniform(0.0, 1.0)).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.uniform(0.0, 1.0)).collect();
        assert_eq!(seq_a, seq_b);
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = Rng::from_seed(1);
        let mut b = Rng::from_seed(2);
        let seq_a: Vec<f64> = (0..10).map(|_| a.uniform(0.0, 1.0)).collect();
        let seq_b: Vec<f64> = (0..10).map(|_| b.uniform(0.0, 1.0)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn clamp_respects_bounds() {
        assert_eq!(clamp(5.0, 0.0, 1.0), 1.0);
        assert_eq!(clamp(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(clamp(0.5, 0.0, 1.0), 0.5);
    }

    #[test]
    fn mutate_by_factor_zero_spread_is_identity() {
        let mut rng = Rng::from_seed(7);
        let v = mutate_by_factor(&mut rng, 3.0, 0.0, 0.0, 10.0);
        assert!((v - 3.0).abs() < 1e-9);
    }

    #[test]
    fn uuid_is_reproducible_from_seed() {
        let mut a = Rng::from_seed(9);
        let mut b = Rng::from_seed(9);
        assert_eq!(a.uuid(), b.uuid());
    }

    #[test]
    fn chance_zero_never_fires_chance_one_always_fires() {
        let mut rng = Rng::from_seed(3);
        for _ in 0..50 {
            assert!(!rng.chance(0.0));
        }
        for _ in 0..50 {
            assert!(rng.chance(1.0));
        }
    }
}
