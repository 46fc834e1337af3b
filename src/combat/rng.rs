//! Random sources for combat simulation.
//!
//! Randomness is an explicit capability passed into every simulation call; there
//! is no process-wide generator. [Rng] is a fast SplitMix64 stream: same seed,
//! same sequence. Not cryptographically secure.

const SPLITMIX64_GOLDEN: u64 = 0x9e3779b97f4a7c15;
const SPLITMIX64_M1: u64 = 0xbf58476d1ce4e5b9;
const SPLITMIX64_M2: u64 = 0x94d049bb133111eb;

/// 2^-53, maps the top 53 bits of a u64 onto [0, 1).
const UNIT_SCALE: f64 = 1.0 / (1u64 << 53) as f64;

/// Uniform random source injected into simulations.
pub trait RandomSource {
    fn next_u64(&mut self) -> u64;

    /// Next value uniformly distributed over `[0, 1)`.
    #[inline]
    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * UNIT_SCALE
    }

    /// Derive an independent child stream. Used to hand one stream to each
    /// parallel batch; forking in a fixed order keeps seeded runs reproducible.
    fn fork(&mut self) -> Self
    where
        Self: Sized;

    /// Uniform over `[low, high)`; returns `low` when the interval is empty.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        if high <= low {
            return low;
        }
        low + (high - low) * self.next_f64()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from operating-system entropy, for non-reproducible production runs.
    pub fn from_entropy() -> Result<Self, getrandom::Error> {
        Ok(Self::new(entropy_seed()?))
    }
}

impl RandomSource for Rng {
    #[inline]
    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(SPLITMIX64_GOLDEN);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(SPLITMIX64_M1);
        z = (z ^ (z >> 27)).wrapping_mul(SPLITMIX64_M2);
        z ^ (z >> 31)
    }

    fn fork(&mut self) -> Self {
        Self::new(self.next_u64())
    }
}

pub fn entropy_seed() -> Result<u64, getrandom::Error> {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes)?;
    Ok(u64::from_le_bytes(bytes))
}
