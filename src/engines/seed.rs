use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const SEED_MIN_VALUE: u64 = 0;
pub const SEED_MAX_VALUE: u64 = 1_000_000;

/// Owns the run's random stream and derives one seed per generation from it.
///
/// The generator is handed out by reference only; nothing in the crate
/// reaches for a global or thread-local generator on the engine's behalf.
pub struct SeedSequencer {
    rng: StdRng,
    random_seed: u64,
    generation_seed: Option<u64>,
}

impl SeedSequencer {
    pub fn new(random_seed: u64, generation_seed: Option<u64>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(random_seed),
            random_seed,
            generation_seed,
        }
    }

    /// Remembers the seeds but binds an entropy-seeded generator. The stream is
    /// reproducible again only after the next `set_root_seed` or
    /// `set_generation_seed`.
    pub fn detached(random_seed: u64, generation_seed: Option<u64>) -> Self {
        Self {
            rng: StdRng::from_entropy(),
            random_seed,
            generation_seed,
        }
    }

    pub fn set_root_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.random_seed = seed;
    }

    pub fn set_generation_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.generation_seed = Some(seed);
    }

    /// Draws the next seed from the current stream.
    pub fn next_seed(&mut self) -> u64 {
        self.rng.gen_range(SEED_MIN_VALUE..=SEED_MAX_VALUE)
    }

    /// Draws the next seed and reseeds the stream with it.
    pub fn advance_generation(&mut self) -> u64 {
        let seed = self.next_seed();
        self.set_generation_seed(seed);
        seed
    }

    pub fn random_seed(&self) -> u64 {
        self.random_seed
    }

    pub fn generation_seed(&self) -> Option<u64> {
        self.generation_seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}
