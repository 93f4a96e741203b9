use rand::{Rng, SeedableRng, rngs::StdRng};

/// Per-worker pseudo-random stream. Same seed, same sequence.
pub struct RandomStream {
    rng: StdRng,
}

impl RandomStream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Uniform in `[0, 1)`.
    pub fn next_uniform(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    pub fn next_uniform_int(&mut self) -> u64 {
        self.rng.random::<u64>()
    }
}
