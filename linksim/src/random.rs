use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::{ComponentId, Jiffies};

pub type Seed = u64;

/// Latency distribution of a link.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Distributions {
    Fixed(Jiffies),
    Uniform(Jiffies, Jiffies),
    // Latency `val` with probability `p`, zero otherwise
    Bernoulli(f64, Jiffies),
    Normal(Jiffies, Jiffies),
}

impl Distributions {
    pub(crate) fn check(&self) -> Result<(), String> {
        match *self {
            Distributions::Uniform(from, to) if from > to => {
                Err(format!("uniform bounds {from} > {to}"))
            }
            Distributions::Bernoulli(p, _) if !(0.0..=1.0).contains(&p) => {
                Err(format!("bernoulli probability {p} outside [0, 1]"))
            }
            _ => Ok(()),
        }
    }
}

/// Derives the seed of a component so that components of one simulation get
/// distinct but reproducible streams.
pub(crate) fn derive_seed(base: Seed, id: ComponentId) -> Seed {
    base.wrapping_add(id as u64)
}

pub(crate) struct Randomizer {
    rnd: rand::rngs::StdRng,
}

impl Randomizer {
    pub(crate) fn new(seed: Seed) -> Self {
        Self {
            rnd: rand::rngs::StdRng::seed_from_u64(seed),
        }
    }

    // Distributions are checked when links are connected
    pub(crate) fn random_jiffies(&mut self, d: Distributions) -> Jiffies {
        match d {
            Distributions::Fixed(value) => value,
            Distributions::Uniform(Jiffies(from), Jiffies(to)) => {
                Jiffies(self.rnd.random_range(from..=to))
            }
            Distributions::Bernoulli(p, val) => {
                if self.rnd.random_bool(p) {
                    val
                } else {
                    Jiffies::ZERO
                }
            }
            Distributions::Normal(Jiffies(mean), Jiffies(std_dev)) => {
                match Normal::new(mean as f64, std_dev as f64) {
                    Ok(distr) => Jiffies(distr.sample(&mut self.rnd).max(0.0).round() as u64),
                    Err(_) => Jiffies(mean),
                }
            }
        }
    }
}
