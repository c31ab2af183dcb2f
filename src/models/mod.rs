pub mod bs;
pub mod credit;
pub mod gbm;
pub mod portfolio;
pub mod short_rate;

/// Common traits used by all path models
pub mod traits {
    use crate::paths::PathSet;
    use rand::RngCore;

    /// A process that can be sampled into a [`PathSet`].
    ///
    /// The random source is injected so that a seeded generator reproduces a
    /// run exactly.
    pub trait PathModel {
        fn n_assets(&self) -> usize;
        fn n_steps(&self) -> usize;
        fn maturity(&self) -> f64;

        /// Simulate `n_paths` paths. With `antithetic`, draws are mirrored so
        /// that paths `2k` and `2k + 1` form a pair; an odd `n_paths` is rounded
        /// up to the next even count.
        fn simulate(&self, rng: &mut dyn RngCore, n_paths: usize, antithetic: bool) -> PathSet;

        fn dt(&self) -> f64 {
            self.maturity() / self.n_steps() as f64
        }
    }
}

/// Utility functions shared by the path models
pub mod utils {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// Seeded generator when `seed` is set, otherwise seeded from OS entropy.
    pub fn rng_from_seed(seed: Option<u64>) -> StdRng {
        match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        }
    }

    /// Continuous-compounding discount factor `exp(-r T)`.
    pub fn discount_factor(rate: f64, maturity: f64) -> f64 {
        (-rate * maturity).exp()
    }

    /// Number of simulated paths once antithetic pairing is applied.
    pub fn simulated_path_count(n_paths: usize, antithetic: bool) -> usize {
        if antithetic {
            n_paths.div_ceil(2) * 2
        } else {
            n_paths
        }
    }
}
