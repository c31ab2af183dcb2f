//! Single-asset geometric Brownian motion.
//!
//! Log-prices evolve with the exact GBM step
//!
//! ```text
//! ln S(t+Δt) = ln S(t) + (μ - σ²/2) Δt + σ √Δt Z,   Z ~ N(0, 1)
//! ```
//!
//! where `μ = r - q` under the risk-neutral measure. Because the increments are
//! independent Gaussians the scheme has no discretisation bias, so a payoff that
//! reads only `S_T` can be simulated with one step of length `T`
//! ([`GbmModel::terminal_only`]).

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};

use crate::error::{validation, SimResult};
use crate::models::traits::PathModel;
use crate::models::utils::simulated_path_count;
use crate::paths::PathSet;
use crate::simulation::types::MarketScenario;

/// GBM parameters for one underlying.
#[derive(Debug, Clone, PartialEq)]
pub struct GbmModel {
    pub spot: f64,
    /// Drift of the log-price before the `-σ²/2` correction.
    pub drift: f64,
    pub volatility: f64,
    pub maturity: f64,
    pub n_steps: usize,
}

impl GbmModel {
    /// Risk-neutral model with drift `rate - dividend_yield`.
    pub fn new(
        spot: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        validation::finite("rate", rate)?;
        validation::finite("dividend_yield", dividend_yield)?;
        let model = Self {
            spot,
            drift: rate - dividend_yield,
            volatility,
            maturity,
            n_steps,
        };
        model.validate()?;
        Ok(model)
    }

    /// Build from the first asset of a scenario with a scalar volatility.
    pub fn from_scenario(scenario: &MarketScenario) -> SimResult<Self> {
        let volatility = scenario.scalar_volatility()?;
        let model = Self {
            spot: scenario.spots[0],
            drift: scenario.drift(0),
            volatility,
            maturity: scenario.maturity,
            n_steps: scenario.n_steps,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> SimResult<()> {
        validation::positive("spot", self.spot)?;
        validation::finite("drift", self.drift)?;
        validation::non_negative("volatility", self.volatility)?;
        validation::positive("maturity", self.maturity)?;
        validation::at_least_one("step_count", self.n_steps)
    }

    /// Same law at maturity, simulated in a single step.
    pub fn terminal_only(&self) -> Self {
        Self {
            n_steps: 1,
            ..self.clone()
        }
    }

    fn step_coefficients(&self) -> (f64, f64) {
        let dt = self.dt();
        let nudt = (self.drift - 0.5 * self.volatility * self.volatility) * dt;
        let volsdt = self.volatility * dt.sqrt();
        (nudt, volsdt)
    }
}

impl PathModel for GbmModel {
    fn n_assets(&self) -> usize {
        1
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn maturity(&self) -> f64 {
        self.maturity
    }

    fn simulate(&self, rng: &mut dyn RngCore, n_paths: usize, antithetic: bool) -> PathSet {
        let total = simulated_path_count(n_paths, antithetic);
        let (nudt, volsdt) = self.step_coefficients();
        let ln_s0 = self.spot.ln();
        let mut paths = PathSet::with_initial(total, self.n_steps, &[self.spot]);
        let mut z = vec![0.0; self.n_steps];

        let fill = |levels: &mut [f64], z: &[f64], sign: f64| {
            let mut ln_s = ln_s0;
            for (level, dz) in levels[1..].iter_mut().zip(z) {
                ln_s += nudt + sign * volsdt * dz;
                *level = ln_s.exp();
            }
        };

        if antithetic {
            for pair in 0..total / 2 {
                for dz in z.iter_mut() {
                    *dz = StandardNormal.sample(rng);
                }
                fill(paths.path_mut(2 * pair), &z, 1.0);
                fill(paths.path_mut(2 * pair + 1), &z, -1.0);
            }
            paths.mark_antithetic()
        } else {
            for p in 0..total {
                for dz in z.iter_mut() {
                    *dz = StandardNormal.sample(rng);
                }
                fill(paths.path_mut(p), &z, 1.0);
            }
            paths
        }
    }
}
