//! Mean-reverting short-rate models simulated with an Euler scheme.
//!
//! All three models share the drift `κ (θ(t) - r)` and differ in the diffusion:
//!
//! ```text
//! Vasicek:     dr = κ (θ - r) dt + σ dW
//! CIR:         dr = κ (θ - r) dt + σ √r dW
//! Hull-White:  dr = κ (θ(t) - r) dt + σ dW
//! ```
//!
//! CIR uses full truncation: the diffusion reads `max(r, 0)` and every simulated
//! rate is floored at zero. Vasicek and Hull-White rates can go negative.
//! `θ(t)` is a piecewise-constant [`ThetaSchedule`] evaluated at the start of
//! each step.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::aggregation::{pair_antithetic, Estimate};
use crate::error::{validation, SimResult, SimulationError};
use crate::models::traits::PathModel;
use crate::models::utils::simulated_path_count;
use crate::paths::PathSet;

/// Diffusion of the short rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShortRateDynamics {
    Vasicek,
    Cir,
    HullWhite,
}

impl FromStr for ShortRateDynamics {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "vasicek" => Ok(ShortRateDynamics::Vasicek),
            "cir" | "cox_ingersoll_ross" => Ok(ShortRateDynamics::Cir),
            "hull_white" | "hw" => Ok(ShortRateDynamics::HullWhite),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "short-rate model",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ShortRateDynamics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShortRateDynamics::Vasicek => write!(f, "vasicek"),
            ShortRateDynamics::Cir => write!(f, "cir"),
            ShortRateDynamics::HullWhite => write!(f, "hull_white"),
        }
    }
}

/// Piecewise-constant long-run level.
///
/// `levels[0]` applies before `breakpoints[0]`, `levels[k]` on
/// `[breakpoints[k-1], breakpoints[k])` and the last level from the final
/// breakpoint on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThetaSchedule {
    pub breakpoints: Vec<f64>,
    pub levels: Vec<f64>,
}

impl ThetaSchedule {
    pub fn constant(theta: f64) -> Self {
        Self {
            breakpoints: Vec::new(),
            levels: vec![theta],
        }
    }

    pub fn piecewise(breakpoints: Vec<f64>, levels: Vec<f64>) -> SimResult<Self> {
        let schedule = Self {
            breakpoints,
            levels,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.levels.len() != self.breakpoints.len() + 1 {
            return Err(SimulationError::shape(
                format!("{} theta levels", self.breakpoints.len() + 1),
                format!("{}", self.levels.len()),
            ));
        }
        for level in &self.levels {
            validation::finite("theta", *level)?;
        }
        for t in &self.breakpoints {
            validation::positive("theta breakpoint", *t)?;
        }
        if self.breakpoints.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SimulationError::invalid(
                "theta breakpoint",
                f64::NAN,
                "breakpoints must be strictly increasing",
            ));
        }
        Ok(())
    }

    /// θ(t).
    pub fn at(&self, t: f64) -> f64 {
        let k = self.breakpoints.partition_point(|&b| b <= t);
        self.levels[k]
    }

    pub fn is_constant(&self) -> bool {
        self.breakpoints.is_empty()
    }
}

/// A short-rate process on a uniform grid of `n_steps` over `maturity` years.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortRateModel {
    pub dynamics: ShortRateDynamics,
    pub r0: f64,
    /// Mean-reversion speed κ
    pub kappa: f64,
    pub theta: ThetaSchedule,
    pub sigma: f64,
    pub maturity: f64,
    pub n_steps: usize,
}

impl ShortRateModel {
    pub fn vasicek(
        r0: f64,
        kappa: f64,
        theta: f64,
        sigma: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        Self::new(
            ShortRateDynamics::Vasicek,
            r0,
            kappa,
            ThetaSchedule::constant(theta),
            sigma,
            maturity,
            n_steps,
        )
    }

    pub fn cir(
        r0: f64,
        kappa: f64,
        theta: f64,
        sigma: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        Self::new(
            ShortRateDynamics::Cir,
            r0,
            kappa,
            ThetaSchedule::constant(theta),
            sigma,
            maturity,
            n_steps,
        )
    }

    pub fn hull_white(
        r0: f64,
        kappa: f64,
        theta: ThetaSchedule,
        sigma: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        Self::new(
            ShortRateDynamics::HullWhite,
            r0,
            kappa,
            theta,
            sigma,
            maturity,
            n_steps,
        )
    }

    pub fn new(
        dynamics: ShortRateDynamics,
        r0: f64,
        kappa: f64,
        theta: ThetaSchedule,
        sigma: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        let model = Self {
            dynamics,
            r0,
            kappa,
            theta,
            sigma,
            maturity,
            n_steps,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn validate(&self) -> SimResult<()> {
        validation::finite("r0", self.r0)?;
        validation::positive("kappa", self.kappa)?;
        validation::non_negative("sigma", self.sigma)?;
        validation::positive("maturity", self.maturity)?;
        validation::at_least_one("step_count", self.n_steps)?;
        self.theta.validate()?;

        match self.dynamics {
            ShortRateDynamics::Cir => {
                validation::non_negative("r0", self.r0)?;
                for level in &self.theta.levels {
                    validation::non_negative("theta", *level)?;
                }
                Ok(())
            }
            ShortRateDynamics::Vasicek if !self.theta.is_constant() => Err(SimulationError::invalid(
                "theta",
                f64::NAN,
                "Vasicek takes a constant theta, use Hull-White for a schedule",
            )),
            _ => Ok(()),
        }
    }

    /// True when `2 κ θ ≥ σ²` for every level, so the continuous CIR process
    /// stays strictly positive.
    pub fn feller_condition(&self) -> bool {
        self.theta
            .levels
            .iter()
            .all(|theta| 2.0 * self.kappa * theta >= self.sigma * self.sigma)
    }

    /// Mean of the continuous process at time `t`, ignoring the CIR floor.
    ///
    /// Solves `dm/dt = κ (θ(t) - m)` piece by piece over the theta schedule.
    pub fn expected_rate(&self, t: f64) -> f64 {
        let mut m = self.r0;
        let mut start = 0.0;
        for (k, &level) in self.theta.levels.iter().enumerate() {
            let end = self.theta.breakpoints.get(k).copied().unwrap_or(f64::INFINITY).min(t);
            if end > start {
                m = level + (m - level) * (-self.kappa * (end - start)).exp();
                start = end;
            }
            if start >= t {
                break;
            }
        }
        m
    }

    fn next_rate(&self, r: f64, theta: f64, dt: f64, dw: f64) -> f64 {
        let drift = self.kappa * (theta - r) * dt;
        match self.dynamics {
            ShortRateDynamics::Cir => (r + drift + self.sigma * r.max(0.0).sqrt() * dw).max(0.0),
            ShortRateDynamics::Vasicek | ShortRateDynamics::HullWhite => {
                r + drift + self.sigma * dw
            }
        }
    }

    fn fill(&self, levels: &mut [f64], z: &[f64], sign: f64, thetas: &[f64]) {
        let dt = self.dt();
        let sqrt_dt = dt.sqrt();
        let mut r = self.r0;
        for ((level, dz), theta) in levels[1..].iter_mut().zip(z).zip(thetas) {
            r = self.next_rate(r, *theta, dt, sign * sqrt_dt * dz);
            *level = r;
        }
    }

    /// Monte Carlo price of a zero-coupon bond paying 1 at `maturity`,
    /// `E[exp(-∫ r dt)]` with the integral taken by the trapezoid rule.
    pub fn zero_coupon_bond(
        &self,
        rng: &mut dyn RngCore,
        n_paths: usize,
        antithetic: bool,
    ) -> SimResult<Estimate> {
        validation::at_least_one("path_count", n_paths)?;
        let paths = self.simulate(rng, n_paths, antithetic);
        let dt = self.dt();
        let discounts: Vec<f64> = paths
            .iter()
            .map(|path| {
                let rates: Vec<f64> = path.steps().map(|s| s[0]).collect();
                let integral: f64 = rates.windows(2).map(|w| 0.5 * (w[0] + w[1]) * dt).sum();
                (-integral).exp()
            })
            .collect();

        tracing::debug!(
            model = %self.dynamics,
            n_paths = paths.n_paths(),
            "simulated short-rate paths for bond pricing"
        );
        if paths.is_antithetic() {
            Estimate::from_samples(&pair_antithetic(&discounts)?)
        } else {
            Estimate::from_samples(&discounts)
        }
    }
}

impl PathModel for ShortRateModel {
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
        let dt = self.dt();
        let thetas: Vec<f64> = (0..self.n_steps)
            .map(|k| self.theta.at(k as f64 * dt))
            .collect();
        let mut paths = PathSet::with_initial(total, self.n_steps, &[self.r0]);
        let mut z = vec![0.0; self.n_steps];

        if antithetic {
            for pair in 0..total / 2 {
                for dz in z.iter_mut() {
                    *dz = StandardNormal.sample(rng);
                }
                self.fill(paths.path_mut(2 * pair), &z, 1.0, &thetas);
                self.fill(paths.path_mut(2 * pair + 1), &z, -1.0, &thetas);
            }
            paths.mark_antithetic()
        } else {
            for p in 0..total {
                for dz in z.iter_mut() {
                    *dz = StandardNormal.sample(rng);
                }
                self.fill(paths.path_mut(p), &z, 1.0, &thetas);
            }
            paths
        }
    }
}

/// Closed-form Vasicek zero-coupon bond price `A(T) exp(-B(T) r0)`.
pub fn vasicek_bond_price(r0: f64, kappa: f64, theta: f64, sigma: f64, maturity: f64) -> f64 {
    let b = (1.0 - (-kappa * maturity).exp()) / kappa;
    let s2 = sigma * sigma;
    let ln_a = (theta - s2 / (2.0 * kappa * kappa)) * (b - maturity) - s2 * b * b / (4.0 * kappa);
    (ln_a - b * r0).exp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::utils::rng_from_seed;

    fn terminal_estimate(model: &ShortRateModel, seed: u64, n_paths: usize) -> Estimate {
        let paths = model.simulate(&mut rng_from_seed(Some(seed)), n_paths, false);
        Estimate::from_samples(&paths.terminal_values().unwrap()).unwrap()
    }

    #[test]
    fn test_vasicek_reverts_toward_theta() {
        let model = ShortRateModel::vasicek(0.03, 0.5, 0.05, 0.02, 10.0, 1000).unwrap();
        let terminal = terminal_estimate(&model, 42, 2_000);
        let expected = model.expected_rate(10.0);
        assert!((expected - (0.05 - 0.02 * (-5.0f64).exp())).abs() < 1e-12);
        assert!(
            (terminal.value - expected).abs() <= 4.0 * terminal.std_error,
            "terminal mean {} vs {}",
            terminal,
            expected
        );
        assert!((terminal.value - 0.05).abs() < (0.03f64 - 0.05).abs());
    }

    #[test]
    fn test_cir_rates_never_negative() {
        // 2κθ = 0.01 < σ² = 0.09, so the Euler scheme keeps hitting the floor
        let model = ShortRateModel::cir(0.01, 0.5, 0.01, 0.3, 5.0, 500).unwrap();
        assert!(!model.feller_condition());
        let paths = model.simulate(&mut rng_from_seed(Some(5)), 500, true);
        let mut floored = 0;
        for path in paths.iter() {
            for level in path.steps().map(|s| s[0]) {
                assert!(level >= 0.0 && level.is_finite());
                if level == 0.0 {
                    floored += 1;
                }
            }
        }
        assert!(floored > 0, "expected the zero floor to bind");
    }

    #[test]
    fn test_vasicek_can_go_negative() {
        let model = ShortRateModel::vasicek(0.01, 0.5, 0.01, 0.3, 5.0, 500).unwrap();
        let paths = model.simulate(&mut rng_from_seed(Some(5)), 200, false);
        assert!(paths.iter().any(|p| p.steps().any(|s| s[0] < 0.0)));
    }

    #[test]
    fn test_hull_white_follows_theta_schedule() {
        let theta = ThetaSchedule::piecewise(vec![5.0], vec![0.04, 0.06]).unwrap();
        assert_eq!(theta.at(0.0), 0.04);
        assert_eq!(theta.at(4.999), 0.04);
        assert_eq!(theta.at(5.0), 0.06);

        let model = ShortRateModel::hull_white(0.03, 0.5, theta, 0.02, 10.0, 1000).unwrap();
        let halfway = model.expected_rate(5.0);
        assert!((halfway - (0.04 - 0.01 * (-2.5f64).exp())).abs() < 1e-12);
        let expected = model.expected_rate(10.0);
        assert!((expected - (0.06 + (halfway - 0.06) * (-2.5f64).exp())).abs() < 1e-12);

        let terminal = terminal_estimate(&model, 9, 2_000);
        assert!(
            (terminal.value - expected).abs() <= 4.0 * terminal.std_error + 1e-4,
            "terminal mean {} vs {}",
            terminal,
            expected
        );
        assert!(terminal.value > 0.05, "rates should move toward the later 6% level");
    }

    #[test]
    fn test_antithetic_first_step_averages_to_drift() {
        let model = ShortRateModel::vasicek(0.03, 0.5, 0.05, 0.02, 1.0, 10).unwrap();
        let paths = model.simulate(&mut rng_from_seed(Some(1)), 4, true);
        assert!(paths.is_antithetic());
        let expected = 0.03 + 0.5 * (0.05 - 0.03) * 0.1;
        for pair in 0..2 {
            let mean = 0.5 * (paths.level(2 * pair, 1, 0) + paths.level(2 * pair + 1, 1, 0));
            assert!((mean - expected).abs() < 1e-12);
        }
    }

    #[test]
    fn test_vasicek_bond_matches_closed_form() {
        let model = ShortRateModel::vasicek(0.03, 0.5, 0.05, 0.02, 5.0, 500).unwrap();
        let bond = model
            .zero_coupon_bond(&mut rng_from_seed(Some(77)), 20_000, true)
            .unwrap();
        let exact = vasicek_bond_price(0.03, 0.5, 0.05, 0.02, 5.0);
        assert!(
            (bond.value - exact).abs() <= 4.0 * bond.std_error + 1e-4,
            "MC bond {} vs closed form {:.6}",
            bond,
            exact
        );
        assert_eq!(bond.n_samples, 10_000);
    }

    #[test]
    fn test_zero_volatility_bond_is_deterministic() {
        let model = ShortRateModel::vasicek(0.05, 1.0, 0.05, 0.0, 2.0, 8).unwrap();
        let bond = model
            .zero_coupon_bond(&mut rng_from_seed(Some(3)), 3, false)
            .unwrap();
        assert!((bond.value - (-0.1f64).exp()).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        assert!(ShortRateModel::vasicek(0.03, 0.0, 0.05, 0.02, 1.0, 10).is_err());
        assert!(ShortRateModel::vasicek(0.03, 0.5, 0.05, -0.02, 1.0, 10).is_err());
        assert!(ShortRateModel::vasicek(0.03, 0.5, 0.05, 0.02, 1.0, 0).is_err());
        assert!(ShortRateModel::cir(-0.01, 0.5, 0.05, 0.02, 1.0, 10).is_err());
        assert!(ThetaSchedule::piecewise(vec![2.0, 1.0], vec![0.01, 0.02, 0.03]).is_err());
        assert!(matches!(
            ThetaSchedule::piecewise(vec![1.0], vec![0.01]),
            Err(SimulationError::ShapeMismatch { .. })
        ));

        let schedule = ThetaSchedule::piecewise(vec![1.0], vec![0.01, 0.02]).unwrap();
        assert!(ShortRateModel::new(
            ShortRateDynamics::Vasicek,
            0.03,
            0.5,
            schedule,
            0.02,
            2.0,
            10
        )
        .is_err());
    }

    #[test]
    fn test_dynamics_parsing() {
        assert_eq!("CIR".parse::<ShortRateDynamics>().unwrap(), ShortRateDynamics::Cir);
        assert_eq!(
            "hull-white".parse::<ShortRateDynamics>().unwrap(),
            ShortRateDynamics::HullWhite
        );
        assert!(matches!(
            "hjm".parse::<ShortRateDynamics>(),
            Err(SimulationError::UnrecognizedName { .. })
        ));
    }
}
