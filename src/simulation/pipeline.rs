use rand::RngCore;
use rayon::prelude::*;

use crate::aggregation::{discounted_price, tail_risk};
use crate::error::{SimResult, SimulationError};
use crate::models::bs::implied_volatility;
use crate::models::gbm::GbmModel;
use crate::models::portfolio::CorrelatedGbmModel;
use crate::models::traits::PathModel;
use crate::models::utils::{rng_from_seed, simulated_path_count};
use crate::paths::PathSet;
use crate::payoffs::Payoff;
use crate::simulation::config::SimulationConfig;
use crate::simulation::types::{
    MarketScenario, PricingResult, RiskResult, SimulationOutput, Volatility,
};

/// One validated simulation: scenario, payoff rule and run settings.
///
/// Construction validates everything, so a failed configuration never draws
/// from the generator.
#[derive(Debug, Clone)]
pub struct SimulationProcess {
    config: SimulationConfig,
    scenario: MarketScenario,
}

impl SimulationProcess {
    pub fn new(config: SimulationConfig) -> SimResult<Self> {
        config.validate()?;
        if config.ignores_mean_returns() {
            tracing::warn!(
                payoff = %config.payoff.kind(),
                "mean_returns ignored, option payoffs simulate under the risk-neutral drift"
            );
        }
        let scenario = config.scenario()?;
        Ok(Self { config, scenario })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn scenario(&self) -> &MarketScenario {
        &self.scenario
    }

    pub fn payoff(&self) -> &Payoff {
        &self.config.payoff
    }

    /// Whether the run simulates a single step of length `T`.
    pub fn uses_terminal_shortcut(&self) -> bool {
        self.config.uses_terminal_shortcut()
    }

    /// Path model for this scenario.
    pub fn model(&self) -> SimResult<Box<dyn PathModel>> {
        match &self.scenario.volatility {
            Volatility::Scalar(_) => {
                let model = GbmModel::from_scenario(&self.scenario)?;
                if self.uses_terminal_shortcut() {
                    Ok(Box::new(model.terminal_only()))
                } else {
                    Ok(Box::new(model))
                }
            }
            Volatility::Covariance(_) => Ok(Box::new(CorrelatedGbmModel::from_scenario(
                &self.scenario,
                self.config.psd_repair,
            )?)),
        }
    }

    pub fn simulate_paths(&self, rng: &mut dyn RngCore) -> SimResult<PathSet> {
        let model = self.model()?;
        let paths = model.simulate(rng, self.config.path_count, self.config.antithetic());
        tracing::debug!(
            n_paths = paths.n_paths(),
            n_steps = paths.n_steps(),
            n_assets = paths.n_assets(),
            "simulated paths"
        );
        Ok(paths)
    }

    /// Payoff of every path, in path order.
    pub fn evaluate(&self, paths: &PathSet) -> SimResult<Vec<f64>> {
        let payoff = &self.config.payoff;
        if paths.n_assets() != payoff.n_assets() {
            return Err(SimulationError::shape(
                format!("{} asset(s) per path", payoff.n_assets()),
                format!("{}", paths.n_assets()),
            ));
        }
        let samples: Vec<f64> = if self.config.parallel_eval {
            (0..paths.n_paths())
                .into_par_iter()
                .map(|p| payoff.evaluate(paths.path(p)))
                .collect()
        } else {
            paths.iter().map(|path| payoff.evaluate(path)).collect()
        };
        Ok(samples)
    }

    /// Reduce payoff samples to a price or to tail risk.
    pub fn aggregate(&self, samples: &[f64], antithetic: bool) -> SimResult<SimulationOutput> {
        match &self.config.payoff {
            Payoff::PortfolioValue { initial_value, .. } => {
                // pairs are not averaged: the tail is read from every simulated outcome
                let tail = tail_risk(
                    samples,
                    self.config.percentile_level(),
                    self.config.percentile_method,
                )?;
                Ok(SimulationOutput::Risk(RiskResult::from_tail(tail, *initial_value)))
            }
            payoff => {
                let discount = self.scenario.discount_factor();
                let estimate = discounted_price(samples, discount, antithetic)?;
                Ok(SimulationOutput::Pricing(PricingResult::from_estimate(
                    payoff.kind().to_string(),
                    estimate,
                    samples.len(),
                    discount,
                    self.uses_terminal_shortcut(),
                )))
            }
        }
    }

    /// Run with an externally owned generator.
    pub fn run_with_rng(&self, rng: &mut dyn RngCore) -> SimResult<SimulationOutput> {
        tracing::debug!(
            payoff = %self.config.payoff.kind(),
            path_count = self.config.path_count,
            step_count = self.config.step_count,
            antithetic = self.config.antithetic(),
            "starting simulation"
        );
        let paths = self.simulate_paths(rng)?;
        let samples = self.evaluate(&paths)?;
        let output = self.aggregate(&samples, paths.is_antithetic())?;

        match &output {
            SimulationOutput::Pricing(p) => tracing::info!(
                payoff = %p.payoff,
                estimate = p.estimate,
                standard_error = p.standard_error,
                n_paths = p.n_paths,
                "pricing complete"
            ),
            SimulationOutput::Risk(r) => tracing::info!(
                var = r.var,
                cvar = r.cvar,
                percentile_level = r.percentile_level,
                "risk complete"
            ),
        }
        Ok(output)
    }

    /// Run with a generator seeded from `random_seed` (or OS entropy).
    pub fn run(&self) -> SimResult<SimulationOutput> {
        let mut rng = rng_from_seed(self.config.random_seed);
        self.run_with_rng(&mut rng)
    }

    /// Number of paths the run will simulate.
    pub fn simulated_path_count(&self) -> usize {
        simulated_path_count(self.config.path_count, self.config.antithetic())
    }

    /// Black-Scholes volatility implied by a vanilla Monte Carlo price.
    pub fn implied_volatility(&self, result: &PricingResult) -> SimResult<f64> {
        match self.config.payoff {
            Payoff::Vanilla {
                option_type,
                strike,
            } => implied_volatility(
                option_type,
                result.estimate,
                self.scenario.spots[0],
                strike,
                self.scenario.rate,
                self.scenario.dividend_yield,
                self.scenario.maturity,
            ),
            ref other => Err(SimulationError::invalid(
                "payoff",
                f64::NAN,
                format!("implied volatility needs a vanilla payoff, got `{}`", other.kind()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payoffs::OptionType;
    use crate::simulation::types::VarianceReduction;

    fn call(strike: f64) -> Payoff {
        Payoff::Vanilla {
            option_type: OptionType::Call,
            strike,
        }
    }

    #[test]
    fn test_shortcut_only_for_terminal_payoffs() {
        let config = SimulationConfig::minimal().with_payoff(call(100.0));
        let process = SimulationProcess::new(config.clone()).unwrap();
        assert!(process.uses_terminal_shortcut());
        assert_eq!(process.model().unwrap().n_steps(), 1);

        let lookback = config.with_payoff(Payoff::Lookback {
            option_type: OptionType::Put,
        });
        let process = SimulationProcess::new(lookback).unwrap();
        assert!(!process.uses_terminal_shortcut());
        assert_eq!(process.model().unwrap().n_steps(), 12);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let base = SimulationConfig::minimal()
            .with_payoff(Payoff::AsianAverage {
                option_type: OptionType::Call,
                strike: 100.0,
            })
            .with_seed(17);
        let mut parallel = base.clone();
        parallel.parallel_eval = true;

        let a = SimulationProcess::new(base).unwrap().run().unwrap();
        let b = SimulationProcess::new(parallel).unwrap().run().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_antithetic_rounds_odd_budget() {
        let config = SimulationConfig::minimal()
            .with_paths(1001)
            .with_variance_reduction(VarianceReduction::Antithetic);
        let process = SimulationProcess::new(config).unwrap();
        assert_eq!(process.simulated_path_count(), 1002);
        let result = process.run().unwrap();
        let pricing = result.pricing().unwrap();
        assert_eq!(pricing.n_paths, 1002);
        assert_eq!(pricing.n_samples, 501);
    }

    #[test]
    fn test_pricing_ignores_real_world_drift() {
        let config = SimulationConfig::minimal()
            .with_basket(vec![100.0], vec![0.5], vec![vec![0.04]])
            .with_payoff(call(110.0));
        assert!(config.ignores_mean_returns());
        let process = SimulationProcess::new(config.clone()).unwrap();
        assert_eq!(process.scenario().mean_returns, None);
        assert!((process.scenario().drift(0) - config.rate).abs() < 1e-15);

        let basket = config.with_payoff(Payoff::PortfolioValue {
            weights: vec![1.0],
            initial_value: 1_000.0,
        });
        assert!(!basket.ignores_mean_returns());
        let process = SimulationProcess::new(basket).unwrap();
        assert_eq!(process.scenario().mean_returns, Some(vec![0.5]));
    }

    #[test]
    fn test_implied_volatility_requires_vanilla() {
        let config = SimulationConfig::minimal().with_payoff(Payoff::Lookback {
            option_type: OptionType::Call,
        });
        let process = SimulationProcess::new(config).unwrap();
        let pricing = process.run().unwrap().pricing().cloned().unwrap();
        assert!(process.implied_volatility(&pricing).is_err());
    }
}
