//! # Montecarlo-Lib: Monte Carlo Option Pricing and Portfolio Risk
//!
//! `montecarlo-lib` simulates geometric Brownian motion paths, applies payoff rules to
//! them and reduces the results either to a discounted price with its standard error or
//! to tail-risk statistics (VaR/CVaR) of a portfolio.
//!
//! ## Core Features
//!
//! - **Path Simulation**: exact-step GBM for one asset, correlated GBM for a basket with
//!   Cholesky or eigenvalue-repaired covariance factors
//! - **Payoff Rules**: vanilla, Asian, lookback, barrier, cliquet, digital and
//!   constant-mix portfolio value
//! - **Variance Reduction**: antithetic variates and a single-step terminal shortcut
//! - **Risk**: VaR/CVaR with nearest-rank or linearly interpolated percentiles
//! - **Benchmarks**: closed-form Black-Scholes and implied volatility
//! - **Credit**: one-factor Gaussian copula tranche losses
//! - **Short Rates**: Vasicek, CIR and Hull-White paths with Monte Carlo bond prices
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use montecarlo_lib::{default_configs, price_option, OptionType, Payoff};
//!
//! let config = default_configs::fast()
//!     .with_market(100.0, 0.05, 0.0, 0.2)
//!     .with_payoff(Payoff::Vanilla { option_type: OptionType::Call, strike: 110.0 });
//!
//! let result = price_option(config)?;
//! println!("{}", result); // vanilla: 6.04.. +/- 0.0..
//! # Ok::<(), montecarlo_lib::SimulationError>(())
//! ```
//!
//! ## Configuration Presets
//!
//! - `production()`: antithetic draws over a large path budget
//! - `fast()`: seeded, moderate budget for development
//! - `research()`: very large budget for convergence studies
//! - `minimal()`: tiny sequential runs for quick checks

// ================================================================================================
// MODULES
// ================================================================================================

pub mod aggregation;
pub mod error;
pub mod market_data;
pub mod models;
pub mod paths;
pub mod payoffs;
pub mod simulation;

// ================================================================================================
// IMPORTS
// ================================================================================================

use rand::RngCore;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

// Errors
pub use error::{SimResult, SimulationError};

// Simulation inputs and outputs
pub use simulation::{
    MarketScenario, PricingResult, RiskResult, SimulationConfig, SimulationOutput,
    SimulationProcess, VarianceReduction, Volatility,
};

// Payoff rules
pub use payoffs::{BarrierDirection, BarrierKind, OptionType, Payoff, PayoffKind};

// Aggregation
pub use aggregation::{Estimate, PercentileMethod, TailRisk};

// Models
pub use models::bs::{bs_call_price, bs_price, bs_put_price, implied_volatility};
pub use models::credit::{CopulaPortfolio, Tranche};
pub use models::portfolio::PsdRepair;
pub use models::short_rate::{ShortRateDynamics, ShortRateModel, ThetaSchedule};

pub use market_data::ReturnStatistics;
pub use paths::{PathSet, PathView};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured simulation settings for common use cases.
///
/// Every preset prices an at-the-money one-year call (S = K = 100, r = 5%, σ = 20%);
/// override the market and payoff with the `with_*` builders on [`SimulationConfig`].
pub mod default_configs {
    use crate::simulation::SimulationConfig;

    /// Production-grade configuration.
    ///
    /// **Characteristics:**
    /// - 500,000 paths with antithetic variates
    /// - Daily steps over the horizon
    /// - Unseeded: every run draws fresh entropy
    pub fn production() -> SimulationConfig {
        SimulationConfig::production()
    }

    /// Fast configuration for development and testing.
    ///
    /// **Characteristics:**
    /// - 10,000 paths, weekly steps
    /// - Fixed seed, so repeated runs agree
    ///
    /// # Example
    ///
    /// ```rust
    /// use montecarlo_lib::default_configs;
    ///
    /// let config = default_configs::fast();
    /// assert_eq!(config.random_seed, Some(42));
    /// ```
    pub fn fast() -> SimulationConfig {
        SimulationConfig::fast()
    }

    /// High-precision configuration for research and convergence studies.
    pub fn research() -> SimulationConfig {
        SimulationConfig::research()
    }

    /// Minimal configuration for quick validation and debugging.
    ///
    /// **Characteristics:**
    /// - 1,000 paths, monthly steps
    /// - Sequential payoff evaluation
    pub fn minimal() -> SimulationConfig {
        SimulationConfig::minimal()
    }
}

// ================================================================================================
// ENTRY POINTS
// ================================================================================================

/// Run one simulation with the generator implied by `config.random_seed`.
///
/// Option payoffs yield [`SimulationOutput::Pricing`]; the portfolio-value rule yields
/// [`SimulationOutput::Risk`].
pub fn simulate(config: SimulationConfig) -> SimResult<SimulationOutput> {
    SimulationProcess::new(config)?.run()
}

/// Run one simulation drawing from `rng`.
pub fn simulate_with_rng(
    config: SimulationConfig,
    rng: &mut dyn RngCore,
) -> SimResult<SimulationOutput> {
    SimulationProcess::new(config)?.run_with_rng(rng)
}

/// Discounted Monte Carlo price of an option payoff.
///
/// # Errors
///
/// * [`SimulationError::Config`] if the payoff is the portfolio-value rule
/// * any validation error raised by [`SimulationConfig::validate`]
///
/// # Example
///
/// ```rust,no_run
/// use montecarlo_lib::{bs_call_price, price_option, Payoff, OptionType, SimulationConfig};
///
/// let config = SimulationConfig::default()
///     .with_market(100.0, 0.05, 0.0, 0.2)
///     .with_payoff(Payoff::Vanilla { option_type: OptionType::Call, strike: 110.0 })
///     .with_seed(7);
///
/// let mc = price_option(config)?;
/// let bs = bs_call_price(100.0, 110.0, 0.05, 0.0, 1.0, 0.2);
/// assert!((mc.estimate - bs).abs() < 3.0 * mc.standard_error);
/// # Ok::<(), montecarlo_lib::SimulationError>(())
/// ```
pub fn price_option(config: SimulationConfig) -> SimResult<PricingResult> {
    if config.payoff.is_risk_measure() {
        return Err(SimulationError::Config(format!(
            "payoff `{}` yields tail risk, not a price",
            config.payoff.kind()
        )));
    }
    match simulate(config)? {
        SimulationOutput::Pricing(result) => Ok(result),
        SimulationOutput::Risk(_) => Err(SimulationError::Config(
            "pricing run produced a risk result".to_string(),
        )),
    }
}

/// VaR and CVaR of a simulated portfolio.
///
/// The payoff must be [`Payoff::PortfolioValue`]; `config.confidence_level` sets the tail.
pub fn portfolio_risk(config: SimulationConfig) -> SimResult<RiskResult> {
    if !config.payoff.is_risk_measure() {
        return Err(SimulationError::Config(format!(
            "payoff `{}` yields a price, not tail risk",
            config.payoff.kind()
        )));
    }
    match simulate(config)? {
        SimulationOutput::Risk(result) => Ok(result),
        SimulationOutput::Pricing(_) => Err(SimulationError::Config(
            "risk run produced a pricing result".to_string(),
        )),
    }
}
