use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::aggregation::PercentileMethod;
use crate::error::{validation, SimResult, SimulationError};
use crate::models::portfolio::PsdRepair;
use crate::models::utils::simulated_path_count;
use crate::payoffs::{OptionType, Payoff};
use crate::simulation::types::{MarketScenario, VarianceReduction, Volatility};

/// Everything one simulation run needs.
///
/// Deserializes from TOML with defaults for every omitted field, e.g.
///
/// ```toml
/// spot = 100.0
/// rate = 0.05
/// volatility = 0.2
/// path_count = 100000
///
/// [payoff]
/// rule = "asian_average"
/// option_type = "call"
/// strike = 105.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    #[serde(default = "default_spot")]
    pub spot: f64,

    /// Per-asset initial levels for baskets; overrides `spot` when set
    #[serde(default)]
    pub asset_spots: Option<Vec<f64>>,

    #[serde(default = "default_rate")]
    pub rate: f64,

    #[serde(default)]
    pub dividend_yield: f64,

    /// Scalar σ, or a covariance matrix for a basket
    #[serde(default = "default_volatility")]
    pub volatility: Volatility,

    /// Real-world drift per asset; only portfolio runs read it, option payoffs
    /// always simulate under the risk-neutral drift `rate - dividend_yield`
    #[serde(default)]
    pub mean_returns: Option<Vec<f64>>,

    /// Horizon in years
    #[serde(default = "default_maturity")]
    pub maturity: f64,

    #[serde(default = "default_step_count")]
    pub step_count: usize,

    /// Total path budget; antithetic runs round it up to an even count
    #[serde(default = "default_path_count")]
    pub path_count: usize,

    #[serde(default = "default_payoff")]
    pub payoff: Payoff,

    /// Confidence of the tail-risk figures, e.g. 0.95 for the 5th percentile
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,

    #[serde(default)]
    pub random_seed: Option<u64>,

    #[serde(default)]
    pub variance_reduction: VarianceReduction,

    #[serde(default)]
    pub percentile_method: PercentileMethod,

    #[serde(default)]
    pub psd_repair: PsdRepair,

    /// Evaluate payoffs on the rayon pool
    #[serde(default = "default_true")]
    pub parallel_eval: bool,

    /// Simulate a single step when the payoff reads only the terminal level
    #[serde(default = "default_true")]
    pub terminal_shortcut: bool,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            spot: default_spot(),
            asset_spots: None,
            rate: default_rate(),
            dividend_yield: 0.0,
            volatility: default_volatility(),
            mean_returns: None,
            maturity: default_maturity(),
            step_count: default_step_count(),
            path_count: default_path_count(),
            payoff: default_payoff(),
            confidence_level: default_confidence_level(),
            random_seed: None,
            variance_reduction: VarianceReduction::None,
            percentile_method: PercentileMethod::default(),
            psd_repair: PsdRepair::default(),
            parallel_eval: true,
            terminal_shortcut: true,
        }
    }
}

impl SimulationConfig {
    /// Production pricing: large path budget, antithetic draws, daily steps.
    ///
    /// A path-dependent payoff keeps every level in memory, about 1 GB per asset
    /// here; see [`SimulationConfig::path_storage_bytes`].
    pub fn production() -> Self {
        Self {
            path_count: 500_000,
            step_count: 252,
            variance_reduction: VarianceReduction::Antithetic,
            ..Self::default()
        }
    }

    /// Fast configuration for development and testing
    pub fn fast() -> Self {
        Self {
            path_count: 10_000,
            step_count: 52,
            random_seed: Some(42),
            ..Self::default()
        }
    }

    /// High-precision configuration for research and convergence studies.
    ///
    /// Path-dependent payoffs need about 8 GB per asset of path storage at this
    /// size. Lower `step_count` or `path_count` on smaller machines.
    pub fn research() -> Self {
        Self {
            path_count: 2_000_000,
            step_count: 504,
            variance_reduction: VarianceReduction::Antithetic,
            random_seed: Some(123456),
            ..Self::default()
        }
    }

    /// Minimal configuration for quick validation and debugging
    pub fn minimal() -> Self {
        Self {
            path_count: 1_000,
            step_count: 12,
            random_seed: Some(1),
            parallel_eval: false,
            ..Self::default()
        }
    }

    pub fn from_toml_str(s: &str) -> SimResult<Self> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn with_payoff(mut self, payoff: Payoff) -> Self {
        self.payoff = payoff;
        self
    }

    pub fn with_paths(mut self, path_count: usize) -> Self {
        self.path_count = path_count;
        self
    }

    pub fn with_steps(mut self, step_count: usize) -> Self {
        self.step_count = step_count;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }

    pub fn with_variance_reduction(mut self, variance_reduction: VarianceReduction) -> Self {
        self.variance_reduction = variance_reduction;
        self
    }

    pub fn with_market(mut self, spot: f64, rate: f64, dividend_yield: f64, volatility: f64) -> Self {
        self.spot = spot;
        self.asset_spots = None;
        self.rate = rate;
        self.dividend_yield = dividend_yield;
        self.volatility = Volatility::Scalar(volatility);
        self
    }

    pub fn with_maturity(mut self, maturity: f64) -> Self {
        self.maturity = maturity;
        self
    }

    /// Switch to a basket with its own spots, drifts and covariance.
    pub fn with_basket(
        mut self,
        spots: Vec<f64>,
        mean_returns: Vec<f64>,
        covariance: Vec<Vec<f64>>,
    ) -> Self {
        self.asset_spots = Some(spots);
        self.mean_returns = Some(mean_returns);
        self.volatility = Volatility::Covariance(covariance);
        self
    }

    pub fn spots(&self) -> Vec<f64> {
        match &self.asset_spots {
            Some(spots) => spots.clone(),
            None => vec![self.spot; self.volatility.dimension()],
        }
    }

    /// Whether the run simulates a single step of length `maturity`.
    pub fn uses_terminal_shortcut(&self) -> bool {
        self.terminal_shortcut
            && !self.payoff.requires_full_path()
            && matches!(self.volatility, Volatility::Scalar(_))
    }

    /// Bytes of path storage one run allocates. Terminal-only runs keep two
    /// levels per path.
    pub fn path_storage_bytes(&self) -> usize {
        let steps = if self.uses_terminal_shortcut() {
            1
        } else {
            self.step_count
        };
        simulated_path_count(self.path_count, self.antithetic())
            * (steps + 1)
            * self.volatility.dimension()
            * std::mem::size_of::<f64>()
    }

    pub fn antithetic(&self) -> bool {
        self.variance_reduction == VarianceReduction::Antithetic
    }

    /// Left-tail percentile implied by `confidence_level`, e.g. 5.0 for 0.95.
    pub fn percentile_level(&self) -> f64 {
        (1.0 - self.confidence_level) * 100.0
    }

    /// True when `mean_returns` is set but the payoff is priced risk-neutrally.
    pub fn ignores_mean_returns(&self) -> bool {
        self.mean_returns.is_some() && !self.payoff.is_risk_measure()
    }

    /// Market scenario described by this config.
    pub fn scenario(&self) -> SimResult<MarketScenario> {
        let mean_returns = if self.payoff.is_risk_measure() {
            self.mean_returns.clone()
        } else {
            None
        };
        let scenario = MarketScenario {
            spots: self.spots(),
            rate: self.rate,
            dividend_yield: self.dividend_yield,
            volatility: self.volatility.clone(),
            mean_returns,
            maturity: self.maturity,
            n_steps: self.step_count,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    /// Check every parameter before anything is drawn.
    pub fn validate(&self) -> SimResult<()> {
        validation::at_least_one("path_count", self.path_count)?;
        validation::open_unit("confidence_level", self.confidence_level)?;
        self.payoff.validate()?;
        let scenario = self.scenario()?;

        let needed = self.payoff.n_assets();
        if scenario.n_assets() != needed {
            return Err(SimulationError::shape(
                format!("{needed} asset(s) for payoff `{}`", self.payoff.kind()),
                format!("{} simulated asset(s)", scenario.n_assets()),
            ));
        }
        Ok(())
    }
}

fn default_spot() -> f64 {
    100.0
}

fn default_rate() -> f64 {
    0.05
}

fn default_volatility() -> Volatility {
    Volatility::Scalar(0.2)
}

fn default_maturity() -> f64 {
    1.0
}

fn default_step_count() -> usize {
    252
}

fn default_path_count() -> usize {
    100_000
}

fn default_payoff() -> Payoff {
    Payoff::Vanilla {
        option_type: OptionType::Call,
        strike: 100.0,
    }
}

fn default_confidence_level() -> f64 {
    0.95
}

fn default_true() -> bool {
    true
}
