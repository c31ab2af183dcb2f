use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::aggregation::estimator::Estimate;
use crate::aggregation::tail::TailRisk;
use crate::error::{validation, SimResult, SimulationError};

/// Scalar volatility for one asset, or a covariance matrix for a basket.
///
/// Both are per unit of time (annualised when `maturity` is in years).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Volatility {
    Scalar(f64),
    Covariance(Vec<Vec<f64>>),
}

impl Volatility {
    pub fn dimension(&self) -> usize {
        match self {
            Volatility::Scalar(_) => 1,
            Volatility::Covariance(rows) => rows.len(),
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        match self {
            Volatility::Scalar(sigma) => validation::non_negative("volatility", *sigma),
            Volatility::Covariance(rows) => {
                let n = rows.len();
                if n == 0 {
                    return Err(SimulationError::shape("non-empty covariance", "0x0 matrix"));
                }
                for (i, row) in rows.iter().enumerate() {
                    if row.len() != n {
                        return Err(SimulationError::shape(
                            format!("{n}x{n} covariance"),
                            format!("row {i} with {} columns", row.len()),
                        ));
                    }
                    for v in row {
                        validation::finite("covariance entry", *v)?;
                    }
                    validation::non_negative("covariance diagonal", row[i])?;
                }
                for i in 0..n {
                    for j in (i + 1)..n {
                        let (a, b) = (rows[i][j], rows[j][i]);
                        let scale = a.abs().max(b.abs()).max(1e-300);
                        if (a - b).abs() > 1e-10 * scale {
                            return Err(SimulationError::invalid(
                                "covariance",
                                a - b,
                                format!("must be symmetric (entry ({i},{j}) != ({j},{i}))"),
                            ));
                        }
                    }
                }
                Ok(())
            }
        }
    }
}

/// How draws are combined across paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceReduction {
    #[default]
    None,
    /// Each draw vector `Z` is also used as `-Z`; paired payoffs are averaged
    /// before the standard error is computed.
    Antithetic,
}

impl FromStr for VarianceReduction {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "plain" => Ok(VarianceReduction::None),
            "antithetic" => Ok(VarianceReduction::Antithetic),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "variance reduction",
                value: s.to_string(),
            }),
        }
    }
}

/// Immutable market inputs of one simulation run.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketScenario {
    /// One initial level per asset.
    pub spots: Vec<f64>,
    pub rate: f64,
    pub dividend_yield: f64,
    pub volatility: Volatility,
    /// Real-world drift per asset; when absent the risk-neutral `rate - dividend_yield` applies.
    pub mean_returns: Option<Vec<f64>>,
    pub maturity: f64,
    pub n_steps: usize,
}

impl MarketScenario {
    pub fn single_asset(
        spot: f64,
        rate: f64,
        dividend_yield: f64,
        volatility: f64,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        let scenario = Self {
            spots: vec![spot],
            rate,
            dividend_yield,
            volatility: Volatility::Scalar(volatility),
            mean_returns: None,
            maturity,
            n_steps,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn multi_asset(
        spots: Vec<f64>,
        mean_returns: Vec<f64>,
        covariance: Vec<Vec<f64>>,
        maturity: f64,
        n_steps: usize,
    ) -> SimResult<Self> {
        let scenario = Self {
            spots,
            rate: 0.0,
            dividend_yield: 0.0,
            volatility: Volatility::Covariance(covariance),
            mean_returns: Some(mean_returns),
            maturity,
            n_steps,
        };
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> SimResult<()> {
        for s in &self.spots {
            validation::positive("spot", *s)?;
        }
        validation::finite("rate", self.rate)?;
        validation::finite("dividend_yield", self.dividend_yield)?;
        validation::positive("maturity", self.maturity)?;
        validation::at_least_one("step_count", self.n_steps)?;
        self.volatility.validate()?;

        let n = self.n_assets();
        if self.spots.len() != n {
            return Err(SimulationError::shape(
                format!("{n} spots for a {n}-asset volatility"),
                format!("{} spots", self.spots.len()),
            ));
        }
        if let Some(mu) = &self.mean_returns {
            if mu.len() != n {
                return Err(SimulationError::shape(
                    format!("{n} mean returns"),
                    format!("{}", mu.len()),
                ));
            }
            for m in mu {
                validation::finite("mean return", *m)?;
            }
        }
        Ok(())
    }

    pub fn n_assets(&self) -> usize {
        self.volatility.dimension()
    }

    /// Drift of asset `i`.
    pub fn drift(&self, i: usize) -> f64 {
        match &self.mean_returns {
            Some(mu) => mu[i],
            None => self.rate - self.dividend_yield,
        }
    }

    pub fn scalar_volatility(&self) -> SimResult<f64> {
        match &self.volatility {
            Volatility::Scalar(sigma) => Ok(*sigma),
            Volatility::Covariance(rows) => Err(SimulationError::shape(
                "scalar volatility",
                format!("{}x{} covariance", rows.len(), rows.len()),
            )),
        }
    }

    pub fn discount_factor(&self) -> f64 {
        crate::models::utils::discount_factor(self.rate, self.maturity)
    }
}

/// Discounted Monte Carlo price with its standard error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingResult {
    /// Payoff rule name
    pub payoff: String,
    /// Discounted mean payoff
    pub estimate: f64,
    /// Sample standard deviation of discounted samples over sqrt(samples)
    pub standard_error: f64,
    /// Samples entering the estimate (antithetic pairs count once)
    pub n_samples: usize,
    /// Paths actually simulated
    pub n_paths: usize,
    pub discount_factor: f64,
    /// Whether the single-step terminal simulation was used
    pub terminal_shortcut: bool,
}

impl PricingResult {
    pub(crate) fn from_estimate(
        payoff: String,
        estimate: Estimate,
        n_paths: usize,
        discount_factor: f64,
        terminal_shortcut: bool,
    ) -> Self {
        Self {
            payoff,
            estimate: estimate.value,
            standard_error: estimate.std_error,
            n_samples: estimate.n_samples,
            n_paths,
            discount_factor,
            terminal_shortcut,
        }
    }

    pub fn as_estimate(&self) -> Estimate {
        Estimate {
            value: self.estimate,
            std_error: self.standard_error,
            n_samples: self.n_samples,
        }
    }
}

impl fmt::Display for PricingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {:.4} +/- {:.4} ({} samples)",
            self.payoff, self.estimate, self.standard_error, self.n_samples
        )
    }
}

/// Tail statistics of simulated portfolio values.
///
/// `var` and `cvar` are levels on the portfolio-value axis (left tail, lower is
/// worse), so `cvar <= var`. The `*_return` fields express them relative to the
/// initial value and the `*_loss` helpers as positive currency shortfalls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub var: f64,
    pub cvar: f64,
    /// Percentile used for VaR, e.g. 5.0 for 95% confidence
    pub percentile_level: f64,
    pub initial_value: f64,
    pub var_return: f64,
    pub cvar_return: f64,
    pub n_samples: usize,
    /// True when CVaR collapsed onto VaR (singleton tail or identical samples)
    pub degenerate: bool,
}

impl RiskResult {
    pub(crate) fn from_tail(tail: TailRisk, initial_value: f64) -> Self {
        Self {
            var: tail.var,
            cvar: tail.cvar,
            percentile_level: tail.percentile_level,
            initial_value,
            var_return: tail.var / initial_value - 1.0,
            cvar_return: tail.cvar / initial_value - 1.0,
            n_samples: tail.n_samples,
            degenerate: tail.degenerate,
        }
    }

    pub fn var_loss(&self) -> f64 {
        self.initial_value - self.var
    }

    pub fn cvar_loss(&self) -> f64 {
        self.initial_value - self.cvar
    }
}

impl fmt::Display for RiskResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VaR({:.1}%) = {:.2} ({:+.2}%), CVaR = {:.2} ({:+.2}%)",
            self.percentile_level,
            self.var,
            self.var_return * 100.0,
            self.cvar,
            self.cvar_return * 100.0
        )
    }
}

/// Result of a run: a price for option payoffs, tail risk for portfolios.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SimulationOutput {
    Pricing(PricingResult),
    Risk(RiskResult),
}

impl SimulationOutput {
    pub fn pricing(&self) -> Option<&PricingResult> {
        match self {
            SimulationOutput::Pricing(p) => Some(p),
            SimulationOutput::Risk(_) => None,
        }
    }

    pub fn risk(&self) -> Option<&RiskResult> {
        match self {
            SimulationOutput::Risk(r) => Some(r),
            SimulationOutput::Pricing(_) => None,
        }
    }
}
