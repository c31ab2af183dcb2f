//! Payoff rules applied to simulated paths.
//!
//! Every rule is a variant of the closed [`Payoff`] enum carrying its own typed
//! parameters, and evaluation is an exhaustive `match`. Evaluation is pure: the
//! same path always yields the same payoff, so paths can be evaluated in any
//! order or in parallel.
//!
//! | rule | payoff |
//! |------|--------|
//! | `vanilla` | `max(S_T - K, 0)` / `max(K - S_T, 0)` |
//! | `asian_average` | vanilla payoff on the arithmetic mean of `S_1..S_N` |
//! | `lookback` | `S_T - min S` (call) / `max S - S_T` (put) |
//! | `barrier` | vanilla payoff gated by a barrier touch |
//! | `cliquet` | `notional * clip(sum clip(r_i, lf, lc), gf, gc)` |
//! | `digital` | `cash` if the option finishes in the money |
//! | `portfolio_value` | compounded value of a constant-mix basket |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{validation, SimResult, SimulationError};
use crate::paths::PathView;

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    /// Intrinsic value against `strike`.
    pub fn intrinsic(self, underlying: f64, strike: f64) -> f64 {
        match self {
            OptionType::Call => (underlying - strike).max(0.0),
            OptionType::Put => (strike - underlying).max(0.0),
        }
    }
}

impl FromStr for OptionType {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "call" | "c" => Ok(OptionType::Call),
            "put" | "p" => Ok(OptionType::Put),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "option type",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionType::Call => write!(f, "call"),
            OptionType::Put => write!(f, "put"),
        }
    }
}

/// Whether touching the barrier activates or extinguishes the option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    KnockIn,
    KnockOut,
}

impl FromStr for BarrierKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "knock_in" | "in" => Ok(BarrierKind::KnockIn),
            "knock_out" | "out" => Ok(BarrierKind::KnockOut),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "barrier kind",
                value: s.to_string(),
            }),
        }
    }
}

/// Side from which the barrier is approached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BarrierDirection {
    /// Touched when a level is at or above the barrier.
    Up,
    /// Touched when a level is at or below the barrier.
    Down,
}

impl FromStr for BarrierDirection {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "up" => Ok(BarrierDirection::Up),
            "down" => Ok(BarrierDirection::Down),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "barrier direction",
                value: s.to_string(),
            }),
        }
    }
}

/// Field-less tag of each payoff rule, parseable from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayoffKind {
    Vanilla,
    AsianAverage,
    Lookback,
    Barrier,
    Cliquet,
    Digital,
    PortfolioValue,
}

impl PayoffKind {
    pub fn name(self) -> &'static str {
        match self {
            PayoffKind::Vanilla => "vanilla",
            PayoffKind::AsianAverage => "asian_average",
            PayoffKind::Lookback => "lookback",
            PayoffKind::Barrier => "barrier",
            PayoffKind::Cliquet => "cliquet",
            PayoffKind::Digital => "digital",
            PayoffKind::PortfolioValue => "portfolio_value",
        }
    }
}

impl FromStr for PayoffKind {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "vanilla" | "terminal_vanilla" => Ok(PayoffKind::Vanilla),
            "asian_average" | "path_average" => Ok(PayoffKind::AsianAverage),
            "lookback" | "path_extremum" => Ok(PayoffKind::Lookback),
            "barrier" => Ok(PayoffKind::Barrier),
            "cliquet" | "periodic_clipped_sum" => Ok(PayoffKind::Cliquet),
            "digital" => Ok(PayoffKind::Digital),
            "portfolio_value" => Ok(PayoffKind::PortfolioValue),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "payoff rule",
                value: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for PayoffKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A payoff rule and its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Payoff {
    Vanilla {
        option_type: OptionType,
        strike: f64,
    },
    AsianAverage {
        option_type: OptionType,
        strike: f64,
    },
    /// Floating-strike lookback.
    Lookback { option_type: OptionType },
    Barrier {
        option_type: OptionType,
        strike: f64,
        kind: BarrierKind,
        direction: BarrierDirection,
        level: f64,
    },
    Cliquet {
        local_cap: f64,
        local_floor: f64,
        global_cap: f64,
        global_floor: f64,
        notional: f64,
    },
    /// Cash-or-nothing.
    Digital {
        option_type: OptionType,
        strike: f64,
        cash: f64,
    },
    /// Final value of a basket rebalanced to constant `weights` every step.
    PortfolioValue {
        weights: Vec<f64>,
        initial_value: f64,
    },
}

impl Payoff {
    pub fn kind(&self) -> PayoffKind {
        match self {
            Payoff::Vanilla { .. } => PayoffKind::Vanilla,
            Payoff::AsianAverage { .. } => PayoffKind::AsianAverage,
            Payoff::Lookback { .. } => PayoffKind::Lookback,
            Payoff::Barrier { .. } => PayoffKind::Barrier,
            Payoff::Cliquet { .. } => PayoffKind::Cliquet,
            Payoff::Digital { .. } => PayoffKind::Digital,
            Payoff::PortfolioValue { .. } => PayoffKind::PortfolioValue,
        }
    }

    /// False when only the terminal level matters, which allows the
    /// single-step terminal simulation.
    pub fn requires_full_path(&self) -> bool {
        !matches!(self, Payoff::Vanilla { .. } | Payoff::Digital { .. })
    }

    /// Portfolio outcomes are reduced to VaR/CVaR instead of a discounted price.
    pub fn is_risk_measure(&self) -> bool {
        matches!(self, Payoff::PortfolioValue { .. })
    }

    /// Number of assets the rule reads from each path.
    pub fn n_assets(&self) -> usize {
        match self {
            Payoff::PortfolioValue { weights, .. } => weights.len(),
            _ => 1,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        match self {
            Payoff::Vanilla { strike, .. } | Payoff::AsianAverage { strike, .. } => {
                validation::positive("strike", *strike)
            }
            Payoff::Lookback { .. } => Ok(()),
            Payoff::Barrier { strike, level, .. } => {
                validation::positive("strike", *strike)?;
                validation::positive("barrier level", *level)
            }
            Payoff::Cliquet {
                local_cap,
                local_floor,
                global_cap,
                global_floor,
                notional,
            } => {
                for (name, v) in [
                    ("local_cap", *local_cap),
                    ("local_floor", *local_floor),
                    ("global_cap", *global_cap),
                    ("global_floor", *global_floor),
                ] {
                    validation::finite(name, v)?;
                }
                validation::positive("notional", *notional)?;
                if local_floor > local_cap {
                    return Err(SimulationError::invalid(
                        "local_floor",
                        *local_floor,
                        format!("must not exceed local_cap ({})", local_cap),
                    ));
                }
                if global_floor > global_cap {
                    return Err(SimulationError::invalid(
                        "global_floor",
                        *global_floor,
                        format!("must not exceed global_cap ({})", global_cap),
                    ));
                }
                Ok(())
            }
            Payoff::Digital { strike, cash, .. } => {
                validation::positive("strike", *strike)?;
                validation::non_negative("cash", *cash)
            }
            Payoff::PortfolioValue {
                weights,
                initial_value,
            } => {
                if weights.is_empty() {
                    return Err(SimulationError::shape("at least one weight", "0 weights"));
                }
                for w in weights {
                    validation::finite("weight", *w)?;
                }
                validation::positive("initial_value", *initial_value)
            }
        }
    }

    /// Payoff of one path. The path must carry [`Payoff::n_assets`] assets.
    pub fn evaluate(&self, path: PathView<'_>) -> f64 {
        match self {
            Payoff::Vanilla {
                option_type,
                strike,
            } => option_type.intrinsic(path.terminal(0), *strike),

            Payoff::AsianAverage {
                option_type,
                strike,
            } => option_type.intrinsic(observed_average(path), *strike),

            Payoff::Lookback { option_type } => {
                let terminal = path.terminal(0);
                match option_type {
                    OptionType::Call => {
                        let min = series(path).fold(f64::INFINITY, f64::min);
                        (terminal - min).max(0.0)
                    }
                    OptionType::Put => {
                        let max = series(path).fold(f64::NEG_INFINITY, f64::max);
                        (max - terminal).max(0.0)
                    }
                }
            }

            Payoff::Barrier {
                option_type,
                strike,
                kind,
                direction,
                level,
            } => {
                let touched = barrier_touched(path, *direction, *level);
                let active = match kind {
                    BarrierKind::KnockIn => touched,
                    BarrierKind::KnockOut => !touched,
                };
                if active {
                    option_type.intrinsic(path.terminal(0), *strike)
                } else {
                    0.0
                }
            }

            Payoff::Cliquet {
                local_cap,
                local_floor,
                global_cap,
                global_floor,
                notional,
            } => {
                let levels: Vec<f64> = series(path).collect();
                let total: f64 = levels
                    .windows(2)
                    .map(|w| {
                        let period_return = if w[0] > 0.0 { w[1] / w[0] - 1.0 } else { 0.0 };
                        period_return.max(*local_floor).min(*local_cap)
                    })
                    .sum();
                notional * total.max(*global_floor).min(*global_cap)
            }

            Payoff::Digital {
                option_type,
                strike,
                cash,
            } => {
                let terminal = path.terminal(0);
                let in_the_money = match option_type {
                    OptionType::Call => terminal > *strike,
                    OptionType::Put => terminal < *strike,
                };
                if in_the_money {
                    *cash
                } else {
                    0.0
                }
            }

            Payoff::PortfolioValue {
                weights,
                initial_value,
            } => {
                let mut value = *initial_value;
                let mut prev = path.at_step(0);
                for current in path.steps().skip(1) {
                    let basket_return: f64 = weights
                        .iter()
                        .zip(prev.iter().zip(current))
                        .map(|(w, (p, c))| if *p > 0.0 { w * (c / p - 1.0) } else { 0.0 })
                        .sum();
                    value *= 1.0 + basket_return;
                    prev = current;
                }
                value
            }
        }
    }
}

/// Levels of the first asset, step 0 included.
fn series<'a>(path: PathView<'a>) -> impl Iterator<Item = f64> + 'a {
    path.steps().map(|s| s[0])
}

/// Arithmetic mean over the monitoring dates `1..=N`; a path without
/// monitoring dates averages to its initial level.
fn observed_average(path: PathView<'_>) -> f64 {
    let n = path.n_steps();
    if n == 0 {
        return path.terminal(0);
    }
    series(path).skip(1).sum::<f64>() / n as f64
}

fn barrier_touched(path: PathView<'_>, direction: BarrierDirection, level: f64) -> bool {
    match direction {
        BarrierDirection::Up => series(path).any(|s| s >= level),
        BarrierDirection::Down => series(path).any(|s| s <= level),
    }
}
