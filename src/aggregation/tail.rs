//! Value-at-Risk and Conditional Value-at-Risk.
//!
//! Tail risk is read on the outcome axis, where lower is worse: VaR at level
//! `α` percent is the `α`-th percentile of the outcomes and CVaR is the mean of
//! every outcome at or below VaR, so `cvar <= var` always holds. Loss
//! distributions, where higher is worse, use [`loss_tail_risk`] instead.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};
use crate::paths::PathSet;

/// Percentile definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PercentileMethod {
    /// Smallest sample with at least `p%` of the collection at or below it.
    #[default]
    NearestRank,
    /// Linear interpolation between closest ranks on `(n - 1) * p / 100`.
    Linear,
}

impl FromStr for PercentileMethod {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "nearest_rank" | "nearest" => Ok(PercentileMethod::NearestRank),
            "linear" => Ok(PercentileMethod::Linear),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "percentile method",
                value: s.to_string(),
            }),
        }
    }
}

/// VaR and CVaR of one sample collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TailRisk {
    pub var: f64,
    pub cvar: f64,
    pub percentile_level: f64,
    pub n_samples: usize,
    /// Samples averaged into CVaR
    pub tail_count: usize,
    /// Singleton tail or identical samples; CVaR equals VaR
    pub degenerate: bool,
}

/// `level`-th percentile (0..=100) of an ascending slice.
fn percentile_sorted(sorted: &[f64], level: f64, method: PercentileMethod) -> f64 {
    let n = sorted.len();
    match method {
        PercentileMethod::NearestRank => {
            // the epsilon keeps exact ranks such as 0.05 * 20 from rounding up
            let rank = (level / 100.0 * n as f64 - 1e-9).ceil();
            let rank = (rank.max(1.0) as usize).min(n);
            sorted[rank - 1]
        }
        PercentileMethod::Linear => {
            let pos = level / 100.0 * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            let frac = pos - lo as f64;
            sorted[lo] + frac * (sorted[hi] - sorted[lo])
        }
    }
}

fn sorted_samples(samples: &[f64]) -> SimResult<Vec<f64>> {
    if samples.is_empty() {
        return Err(SimulationError::EmptySample);
    }
    if let Some((i, x)) = samples.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(SimulationError::NonFinite(format!("sample {i} ({x})")));
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    Ok(sorted)
}

fn check_level(level: f64) -> SimResult<()> {
    if !(0.0..=100.0).contains(&level) {
        return Err(SimulationError::invalid(
            "percentile_level",
            level,
            "must be in [0, 100]",
        ));
    }
    Ok(())
}

/// `level`-th percentile of `samples`.
pub fn percentile(samples: &[f64], level: f64, method: PercentileMethod) -> SimResult<f64> {
    check_level(level)?;
    let sorted = sorted_samples(samples)?;
    Ok(percentile_sorted(&sorted, level, method))
}

/// Left-tail VaR/CVaR of outcomes at `percentile_level` percent (e.g. 5.0).
pub fn tail_risk(
    samples: &[f64],
    percentile_level: f64,
    method: PercentileMethod,
) -> SimResult<TailRisk> {
    check_level(percentile_level)?;
    let sorted = sorted_samples(samples)?;
    let var = percentile_sorted(&sorted, percentile_level, method);

    // var >= sorted[0] under both methods, so the tail is never empty
    let tail_count = sorted.partition_point(|&x| x <= var).max(1);
    let cvar = sorted[..tail_count].iter().sum::<f64>() / tail_count as f64;

    let identical = sorted[0] == sorted[sorted.len() - 1];
    let degenerate = tail_count == 1 || identical;

    Ok(TailRisk {
        var,
        cvar: if degenerate { var } else { cvar.min(var) },
        percentile_level,
        n_samples: sorted.len(),
        tail_count,
        degenerate,
    })
}

/// Upper-tail VaR/CVaR of a loss distribution at `confidence` (e.g. 0.99).
///
/// VaR is the `confidence` quantile of the losses and CVaR the mean of losses
/// at or above it, so `cvar >= var`.
pub fn loss_tail_risk(
    losses: &[f64],
    confidence: f64,
    method: PercentileMethod,
) -> SimResult<TailRisk> {
    crate::error::validation::open_unit("confidence_level", confidence)?;
    let percentile_level = confidence * 100.0;
    let sorted = sorted_samples(losses)?;
    let var = percentile_sorted(&sorted, percentile_level, method);

    let start = sorted.partition_point(|&x| x < var).min(sorted.len() - 1);
    let tail = &sorted[start..];
    let tail_count = tail.len();
    let cvar = tail.iter().sum::<f64>() / tail_count as f64;
    let degenerate = tail_count == 1 || sorted[0] == sorted[sorted.len() - 1];

    Ok(TailRisk {
        var,
        cvar: if degenerate { var } else { cvar.max(var) },
        percentile_level,
        n_samples: sorted.len(),
        tail_count,
        degenerate,
    })
}

/// Left-tail risk of the terminal levels of a single-asset path set.
pub fn tail_risk_of_paths(
    paths: &PathSet,
    percentile_level: f64,
    method: PercentileMethod,
) -> SimResult<TailRisk> {
    let terminal = paths.terminal_values()?;
    tail_risk(&terminal, percentile_level, method)
}
