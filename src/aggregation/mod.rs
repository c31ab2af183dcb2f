//! Reduction of payoff samples to results.
//!
//! [`estimator`] turns payoffs into a discounted price with its standard error;
//! [`tail`] turns outcome samples into VaR/CVaR.

pub mod estimator;
pub mod tail;

pub use estimator::{discounted_price, pair_antithetic, Estimate};
pub use tail::{loss_tail_risk, percentile, tail_risk, tail_risk_of_paths, PercentileMethod, TailRisk};
