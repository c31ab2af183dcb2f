//! One-factor Gaussian copula for a homogeneous credit portfolio.
//!
//! Each name has a latent asset value `A_j = √ρ M + √(1-ρ) ε_j` with a common
//! market factor `M` and idiosyncratic `ε_j`, all standard normal. Name `j`
//! defaults when `A_j < Φ⁻¹(p)`. A scenario's portfolio loss fraction is the
//! defaulted share of names times the loss given default `1 - R`.

use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use crate::aggregation::Estimate;
use crate::error::{validation, SimResult, SimulationError};

/// Homogeneous pool of `n_names` equally weighted credits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CopulaPortfolio {
    pub n_names: usize,
    pub default_probability: f64,
    /// Asset correlation ρ in [0, 1]
    pub correlation: f64,
    #[serde(default)]
    pub recovery_rate: f64,
    pub notional: f64,
}

impl CopulaPortfolio {
    pub fn new(
        n_names: usize,
        default_probability: f64,
        correlation: f64,
        notional: f64,
    ) -> SimResult<Self> {
        let portfolio = Self {
            n_names,
            default_probability,
            correlation,
            recovery_rate: 0.0,
            notional,
        };
        portfolio.validate()?;
        Ok(portfolio)
    }

    pub fn with_recovery_rate(mut self, recovery_rate: f64) -> SimResult<Self> {
        self.recovery_rate = recovery_rate;
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> SimResult<()> {
        validation::at_least_one("n_names", self.n_names)?;
        validation::open_unit("default_probability", self.default_probability)?;
        validation::finite("correlation", self.correlation)?;
        if !(0.0..=1.0).contains(&self.correlation) {
            return Err(SimulationError::invalid(
                "correlation",
                self.correlation,
                "must be in [0, 1]",
            ));
        }
        validation::finite("recovery_rate", self.recovery_rate)?;
        if !(0.0..=1.0).contains(&self.recovery_rate) {
            return Err(SimulationError::invalid(
                "recovery_rate",
                self.recovery_rate,
                "must be in [0, 1]",
            ));
        }
        validation::positive("notional", self.notional)
    }

    /// `Φ⁻¹(p)`.
    pub fn default_threshold(&self) -> SimResult<f64> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| SimulationError::Config(format!("standard normal: {e}")))?;
        Ok(normal.inverse_cdf(self.default_probability))
    }

    /// Expected portfolio loss fraction `p (1 - R)`.
    pub fn expected_loss_fraction(&self) -> f64 {
        self.default_probability * (1.0 - self.recovery_rate)
    }
}

/// Capital-structure slice `[attachment, detachment)` of the pool notional.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tranche {
    pub attachment: f64,
    pub detachment: f64,
}

impl Tranche {
    pub fn new(attachment: f64, detachment: f64) -> SimResult<Self> {
        let tranche = Self {
            attachment,
            detachment,
        };
        tranche.validate()?;
        Ok(tranche)
    }

    /// 0-3%
    pub fn equity() -> Self {
        Self {
            attachment: 0.0,
            detachment: 0.03,
        }
    }

    /// 3-7%
    pub fn mezzanine() -> Self {
        Self {
            attachment: 0.03,
            detachment: 0.07,
        }
    }

    pub fn validate(&self) -> SimResult<()> {
        validation::finite("attachment", self.attachment)?;
        validation::finite("detachment", self.detachment)?;
        if self.attachment < 0.0 || self.detachment > 1.0 || self.attachment >= self.detachment {
            return Err(SimulationError::invalid(
                "tranche",
                self.attachment,
                format!(
                    "need 0 <= attachment < detachment <= 1, got [{}, {})",
                    self.attachment, self.detachment
                ),
            ));
        }
        Ok(())
    }

    pub fn width(&self) -> f64 {
        self.detachment - self.attachment
    }

    /// Share of the tranche wiped out by a portfolio loss fraction, in [0, 1].
    pub fn loss_fraction(&self, portfolio_loss: f64) -> f64 {
        (portfolio_loss - self.attachment).max(0.0).min(self.width()) / self.width()
    }
}

/// Portfolio loss fraction of each of `n_scenarios` copula draws.
pub fn simulate_portfolio_losses(
    portfolio: &CopulaPortfolio,
    rng: &mut dyn RngCore,
    n_scenarios: usize,
) -> SimResult<Vec<f64>> {
    portfolio.validate()?;
    validation::at_least_one("scenario_count", n_scenarios)?;

    let threshold = portfolio.default_threshold()?;
    let systematic = portfolio.correlation.sqrt();
    let idiosyncratic = (1.0 - portfolio.correlation).sqrt();
    let lgd = 1.0 - portfolio.recovery_rate;
    let n = portfolio.n_names;

    let losses = (0..n_scenarios)
        .map(|_| {
            let market: f64 = StandardNormal.sample(&mut *rng);
            let defaults = (0..n)
                .filter(|_| {
                    let eps: f64 = StandardNormal.sample(&mut *rng);
                    systematic * market + idiosyncratic * eps < threshold
                })
                .count();
            defaults as f64 / n as f64 * lgd
        })
        .collect();
    Ok(losses)
}

/// Expected loss of each tranche as a fraction of its width, with standard errors.
pub fn expected_tranche_losses(
    portfolio: &CopulaPortfolio,
    tranches: &[Tranche],
    rng: &mut dyn RngCore,
    n_scenarios: usize,
) -> SimResult<Vec<Estimate>> {
    for tranche in tranches {
        tranche.validate()?;
    }
    let losses = simulate_portfolio_losses(portfolio, rng, n_scenarios)?;
    tracing::debug!(
        n_scenarios,
        correlation = portfolio.correlation,
        n_tranches = tranches.len(),
        "simulated copula losses"
    );

    tranches
        .iter()
        .map(|tranche| {
            let samples: Vec<f64> = losses.iter().map(|&l| tranche.loss_fraction(l)).collect();
            Estimate::from_samples(&samples)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::utils::rng_from_seed;

    #[test]
    fn test_tranche_loss_fraction() {
        let mezz = Tranche::mezzanine();
        assert_eq!(mezz.loss_fraction(0.02), 0.0);
        assert!((mezz.loss_fraction(0.05) - 0.5).abs() < 1e-12);
        assert_eq!(mezz.loss_fraction(0.5), 1.0);
        assert!((Tranche::equity().loss_fraction(0.015) - 0.5).abs() < 1e-12);
        assert!(Tranche::new(0.07, 0.03).is_err());
    }

    #[test]
    fn test_threshold_is_normal_quantile() {
        let p = CopulaPortfolio::new(125, 0.02, 0.3, 100.0).unwrap();
        assert!((p.default_threshold().unwrap() + 2.053748910631823).abs() < 1e-6);
    }

    #[test]
    fn test_mean_loss_matches_default_probability() {
        let p = CopulaPortfolio::new(125, 0.02, 0.3, 100.0)
            .unwrap()
            .with_recovery_rate(0.4)
            .unwrap();
        let mut rng = rng_from_seed(Some(5));
        let losses = simulate_portfolio_losses(&p, &mut rng, 20_000).unwrap();
        let e = Estimate::from_samples(&losses).unwrap();
        assert!(
            e.contains(p.expected_loss_fraction(), 4.0),
            "mean loss {} vs {}",
            e,
            p.expected_loss_fraction()
        );
    }

    #[test]
    fn test_correlation_shifts_loss_to_senior_tranches() {
        let tranches = [Tranche::equity(), Tranche::mezzanine()];
        let low = CopulaPortfolio::new(125, 0.02, 0.0, 100.0).unwrap();
        let high = CopulaPortfolio::new(125, 0.02, 0.6, 100.0).unwrap();

        let mut rng = rng_from_seed(Some(9));
        let el_low = expected_tranche_losses(&low, &tranches, &mut rng, 5_000).unwrap();
        let el_high = expected_tranche_losses(&high, &tranches, &mut rng, 5_000).unwrap();

        assert!(el_high[0].value < el_low[0].value, "equity loss should fall");
        assert!(el_high[1].value > el_low[1].value, "mezzanine loss should rise");
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(CopulaPortfolio::new(0, 0.02, 0.3, 100.0).is_err());
        assert!(CopulaPortfolio::new(10, 1.0, 0.3, 100.0).is_err());
        assert!(CopulaPortfolio::new(10, 0.02, 1.3, 100.0).is_err());
    }
}
