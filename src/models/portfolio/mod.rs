//! Correlated multi-asset GBM for portfolio simulations.
//!
//! Each asset follows
//!
//! ```text
//! ln S_i(t+Δt) = ln S_i(t) + (μ_i - Σ_ii/2) Δt + √Δt (F Z)_i
//! ```
//!
//! with `F Fᵀ = Σ`. `F` is the Cholesky factor when `Σ` is positive definite.
//! Estimated covariance matrices are often only semi-definite, or slightly
//! indefinite from estimation noise; those are factorized through a symmetric
//! eigen-decomposition with negative eigenvalues clipped to zero,
//! `F = V diag(√λ⁺)`, which reconstructs the nearest PSD matrix `V diag(λ⁺) Vᵀ`.

use std::fmt;
use std::str::FromStr;

use nalgebra::{DMatrix, DVector};
use rand::RngCore;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};

use crate::error::{validation, SimResult, SimulationError};
use crate::models::traits::PathModel;
use crate::models::utils::simulated_path_count;
use crate::paths::PathSet;
use crate::simulation::types::{MarketScenario, Volatility};

/// What to do with a covariance matrix that is not positive semi-definite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PsdRepair {
    /// Clip negative eigenvalues to zero and log a warning.
    #[default]
    ClipEigenvalues,
    /// Fail with [`SimulationError::NonPositiveSemiDefinite`].
    Strict,
}

impl FromStr for PsdRepair {
    type Err = SimulationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "clip" | "clip_eigenvalues" => Ok(PsdRepair::ClipEigenvalues),
            "strict" => Ok(PsdRepair::Strict),
            _ => Err(SimulationError::UnrecognizedName {
                kind: "psd repair policy",
                value: s.to_string(),
            }),
        }
    }
}

/// How the factor was obtained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Factorization {
    Cholesky,
    /// Eigen-decomposition; `clipped` counts eigenvalues raised to zero.
    Eigen { min_eigenvalue: f64, clipped: usize },
}

impl fmt::Display for Factorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Factorization::Cholesky => write!(f, "cholesky"),
            Factorization::Eigen {
                min_eigenvalue,
                clipped,
            } => write!(
                f,
                "eigen (min eigenvalue {:.3e}, {} clipped)",
                min_eigenvalue, clipped
            ),
        }
    }
}

/// A matrix `F` with `F Fᵀ` equal to the (possibly repaired) covariance.
#[derive(Debug, Clone, PartialEq)]
pub struct CovarianceFactor {
    pub factor: DMatrix<f64>,
    pub method: Factorization,
}

impl CovarianceFactor {
    pub fn dimension(&self) -> usize {
        self.factor.nrows()
    }

    /// True when the covariance had to be altered to become PSD.
    pub fn is_repaired(&self) -> bool {
        matches!(self.method, Factorization::Eigen { clipped, .. } if clipped > 0)
    }

    /// `F Fᵀ`, the covariance actually simulated.
    pub fn reconstructed(&self) -> DMatrix<f64> {
        &self.factor * self.factor.transpose()
    }

    /// Diagonal of [`CovarianceFactor::reconstructed`].
    pub fn variances(&self) -> Vec<f64> {
        self.factor
            .row_iter()
            .map(|row| row.iter().map(|v| v * v).sum::<f64>())
            .collect()
    }
}

/// Factorize `covariance` for correlated draws.
pub fn factorize_covariance(
    covariance: &[Vec<f64>],
    repair: PsdRepair,
) -> SimResult<CovarianceFactor> {
    Volatility::Covariance(covariance.to_vec()).validate()?;
    let n = covariance.len();
    let matrix = DMatrix::from_fn(n, n, |i, j| covariance[i][j]);

    if let Some(chol) = matrix.clone().cholesky() {
        let factor = chol.l();
        if factor.iter().all(|v| v.is_finite()) {
            return Ok(CovarianceFactor {
                factor,
                method: Factorization::Cholesky,
            });
        }
    }

    let eigen = matrix.symmetric_eigen();
    let min_eigenvalue = eigen.eigenvalues.min();
    let max_abs = eigen.eigenvalues.amax().max(f64::MIN_POSITIVE);
    // negative eigenvalues within round-off of zero are a singular PSD matrix
    let tolerance = 1e-10 * max_abs;
    let clipped = eigen.eigenvalues.iter().filter(|&&l| l < 0.0).count();

    if min_eigenvalue < -tolerance {
        match repair {
            PsdRepair::Strict => {
                return Err(SimulationError::NonPositiveSemiDefinite { min_eigenvalue });
            }
            PsdRepair::ClipEigenvalues => {
                tracing::warn!(
                    min_eigenvalue,
                    clipped,
                    "covariance is not positive semi-definite, clipping negative eigenvalues"
                );
            }
        }
    } else {
        tracing::debug!(min_eigenvalue, "covariance is singular, using eigen factor");
    }

    let sqrt_lambda: DVector<f64> = eigen.eigenvalues.map(|l| l.max(0.0).sqrt());
    let factor = &eigen.eigenvectors * DMatrix::from_diagonal(&sqrt_lambda);

    Ok(CovarianceFactor {
        factor,
        method: Factorization::Eigen {
            min_eigenvalue,
            clipped: if min_eigenvalue < -tolerance { clipped } else { 0 },
        },
    })
}

/// Correlated GBM basket.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelatedGbmModel {
    pub spots: Vec<f64>,
    pub drifts: Vec<f64>,
    pub factor: CovarianceFactor,
    pub maturity: f64,
    pub n_steps: usize,
}

impl CorrelatedGbmModel {
    pub fn new(
        spots: Vec<f64>,
        drifts: Vec<f64>,
        covariance: &[Vec<f64>],
        maturity: f64,
        n_steps: usize,
        repair: PsdRepair,
    ) -> SimResult<Self> {
        let factor = factorize_covariance(covariance, repair)?;
        let model = Self {
            spots,
            drifts,
            factor,
            maturity,
            n_steps,
        };
        model.validate()?;
        Ok(model)
    }

    pub fn from_scenario(scenario: &MarketScenario, repair: PsdRepair) -> SimResult<Self> {
        let covariance = match &scenario.volatility {
            Volatility::Covariance(rows) => rows.clone(),
            Volatility::Scalar(sigma) => vec![vec![sigma * sigma]],
        };
        let drifts = (0..scenario.n_assets()).map(|i| scenario.drift(i)).collect();
        Self::new(
            scenario.spots.clone(),
            drifts,
            &covariance,
            scenario.maturity,
            scenario.n_steps,
            repair,
        )
    }

    pub fn validate(&self) -> SimResult<()> {
        let n = self.factor.dimension();
        if self.spots.len() != n || self.drifts.len() != n {
            return Err(SimulationError::shape(
                format!("{n} spots and drifts"),
                format!("{} spots, {} drifts", self.spots.len(), self.drifts.len()),
            ));
        }
        for s in &self.spots {
            validation::positive("spot", *s)?;
        }
        for d in &self.drifts {
            validation::finite("drift", *d)?;
        }
        validation::positive("maturity", self.maturity)?;
        validation::at_least_one("step_count", self.n_steps)
    }

    fn fill_path(&self, levels: &mut [f64], shocks: &[DVector<f64>], sign: f64, nudt: &[f64]) {
        let n = self.spots.len();
        let sqrt_dt = self.dt().sqrt();
        let mut ln_s: Vec<f64> = self.spots.iter().map(|s| s.ln()).collect();
        for (step, shock) in shocks.iter().enumerate() {
            let row = &mut levels[(step + 1) * n..(step + 2) * n];
            for i in 0..n {
                ln_s[i] += nudt[i] + sign * sqrt_dt * shock[i];
                row[i] = ln_s[i].exp();
            }
        }
    }
}

impl PathModel for CorrelatedGbmModel {
    fn n_assets(&self) -> usize {
        self.spots.len()
    }

    fn n_steps(&self) -> usize {
        self.n_steps
    }

    fn maturity(&self) -> f64 {
        self.maturity
    }

    fn simulate(&self, rng: &mut dyn RngCore, n_paths: usize, antithetic: bool) -> PathSet {
        let n = self.n_assets();
        let dt = self.dt();
        let nudt: Vec<f64> = self
            .drifts
            .iter()
            .zip(self.factor.variances())
            .map(|(mu, var)| (mu - 0.5 * var) * dt)
            .collect();

        let total = simulated_path_count(n_paths, antithetic);
        let mut paths = PathSet::with_initial(total, self.n_steps, &self.spots);
        let mut z = DVector::<f64>::zeros(n);
        let mut shocks = vec![DVector::<f64>::zeros(n); self.n_steps];

        let draws = if antithetic { total / 2 } else { total };
        for k in 0..draws {
            for shock in shocks.iter_mut() {
                for zi in z.iter_mut() {
                    *zi = StandardNormal.sample(&mut *rng);
                }
                self.factor.factor.mul_to(&z, shock);
            }
            if antithetic {
                self.fill_path(paths.path_mut(2 * k), &shocks, 1.0, &nudt);
                self.fill_path(paths.path_mut(2 * k + 1), &shocks, -1.0, &nudt);
            } else {
                self.fill_path(paths.path_mut(k), &shocks, 1.0, &nudt);
            }
        }

        if antithetic {
            paths.mark_antithetic()
        } else {
            paths
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::utils::rng_from_seed;

    fn assert_matrix_close(a: &DMatrix<f64>, b: &[Vec<f64>], tol: f64) {
        for i in 0..b.len() {
            for j in 0..b.len() {
                assert!(
                    (a[(i, j)] - b[i][j]).abs() < tol,
                    "entry ({i},{j}): {} vs {}",
                    a[(i, j)],
                    b[i][j]
                );
            }
        }
    }

    #[test]
    fn test_cholesky_for_positive_definite() {
        let cov = vec![vec![0.04, 0.006], vec![0.006, 0.09]];
        let f = factorize_covariance(&cov, PsdRepair::Strict).unwrap();
        assert_eq!(f.method, Factorization::Cholesky);
        assert!(!f.is_repaired());
        assert_matrix_close(&f.reconstructed(), &cov, 1e-14);
    }

    #[test]
    fn test_singular_psd_uses_eigen_without_repair() {
        // perfectly correlated assets
        let cov = vec![vec![0.04, 0.04], vec![0.04, 0.04]];
        let f = factorize_covariance(&cov, PsdRepair::Strict).unwrap();
        assert!(!f.is_repaired());
        assert_matrix_close(&f.reconstructed(), &cov, 1e-12);
    }

    #[test]
    fn test_indefinite_matrix_is_clipped_or_rejected() {
        // correlation 1.2 between unit-variance assets: eigenvalues 2.2, -0.2
        let cov = vec![vec![1.0, 1.2], vec![1.2, 1.0]];
        assert!(matches!(
            factorize_covariance(&cov, PsdRepair::Strict),
            Err(SimulationError::NonPositiveSemiDefinite { .. })
        ));

        let f = factorize_covariance(&cov, PsdRepair::ClipEigenvalues).unwrap();
        assert!(f.is_repaired());
        let fixed = f.reconstructed();
        // clipped matrix: 1.1 * [[1, 1], [1, 1]]
        assert_matrix_close(&fixed, &[vec![1.1, 1.1], vec![1.1, 1.1]], 1e-10);
        assert!(fixed.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_asymmetric_matrix_rejected() {
        let cov = vec![vec![1.0, 0.5], vec![0.1, 1.0]];
        assert!(factorize_covariance(&cov, PsdRepair::ClipEigenvalues).is_err());
    }

    #[test]
    fn test_simulated_log_returns_match_covariance() {
        let cov = vec![vec![0.04, 0.03], vec![0.03, 0.09]];
        let model =
            CorrelatedGbmModel::new(vec![1.0, 1.0], vec![0.0, 0.0], &cov, 1.0, 1, PsdRepair::Strict)
                .unwrap();
        let mut rng = rng_from_seed(Some(42));
        let paths = model.simulate(&mut rng, 40_000, false);

        let x: Vec<f64> = (0..paths.n_paths()).map(|p| paths.level(p, 1, 0).ln()).collect();
        let y: Vec<f64> = (0..paths.n_paths()).map(|p| paths.level(p, 1, 1).ln()).collect();
        let mean = |v: &[f64]| v.iter().sum::<f64>() / v.len() as f64;
        let (mx, my) = (mean(&x), mean(&y));
        let cxy = x
            .iter()
            .zip(&y)
            .map(|(a, b)| (a - mx) * (b - my))
            .sum::<f64>()
            / (x.len() - 1) as f64;
        assert!((cxy - 0.03).abs() < 0.003, "sample covariance {}", cxy);
    }
}
