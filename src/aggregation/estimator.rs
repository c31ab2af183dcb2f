use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SimResult, SimulationError};

/// Sample mean with its standard error.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub value: f64,
    /// Sample standard deviation (n - 1) over sqrt(n); infinite below two samples
    pub std_error: f64,
    pub n_samples: usize,
}

impl Estimate {
    /// Mean and standard error of `samples`, computed in one pass.
    pub fn from_samples(samples: &[f64]) -> SimResult<Self> {
        if samples.is_empty() {
            return Err(SimulationError::EmptySample);
        }

        // Welford
        let mut mean = 0.0;
        let mut m2 = 0.0;
        for (i, &x) in samples.iter().enumerate() {
            if !x.is_finite() {
                return Err(SimulationError::NonFinite(format!("sample {i} ({x})")));
            }
            let delta = x - mean;
            mean += delta / (i + 1) as f64;
            m2 += delta * (x - mean);
        }

        let n = samples.len();
        let std_error = if n < 2 {
            f64::INFINITY
        } else {
            (m2 / (n - 1) as f64).sqrt() / (n as f64).sqrt()
        };

        Ok(Self {
            value: mean,
            std_error,
            n_samples: n,
        })
    }

    /// `(value - z*se, value + z*se)`.
    pub fn confidence_interval(&self, z: f64) -> (f64, f64) {
        let half = z * self.std_error;
        (self.value - half, self.value + half)
    }

    /// True when `target` lies within `z` standard errors.
    pub fn contains(&self, target: f64, z: f64) -> bool {
        (self.value - target).abs() <= z * self.std_error
    }
}

impl fmt::Display for Estimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} (se {:.6}, n = {})", self.value, self.std_error, self.n_samples)
    }
}

/// Average interleaved antithetic pairs `(2k, 2k + 1)`.
pub fn pair_antithetic(samples: &[f64]) -> SimResult<Vec<f64>> {
    if samples.len() % 2 != 0 {
        return Err(SimulationError::shape(
            "even number of antithetic samples",
            format!("{}", samples.len()),
        ));
    }
    Ok(samples
        .chunks_exact(2)
        .map(|pair| 0.5 * (pair[0] + pair[1]))
        .collect())
}

/// Discounted Monte Carlo price of `payoffs`.
///
/// With `antithetic`, pairs are averaged first so the standard error reflects
/// the independent pair averages rather than the correlated halves.
pub fn discounted_price(payoffs: &[f64], discount: f64, antithetic: bool) -> SimResult<Estimate> {
    let discounted: Vec<f64> = if antithetic {
        pair_antithetic(payoffs)?
            .into_iter()
            .map(|p| discount * p)
            .collect()
    } else {
        payoffs.iter().map(|p| discount * p).collect()
    };
    Estimate::from_samples(&discounted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_standard_error() {
        let e = Estimate::from_samples(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert!((e.value - 2.5).abs() < 1e-15);
        // sample variance 5/3
        let expected = (5.0f64 / 3.0).sqrt() / 2.0;
        assert!((e.std_error - expected).abs() < 1e-12);
        assert_eq!(e.n_samples, 4);

        let (lo, hi) = e.confidence_interval(3.0);
        assert!((hi - lo - 6.0 * expected).abs() < 1e-12);
        assert!(e.contains(2.5 + 2.0 * expected, 3.0));
    }

    #[test]
    fn test_single_sample_has_infinite_error() {
        let e = Estimate::from_samples(&[7.0]).unwrap();
        assert_eq!(e.value, 7.0);
        assert!(e.std_error.is_infinite());
    }

    #[test]
    fn test_empty_and_non_finite_rejected() {
        assert_eq!(Estimate::from_samples(&[]), Err(SimulationError::EmptySample));
        assert!(matches!(
            Estimate::from_samples(&[1.0, f64::NAN]),
            Err(SimulationError::NonFinite(_))
        ));
    }

    #[test]
    fn test_antithetic_pairs_are_averaged_before_error() {
        // perfectly anti-correlated halves: every pair averages to 1
        let payoffs = [0.0, 2.0, 1.5, 0.5, 2.0, 0.0];
        let e = discounted_price(&payoffs, 0.5, true).unwrap();
        assert_eq!(e.n_samples, 3);
        assert!((e.value - 0.5).abs() < 1e-15);
        assert_eq!(e.std_error, 0.0);

        assert!(discounted_price(&payoffs[..5], 1.0, true).is_err());
    }
}
