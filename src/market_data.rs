//! Historical close prices to portfolio scenario inputs.
//!
//! The CSV layout is one row per observation date: a leading date column
//! followed by one close-price column per asset, oldest row first.
//!
//! ```text
//! date,AAPL,MSFT,GOOG
//! 2024-01-02,185.6,370.9,138.2
//! 2024-01-03,184.3,370.6,139.1
//! ```

use std::io::Read;
use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::error::{validation, SimResult, SimulationError};
use crate::simulation::SimulationConfig;

/// Trading days per year, used to annualise daily statistics.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Mean vector and sample covariance of per-period simple returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnStatistics {
    pub assets: Vec<String>,
    pub mean_returns: Vec<f64>,
    /// Sample covariance with the n - 1 normalisation
    pub covariance: Vec<Vec<f64>>,
    /// Latest close of each asset
    pub last_prices: Vec<f64>,
    /// Number of return observations
    pub n_observations: usize,
}

impl ReturnStatistics {
    /// Statistics of `prices`, one row per date and one column per asset.
    pub fn from_prices(assets: Vec<String>, prices: &[Vec<f64>]) -> SimResult<Self> {
        let n_assets = assets.len();
        if n_assets == 0 {
            return Err(SimulationError::shape("at least one asset", "0 assets"));
        }
        if prices.len() < 3 {
            return Err(SimulationError::shape(
                "at least 3 price rows",
                format!("{}", prices.len()),
            ));
        }
        for (i, row) in prices.iter().enumerate() {
            if row.len() != n_assets {
                return Err(SimulationError::shape(
                    format!("{n_assets} prices per row"),
                    format!("row {i} with {}", row.len()),
                ));
            }
            for p in row {
                validation::positive("price", *p)?;
            }
        }

        let returns: Vec<Vec<f64>> = prices
            .windows(2)
            .map(|w| w[0].iter().zip(&w[1]).map(|(a, b)| b / a - 1.0).collect())
            .collect();
        let n = returns.len();

        let mut mean_returns = vec![0.0; n_assets];
        for r in &returns {
            for (m, x) in mean_returns.iter_mut().zip(r) {
                *m += x / n as f64;
            }
        }

        let mut covariance = vec![vec![0.0; n_assets]; n_assets];
        for r in &returns {
            for i in 0..n_assets {
                let di = r[i] - mean_returns[i];
                for j in i..n_assets {
                    covariance[i][j] += di * (r[j] - mean_returns[j]);
                }
            }
        }
        for i in 0..n_assets {
            for j in i..n_assets {
                covariance[i][j] /= (n - 1) as f64;
                covariance[j][i] = covariance[i][j];
            }
        }

        let last_prices = prices[prices.len() - 1].clone();
        Ok(Self {
            assets,
            mean_returns,
            covariance,
            last_prices,
            n_observations: n,
        })
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let headers = rdr.headers().context("reading CSV header")?.clone();
        if headers.len() < 2 {
            bail!("expected a date column followed by at least one asset column");
        }
        let assets: Vec<String> = headers.iter().skip(1).map(|h| h.trim().to_string()).collect();

        let mut prices = Vec::new();
        for (line, record) in rdr.records().enumerate() {
            let record = record.with_context(|| format!("reading CSV row {}", line + 1))?;
            let row = record
                .iter()
                .skip(1)
                .map(|field| {
                    field
                        .trim()
                        .parse::<f64>()
                        .with_context(|| format!("row {}: bad price `{}`", line + 1, field))
                })
                .collect::<anyhow::Result<Vec<f64>>>()?;
            prices.push(row);
        }

        Self::from_prices(assets, &prices).context("computing return statistics")
    }

    pub fn from_csv_path<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .with_context(|| format!("opening price history {}", path.display()))?;
        Self::from_csv_reader(file).with_context(|| format!("loading {}", path.display()))
    }

    pub fn n_assets(&self) -> usize {
        self.assets.len()
    }

    /// Scale per-period statistics to a yearly horizon.
    pub fn annualized(mut self, periods_per_year: f64) -> Self {
        for m in &mut self.mean_returns {
            *m *= periods_per_year;
        }
        for row in &mut self.covariance {
            for c in row.iter_mut() {
                *c *= periods_per_year;
            }
        }
        self
    }

    /// Basket config seeded with these statistics and the latest prices.
    pub fn apply_to(&self, config: SimulationConfig) -> SimulationConfig {
        config.with_basket(
            self.last_prices.clone(),
            self.mean_returns.clone(),
            self.covariance.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_asset_statistics() {
        let prices = vec![
            vec![100.0, 50.0],
            vec![110.0, 55.0],
            vec![99.0, 49.5],
            vec![108.9, 54.45],
        ];
        let stats =
            ReturnStatistics::from_prices(vec!["A".into(), "B".into()], &prices).unwrap();
        // both assets return +10%, -10%, +10%
        assert!((stats.mean_returns[0] - 0.1 / 3.0).abs() < 1e-12);
        assert!((stats.covariance[0][1] - stats.covariance[0][0]).abs() < 1e-12);
        assert_eq!(stats.n_observations, 3);
        assert_eq!(stats.last_prices, vec![108.9, 54.45]);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let prices = vec![vec![1.0, 2.0], vec![1.0], vec![1.0, 2.0]];
        assert!(ReturnStatistics::from_prices(vec!["A".into(), "B".into()], &prices).is_err());
    }

    #[test]
    fn test_csv_reader() {
        let text = "date,A,B\n2024-01-01,100,200\n2024-01-02,101,198\n2024-01-03,102,199\n";
        let stats = ReturnStatistics::from_csv_reader(text.as_bytes()).unwrap();
        assert_eq!(stats.assets, vec!["A".to_string(), "B".to_string()]);
        assert_eq!(stats.n_observations, 2);

        let bad = "date,A\n2024-01-01,abc\n";
        assert!(ReturnStatistics::from_csv_reader(bad.as_bytes()).is_err());
    }
}
