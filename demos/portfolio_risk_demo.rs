// demos/portfolio_risk_demo.rs

//! VaR/CVaR of a constant-mix basket
//!
//! Pass a CSV price history (date column, then one close column per asset) to
//! estimate drifts and covariance from data; without one a built-in
//! three-asset basket is used.
//!
//! ```text
//! cargo run --example portfolio_risk_demo -- tests/data/prices.csv
//! ```

use anyhow::Result;
use montecarlo_lib::market_data::TRADING_DAYS_PER_YEAR;
use montecarlo_lib::{portfolio_risk, Payoff, ReturnStatistics, SimulationConfig};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let base = SimulationConfig::fast()
        .with_steps(252)
        .with_paths(50_000);

    let config = match std::env::args().nth(1) {
        Some(path) => {
            let stats = ReturnStatistics::from_csv_path(&path)?.annualized(TRADING_DAYS_PER_YEAR);
            println!(
                "Loaded {} assets ({}) over {} returns from {}",
                stats.n_assets(),
                stats.assets.join(", "),
                stats.n_observations,
                path
            );
            let n = stats.n_assets();
            stats.apply_to(base).with_payoff(Payoff::PortfolioValue {
                weights: vec![1.0 / n as f64; n],
                initial_value: 1_000_000.0,
            })
        }
        None => base
            .with_basket(
                vec![150.0, 300.0, 80.0],
                vec![0.08, 0.10, 0.06],
                vec![
                    vec![0.0625, 0.0300, 0.0150],
                    vec![0.0300, 0.0900, 0.0200],
                    vec![0.0150, 0.0200, 0.0400],
                ],
            )
            .with_payoff(Payoff::PortfolioValue {
                weights: vec![0.4, 0.35, 0.25],
                initial_value: 1_000_000.0,
            }),
    };

    println!("\nPortfolio Risk Demo");
    println!("===================");
    for confidence in [0.90, 0.95, 0.99] {
        let mut run = config.clone();
        run.confidence_level = confidence;
        let risk = portfolio_risk(run)?;
        println!(
            "{:>4.0}%  VaR loss {:>12.2}  CVaR loss {:>12.2}  ({})",
            confidence * 100.0,
            risk.var_loss(),
            risk.cvar_loss(),
            risk
        );
    }
    Ok(())
}
