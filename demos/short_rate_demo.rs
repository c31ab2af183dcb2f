//! Vasicek, CIR and Hull-White short rates side by side: terminal rate
//! distribution after ten years and Monte Carlo zero-coupon bond prices.

use anyhow::Result;
use montecarlo_lib::models::short_rate::vasicek_bond_price;
use montecarlo_lib::models::traits::PathModel;
use montecarlo_lib::models::utils::rng_from_seed;
use montecarlo_lib::{Estimate, ShortRateModel, ThetaSchedule};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (r0, kappa, theta, sigma, horizon, steps) = (0.03, 0.5, 0.05, 0.02, 10.0, 1000);
    let schedule = ThetaSchedule::piecewise(vec![horizon / 2.0], vec![0.04, 0.06])?;
    let models = [
        ShortRateModel::vasicek(r0, kappa, theta, sigma, horizon, steps)?,
        ShortRateModel::cir(r0, kappa, theta, sigma, horizon, steps)?,
        ShortRateModel::hull_white(r0, kappa, schedule, sigma, horizon, steps)?,
    ];

    let mut rng = rng_from_seed(Some(42));
    println!(
        "{:>11} {:>10} {:>10} {:>10} {:>10}",
        "Model", "E[r_T]", "MC mean", "Min r", "Below 0"
    );
    for model in &models {
        let paths = model.simulate(&mut rng, 1_000, false);
        let terminal = paths.terminal_values()?;
        let mean = Estimate::from_samples(&terminal)?;
        let min = paths
            .iter()
            .flat_map(|p| p.steps().map(|s| s[0]))
            .fold(f64::INFINITY, f64::min);
        let negative = terminal.iter().filter(|r| **r < 0.0).count();
        println!(
            "{:>11} {:>9.3}% {:>9.3}% {:>9.3}% {:>10}",
            model.dynamics.to_string(),
            model.expected_rate(horizon) * 100.0,
            mean.value * 100.0,
            min * 100.0,
            negative
        );
    }

    println!("\nZero-coupon bond, 5 years:");
    for model in &models {
        let five_year = ShortRateModel {
            maturity: 5.0,
            n_steps: 500,
            ..model.clone()
        };
        let bond = five_year.zero_coupon_bond(&mut rng, 20_000, true)?;
        println!("{:>11} {}", model.dynamics.to_string(), bond);
    }
    println!(
        "{:>11} {:.6} (closed form)",
        "vasicek",
        vasicek_bond_price(r0, kappa, theta, sigma, 5.0)
    );
    Ok(())
}
