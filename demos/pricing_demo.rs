// demos/pricing_demo.rs

//! Monte Carlo pricing of every option payoff rule
//!
//! This example shows how to:
//! 1. Build a pricing config from a preset
//! 2. Price vanilla and path-dependent payoffs
//! 3. Compare the vanilla estimate with Black-Scholes and its implied volatility

use anyhow::Result;
use montecarlo_lib::{
    bs_call_price, default_configs, BarrierDirection, BarrierKind, OptionType, Payoff,
    SimulationProcess, VarianceReduction,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("Monte Carlo Pricing Demo");
    println!("========================");

    let base = default_configs::fast()
        .with_market(100.0, 0.05, 0.0, 0.2)
        .with_paths(100_000)
        .with_variance_reduction(VarianceReduction::Antithetic);

    let payoffs = vec![
        Payoff::Vanilla {
            option_type: OptionType::Call,
            strike: 110.0,
        },
        Payoff::AsianAverage {
            option_type: OptionType::Call,
            strike: 110.0,
        },
        Payoff::Lookback {
            option_type: OptionType::Put,
        },
        Payoff::Barrier {
            option_type: OptionType::Call,
            strike: 110.0,
            kind: BarrierKind::KnockOut,
            direction: BarrierDirection::Up,
            level: 140.0,
        },
        Payoff::Cliquet {
            local_cap: 0.02,
            local_floor: -0.01,
            global_cap: 0.20,
            global_floor: 0.0,
            notional: 100.0,
        },
        Payoff::Digital {
            option_type: OptionType::Call,
            strike: 110.0,
            cash: 10.0,
        },
    ];

    println!("\n{:<16} {:>10} {:>10} {:>10}", "Payoff", "Price", "Std Err", "Samples");
    println!("{}", "-".repeat(50));
    for payoff in payoffs {
        let process = SimulationProcess::new(base.clone().with_payoff(payoff))?;
        let output = process.run()?;
        if let Some(p) = output.pricing() {
            println!(
                "{:<16} {:>10.4} {:>10.4} {:>10}",
                p.payoff, p.estimate, p.standard_error, p.n_samples
            );
        }
    }

    println!("\nBenchmark against Black-Scholes:");
    let vanilla = SimulationProcess::new(base.with_payoff(Payoff::Vanilla {
        option_type: OptionType::Call,
        strike: 110.0,
    }))?;
    let output = vanilla.run()?;
    if let Some(p) = output.pricing() {
        let bs = bs_call_price(100.0, 110.0, 0.05, 0.0, 1.0, 0.2);
        let (lo, hi) = p.as_estimate().confidence_interval(3.0);
        println!("  Black-Scholes:   {:.4}", bs);
        println!("  Monte Carlo:     {:.4}  (3 SE band [{:.4}, {:.4}])", p.estimate, lo, hi);
        println!("  Implied vol:     {:.2}%", vanilla.implied_volatility(p)? * 100.0);
    }

    Ok(())
}
