use montecarlo_lib::{default_configs, price_option, OptionType, Payoff, SimulationConfig};

fn describe(name: &str, config: &SimulationConfig, use_case: &str) {
    println!("{}:", name);
    println!("   Paths: {}", config.path_count);
    println!("   Steps: {}", config.step_count);
    println!("   Variance reduction: {:?}", config.variance_reduction);
    println!("   Seed: {:?}", config.random_seed);
    println!("   Parallel evaluation: {}", config.parallel_eval);
    println!("   Use case: {}\n", use_case);
}

fn main() {
    println!("Montecarlo-lib Default Configuration Examples\n");

    describe("1. Fast Configuration", &default_configs::fast(), "Development, quick prototyping");
    describe(
        "2. Production Configuration",
        &default_configs::production(),
        "Live pricing and risk reports",
    );
    describe(
        "3. Research Configuration",
        &default_configs::research(),
        "Convergence studies, model validation",
    );
    describe(
        "4. Minimal Configuration",
        &default_configs::minimal(),
        "Unit tests, debugging",
    );

    println!("Pricing an Asian call with the minimal preset...");
    let config = default_configs::minimal().with_payoff(Payoff::AsianAverage {
        option_type: OptionType::Call,
        strike: 100.0,
    });
    match price_option(config) {
        Ok(result) => println!("   {}", result),
        Err(e) => eprintln!("   Pricing failed: {}", e),
    }
}
