
use montecarlo_lib::aggregation::{tail_risk, tail_risk_of_paths};
use montecarlo_lib::{
    portfolio_risk, price_option, simulate, Payoff, PercentileMethod, PsdRepair, SimulationError,
    SimulationOutput, SimulationProcess, VarianceReduction,
};
use test_utils::{basket_config, init_tracing};

#[test]
fn test_five_outcomes_at_five_percent() {
    let values = [9000.0, 9500.0, 10000.0, 10500.0, 11000.0];
    let risk = tail_risk(&values, 5.0, PercentileMethod::NearestRank).unwrap();
    assert_eq!(risk.var, 9000.0);
    assert_eq!(risk.cvar, 9000.0);
    assert!(risk.degenerate, "a singleton tail is flagged, not fatal");
}

#[test]
fn test_empty_sample_is_an_error() {
    assert_eq!(
        tail_risk(&[], 5.0, PercentileMethod::NearestRank),
        Err(SimulationError::EmptySample)
    );
}

#[test]
fn test_basket_risk() {
    init_tracing();
    let risk = portfolio_risk(basket_config(20_000, 7)).expect("risk run failed");
    println!("{}", risk);

    assert_eq!(risk.n_samples, 20_000);
    assert!((risk.percentile_level - 5.0).abs() < 1e-12);
    assert!(risk.cvar <= risk.var, "cvar {} > var {}", risk.cvar, risk.var);
    assert!(risk.var < risk.initial_value, "5% VaR should sit below the initial value");
    assert!(risk.var_loss() > 0.0);
    assert!(risk.cvar_loss() >= risk.var_loss());
    assert!(!risk.degenerate);
    assert!((risk.var_return - (risk.var / 10_000.0 - 1.0)).abs() < 1e-12);
}

#[test]
fn test_higher_confidence_moves_var_down() {
    let mut c95 = basket_config(20_000, 11);
    c95.confidence_level = 0.95;
    let mut c99 = c95.clone();
    c99.confidence_level = 0.99;

    let r95 = portfolio_risk(c95).unwrap();
    let r99 = portfolio_risk(c99).unwrap();
    assert!(r99.var <= r95.var);
    assert!(r99.cvar <= r95.cvar);
}

#[test]
fn test_linear_percentile_close_to_nearest_rank() {
    let mut nearest = basket_config(20_000, 3);
    nearest.percentile_method = PercentileMethod::NearestRank;
    let mut linear = nearest.clone();
    linear.percentile_method = PercentileMethod::Linear;

    let a = portfolio_risk(nearest).unwrap();
    let b = portfolio_risk(linear).unwrap();
    // same outcomes; the two definitions differ by at most one order statistic gap
    assert!((a.var - b.var).abs() < 0.01 * a.var);
}

#[test]
fn test_antithetic_risk_keeps_every_outcome() {
    let config = basket_config(5_001, 4).with_variance_reduction(VarianceReduction::Antithetic);
    let risk = portfolio_risk(config).unwrap();
    assert_eq!(risk.n_samples, 5_002);
    assert!(risk.cvar <= risk.var);
}

#[test]
fn test_indefinite_covariance_is_repaired_or_rejected() {
    let mut config = basket_config(2_000, 5).with_basket(
        vec![100.0, 100.0],
        vec![0.05, 0.05],
        vec![vec![0.04, 0.048], vec![0.048, 0.04]],
    );
    config.payoff = Payoff::PortfolioValue {
        weights: vec![0.5, 0.5],
        initial_value: 1_000.0,
    };

    let repaired = portfolio_risk(config.clone()).expect("clipped covariance should run");
    assert!(repaired.var.is_finite() && repaired.cvar.is_finite());

    config.psd_repair = PsdRepair::Strict;
    assert!(matches!(
        portfolio_risk(config),
        Err(SimulationError::NonPositiveSemiDefinite { .. })
    ));
}

#[test]
fn test_weight_count_must_match_assets() {
    let mut config = basket_config(1_000, 1);
    config.payoff = Payoff::PortfolioValue {
        weights: vec![0.5, 0.5],
        initial_value: 10_000.0,
    };
    assert!(matches!(
        simulate(config),
        Err(SimulationError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_tail_risk_on_basket_paths_is_a_shape_error() {
    let process = SimulationProcess::new(basket_config(100, 2)).unwrap();
    let paths = process
        .simulate_paths(&mut test_utils::seeded(2))
        .unwrap();
    assert_eq!(paths.n_assets(), 3);
    assert!(matches!(
        tail_risk_of_paths(&paths, 5.0, PercentileMethod::NearestRank),
        Err(SimulationError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_entry_points_reject_the_wrong_mode() {
    let risk_config = basket_config(100, 1);
    assert!(matches!(
        price_option(risk_config.clone()),
        Err(SimulationError::Config(_))
    ));
    assert!(matches!(simulate(risk_config).unwrap(), SimulationOutput::Risk(_)));

    let pricing_config = montecarlo_lib::default_configs::minimal();
    assert!(matches!(
        portfolio_risk(pricing_config),
        Err(SimulationError::Config(_))
    ));
}
