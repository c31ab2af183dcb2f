
use montecarlo_lib::aggregation::loss_tail_risk;
use montecarlo_lib::models::credit::{expected_tranche_losses, simulate_portfolio_losses};
use montecarlo_lib::{CopulaPortfolio, PercentileMethod, Tranche};
use test_utils::seeded;

#[test]
fn test_loss_distribution_tail() {
    let portfolio = CopulaPortfolio::new(125, 0.02, 0.3, 100.0).unwrap();
    let losses = simulate_portfolio_losses(&portfolio, &mut seeded(42), 20_000).unwrap();
    let mean = losses.iter().sum::<f64>() / losses.len() as f64;

    let risk = loss_tail_risk(&losses, 0.99, PercentileMethod::NearestRank).unwrap();
    assert!(risk.var > mean, "99% loss VaR {} should exceed mean {}", risk.var, mean);
    assert!(risk.cvar >= risk.var);
    assert!(risk.cvar <= 1.0);
}

#[test]
fn test_tranche_estimates_are_fractions() {
    let portfolio = CopulaPortfolio::new(125, 0.02, 0.2, 100.0).unwrap();
    let tranches = [Tranche::equity(), Tranche::mezzanine(), Tranche::new(0.07, 1.0).unwrap()];
    let estimates = expected_tranche_losses(&portfolio, &tranches, &mut seeded(1), 10_000).unwrap();

    assert_eq!(estimates.len(), 3);
    for e in &estimates {
        assert!((0.0..=1.0).contains(&e.value));
        assert!(e.std_error.is_finite());
    }
    // seniority: equity absorbs the most, the senior slice the least
    assert!(estimates[0].value > estimates[1].value);
    assert!(estimates[1].value > estimates[2].value);
}
