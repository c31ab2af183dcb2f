// Closed-form Black-Scholes prices used as the analytic benchmark for the
// Monte Carlo estimators, plus implied-volatility inversion of a price.

use roots::find_root_brent;

use crate::error::{validation, SimResult, SimulationError};
use crate::payoffs::OptionType;

fn norm_cdf(x: f64) -> f64 {
    // 0.5 * [1 + erf(x / sqrt(2))]
    0.5 * (1.0 + libm::erf(x / (2.0_f64).sqrt()))
}

/// Price of a European call option under Black-Scholes assumptions.
///
/// With `T <= 0` or `sigma <= 0` the discounted forward intrinsic value is returned.
#[allow(non_snake_case)]
pub fn bs_call_price(S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> f64 {
    if T <= 0.0 || sigma <= 0.0 {
        return (S * (-q * T).exp() - K * (-r * T).exp()).max(0.0);
    }
    let d1 = ((S / K).ln() + (r - q + 0.5 * sigma.powi(2)) * T) / (sigma * T.sqrt());
    let d2 = d1 - sigma * T.sqrt();
    S * (-q * T).exp() * norm_cdf(d1) - K * (-r * T).exp() * norm_cdf(d2)
}

/// Price of a European put option under Black-Scholes assumptions.
#[allow(non_snake_case)]
pub fn bs_put_price(S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> f64 {
    if T <= 0.0 || sigma <= 0.0 {
        return (K * (-r * T).exp() - S * (-q * T).exp()).max(0.0);
    }
    let d1 = ((S / K).ln() + (r - q + 0.5 * sigma.powi(2)) * T) / (sigma * T.sqrt());
    let d2 = d1 - sigma * T.sqrt();
    let nd1m = 1.0 - norm_cdf(d1);
    let nd2m = 1.0 - norm_cdf(d2);
    K * (-r * T).exp() * nd2m - S * (-q * T).exp() * nd1m
}

/// Dispatch on the option type.
#[allow(non_snake_case)]
pub fn bs_price(option_type: OptionType, S: f64, K: f64, r: f64, q: f64, T: f64, sigma: f64) -> f64 {
    match option_type {
        OptionType::Call => bs_call_price(S, K, r, q, T, sigma),
        OptionType::Put => bs_put_price(S, K, r, q, T, sigma),
    }
}

/// Volatility at which the Black-Scholes price equals `price`.
///
/// Solved with Brent's method on `[1e-6, 5.0]`. Prices outside the no-arbitrage
/// band for that bracket are rejected as invalid parameters.
#[allow(non_snake_case)]
pub fn implied_volatility(
    option_type: OptionType,
    price: f64,
    S: f64,
    K: f64,
    r: f64,
    q: f64,
    T: f64,
) -> SimResult<f64> {
    validation::positive("spot", S)?;
    validation::positive("strike", K)?;
    validation::positive("maturity", T)?;
    validation::finite("price", price)?;

    const VOL_LO: f64 = 1e-6;
    const VOL_HI: f64 = 5.0;

    let objective = |sigma: f64| bs_price(option_type, S, K, r, q, T, sigma) - price;
    let (lo, hi) = (objective(VOL_LO), objective(VOL_HI));
    if lo > 0.0 || hi < 0.0 {
        return Err(SimulationError::invalid(
            "price",
            price,
            format!(
                "outside attainable range [{:.6}, {:.6}]",
                lo + price,
                hi + price
            ),
        ));
    }

    let mut tol = 1e-10_f64;
    find_root_brent(VOL_LO, VOL_HI, &objective, &mut tol).map_err(|_| {
        SimulationError::invalid("price", price, "implied volatility root search failed")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_norm_cdf_quantiles() {
        assert!((norm_cdf(0.0) - 0.5).abs() < 1e-15);
        assert!((norm_cdf(1.959964) - 0.975).abs() < 1e-6);
        assert!((norm_cdf(-1.959964) - 0.025).abs() < 1e-6);
    }

    #[test]
    fn test_reference_call_price() {
        let c = bs_call_price(100.0, 110.0, 0.05, 0.0, 1.0, 0.2);
        assert!((c - 6.04).abs() < 0.01, "expected ~6.04, got {}", c);
    }

    #[test]
    fn test_put_call_parity() {
        let (s, k, r, q, t, v) = (100.0, 95.0, 0.03, 0.01, 0.75, 0.25);
        let c = bs_call_price(s, k, r, q, t, v);
        let p = bs_put_price(s, k, r, q, t, v);
        let parity = s * (-q * t).exp() - k * (-r * t).exp();
        assert!((c - p - parity).abs() < 1e-9);
    }

    #[test]
    fn test_zero_vol_falls_back_to_intrinsic() {
        let c = bs_call_price(100.0, 90.0, 0.0, 0.0, 1.0, 0.0);
        assert!((c - 10.0).abs() < 1e-12);
        let p = bs_put_price(100.0, 90.0, 0.0, 0.0, 0.0, 0.2);
        assert_eq!(p, 0.0);
    }

    #[test]
    fn test_implied_volatility_round_trip() {
        let price = bs_call_price(100.0, 105.0, 0.02, 0.0, 0.5, 0.31);
        let iv = implied_volatility(OptionType::Call, price, 100.0, 105.0, 0.02, 0.0, 0.5).unwrap();
        assert!((iv - 0.31).abs() < 1e-6, "iv = {}", iv);

        // below intrinsic is unattainable
        assert!(implied_volatility(OptionType::Put, 0.0, 100.0, 150.0, 0.0, 0.0, 1.0).is_err());
    }
}
