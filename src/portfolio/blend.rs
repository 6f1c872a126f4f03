//! # Capital Allocation Line
//!
//! $$
//! p=\min\left(1,\frac{\sigma^\*}{\sigma_m}\right),\qquad
//! \mathbb E[R]=(1-p)\,r_f+p\,\mathbb E[R_m],\qquad \sigma=p\,\sigma_m
//! $$
//!
//! Blend the market portfolio with the risk-free asset to meet a volatility budget.

use tracing::warn;

use super::types::PortfolioMetrics;
use super::types::ZERO_RISK;
use super::types::sharpe_ratio;

/// Share of capital placed in the market portfolio for a volatility budget.
///
/// `risk_tolerance / market_risk` clamped to `[0, 1]`; zero when the market
/// portfolio carries no risk or the tolerance is not a positive number.
pub fn market_proportion(market_risk: f64, risk_tolerance: f64) -> f64 {
  if market_risk > ZERO_RISK && risk_tolerance > 0.0 {
    (risk_tolerance / market_risk).min(1.0)
  } else {
    0.0
  }
}

/// Risk-controlled portfolio on the Capital Allocation Line.
///
/// Returned weights sum to the market proportion; the rest of the capital sits
/// in the risk-free asset, which has no weight entry.
pub fn blend(
  market: &PortfolioMetrics,
  risk_free_rate: f64,
  risk_tolerance: f64,
) -> PortfolioMetrics {
  if market.risk <= ZERO_RISK {
    warn!("market portfolio carries no risk, allocating fully to the risk-free asset");
  }

  let p = market_proportion(market.risk, risk_tolerance);
  let risk_free_share = 1.0 - p;

  let expected_return = risk_free_share * risk_free_rate + p * market.expected_return;
  let risk = p * market.risk;

  PortfolioMetrics {
    weights: &market.weights * p,
    expected_return,
    risk,
    sharpe_ratio: sharpe_ratio(expected_return, risk, risk_free_rate),
  }
}

/// `points` evenly spaced `(risk, return)` pairs on the line through the
/// risk-free rate and the market portfolio, for risks in `[0, max_risk]`.
///
/// Empty when the market portfolio is riskless, since the line has no slope.
pub fn capital_allocation_line(
  market: &PortfolioMetrics,
  risk_free_rate: f64,
  max_risk: f64,
  points: usize,
) -> Vec<(f64, f64)> {
  if market.risk <= ZERO_RISK || points == 0 {
    return Vec::new();
  }

  let slope = (market.expected_return - risk_free_rate) / market.risk;
  let step = if points > 1 {
    max_risk / (points - 1) as f64
  } else {
    0.0
  };

  (0..points)
    .map(|i| {
      let risk = step * i as f64;
      (risk, risk_free_rate + slope * risk)
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;

  use super::*;

  const RF: f64 = 0.02;

  fn market() -> PortfolioMetrics {
    let expected_return = 0.15;
    let risk = 0.2;
    PortfolioMetrics {
      weights: array![0.4, 0.6],
      expected_return,
      risk,
      sharpe_ratio: sharpe_ratio(expected_return, risk, RF),
    }
  }

  #[test]
  fn zero_tolerance_holds_only_the_risk_free_asset() {
    let blended = blend(&market(), RF, 0.0);

    assert_eq!(blended.risk, 0.0);
    assert_eq!(blended.expected_return, RF);
    assert_eq!(blended.weights, array![0.0, 0.0]);
    assert_eq!(blended.sharpe_ratio, None);
  }

  #[test]
  fn tolerance_at_or_above_market_risk_returns_market() {
    let market = market();

    assert_eq!(blend(&market, RF, market.risk), market);
    assert_eq!(blend(&market, RF, 0.5), market);
    assert_eq!(blend(&market, RF, f64::INFINITY), market);
  }

  #[test]
  fn partial_exposure_scales_linearly() {
    let blended = blend(&market(), RF, 0.05);

    assert_abs_diff_eq!(blended.invested_fraction(), 0.25, epsilon = 1e-12);
    assert_abs_diff_eq!(blended.risk, 0.05, epsilon = 1e-12);
    assert_abs_diff_eq!(blended.expected_return, 0.75 * RF + 0.25 * 0.15, epsilon = 1e-12);
    // every point on the line shares the market Sharpe ratio
    assert_abs_diff_eq!(
      blended.sharpe_ratio.unwrap(),
      market().sharpe_ratio.unwrap(),
      epsilon = 1e-12
    );
  }

  #[test]
  fn return_is_monotone_in_tolerance() {
    let market = market();
    let mut last = f64::NEG_INFINITY;

    for step in 0..=40 {
      let tolerance = step as f64 * 0.01;
      let blended = blend(&market, RF, tolerance);
      assert!(blended.expected_return >= last);
      last = blended.expected_return;
    }
  }

  #[test]
  fn negative_or_nan_tolerance_means_no_exposure() {
    assert_eq!(market_proportion(0.2, -0.1), 0.0);
    assert_eq!(market_proportion(0.2, f64::NAN), 0.0);
    assert_eq!(market_proportion(0.2, 0.1), 0.5);
  }

  #[test]
  fn riskless_market_stays_in_risk_free_asset() {
    let riskless = PortfolioMetrics {
      weights: array![0.5, 0.5],
      expected_return: 0.03,
      risk: 0.0,
      sharpe_ratio: None,
    };

    let blended = blend(&riskless, RF, 0.1);
    assert_eq!(blended.expected_return, RF);
    assert_eq!(blended.risk, 0.0);
    assert!(capital_allocation_line(&riskless, RF, 0.3, 10).is_empty());
  }

  #[test]
  fn capital_allocation_line_passes_through_market() {
    let market = market();
    let line = capital_allocation_line(&market, RF, 0.4, 5);

    assert_eq!(line.len(), 5);
    assert_eq!(line[0], (0.0, RF));
    assert_abs_diff_eq!(line[2].0, 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(line[2].1, market.expected_return, epsilon = 1e-12);
    assert_abs_diff_eq!(line[4].0, 0.4, epsilon = 1e-12);
  }
}
