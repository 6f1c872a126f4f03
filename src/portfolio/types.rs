//! # Portfolio Types
//!
//! $$
//! S_p=\frac{\mathbb E[R_p]-r_f}{\sigma_p}
//! $$
//!
//! Shared weight and result containers for portfolio optimization.

use ndarray::Array1;

use super::data::ReturnProfile;
use super::optimizers::evaluate;

/// Allocation over an [`AssetSet`](crate::market::AssetSet), one weight per asset.
pub type WeightVector = Array1<f64>;

/// Slack allowed on the full-investment constraint `sum(w) = 1`.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Volatility at or below which a portfolio counts as riskless.
pub(crate) const ZERO_RISK: f64 = 1e-15;

/// Sharpe ratio `(expected_return - risk_free) / risk`.
///
/// `None` for a riskless portfolio, where the ratio is undefined.
pub fn sharpe_ratio(expected_return: f64, risk: f64, risk_free_rate: f64) -> Option<f64> {
  (risk > ZERO_RISK).then(|| (expected_return - risk_free_rate) / risk)
}

/// `true` when every weight lies in `[0, 1]` and the weights sum to one.
pub fn is_valid_allocation(weights: &WeightVector) -> bool {
  let in_bounds = weights
    .iter()
    .all(|&w| w.is_finite() && (-WEIGHT_SUM_TOLERANCE..=1.0 + WEIGHT_SUM_TOLERANCE).contains(&w));
  in_bounds && (weights.sum() - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
}

/// Weights with their model return, risk and Sharpe ratio.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioMetrics {
  /// Risky-asset weights. Sum to one for fully invested portfolios and to the
  /// market proportion for blended ones.
  pub weights: WeightVector,
  /// Model expected return (annualized if the profile is annualized).
  pub expected_return: f64,
  /// Portfolio volatility, never negative.
  pub risk: f64,
  /// `None` when `risk` is zero.
  pub sharpe_ratio: Option<f64>,
}

impl PortfolioMetrics {
  /// Evaluate `weights` against `profile`.
  ///
  /// # Panics
  ///
  /// If `weights` does not have one entry per asset of `profile`.
  pub fn from_weights(weights: WeightVector, profile: &ReturnProfile, risk_free_rate: f64) -> Self {
    let (expected_return, risk) = evaluate(weights.view(), profile);
    Self {
      weights,
      expected_return,
      risk,
      sharpe_ratio: sharpe_ratio(expected_return, risk, risk_free_rate),
    }
  }

  /// Share of capital held in risky assets.
  pub fn invested_fraction(&self) -> f64 {
    self.weights.sum()
  }

  /// Sharpe ratio with the riskless case ranked below every risky portfolio.
  pub fn sharpe_or_neg_infinity(&self) -> f64 {
    self.sharpe_ratio.unwrap_or(f64::NEG_INFINITY)
  }
}
