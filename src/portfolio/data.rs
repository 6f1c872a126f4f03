//! # Portfolio Data Utilities
//!
//! $$
//! \mu = k\,\bar r,\qquad \Sigma = \frac{k}{T-1}\sum_{t=1}^{T}(r_t-\bar r)(r_t-\bar r)^\top
//! $$
//!
//! Simple returns, annualized expected returns and covariance.

use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView2;
use ndarray::Axis;
use ndarray_stats::CorrelationExt;
use tracing::debug;

use crate::error::AllocationError;
use crate::error::Result;
use crate::market::AssetSet;
use crate::market::PriceHistory;

/// Trading periods per year for daily data.
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Minimum usable return observations per asset.
const MIN_RETURN_OBSERVATIONS: usize = 2;

/// Relative tolerance used when checking covariance symmetry.
const SYMMETRY_TOLERANCE: f64 = 1e-10;

/// Period-over-period simple returns `(p_t - p_{t-1}) / p_{t-1}`.
///
/// The first row has no prior price and is skipped; rows containing any
/// non-finite return are dropped.
pub fn simple_returns(closes: ArrayView2<'_, f64>) -> Array2<f64> {
  let n_assets = closes.ncols();
  let mut data = Vec::with_capacity(closes.nrows().saturating_sub(1) * n_assets);
  let mut kept = 0;

  for t in 1..closes.nrows() {
    let prev = closes.row(t - 1);
    let curr = closes.row(t);
    let row: Vec<f64> = prev
      .iter()
      .zip(curr.iter())
      .map(|(&p0, &p1)| (p1 - p0) / p0)
      .collect();

    if row.iter().all(|r| r.is_finite()) {
      data.extend(row);
      kept += 1;
    }
  }

  Array2::from_shape_vec((kept, n_assets), data).unwrap_or_else(|_| Array2::zeros((0, n_assets)))
}

/// Annualized expected returns and covariance over an [`AssetSet`].
///
/// Immutable once built; shared read-only by the optimizer and frontier sampler.
#[derive(Clone, Debug, PartialEq)]
pub struct ReturnProfile {
  assets: AssetSet,
  expected_returns: Array1<f64>,
  covariance: Array2<f64>,
}

impl ReturnProfile {
  /// Build from already annualized statistics.
  ///
  /// The covariance must be square, finite, symmetric and carry non-negative
  /// variances. It is stored exactly symmetrized.
  pub fn new(
    assets: AssetSet,
    expected_returns: Array1<f64>,
    covariance: Array2<f64>,
  ) -> Result<Self> {
    let n = assets.len();
    if expected_returns.len() != n {
      return Err(AllocationError::validation(format!(
        "expected returns have {} entries for {n} assets",
        expected_returns.len()
      )));
    }
    if covariance.dim() != (n, n) {
      return Err(AllocationError::validation(format!(
        "covariance is {:?}, expected ({n}, {n})",
        covariance.dim()
      )));
    }
    if !expected_returns.iter().chain(covariance.iter()).all(|v| v.is_finite()) {
      return Err(AllocationError::validation(
        "return statistics contain non-finite values",
      ));
    }

    for i in 0..n {
      if covariance[[i, i]] < 0.0 {
        return Err(AllocationError::validation(format!(
          "negative variance for {}",
          assets.get(i).unwrap_or_default()
        )));
      }
      for j in (i + 1)..n {
        let (a, b) = (covariance[[i, j]], covariance[[j, i]]);
        if (a - b).abs() > SYMMETRY_TOLERANCE * a.abs().max(b.abs()).max(1.0) {
          return Err(AllocationError::validation(format!(
            "covariance is not symmetric at ({i}, {j})"
          )));
        }
      }
    }

    let covariance = (&covariance + &covariance.t()) / 2.0;

    Ok(Self {
      assets,
      expected_returns,
      covariance,
    })
  }

  pub fn assets(&self) -> &AssetSet {
    &self.assets
  }

  pub fn n_assets(&self) -> usize {
    self.assets.len()
  }

  /// Annualized expected return per asset.
  pub fn expected_returns(&self) -> &Array1<f64> {
    &self.expected_returns
  }

  /// Annualized covariance matrix.
  pub fn covariance(&self) -> &Array2<f64> {
    &self.covariance
  }

  /// Per-asset volatility, the square root of the covariance diagonal.
  pub fn volatilities(&self) -> Array1<f64> {
    self.covariance.diag().mapv(|v| v.max(0.0).sqrt())
  }

  /// Pearson correlation implied by the covariance. Pairs involving a
  /// riskless asset get zero off-diagonal correlation.
  pub fn correlation(&self) -> Array2<f64> {
    let sigmas = self.volatilities();
    let n = sigmas.len();

    Array2::from_shape_fn((n, n), |(i, j)| {
      let denom = sigmas[i] * sigmas[j];
      if i == j {
        1.0
      } else if denom > 1e-15 {
        (self.covariance[[i, j]] / denom).clamp(-1.0, 1.0)
      } else {
        0.0
      }
    })
  }

  /// `true` when no weight vector can carry risk.
  pub(crate) fn is_riskless(&self) -> bool {
    self.covariance.diag().iter().all(|&v| v <= 1e-30)
  }
}

/// Factory turning a [`PriceHistory`] into a [`ReturnProfile`].
#[derive(Clone, Copy, Debug)]
pub struct ReturnStatistics {
  annualization_factor: u32,
}

impl Default for ReturnStatistics {
  fn default() -> Self {
    Self {
      annualization_factor: TRADING_DAYS_PER_YEAR,
    }
  }
}

impl ReturnStatistics {
  /// `annualization_factor` is the number of return periods per year.
  pub fn new(annualization_factor: u32) -> Result<Self> {
    if annualization_factor == 0 {
      return Err(AllocationError::validation(
        "annualization factor must be a positive integer",
      ));
    }
    Ok(Self {
      annualization_factor,
    })
  }

  pub fn annualization_factor(&self) -> u32 {
    self.annualization_factor
  }

  /// Annualized mean returns and sample covariance (`ddof = 1`), both scaled
  /// linearly by the annualization factor.
  pub fn compute(&self, history: &PriceHistory) -> Result<ReturnProfile> {
    let assets = history.assets();
    let closes = history.closes();

    for (j, asset) in assets.iter().enumerate() {
      if let Some((t, p)) = closes
        .column(j)
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || **p <= 0.0)
      {
        return Err(AllocationError::insufficient(
          asset,
          format!("unusable close {p} at observation {t}"),
        ));
      }
    }

    let returns = simple_returns(closes);
    let dropped = closes.nrows().saturating_sub(1) - returns.nrows();
    if returns.nrows() < MIN_RETURN_OBSERVATIONS {
      return Err(AllocationError::insufficient(
        assets.to_string(),
        format!(
          "{} usable return observations, at least {MIN_RETURN_OBSERVATIONS} required",
          returns.nrows()
        ),
      ));
    }

    let k = self.annualization_factor as f64;
    let mean = returns
      .mean_axis(Axis(0))
      .ok_or_else(|| AllocationError::insufficient(assets.to_string(), "no returns"))?;
    let cov = returns
      .t()
      .cov(1.0)
      .map_err(|e| AllocationError::insufficient(assets.to_string(), e.to_string()))?;

    debug!(
      n_assets = assets.len(),
      observations = returns.nrows(),
      dropped,
      annualization_factor = self.annualization_factor,
      "computed return statistics"
    );

    ReturnProfile::new(assets.clone(), mean * k, cov * k)
  }
}

#[cfg(test)]
mod tests {
  use approx::assert_abs_diff_eq;
  use ndarray::array;
  use tracing_test::traced_test;

  use super::*;

  fn two_assets() -> AssetSet {
    AssetSet::new(["AAA", "BBB"]).unwrap()
  }

  fn history() -> PriceHistory {
    PriceHistory::from_closes(
      two_assets(),
      array![[100.0, 50.0], [110.0, 50.0], [99.0, 55.0], [108.9, 55.0]],
    )
    .unwrap()
  }

  #[test]
  fn simple_returns_skip_first_row() {
    let r = simple_returns(history().closes());

    let expected = array![[0.1, 0.0], [-0.1, 0.1], [0.1, 0.0]];
    assert_eq!(r.dim(), expected.dim());
    for (a, b) in r.iter().zip(expected.iter()) {
      assert_abs_diff_eq!(*a, *b, epsilon = 1e-12);
    }
  }

  #[test]
  fn simple_returns_drop_non_finite_rows() {
    let closes = array![[1.0, 1.0], [0.0, 2.0], [1.0, 4.0]];
    let r = simple_returns(closes.view());

    // (1 - 0) / 0 is infinite, so only the first step survives
    assert_eq!(r, array![[-1.0, 1.0]]);
  }

  #[test]
  fn unit_factor_gives_period_statistics() {
    let profile = ReturnStatistics::new(1).unwrap().compute(&history()).unwrap();

    assert_abs_diff_eq!(profile.expected_returns()[0], 0.1 / 3.0, epsilon = 1e-12);
    assert_abs_diff_eq!(profile.expected_returns()[1], 0.1 / 3.0, epsilon = 1e-12);

    let cov = profile.covariance();
    assert_abs_diff_eq!(cov[[0, 0]], 24.0 / 1800.0, epsilon = 1e-12);
    assert_abs_diff_eq!(cov[[1, 1]], 6.0 / 1800.0, epsilon = 1e-12);
    assert_abs_diff_eq!(cov[[0, 1]], -12.0 / 1800.0, epsilon = 1e-12);
    assert_eq!(cov[[0, 1]], cov[[1, 0]]);
    assert_abs_diff_eq!(profile.correlation()[[0, 1]], -1.0, epsilon = 1e-9);
  }

  #[test]
  fn annualization_scales_mean_and_covariance_linearly() {
    let daily = ReturnStatistics::new(1).unwrap().compute(&history()).unwrap();
    let annual = ReturnStatistics::default().compute(&history()).unwrap();

    for (a, d) in annual.expected_returns().iter().zip(daily.expected_returns()) {
      assert_abs_diff_eq!(*a, d * 252.0, epsilon = 1e-10);
    }
    for (a, d) in annual.covariance().iter().zip(daily.covariance()) {
      assert_abs_diff_eq!(*a, d * 252.0, epsilon = 1e-10);
    }
  }

  #[test]
  fn non_positive_price_is_rejected() {
    let bad = PriceHistory::from_closes(
      two_assets(),
      array![[100.0, 50.0], [110.0, 0.0], [99.0, 55.0], [108.9, 55.0]],
    )
    .unwrap();

    let err = ReturnStatistics::default().compute(&bad).unwrap_err();
    assert!(matches!(err, AllocationError::InsufficientData { ref asset, .. } if asset == "BBB"));

    let negative = PriceHistory::from_closes(
      two_assets(),
      array![[100.0, 50.0], [-1.0, 51.0], [99.0, 55.0]],
    )
    .unwrap();
    assert!(ReturnStatistics::default().compute(&negative).is_err());
  }

  #[test]
  #[traced_test]
  fn too_few_observations_are_rejected() {
    let short = PriceHistory::from_closes(two_assets(), array![[100.0, 50.0], [101.0, 51.0]]).unwrap();
    let err = ReturnStatistics::default().compute(&short).unwrap_err();
    assert!(matches!(err, AllocationError::InsufficientData { .. }));

    let ok = PriceHistory::from_closes(
      two_assets(),
      array![[100.0, 50.0], [101.0, 51.0], [100.0, 52.0]],
    )
    .unwrap();
    assert!(ReturnStatistics::default().compute(&ok).is_ok());
    assert!(logs_contain("computed return statistics"));
  }

  #[test]
  fn zero_annualization_factor_is_invalid() {
    assert!(matches!(
      ReturnStatistics::new(0),
      Err(AllocationError::Validation(_))
    ));
  }

  #[test]
  fn profile_rejects_inconsistent_statistics() {
    let assets = two_assets();

    assert!(ReturnProfile::new(assets.clone(), array![0.1], array![[0.04, 0.0], [0.0, 0.09]]).is_err());
    assert!(ReturnProfile::new(assets.clone(), array![0.1, 0.2], array![[0.04, 0.02], [0.0, 0.09]]).is_err());
    assert!(ReturnProfile::new(assets.clone(), array![0.1, 0.2], array![[-0.04, 0.0], [0.0, 0.09]]).is_err());
    assert!(ReturnProfile::new(assets, array![0.1, f64::NAN], array![[0.04, 0.0], [0.0, 0.09]]).is_err());
  }

  #[test]
  fn volatilities_and_correlation() {
    let profile = ReturnProfile::new(
      two_assets(),
      array![0.1, 0.2],
      array![[0.04, 0.01], [0.01, 0.09]],
    )
    .unwrap();

    let vols = profile.volatilities();
    assert_abs_diff_eq!(vols[0], 0.2, epsilon = 1e-12);
    assert_abs_diff_eq!(vols[1], 0.3, epsilon = 1e-12);
    assert_abs_diff_eq!(profile.correlation()[[1, 0]], 0.01 / 0.06, epsilon = 1e-12);
    assert_eq!(profile.correlation()[[1, 1]], 1.0);
  }
}
