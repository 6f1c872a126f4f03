use std::collections::HashMap;

use chrono::NaiveDate;
use ndarray::Array2;
use ndarray::ArrayView1;
use ndarray::ArrayView2;
use ndarray::Axis;

use super::assets::AssetSet;
use crate::error::AllocationError;
use crate::error::Result;

/// Closing prices for an [`AssetSet`] on a shared calendar.
///
/// Rows are observations in date order, columns follow the asset order.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceHistory {
  assets: AssetSet,
  dates: Option<Vec<NaiveDate>>,
  closes: Array2<f64>,
}

impl PriceHistory {
  /// Build from per-asset `(date, close)` series as handed over by a market-data
  /// provider. Every asset must be present, non-empty, strictly date-ordered and
  /// share exactly the same dates. Entries for ids outside `assets` are ignored.
  pub fn from_series(
    assets: &AssetSet,
    series: &HashMap<String, Vec<(NaiveDate, f64)>>,
  ) -> Result<Self> {
    let mut calendar: Option<Vec<NaiveDate>> = None;
    let mut columns = Vec::with_capacity(assets.len());

    for asset in assets.iter() {
      let points = series
        .get(asset)
        .ok_or_else(|| AllocationError::insufficient(asset, "no price series supplied"))?;

      if points.is_empty() {
        return Err(AllocationError::insufficient(asset, "price series is empty"));
      }
      if points.windows(2).any(|w| w[1].0 <= w[0].0) {
        return Err(AllocationError::insufficient(
          asset,
          "dates are not strictly increasing",
        ));
      }

      let dates: Vec<NaiveDate> = points.iter().map(|(d, _)| *d).collect();
      match &calendar {
        None => calendar = Some(dates),
        Some(reference) if *reference != dates => {
          return Err(AllocationError::insufficient(
            asset,
            format!(
              "dates are misaligned with {} ({} vs {} observations)",
              assets.get(0).unwrap_or_default(),
              dates.len(),
              reference.len()
            ),
          ));
        }
        Some(_) => {}
      }

      columns.push(points.iter().map(|(_, p)| *p).collect::<Vec<f64>>());
    }

    let n_obs = calendar.as_ref().map(Vec::len).unwrap_or(0);
    let closes = Array2::from_shape_fn((n_obs, assets.len()), |(t, j)| columns[j][t]);

    Ok(Self {
      assets: assets.clone(),
      dates: calendar,
      closes,
    })
  }

  /// Build from a dense `observations x assets` close matrix without dates.
  pub fn from_closes(assets: AssetSet, closes: Array2<f64>) -> Result<Self> {
    if closes.ncols() != assets.len() {
      return Err(AllocationError::validation(format!(
        "close matrix has {} columns for {} assets",
        closes.ncols(),
        assets.len()
      )));
    }
    if closes.nrows() == 0 {
      return Err(AllocationError::insufficient(
        assets.to_string(),
        "price history is empty",
      ));
    }

    Ok(Self {
      assets,
      dates: None,
      closes,
    })
  }

  pub fn assets(&self) -> &AssetSet {
    &self.assets
  }

  /// Observation dates, when the history was built from dated series.
  pub fn dates(&self) -> Option<&[NaiveDate]> {
    self.dates.as_deref()
  }

  pub fn closes(&self) -> ArrayView2<'_, f64> {
    self.closes.view()
  }

  /// Close series of the asset at `index`.
  pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
    self.closes.index_axis(Axis(1), index)
  }

  /// Number of observations per asset.
  pub fn len(&self) -> usize {
    self.closes.nrows()
  }

  pub fn is_empty(&self) -> bool {
    self.closes.nrows() == 0
  }
}
