//! Collaborator seams for price history and risk-free rate retrieval.
//!
//! Network-backed providers live outside this crate; they implement these
//! traits and hand their results to the allocation core.

use std::collections::HashMap;

use anyhow::Result;
use anyhow::anyhow;
use chrono::NaiveDate;
use impl_new_derive::ImplNew;

use super::assets::AssetSet;
use super::history::PriceHistory;
use super::lookback::LookbackWindow;

/// Supplies aligned closing prices for an asset universe.
pub trait PriceSource {
  fn fetch(&self, assets: &AssetSet, window: LookbackWindow) -> Result<PriceHistory>;
}

/// Supplies the annualized risk-free rate valid as of today.
pub trait RateSource {
  fn current_rate(&self) -> Result<f64>;
}

/// Constant rate, e.g. read from configuration.
#[derive(ImplNew, Clone, Copy, Debug)]
pub struct FixedRate {
  /// Annualized rate as a fraction (0.02 = 2%).
  pub rate: f64,
}

impl RateSource for FixedRate {
  fn current_rate(&self) -> Result<f64> {
    Ok(self.rate)
  }
}

/// Price source over series already held in memory.
///
/// Windows are resolved against the latest date present in the data.
#[derive(Clone, Debug, Default)]
pub struct InMemoryPrices {
  series: HashMap<String, Vec<(NaiveDate, f64)>>,
}

impl InMemoryPrices {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add or replace the series of `asset`.
  pub fn insert(&mut self, asset: impl Into<String>, points: Vec<(NaiveDate, f64)>) {
    self.series.insert(asset.into(), points);
  }

  pub fn with_series(mut self, asset: impl Into<String>, points: Vec<(NaiveDate, f64)>) -> Self {
    self.insert(asset, points);
    self
  }
}

impl PriceSource for InMemoryPrices {
  fn fetch(&self, assets: &AssetSet, window: LookbackWindow) -> Result<PriceHistory> {
    let as_of = assets
      .iter()
      .filter_map(|a| self.series.get(a))
      .filter_map(|points| points.last().map(|(d, _)| *d))
      .max()
      .ok_or_else(|| anyhow!("no prices held for {assets}"))?;
    let start = window.start_date(as_of);

    let selected: HashMap<String, Vec<(NaiveDate, f64)>> = assets
      .iter()
      .filter_map(|a| self.series.get(a).map(|points| (a, points)))
      .map(|(a, points)| {
        let kept = points
          .iter()
          .filter(|(d, _)| start.map_or(true, |s| *d >= s))
          .copied()
          .collect();
        (a.to_string(), kept)
      })
      .collect();

    Ok(PriceHistory::from_series(assets, &selected)?)
  }
}
