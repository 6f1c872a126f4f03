//! Plain-text summary of an allocation.

use std::fmt::Display;
use std::fmt::Formatter;

use prettytable::Cell;
use prettytable::Row;
use prettytable::Table;
use prettytable::format::consts::FORMAT_BOX_CHARS;

use super::engine::AssetAllocation;
use super::types::PortfolioMetrics;
use crate::market::AssetSet;

fn percent(value: f64) -> String {
  format!("{:.2}%", value * 100.0)
}

fn row(label: &str, value: String) -> Row {
  Row::new(vec![Cell::new(label), Cell::new(&value)])
}

/// Weights and summary metrics of one portfolio as a table.
#[derive(Clone, Debug)]
pub struct AllocationReport {
  title: String,
  assets: AssetSet,
  metrics: PortfolioMetrics,
}

impl AllocationReport {
  pub fn new(title: impl Into<String>, assets: AssetSet, metrics: PortfolioMetrics) -> Self {
    Self {
      title: title.into(),
      assets,
      metrics,
    }
  }

  /// Report on the market portfolio of `allocation`.
  pub fn market(allocation: &AssetAllocation) -> Self {
    Self::new(
      format!("{} market portfolio", allocation.profile().label()),
      allocation.assets().clone(),
      allocation.market_portfolio().clone(),
    )
  }

  /// Report on the portfolio matching the investor's own risk tolerance.
  pub fn risk_controlled(allocation: &AssetAllocation) -> Self {
    Self::new(
      format!("{} risk-controlled portfolio", allocation.profile().label()),
      allocation.assets().clone(),
      allocation.risk_controlled_for_profile(),
    )
  }

  pub fn metrics(&self) -> &PortfolioMetrics {
    &self.metrics
  }

  pub fn table(&self) -> Table {
    let mut table = Table::new();
    table.set_format(*FORMAT_BOX_CHARS);
    table.set_titles(Row::new(vec![Cell::new(&self.title), Cell::new("")]));

    for (asset, weight) in self.assets.iter().zip(self.metrics.weights.iter()) {
      table.add_row(row(asset, percent(*weight)));
    }

    let risk_free_share = 1.0 - self.metrics.invested_fraction();
    if risk_free_share > 1e-9 {
      table.add_row(row("risk-free", percent(risk_free_share)));
    }

    table.add_row(row("expected return", percent(self.metrics.expected_return)));
    table.add_row(row("risk", percent(self.metrics.risk)));
    table.add_row(row(
      "sharpe ratio",
      self
        .metrics
        .sharpe_ratio
        .map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}")),
    ));

    table
  }
}

impl Display for AllocationReport {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.table())
  }
}
