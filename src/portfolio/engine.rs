//! # Allocation Engine
//!
//! $$
//! \text{prices}\to(\mu,\Sigma)\to\mathbf{w}^\*\to\text{CAL blend}
//! $$
//!
//! Investor-facing orchestration: validates the configuration, builds the
//! return profile once, solves the market portfolio once, and derives
//! risk-controlled portfolios from it on demand.

use ndarray::ArrayView1;
use tracing::info;

use super::blend::blend;
use super::blend::capital_allocation_line;
use super::data::ReturnProfile;
use super::data::ReturnStatistics;
use super::data::TRADING_DAYS_PER_YEAR;
use super::frontier::FrontierSampler;
use super::optimizers::OptimizerSettings;
use super::optimizers::PortfolioOptimizer;
use super::optimizers::evaluate;
use super::types::PortfolioMetrics;
use crate::error::AllocationError;
use crate::error::Result;
use crate::market::AssetSet;
use crate::market::LookbackWindow;
use crate::market::PriceHistory;
use crate::market::PriceSource;
use crate::market::RateSource;

fn check_rate(risk_free_rate: f64) -> Result<f64> {
  if risk_free_rate.is_finite() && risk_free_rate >= 0.0 {
    Ok(risk_free_rate)
  } else {
    Err(AllocationError::validation(format!(
      "risk-free rate must be a non-negative number, got {risk_free_rate}"
    )))
  }
}

fn check_tolerance(risk_tolerance: f64) -> Result<f64> {
  if risk_tolerance.is_finite() && risk_tolerance >= 0.0 {
    Ok(risk_tolerance)
  } else {
    Err(AllocationError::validation(format!(
      "risk tolerance must be a non-negative number, got {risk_tolerance}"
    )))
  }
}

/// Who is being allocated for: a label, a volatility budget and a universe.
#[derive(Clone, Debug, PartialEq)]
pub struct InvestorProfile {
  label: String,
  risk_tolerance: f64,
  assets: AssetSet,
}

impl InvestorProfile {
  /// `risk_tolerance` is an absolute annualized volatility budget (0.05 = 5%).
  pub fn new(label: impl Into<String>, risk_tolerance: f64, assets: AssetSet) -> Result<Self> {
    let label = label.into();
    if label.trim().is_empty() {
      return Err(AllocationError::validation("profile label must be non-empty"));
    }

    Ok(Self {
      label,
      risk_tolerance: check_tolerance(risk_tolerance)?,
      assets,
    })
  }

  pub fn label(&self) -> &str {
    &self.label
  }

  pub fn risk_tolerance(&self) -> f64 {
    self.risk_tolerance
  }

  pub fn assets(&self) -> &AssetSet {
    &self.assets
  }
}

/// Runtime configuration for [`AssetAllocation`].
#[derive(Clone, Debug, PartialEq)]
pub struct AllocationConfig {
  /// History requested from the price source.
  pub lookback: LookbackWindow,
  /// Return periods per year.
  pub annualization_factor: u32,
  /// Fixed risk-free rate; `None` asks the rate source.
  pub risk_free_rate: Option<f64>,
  /// Sharpe solver controls.
  pub optimizer: OptimizerSettings,
}

impl Default for AllocationConfig {
  fn default() -> Self {
    Self {
      lookback: LookbackWindow::default(),
      annualization_factor: TRADING_DAYS_PER_YEAR,
      risk_free_rate: None,
      optimizer: OptimizerSettings::default(),
    }
  }
}

impl AllocationConfig {
  pub fn validate(&self) -> Result<()> {
    ReturnStatistics::new(self.annualization_factor)?;
    if let Some(rate) = self.risk_free_rate {
      check_rate(rate)?;
    }
    self.optimizer.validate()
  }
}

/// Market and risk-controlled portfolios for one investor.
#[derive(Clone, Debug)]
pub struct AssetAllocation {
  profile: InvestorProfile,
  returns: ReturnProfile,
  risk_free_rate: f64,
  market: PortfolioMetrics,
}

impl AssetAllocation {
  /// Fetch the rate (unless configured) and the price history from the given
  /// collaborators, then solve.
  pub fn from_sources<P, R>(
    profile: InvestorProfile,
    prices: &P,
    rates: &R,
    config: &AllocationConfig,
  ) -> Result<Self>
  where
    P: PriceSource + ?Sized,
    R: RateSource + ?Sized,
  {
    config.validate()?;

    let risk_free_rate = match config.risk_free_rate {
      Some(rate) => rate,
      None => check_rate(rates.current_rate().map_err(AllocationError::from_source)?)?,
    };
    let history = prices
      .fetch(profile.assets(), config.lookback)
      .map_err(AllocationError::from_source)?;

    Self::from_history(profile, &history, risk_free_rate, config)
  }

  /// Solve over an in-hand price history.
  pub fn from_history(
    profile: InvestorProfile,
    history: &PriceHistory,
    risk_free_rate: f64,
    config: &AllocationConfig,
  ) -> Result<Self> {
    config.validate()?;
    if history.assets() != profile.assets() {
      return Err(AllocationError::validation(format!(
        "price history covers [{}] but the profile holds [{}]",
        history.assets(),
        profile.assets()
      )));
    }

    let returns = ReturnStatistics::new(config.annualization_factor)?.compute(history)?;
    Self::from_returns(profile, returns, risk_free_rate, &config.optimizer)
  }

  /// Solve over already computed return statistics.
  pub fn from_returns(
    profile: InvestorProfile,
    returns: ReturnProfile,
    risk_free_rate: f64,
    settings: &OptimizerSettings,
  ) -> Result<Self> {
    let risk_free_rate = check_rate(risk_free_rate)?;
    if returns.assets() != profile.assets() {
      return Err(AllocationError::validation(format!(
        "return statistics cover [{}] but the profile holds [{}]",
        returns.assets(),
        profile.assets()
      )));
    }

    let market = PortfolioOptimizer::new(*settings)?.market_portfolio(&returns, risk_free_rate)?;
    info!(
      profile = profile.label(),
      expected_return = market.expected_return,
      risk = market.risk,
      sharpe = ?market.sharpe_ratio,
      "market portfolio solved"
    );

    Ok(Self {
      profile,
      returns,
      risk_free_rate,
      market,
    })
  }

  pub fn profile(&self) -> &InvestorProfile {
    &self.profile
  }

  pub fn assets(&self) -> &AssetSet {
    self.profile.assets()
  }

  pub fn returns(&self) -> &ReturnProfile {
    &self.returns
  }

  pub fn risk_free_rate(&self) -> f64 {
    self.risk_free_rate
  }

  /// Maximum-Sharpe, fully invested portfolio.
  pub fn market_portfolio(&self) -> &PortfolioMetrics {
    &self.market
  }

  /// Market portfolio blended with the risk-free asset down to `risk_tolerance`.
  pub fn risk_controlled_portfolio(&self, risk_tolerance: f64) -> Result<PortfolioMetrics> {
    let risk_tolerance = check_tolerance(risk_tolerance)?;
    Ok(blend(&self.market, self.risk_free_rate, risk_tolerance))
  }

  /// Risk-controlled portfolio at the profile's own tolerance.
  pub fn risk_controlled_for_profile(&self) -> PortfolioMetrics {
    blend(&self.market, self.risk_free_rate, self.profile.risk_tolerance())
  }

  /// Return and risk of arbitrary weights against this allocation's statistics.
  pub fn evaluate(&self, weights: ArrayView1<'_, f64>) -> Result<(f64, f64)> {
    if weights.len() != self.returns.n_assets() {
      return Err(AllocationError::validation(format!(
        "expected {} weights, got {}",
        self.returns.n_assets(),
        weights.len()
      )));
    }
    Ok(evaluate(weights, &self.returns))
  }

  /// `count` random feasible portfolios for frontier plots.
  pub fn frontier(&self, count: usize, seed: Option<u64>) -> Vec<PortfolioMetrics> {
    FrontierSampler::new(self.risk_free_rate, seed).par_sample(&self.returns, count)
  }

  /// Points on the Capital Allocation Line up to `max_risk`.
  pub fn capital_allocation_line(&self, max_risk: f64, points: usize) -> Vec<(f64, f64)> {
    capital_allocation_line(&self.market, self.risk_free_rate, max_risk, points)
  }
}
