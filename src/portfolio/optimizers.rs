//! # Portfolio Optimizers
//!
//! $$
//! \min_{\mathbf{w}} -\frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! \quad\text{s.t.}\quad \mathbf{1}^\top\mathbf{w}=1,\ 0\le w_i\le 1
//! $$
//!
//! Long-only maximum-Sharpe (tangency) optimizer.
//!
//! The simplex constraints are carried by the parametrization: the solver
//! moves `N - 1` free logits and weights are their softmax with the last logit
//! pinned at zero, so every point the solver visits is a valid allocation and
//! the zero logit vector is the uniform `1/N` starting point. L-BFGS runs on
//! the logits with the analytic gradient; a run is accepted once the weights
//! satisfy the first-order optimality conditions on the simplex.

use argmin::core::CostFunction;
use argmin::core::Executor;
use argmin::core::Gradient;
use argmin::core::State;
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use ndarray::Array1;
use ndarray::Array2;
use ndarray::ArrayView1;
use tracing::debug;

use super::data::ReturnProfile;
use super::types::PortfolioMetrics;
use super::types::WeightVector;
use super::types::ZERO_RISK;
use super::types::is_valid_allocation;
use super::types::sharpe_ratio;
use crate::error::AllocationError;
use crate::error::Result;

/// Share of the uniform allocation mixed into a restart point.
const RESTART_MIX: f64 = 1e-3;

/// Model return and volatility of `weights`: `(w·μ, sqrt(wᵀΣw))`.
///
/// # Panics
///
/// If `weights` does not have one entry per asset of `profile`.
pub fn evaluate(weights: ArrayView1<'_, f64>, profile: &ReturnProfile) -> (f64, f64) {
  performance(weights, profile.expected_returns(), profile.covariance())
}

fn performance(w: ArrayView1<'_, f64>, mu: &Array1<f64>, cov: &Array2<f64>) -> (f64, f64) {
  let ret = w.dot(mu);
  // PSD covariance can still round to a tiny negative variance
  let var = w.dot(&cov.dot(&w)).max(0.0);
  (ret, var.sqrt())
}

/// Sharpe ratio of `w` and its gradient with respect to the weights,
/// `∂S/∂w = (μ - S·Σw/σ) / σ`. `None` when `w` carries no risk.
fn sharpe_with_gradient(
  w: ArrayView1<'_, f64>,
  mu: &Array1<f64>,
  cov: &Array2<f64>,
  risk_free_rate: f64,
) -> Option<(f64, Array1<f64>)> {
  let cov_w = cov.dot(&w);
  let risk = w.dot(&cov_w).max(0.0).sqrt();
  if risk <= ZERO_RISK {
    return None;
  }

  let sharpe = (w.dot(mu) - risk_free_rate) / risk;
  let grad = (mu - &(cov_w * (sharpe / risk))) / risk;
  Some((sharpe, grad))
}

/// Largest gain in Sharpe per unit of weight moved onto a single asset,
/// relative to the gradient scale. Zero or negative at a simplex optimum.
fn optimality_gap(w: ArrayView1<'_, f64>, grad: &Array1<f64>) -> f64 {
  let mean = w.dot(grad);
  let scale = 1.0 + grad.iter().fold(0.0_f64, |m, g| m.max(g.abs()));
  grad.iter().fold(f64::NEG_INFINITY, |m, &g| m.max(g - mean)) / scale
}

/// Softmax over `logits` extended with a trailing zero logit.
fn anchored_softmax(logits: &[f64]) -> Vec<f64> {
  let max_x = logits.iter().copied().fold(0.0_f64, f64::max);
  let mut exps: Vec<f64> = logits.iter().map(|&v| (v - max_x).exp()).collect();
  exps.push((-max_x).exp());

  // the largest term is exp(0) = 1, so the sum never vanishes
  let sum: f64 = exps.iter().sum();
  exps.iter().map(|&e| e / sum).collect()
}

/// Logits of `weights` nudged towards uniform, so assets driven to zero
/// weight get a visible gradient again.
fn restart_logits(weights: &WeightVector) -> Vec<f64> {
  let n = weights.len();
  let mixed = weights.mapv(|w| (1.0 - RESTART_MIX) * w + RESTART_MIX / n as f64);
  let anchor = mixed[n - 1];
  mixed.iter().take(n - 1).map(|w| (w / anchor).ln()).collect()
}

#[derive(Clone)]
struct NegativeSharpe {
  mu: Array1<f64>,
  cov: Array2<f64>,
  risk_free_rate: f64,
}

impl CostFunction for NegativeSharpe {
  type Param = Vec<f64>;
  type Output = f64;

  fn cost(&self, x: &Self::Param) -> std::result::Result<Self::Output, argmin::core::Error> {
    let w = Array1::from(anchored_softmax(x));
    let (ret, risk) = performance(w.view(), &self.mu, &self.cov);

    // riskless points rank as Sharpe = -inf
    Ok(match sharpe_ratio(ret, risk, self.risk_free_rate) {
      Some(sharpe) => -sharpe,
      None => f64::INFINITY,
    })
  }
}

impl Gradient for NegativeSharpe {
  type Param = Vec<f64>;
  type Gradient = Vec<f64>;

  fn gradient(&self, x: &Self::Param) -> std::result::Result<Self::Gradient, argmin::core::Error> {
    let w = Array1::from(anchored_softmax(x));
    let Some((_, grad)) = sharpe_with_gradient(w.view(), &self.mu, &self.cov, self.risk_free_rate)
    else {
      return Ok(vec![0.0; x.len()]);
    };

    // softmax Jacobian: ∂w_j/∂z_k = w_j (δ_jk - w_k)
    let mean = w.dot(&grad);
    Ok((0..x.len()).map(|k| -w[k] * (grad[k] - mean)).collect())
  }
}

/// Solver controls for [`PortfolioOptimizer`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OptimizerSettings {
  /// Iteration cap for each L-BFGS run.
  pub max_iters: u64,
  /// L-BFGS stops once the logit gradient norm falls below this.
  pub grad_tolerance: f64,
  /// Accepted first-order optimality gap on the weights.
  pub kkt_tolerance: f64,
  /// Further runs from the best point when the gap is not met.
  pub restarts: u32,
  /// Number of correction pairs kept by L-BFGS.
  pub memory: usize,
}

impl Default for OptimizerSettings {
  fn default() -> Self {
    Self {
      max_iters: 1000,
      grad_tolerance: 1e-12,
      kkt_tolerance: 1e-5,
      restarts: 3,
      memory: 10,
    }
  }
}

impl OptimizerSettings {
  pub fn validate(&self) -> Result<()> {
    if self.max_iters == 0 {
      return Err(AllocationError::validation("max_iters must be positive"));
    }
    if !(self.grad_tolerance.is_finite() && self.grad_tolerance >= 0.0) {
      return Err(AllocationError::validation(
        "grad_tolerance must be a non-negative number",
      ));
    }
    if !(self.kkt_tolerance.is_finite() && self.kkt_tolerance > 0.0) {
      return Err(AllocationError::validation("kkt_tolerance must be positive"));
    }
    if self.memory == 0 {
      return Err(AllocationError::validation("memory must be positive"));
    }
    Ok(())
  }
}

/// Maximum-Sharpe optimizer over long-only, fully invested portfolios.
#[derive(Clone, Debug, Default)]
pub struct PortfolioOptimizer {
  settings: OptimizerSettings,
}

impl PortfolioOptimizer {
  pub fn new(settings: OptimizerSettings) -> Result<Self> {
    settings.validate()?;
    Ok(Self { settings })
  }

  pub fn settings(&self) -> &OptimizerSettings {
    &self.settings
  }

  /// Weights maximizing `(w·μ - r_f) / sqrt(wᵀΣw)` subject to `sum(w) = 1`
  /// and `0 <= w_i <= 1`, starting from uniform weights.
  ///
  /// Fails with [`AllocationError::OptimizationFailed`] when the solver errors
  /// out, every portfolio is riskless, or no run reaches an allocation within
  /// the optimality tolerance.
  pub fn maximize_sharpe(
    &self,
    profile: &ReturnProfile,
    risk_free_rate: f64,
  ) -> Result<WeightVector> {
    if !(risk_free_rate.is_finite() && risk_free_rate >= 0.0) {
      return Err(AllocationError::validation(format!(
        "risk-free rate must be a non-negative number, got {risk_free_rate}"
      )));
    }
    if profile.is_riskless() {
      return Err(AllocationError::OptimizationFailed(
        "covariance is degenerate: every portfolio has zero risk".to_string(),
      ));
    }

    let problem = NegativeSharpe {
      mu: profile.expected_returns().clone(),
      cov: profile.covariance().clone(),
      risk_free_rate,
    };

    let mut start = vec![0.0; profile.n_assets() - 1];
    let mut last_gap = f64::INFINITY;
    let mut last_stop = String::from("not started");

    for run in 0..=self.settings.restarts {
      let (weights, stop) = self.run_lbfgs(&problem, start)?;
      last_stop = stop;

      let Some((sharpe, grad)) =
        sharpe_with_gradient(weights.view(), &problem.mu, &problem.cov, risk_free_rate)
      else {
        return Err(AllocationError::OptimizationFailed(
          "no portfolio with positive risk was found".to_string(),
        ));
      };
      last_gap = optimality_gap(weights.view(), &grad);

      debug!(
        run,
        sharpe,
        gap = last_gap,
        stop = %last_stop,
        "sharpe optimization run finished"
      );

      if last_gap <= self.settings.kkt_tolerance && is_valid_allocation(&weights) {
        return Ok(weights);
      }
      start = restart_logits(&weights);
    }

    Err(AllocationError::OptimizationFailed(format!(
      "no stationary allocation after {} runs: optimality gap {last_gap:.3e} ({last_stop})",
      self.settings.restarts + 1
    )))
  }

  fn run_lbfgs(&self, problem: &NegativeSharpe, start: Vec<f64>) -> Result<(WeightVector, String)> {
    let solver_error = |e: argmin::core::Error| AllocationError::OptimizationFailed(e.to_string());

    let linesearch = MoreThuenteLineSearch::new()
      .with_c(1e-4, 0.9)
      .map_err(solver_error)?;
    let solver = LBFGS::new(linesearch, self.settings.memory)
      .with_tolerance_grad(self.settings.grad_tolerance)
      .map_err(solver_error)?;

    let res = Executor::new(problem.clone(), solver)
      .configure(|state| state.param(start).max_iters(self.settings.max_iters))
      .run()
      .map_err(solver_error)?;

    let state = &res.state;
    let best = state
      .get_best_param()
      .ok_or_else(|| AllocationError::OptimizationFailed("solver returned no parameters".to_string()))?;
    let stop = format!(
      "{:?} after {} iterations",
      state.get_termination_reason(),
      state.get_iter()
    );

    Ok((Array1::from(anchored_softmax(best)), stop))
  }

  /// Solve for the market portfolio and evaluate it.
  pub fn market_portfolio(
    &self,
    profile: &ReturnProfile,
    risk_free_rate: f64,
  ) -> Result<PortfolioMetrics> {
    let weights = self.maximize_sharpe(profile, risk_free_rate)?;
    Ok(PortfolioMetrics::from_weights(weights, profile, risk_free_rate))
  }
}

/// [`PortfolioOptimizer::maximize_sharpe`] with default settings.
pub fn maximize_sharpe(profile: &ReturnProfile, risk_free_rate: f64) -> Result<WeightVector> {
  PortfolioOptimizer::default().maximize_sharpe(profile, risk_free_rate)
}
