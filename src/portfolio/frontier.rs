//! # Frontier Sampling
//!
//! $$
//! \mathbf{w}=\frac{\mathbf{e}}{\mathbf{1}^\top\mathbf{e}},\qquad e_i\sim\mathrm{Exp}(1)
//! $$
//!
//! Random long-only portfolios covering the achievable risk/return region.
//! Normalized exponential draws are uniform on the simplex. No optimality claim.

use impl_new_derive::ImplNew;
use ndarray::Array1;
use ndarray_rand::RandomExt;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::Exp1;
use rayon::prelude::*;

use super::data::ReturnProfile;
use super::types::PortfolioMetrics;
use super::types::WeightVector;

fn random_simplex_weights<R: Rng + ?Sized>(n: usize, rng: &mut R) -> WeightVector {
  let draws: Array1<f64> = Array1::random_using(n, Exp1, rng);
  let total = draws.sum();
  if total > 0.0 {
    draws / total
  } else {
    Array1::from_elem(n, 1.0 / n as f64)
  }
}

/// Random feasible portfolio generator.
#[derive(ImplNew, Clone, Debug)]
pub struct FrontierSampler {
  /// Rate used for the Sharpe ratio of each sample.
  pub risk_free_rate: f64,
  /// Seed for reproducible samples; `None` draws one from the OS.
  pub seed: Option<u64>,
}

impl FrontierSampler {
  fn base_seed(&self) -> u64 {
    self.seed.unwrap_or_else(rand::random)
  }

  /// Lazy stream of `count` sampled portfolios.
  pub fn iter<'a>(&self, profile: &'a ReturnProfile, count: usize) -> FrontierSamples<'a> {
    FrontierSamples {
      profile,
      risk_free_rate: self.risk_free_rate,
      rng: StdRng::seed_from_u64(self.base_seed()),
      remaining: count,
    }
  }

  /// `count` sampled portfolios, materialized.
  pub fn sample(&self, profile: &ReturnProfile, count: usize) -> Vec<PortfolioMetrics> {
    self.iter(profile, count).collect()
  }

  /// Like [`FrontierSampler::sample`], spread across the rayon pool. Each
  /// sample draws from its own generator, so the output does not match
  /// [`FrontierSampler::sample`] for the same seed.
  pub fn par_sample(&self, profile: &ReturnProfile, count: usize) -> Vec<PortfolioMetrics> {
    let base = self.base_seed();
    let n = profile.n_assets();

    (0..count)
      .into_par_iter()
      .map(|i| {
        let mut rng = StdRng::seed_from_u64(base.wrapping_add(i as u64));
        let weights = random_simplex_weights(n, &mut rng);
        PortfolioMetrics::from_weights(weights, profile, self.risk_free_rate)
      })
      .collect()
  }
}

/// Finite, non-restartable iterator returned by [`FrontierSampler::iter`].
pub struct FrontierSamples<'a> {
  profile: &'a ReturnProfile,
  risk_free_rate: f64,
  rng: StdRng,
  remaining: usize,
}

impl Iterator for FrontierSamples<'_> {
  type Item = PortfolioMetrics;

  fn next(&mut self) -> Option<Self::Item> {
    if self.remaining == 0 {
      return None;
    }
    self.remaining -= 1;

    let weights = random_simplex_weights(self.profile.n_assets(), &mut self.rng);
    Some(PortfolioMetrics::from_weights(
      weights,
      self.profile,
      self.risk_free_rate,
    ))
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    (self.remaining, Some(self.remaining))
  }
}

impl ExactSizeIterator for FrontierSamples<'_> {}

#[cfg(test)]
mod tests {
  use ndarray::array;

  use super::*;
  use crate::market::AssetSet;
  use crate::portfolio::optimizers::PortfolioOptimizer;
  use crate::portfolio::types::is_valid_allocation;

  fn profile() -> ReturnProfile {
    ReturnProfile::new(
      AssetSet::new(["A", "B", "C"]).unwrap(),
      array![0.08, 0.12, 0.15],
      array![
        [0.04, 0.006, 0.002],
        [0.006, 0.09, 0.01],
        [0.002, 0.01, 0.16],
      ],
    )
    .unwrap()
  }

  #[test]
  fn samples_are_valid_allocations() {
    let samples = FrontierSampler::new(0.02, Some(7)).sample(&profile(), 500);

    assert_eq!(samples.len(), 500);
    for s in &samples {
      assert!(is_valid_allocation(&s.weights));
      assert!(s.risk > 0.0);
      assert!(s.sharpe_ratio.is_some());
    }
  }

  #[test]
  fn seeded_sampling_is_reproducible() {
    let sampler = FrontierSampler::new(0.02, Some(42));

    assert_eq!(sampler.sample(&profile(), 20), sampler.sample(&profile(), 20));
  }

  #[test]
  fn iterator_is_lazy_and_finite() {
    let profile = profile();
    let mut samples = FrontierSampler::new(0.02, None).iter(&profile, 3);

    assert_eq!(samples.len(), 3);
    assert!(samples.next().is_some());
    assert_eq!(samples.len(), 2);
    assert_eq!(samples.by_ref().count(), 2);
    assert!(samples.next().is_none());
  }

  #[test]
  fn parallel_sampling_yields_requested_count() {
    let sampler = FrontierSampler::new(0.02, Some(3));
    let samples = sampler.par_sample(&profile(), 256);

    assert_eq!(samples.len(), 256);
    assert!(samples.iter().all(|s| is_valid_allocation(&s.weights)));
    assert_eq!(samples, sampler.par_sample(&profile(), 256));
  }

  #[test]
  fn no_sample_beats_the_market_portfolio() {
    let profile = profile();
    let market = PortfolioOptimizer::default()
      .market_portfolio(&profile, 0.02)
      .unwrap();
    let best = market.sharpe_or_neg_infinity();

    for s in FrontierSampler::new(0.02, Some(11)).par_sample(&profile, 2000) {
      assert!(s.sharpe_or_neg_infinity() <= best + 1e-4);
    }
  }
}
