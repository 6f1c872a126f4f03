use std::collections::HashSet;
use std::fmt::Display;

use crate::error::AllocationError;
use crate::error::Result;

/// Minimum number of assets an allocation can be built over.
pub const MIN_ASSETS: usize = 2;

/// Ordered, duplicate-free asset identifiers.
///
/// Every weight vector, return vector and covariance matrix in the crate is
/// positionally aligned with one of these.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AssetSet {
  ids: Vec<String>,
}

impl AssetSet {
  pub fn new<I, S>(ids: I) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let ids: Vec<String> = ids.into_iter().map(Into::into).collect();

    if ids.len() < MIN_ASSETS {
      return Err(AllocationError::validation(format!(
        "at least {MIN_ASSETS} assets are required, got {}",
        ids.len()
      )));
    }

    let mut seen = HashSet::with_capacity(ids.len());
    for id in &ids {
      if id.trim().is_empty() {
        return Err(AllocationError::validation("asset identifiers must be non-empty"));
      }
      if !seen.insert(id.as_str()) {
        return Err(AllocationError::validation(format!("duplicate asset '{id}'")));
      }
    }

    Ok(Self { ids })
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  /// Always `false`; construction rejects universes below [`MIN_ASSETS`].
  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }

  pub fn get(&self, index: usize) -> Option<&str> {
    self.ids.get(index).map(String::as_str)
  }

  /// Position of `id` in the set.
  pub fn position(&self, id: &str) -> Option<usize> {
    self.ids.iter().position(|a| a == id)
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.ids.iter().map(String::as_str)
  }

  pub fn as_slice(&self) -> &[String] {
    &self.ids
  }
}

impl Display for AssetSet {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.ids.join(", "))
  }
}
