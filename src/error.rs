//! # Errors
//!
//! Failure taxonomy shared by every allocation stage.

use thiserror::Error;

/// Errors raised while building an allocation.
#[derive(Error, Debug)]
pub enum AllocationError {
  /// Malformed or inconsistent caller-supplied configuration.
  #[error("invalid configuration: {0}")]
  Validation(String),

  /// Price history too short, misaligned or carrying unusable prices.
  #[error("insufficient data for {asset}: {reason}")]
  InsufficientData { asset: String, reason: String },

  /// The solver did not converge or the input admits no descent direction.
  #[error("optimization failed: {0}")]
  OptimizationFailed(String),

  /// A price or rate collaborator could not deliver its input.
  #[error(transparent)]
  DataSource(#[from] anyhow::Error),
}

impl AllocationError {
  pub(crate) fn validation(msg: impl Into<String>) -> Self {
    Self::Validation(msg.into())
  }

  pub(crate) fn insufficient(asset: impl Into<String>, reason: impl Into<String>) -> Self {
    Self::InsufficientData {
      asset: asset.into(),
      reason: reason.into(),
    }
  }

  /// Unwrap a crate error that travelled through a collaborator's `anyhow`
  /// error; anything else becomes [`AllocationError::DataSource`].
  pub(crate) fn from_source(err: anyhow::Error) -> Self {
    err.downcast::<Self>().unwrap_or_else(Self::DataSource)
  }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AllocationError>;
