//! # asset-allocation
//!
//! $$
//! \mathbf{w}^\*=\arg\max_{\mathbf{w}\in\Delta^{N-1}} \frac{\mathbf{w}^\top\mu-r_f}{\sqrt{\mathbf{w}^\top\Sigma\mathbf{w}}}
//! $$
//!
//! Modern Portfolio Theory allocation: annualized return statistics from a
//! price history, the long-only maximum-Sharpe ("market") portfolio, and the
//! Capital Allocation Line blend that meets an investor's risk tolerance.
//!
//! Price and rate retrieval are collaborator traits in [`market`]; plotting
//! and command-line entry points live outside this crate.

pub mod error;
pub mod market;
pub mod portfolio;

pub use error::AllocationError;
pub use error::Result;
