//! # Portfolio
//!
//! $$
//! \sigma_p^2 = \mathbf{w}^\top \Sigma \mathbf{w}
//! $$
//!
//! Return statistics, maximum-Sharpe optimization, Capital Allocation Line
//! blending and frontier sampling.

pub mod blend;
pub mod data;
pub mod engine;
pub mod frontier;
pub mod optimizers;
pub mod report;
pub mod types;

pub use blend::blend;
pub use blend::capital_allocation_line;
pub use blend::market_proportion;
pub use data::ReturnProfile;
pub use data::ReturnStatistics;
pub use data::TRADING_DAYS_PER_YEAR;
pub use data::simple_returns;
pub use engine::AllocationConfig;
pub use engine::AssetAllocation;
pub use engine::InvestorProfile;
pub use frontier::FrontierSampler;
pub use frontier::FrontierSamples;
pub use optimizers::OptimizerSettings;
pub use optimizers::PortfolioOptimizer;
pub use optimizers::evaluate;
pub use optimizers::maximize_sharpe;
pub use report::AllocationReport;
pub use types::PortfolioMetrics;
pub use types::WEIGHT_SUM_TOLERANCE;
pub use types::WeightVector;
pub use types::is_valid_allocation;
pub use types::sharpe_ratio;
