//! # Market Inputs
//!
//! Asset universes, aligned price histories, lookback windows and the
//! collaborator seams that supply prices and the risk-free rate.

pub mod assets;
pub mod history;
pub mod lookback;
pub mod source;

pub use assets::AssetSet;
pub use history::PriceHistory;
pub use lookback::LookbackWindow;
pub use source::FixedRate;
pub use source::InMemoryPrices;
pub use source::PriceSource;
pub use source::RateSource;
