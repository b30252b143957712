pub mod error;
pub mod fixed_income;
pub mod types;

pub use error::BondAnalyticsError;
pub use types::*;

/// Standard result type for all bond-analytics operations
pub type BondAnalyticsResult<T> = Result<T, BondAnalyticsError>;
