//! Plain-vanilla bullet bond analytics: cash-flow scheduling, valuation and
//! parallel-shift yield sensitivity.

pub mod analysis;
pub mod schedule;
pub mod sensitivity;
pub mod terms;
pub mod valuation;

pub use analysis::{analyze_bond, BondAnalysisInput, BondAnalysisOutput};
pub use schedule::{generate_schedule, CashFlowEvent};
pub use sensitivity::{sensitivity_curve, SensitivityPoint, ShiftRange};
pub use terms::BondTerms;
pub use valuation::{value_bond, PriceClassification, ValuationResult};
