//! Time-series alignment, correlation ranking, and lagged regression.
//!
//! Article counts are aggregated into the windows between consecutive
//! ground-truth dates and normalized by project traffic, ranked by their
//! correlation with the ground truth, and finally regressed against it at
//! every offset of a symmetric lag range.

pub mod aggregate;
pub mod lag;
pub mod rank;
pub mod regression;
pub mod types;
pub mod utility;
