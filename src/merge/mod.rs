//! Merging a front/back pair into one document.
//!
//! - [`order`]: which input page lands at which output position
//! - [`pages`]: rotation and page attribute handling
//! - [`merger`]: loading, orientation detection and assembly
//! - [`report`]: optional JSON record of a merge

pub mod merger;
pub mod order;
pub mod pages;
pub mod report;

pub use merger::{MergeResult, MergeStatistics, Merger};
pub use order::{PageSlot, Side, interleave};
pub use pages::{PageRotation, apply_rotation};
pub use report::MergeReport;
