pub mod rollup;
pub mod writer;

pub use rollup::{RollupOutcome, RollupRecord, WeekCoverage, WeekState};
pub use writer::{WriteRequest, WriteSummary};
