pub(crate) mod common;
pub mod period;
pub mod reports;
pub mod rollup;
pub mod update;
