pub mod commands;
pub mod config;
pub mod contracts;
pub mod error;
pub mod ledger;
pub mod period;
pub mod report;
pub mod setup;
pub mod sources;
pub mod state;

pub use contracts::envelope::{FailureEnvelope, SuccessEnvelope};
pub use error::{ClientError, ClientResult};
pub use period::{Cadence, Period};

pub const API_VERSION: &str = env!("CARGO_PKG_VERSION");
