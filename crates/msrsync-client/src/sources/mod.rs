//! Seams to the outside world: where hours come from and where monthly rollups
//! go. Both are treated as unreliable and called through [`retry`].

pub mod hours;
pub mod invoice;
pub mod retry;

pub use hours::{CsvExportSource, HoursSource, HoursTable, JsonHoursSource};
pub use invoice::{InvoiceSink, JsonExportSink, PublishReceipt};
