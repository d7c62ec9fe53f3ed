//! Report documents and the chain of persisted instances per family.

pub mod carry_forward;
pub mod columns;
pub mod model;
pub mod store;

pub use carry_forward::{BaseSource, CarryForward, resolve_base};
pub use columns::{ColumnMatch, locate_column, require_column};
pub use model::{Cell, CellStatus, CellValue, InstanceStatus, ReportInstance, Section, StyleToken};
