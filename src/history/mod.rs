//! Append-only interaction history: record schema, writer, and the
//! validation/repair pass.

pub mod record;
pub mod repair;
pub mod writer;

pub use record::{InteractionRecord, LineError, SchemaError, SchemaViolation};
pub use repair::{
    HistoryScan, RejectedLine, RepairOutcome, repair_history, scan_history, validate_and_repair,
};
pub use writer::HistoryWriter;
