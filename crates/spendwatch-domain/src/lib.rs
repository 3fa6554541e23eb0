//! spendwatch-domain
//!
//! Pure data types for expense analytics (records, daily aggregates, anomaly and forecast output).
//! No I/O, no CLI, no storage. Only data types and the aggregation helpers they need.

pub mod aggregate;
pub mod analysis;
pub mod category;
pub mod record;

pub use aggregate::*;
pub use analysis::*;
pub use category::*;
pub use record::*;
