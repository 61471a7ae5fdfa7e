//! Repository modules for all Covenant entities.
//!
//! Each module holds the row mapping and SQL for one table as free functions
//! taking a `libsql::Connection` (so they run inside an open transaction),
//! plus the read methods it adds to `LifecycleService` via `impl` blocks.

pub mod approval;
pub mod audit;
pub mod contract;
pub mod version;
