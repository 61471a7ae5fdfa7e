//! Entity structs for all Covenant domain objects.
//!
//! Each entity maps to a table in the libSQL database (see `cov-db` migrations).
//! All structs derive `Serialize`, `Deserialize`, and `JsonSchema` for JSON
//! roundtrip and schema validation.

mod approval;
mod audit;
mod contract;
mod version;

pub use approval::Approval;
pub use audit::AuditLogEntry;
pub use contract::{Contract, Counterparty, NewContract};
pub use version::ContractVersion;
