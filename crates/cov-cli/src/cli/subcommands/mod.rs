mod approval;
mod contract;
mod version;

pub use approval::ApprovalCommands;
pub use contract::ContractCommands;
pub use version::VersionCommands;
