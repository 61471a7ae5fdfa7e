pub mod approval;
pub mod audit;
pub mod contract;
pub mod dispatch;
pub mod schema;
pub mod shared;
pub mod version;
