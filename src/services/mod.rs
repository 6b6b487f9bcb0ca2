//! Services for data aggregation and dashboard state

pub mod aggregator;
pub mod dashboard;
pub mod format;
pub mod rename;

pub use aggregator::{AgentPartition, Aggregator, TimeSeries};
pub use dashboard::{DashboardData, DashboardLoader};
pub use rename::{rename_agent, RenameError, RenameForm};
