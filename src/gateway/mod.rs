//! Remote data gateway contract

mod memory;
mod rest;

pub use memory::MemoryGateway;
pub use rest::RestGateway;

use crate::query::{CustomerSortField, SearchTerm, SortSpec};
use crate::session::Session;
use crate::types::{
    Agent, AgentCustomerCount, Customer, DailyCount, DashboardMetrics, Result,
};

/// Customer table column names matched by free-text search
pub const CUSTOMER_TEXT_COLUMNS: [&str; 2] = ["Customer_Name", "Customer_Mobile"];

/// Customer identifier column
pub const CUSTOMER_ID_COLUMN: &str = "Customer ID";

/// Half-open row window `[offset, offset + limit)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub offset: usize,
    pub limit: usize,
}

impl Range {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// Filter, sort and window for a customer read
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerQuery {
    pub search: Option<SearchTerm>,
    pub sort: SortSpec<CustomerSortField>,
    pub range: Range,
}

/// Operations the dashboard needs from the hosted database service.
///
/// Implementations are shared with worker threads, hence `Send + Sync`.
pub trait Gateway: Send + Sync {
    /// Password sign-in with the auth collaborator
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;

    /// Exchange a refresh token for a fresh session
    fn refresh_session(&self, refresh_token: &str) -> Result<Session>;

    /// Revoke the session's tokens
    fn sign_out(&self, session: &Session) -> Result<()>;

    fn dashboard_metrics(&self) -> Result<DashboardMetrics>;

    /// Per-day customer counts over the last `days_back` days
    fn daily_customer_counts(&self, days_back: u32) -> Result<Vec<DailyCount>>;

    /// Every agent, in gateway order
    fn list_agents(&self) -> Result<Vec<Agent>>;

    fn agent_customer_counts(&self) -> Result<Vec<AgentCustomerCount>>;

    /// One filtered, sorted window of customers
    fn list_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>>;

    /// Size of the filtered customer set
    fn count_customers(&self, search: Option<&SearchTerm>) -> Result<u64>;

    /// Rename an agent. Fails when the caller lacks permission.
    fn update_agent_name(&self, agent_id: i64, new_name: &str) -> Result<()>;
}
