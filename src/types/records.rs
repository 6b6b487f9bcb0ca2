//! Record types read from the gateway

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Display name used when a customer's agent id does not resolve
pub const UNKNOWN_AGENT: &str = "Unknown Agent";

/// Treat an explicit JSON `null` the same as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Row of the `Agent` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Agent {
    #[serde(rename = "Agent ID")]
    pub id: i64,
    #[serde(rename = "Full Name", default, deserialize_with = "null_as_default")]
    pub full_name: String,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "Phone Number", default)]
    pub phone: Option<String>,
    /// Free-form date column kept as entered
    #[serde(rename = "Date", default)]
    pub date: Option<String>,
    /// Join timestamp as returned by the gateway (RFC 3339 or naive)
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Agent {
    pub fn new(id: i64, full_name: impl Into<String>) -> Self {
        Self {
            id,
            full_name: full_name.into(),
            location: None,
            phone: None,
            date: None,
            created_at: None,
        }
    }
}

/// Row of the `Customer_Data` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    #[serde(rename = "Customer ID")]
    pub id: i64,
    #[serde(rename = "Customer_Name", default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(rename = "Customer_Mobile", default)]
    pub phone: Option<String>,
    /// Owning agent; may be null or point at a deleted agent
    #[serde(rename = "Agent ID", default)]
    pub agent_id: Option<i64>,
    #[serde(rename = "Created at", default)]
    pub created_at: Option<String>,
}

/// Customers created on one calendar day (pre-aggregated by the gateway)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCount {
    pub date: NaiveDate,
    #[serde(rename = "customer_count", alias = "count")]
    pub count: u64,
}

impl DailyCount {
    pub fn new(date: NaiveDate, count: u64) -> Self {
        Self { date, count }
    }
}

/// Customers attributed to one agent (pre-aggregated by the gateway)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct AgentCustomerCount {
    pub agent_id: i64,
    #[serde(rename = "customer_count", alias = "count")]
    pub count: u64,
}

/// Headline totals computed server-side
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct DashboardMetrics {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_customers: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active_agents: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_customers_per_day: f64,
}

/// Agent joined with its customer count
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AgentWithCount {
    #[serde(flatten)]
    pub agent: Agent,
    pub customer_count: u64,
}

impl AgentWithCount {
    pub fn new(agent: Agent, customer_count: u64) -> Self {
        Self {
            agent,
            customer_count,
        }
    }

    /// Agents with at least one customer count as active
    pub fn is_active(&self) -> bool {
        self.customer_count > 0
    }

    pub fn status_label(&self) -> &'static str {
        if self.is_active() {
            "Active"
        } else {
            "Inactive"
        }
    }
}

/// Customer joined with its resolved agent display name
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CustomerRow {
    #[serde(flatten)]
    pub customer: Customer,
    pub agent_name: String,
}
