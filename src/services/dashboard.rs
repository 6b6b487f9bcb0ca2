//! Dashboard data loading
//!
//! The three dashboard sections (headline metrics, acquisition series,
//! agent rankings) are fetched independently. A failed read logs a warning
//! and leaves that section at its empty default without affecting the others.

use chrono::NaiveDate;

use crate::gateway::Gateway;
use crate::services::aggregator::{AgentPartition, Aggregator, TimeSeries};
use crate::types::DashboardMetrics;

/// Everything the dashboard tab renders
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardData {
    pub metrics: DashboardMetrics,
    pub series: TimeSeries,
    pub agents: AgentPartition,
}

impl DashboardData {
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            metrics: DashboardMetrics::default(),
            series: TimeSeries::empty(today),
            agents: AgentPartition::default(),
        }
    }
}

/// Loads dashboard sections through a gateway
pub struct DashboardLoader<'a> {
    gateway: &'a dyn Gateway,
    lookback_days: u32,
}

impl<'a> DashboardLoader<'a> {
    pub fn new(gateway: &'a dyn Gateway, lookback_days: u32) -> Self {
        Self {
            gateway,
            lookback_days,
        }
    }

    /// Headline totals, zeroed on failure
    pub fn metrics(&self) -> DashboardMetrics {
        self.gateway.dashboard_metrics().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Dashboard metrics unavailable");
            DashboardMetrics::default()
        })
    }

    /// Weekly and monthly buckets anchored at `today`, all zero on failure
    pub fn series(&self, today: NaiveDate) -> TimeSeries {
        match self.gateway.daily_customer_counts(self.lookback_days) {
            Ok(daily) => Aggregator::time_series(&daily, today),
            Err(e) => {
                tracing::warn!(error = %e, "Daily customer counts unavailable");
                TimeSeries::empty(today)
            }
        }
    }

    /// Ranked agents. Either read failing empties the whole section.
    pub fn agents(&self) -> AgentPartition {
        let agents = match self.gateway.list_agents() {
            Ok(agents) => agents,
            Err(e) => {
                tracing::warn!(error = %e, "Agent list unavailable");
                return AgentPartition::default();
            }
        };
        let counts = match self.gateway.agent_customer_counts() {
            Ok(rows) => Aggregator::count_map(&rows),
            Err(e) => {
                tracing::warn!(error = %e, "Agent customer counts unavailable");
                return AgentPartition::default();
            }
        };
        Aggregator::partition_agents(&agents, &counts)
    }

    pub fn load(&self, today: NaiveDate) -> DashboardData {
        let data = DashboardData {
            metrics: self.metrics(),
            series: self.series(today),
            agents: self.agents(),
        };
        tracing::info!(
            total_customers = data.metrics.total_customers,
            agents = data.agents.all.len(),
            "Dashboard loaded"
        );
        data
    }
}
