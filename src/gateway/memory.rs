//! In-memory gateway backing `--demo` mode, tests and benches

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{Days, NaiveDate, NaiveTime};
use serde_json::json;

use super::{CustomerQuery, Gateway};
use crate::query::SearchTerm;
use crate::services::format::parse_timestamp;
use crate::session::{AuthUser, Session};
use crate::types::{
    Agent, AgentCustomerCount, Customer, DailyCount, DashError, DashboardMetrics, Result,
};

/// Gateway over fixed vectors. Customers are filtered, sorted and windowed
/// the same way the REST service does it.
pub struct MemoryGateway {
    agents: Mutex<Vec<Agent>>,
    customers: Vec<Customer>,
    daily: Option<Vec<DailyCount>>,
    metrics: Option<DashboardMetrics>,
    failing: HashSet<&'static str>,
    rename_error: Option<String>,
    max_rows: Option<usize>,
    list_calls: AtomicUsize,
}

impl MemoryGateway {
    pub fn new(agents: Vec<Agent>, customers: Vec<Customer>) -> Self {
        Self {
            agents: Mutex::new(agents),
            customers,
            daily: None,
            metrics: None,
            failing: HashSet::new(),
            rename_error: None,
            max_rows: None,
            list_calls: AtomicUsize::new(0),
        }
    }

    /// Fixed daily feed instead of one derived from customer timestamps
    pub fn with_daily(mut self, daily: Vec<DailyCount>) -> Self {
        self.daily = Some(daily);
        self
    }

    pub fn with_metrics(mut self, metrics: DashboardMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Make the named operation fail with a 503
    pub fn failing(mut self, operation: &'static str) -> Self {
        self.failing.insert(operation);
        self
    }

    /// Make renames fail with the given gateway message
    pub fn with_rename_error(mut self, message: impl Into<String>) -> Self {
        self.rename_error = Some(message.into());
        self
    }

    /// Server-side row cap applied to every customer read
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Number of `list_customers` calls served so far
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::Relaxed)
    }

    /// Seeded sales team with customers spread over the last four months
    pub fn demo(today: NaiveDate) -> Self {
        const NAMES: [&str; 8] = [
            "Amna Osman",
            "Bashir Elamin",
            "Huda Abdalla",
            "Khalid Yousif",
            "Mariam Hassan",
            "Omer Babiker",
            "Sara Ibrahim",
            "Tarig Mohamed",
        ];
        const LOCATIONS: [&str; 4] = ["Khartoum", "Omdurman", "Bahri", "Port Sudan"];

        let agents: Vec<Agent> = NAMES
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let joined = today.checked_sub_days(Days::new(200 + i as u64 * 17));
                Agent {
                    id: i as i64 + 1,
                    full_name: name.to_string(),
                    location: Some(LOCATIONS[i % LOCATIONS.len()].to_string()),
                    phone: (i % 3 != 2).then(|| format!("+249 91 {:03} {:04}", 100 + i, 2000 + i)),
                    date: joined.map(|d| d.format("%Y-%m-%d").to_string()),
                    created_at: joined.map(|d| format!("{}T08:30:00+00:00", d)),
                }
            })
            .collect();

        // Agents 7 and 8 have no customers
        let active = 6u64;
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap_or_default();
        let customers: Vec<Customer> = (1..=240u64)
            .map(|i| {
                let created = today
                    .checked_sub_days(Days::new((i * 7919) % 110))
                    .map(|d| d.and_time(noon).format("%Y-%m-%dT%H:%M:%S+00:00").to_string());
                Customer {
                    id: i as i64,
                    name: format!("Customer {:03}", i),
                    phone: (i % 11 != 0).then(|| format!("09{:08}", (i * 48271) % 100_000_000)),
                    agent_id: match i % 23 {
                        0 => None,
                        13 => Some(99),
                        _ => Some(((i * 5 + i / 7) % active + 1) as i64),
                    },
                    created_at: created,
                }
            })
            .collect();

        Self::new(agents, customers)
    }

    fn check(&self, operation: &'static str) -> Result<()> {
        if self.failing.contains(operation) {
            return Err(DashError::Gateway {
                status: 503,
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }

    fn agents_snapshot(&self) -> Vec<Agent> {
        self.agents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn filtered(&self, search: Option<&SearchTerm>) -> Vec<Customer> {
        self.customers
            .iter()
            .filter(|c| search.map_or(true, |term| term.matches(*c)))
            .cloned()
            .collect()
    }

    fn derived_daily(&self) -> Vec<DailyCount> {
        let mut by_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for customer in &self.customers {
            if let Some(dt) = customer.created_at.as_deref().and_then(parse_timestamp) {
                *by_day.entry(dt.date()).or_insert(0) += 1;
            }
        }
        by_day
            .into_iter()
            .map(|(date, count)| DailyCount::new(date, count))
            .collect()
    }
}

/// Never-expiring session for the sample user
fn demo_session(access_token: String, email: Option<&str>) -> Session {
    Session {
        access_token,
        refresh_token: "demo-refresh-token".into(),
        expires_at: 0,
        user: AuthUser {
            id: "demo00-user".into(),
            email: email.map(String::from),
            user_metadata: json!({"organization": "Demo Sales"})
                .as_object()
                .cloned()
                .unwrap_or_default(),
            last_sign_in_at: None,
        },
    }
}

impl Gateway for MemoryGateway {
    fn sign_in(&self, email: &str, _password: &str) -> Result<Session> {
        if self.failing.contains("sign_in") {
            return Err(DashError::Auth("Invalid login credentials".into()));
        }
        Ok(demo_session("demo-access-token".into(), Some(email)))
    }

    fn refresh_session(&self, refresh_token: &str) -> Result<Session> {
        if self.failing.contains("refresh_session") {
            return Err(DashError::Auth("Invalid Refresh Token".into()));
        }
        Ok(demo_session(format!("refreshed-{}", refresh_token), None))
    }

    fn sign_out(&self, _session: &Session) -> Result<()> {
        self.check("sign_out")
    }

    fn dashboard_metrics(&self) -> Result<DashboardMetrics> {
        self.check("dashboard_metrics")?;
        if let Some(metrics) = &self.metrics {
            return Ok(metrics.clone());
        }

        let known: HashSet<i64> = self.agents_snapshot().iter().map(|a| a.id).collect();
        let active: HashSet<i64> = self
            .customers
            .iter()
            .filter_map(|c| c.agent_id)
            .filter(|id| known.contains(id))
            .collect();
        let daily = self.daily.clone().unwrap_or_else(|| self.derived_daily());
        let avg = if daily.is_empty() {
            0.0
        } else {
            daily.iter().map(|d| d.count).sum::<u64>() as f64 / daily.len() as f64
        };

        Ok(DashboardMetrics {
            total_customers: self.customers.len() as u64,
            active_agents: active.len() as u64,
            avg_customers_per_day: avg,
        })
    }

    fn daily_customer_counts(&self, days_back: u32) -> Result<Vec<DailyCount>> {
        self.check("daily_customer_counts")?;
        let daily = self.daily.clone().unwrap_or_else(|| self.derived_daily());
        // Lookback is anchored at the newest row
        let Some(newest) = daily.iter().map(|d| d.date).max() else {
            return Ok(daily);
        };
        let oldest = newest
            .checked_sub_days(Days::new(u64::from(days_back)))
            .unwrap_or(NaiveDate::MIN);
        Ok(daily.into_iter().filter(|d| d.date > oldest).collect())
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        self.check("list_agents")?;
        Ok(self.agents_snapshot())
    }

    fn agent_customer_counts(&self) -> Result<Vec<AgentCustomerCount>> {
        self.check("agent_customer_counts")?;
        let mut counts: BTreeMap<i64, u64> = BTreeMap::new();
        for agent_id in self.customers.iter().filter_map(|c| c.agent_id) {
            *counts.entry(agent_id).or_insert(0) += 1;
        }
        Ok(counts
            .into_iter()
            .map(|(agent_id, count)| AgentCustomerCount { agent_id, count })
            .collect())
    }

    fn list_customers(&self, query: &CustomerQuery) -> Result<Vec<Customer>> {
        self.check("list_customers")?;
        self.list_calls.fetch_add(1, Ordering::Relaxed);

        let mut rows = self.filtered(query.search.as_ref());
        // Id ascending first so equal keys come out in id order
        rows.sort_by_key(|c| c.id);
        query.sort.sort(&mut rows);

        let limit = self
            .max_rows
            .map_or(query.range.limit, |cap| cap.min(query.range.limit));
        Ok(rows
            .into_iter()
            .skip(query.range.offset)
            .take(limit)
            .collect())
    }

    fn count_customers(&self, search: Option<&SearchTerm>) -> Result<u64> {
        self.check("count_customers")?;
        Ok(self.filtered(search).len() as u64)
    }

    fn update_agent_name(&self, agent_id: i64, new_name: &str) -> Result<()> {
        self.check("update_agent_name")?;
        if let Some(message) = &self.rename_error {
            return Err(DashError::Gateway {
                status: 403,
                message: message.clone(),
            });
        }

        let mut agents = self.agents.lock().unwrap_or_else(PoisonError::into_inner);
        match agents.iter_mut().find(|a| a.id == agent_id) {
            Some(agent) => {
                agent.full_name = new_name.to_string();
                Ok(())
            }
            None => Err(DashError::Gateway {
                status: 404,
                message: format!("Agent {} not found", agent_id),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Range;
    use crate::query::{CustomerSortField, SortDirection, SortSpec};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gateway() -> MemoryGateway {
        let customers = (1..=12)
            .map(|i| Customer {
                id: i,
                name: if i % 2 == 0 { "Even".into() } else { "Odd".into() },
                phone: None,
                agent_id: Some(1),
                created_at: None,
            })
            .collect();
        MemoryGateway::new(vec![Agent::new(1, "Amna")], customers)
    }

    #[test]
    fn test_list_customers_window_and_cap() {
        let gateway = gateway().with_max_rows(3);
        let query = CustomerQuery {
            search: SearchTerm::parse("even"),
            sort: SortSpec::new(CustomerSortField::Id, SortDirection::Asc),
            range: Range::new(1, 10),
        };
        let ids: Vec<i64> = gateway
            .list_customers(&query)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![4, 6, 8]);
        assert_eq!(gateway.list_calls(), 1);
    }

    #[test]
    fn test_equal_sort_keys_fall_back_to_id() {
        let query = CustomerQuery {
            search: None,
            sort: SortSpec::new(CustomerSortField::Name, SortDirection::Asc),
            range: Range::new(0, 4),
        };
        let ids: Vec<i64> = gateway()
            .list_customers(&query)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 4, 6, 8]);
    }

    #[test]
    fn test_failing_operation() {
        let gateway = gateway().failing("dashboard_metrics");
        let err = gateway.dashboard_metrics().unwrap_err();
        assert!(matches!(err, DashError::Gateway { status: 503, .. }));
        assert!(gateway.list_agents().is_ok());
    }

    #[test]
    fn test_rename_updates_agent() {
        let gateway = gateway();
        gateway.update_agent_name(1, "Amna Osman").unwrap();
        assert_eq!(gateway.list_agents().unwrap()[0].full_name, "Amna Osman");
        assert!(gateway.update_agent_name(42, "Nobody").is_err());
    }

    #[test]
    fn test_daily_lookback() {
        let gateway = gateway().with_daily(vec![
            DailyCount::new(day(2024, 1, 1), 1),
            DailyCount::new(day(2024, 5, 1), 2),
            DailyCount::new(day(2024, 6, 1), 3),
        ]);
        let rows = gateway.daily_customer_counts(120).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_demo_seed() {
        let today = day(2024, 6, 15);
        let gateway = MemoryGateway::demo(today);
        let agents = gateway.list_agents().unwrap();
        assert_eq!(agents.len(), 8);
        assert_eq!(gateway.count_customers(None).unwrap(), 240);

        let daily = gateway.daily_customer_counts(120).unwrap();
        assert!(daily.iter().all(|d| d.date <= today));
        assert_eq!(daily.iter().map(|d| d.count).sum::<u64>(), 240);

        let metrics = gateway.dashboard_metrics().unwrap();
        assert_eq!(metrics.total_customers, 240);
        assert!(metrics.active_agents <= 6);
    }
}
