//! Aggregator service for dashboard time series and agent rankings

use crate::types::{Agent, AgentCustomerCount, AgentWithCount, DailyCount};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::{HashMap, HashSet};

/// Number of daily buckets in the weekly series
pub const WEEKLY_BUCKETS: usize = 7;

/// Number of calendar-month buckets in the monthly series
pub const MONTHLY_BUCKETS: usize = 4;

/// Size of the "top agents" slice
pub const TOP_AGENTS: usize = 5;

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Fixed-width customer acquisition series anchored at `today`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeSeries {
    pub today: NaiveDate,
    /// Oldest first; `weekly[6]` is today
    pub weekly: [u64; WEEKLY_BUCKETS],
    /// Oldest first; `monthly[3]` is the current calendar month
    pub monthly: [u64; MONTHLY_BUCKETS],
}

impl TimeSeries {
    /// All-zero series (used when the daily feed is empty or failed)
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            today,
            weekly: [0; WEEKLY_BUCKETS],
            monthly: [0; MONTHLY_BUCKETS],
        }
    }

    pub fn weekly_total(&self) -> u64 {
        self.weekly.iter().sum()
    }

    pub fn monthly_total(&self) -> u64 {
        self.monthly.iter().sum()
    }

    /// Calendar day covered by each weekly bucket
    pub fn weekly_dates(&self) -> [Option<NaiveDate>; WEEKLY_BUCKETS] {
        let mut dates = [None; WEEKLY_BUCKETS];
        for (i, slot) in dates.iter_mut().enumerate() {
            *slot = self
                .today
                .checked_sub_days(Days::new((WEEKLY_BUCKETS - 1 - i) as u64));
        }
        dates
    }

    /// (year, month) covered by each monthly bucket
    pub fn monthly_months(&self) -> [(i32, u32); MONTHLY_BUCKETS] {
        let mut months = [(0, 0); MONTHLY_BUCKETS];
        for (j, slot) in months.iter_mut().enumerate() {
            *slot = months_before(self.today, (MONTHLY_BUCKETS - 1 - j) as u32);
        }
        months
    }

    /// Weekday abbreviations for the weekly bars ("Mon".."Sun")
    pub fn weekly_labels(&self) -> [String; WEEKLY_BUCKETS] {
        self.weekly_dates()
            .map(|d| d.map(|d| d.format("%a").to_string()).unwrap_or_default())
    }

    /// Month abbreviations for the monthly bars ("Jan".."Dec")
    pub fn monthly_labels(&self) -> [&'static str; MONTHLY_BUCKETS] {
        self.monthly_months()
            .map(|(_, month)| MONTH_NAMES[(month as usize).saturating_sub(1) % 12])
    }
}

/// Share of `part` in `total`, with the denominator floored at 1
pub fn share_of(part: u64, total: u64) -> f64 {
    part as f64 / total.max(1) as f64
}

/// Calendar (year, month) that lies `months` months before the month of `date`
pub fn months_before(date: NaiveDate, months: u32) -> (i32, u32) {
    let index = date.year() * 12 + date.month0() as i32 - months as i32;
    (index.div_euclid(12), index.rem_euclid(12) as u32 + 1)
}

/// Agents ranked by customer count
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentPartition {
    /// Every agent once, descending by count, ties in gateway order
    pub all: Vec<AgentWithCount>,
    /// First `TOP_AGENTS` of `all`
    pub top: Vec<AgentWithCount>,
    /// Agents with zero customers, gateway order
    pub inactive: Vec<AgentWithCount>,
}

/// Aggregator for dashboard statistics
pub struct Aggregator;

impl Aggregator {
    /// Bucket daily counts into the last 7 days and the last 4 calendar months.
    ///
    /// Buckets are anchored at `today`, not at the range of the data, so a
    /// stale or sparse feed yields zero buckets.
    pub fn time_series(daily: &[DailyCount], today: NaiveDate) -> TimeSeries {
        let mut series = TimeSeries::empty(today);
        if daily.is_empty() {
            return series;
        }

        // Later rows for the same day replace earlier ones
        let by_day: HashMap<NaiveDate, u64> = daily.iter().map(|d| (d.date, d.count)).collect();

        let dates = series.weekly_dates();
        for (slot, date) in series.weekly.iter_mut().zip(dates) {
            *slot = date.and_then(|d| by_day.get(&d).copied()).unwrap_or(0);
        }

        let months = series.monthly_months();
        for row in daily {
            let key = (row.date.year(), row.date.month());
            if let Some(j) = months.iter().position(|m| *m == key) {
                series.monthly[j] = series.monthly[j].saturating_add(row.count);
            }
        }

        series
    }

    /// Collapse per-agent count rows into a lookup (duplicate ids are summed)
    pub fn count_map(rows: &[AgentCustomerCount]) -> HashMap<i64, u64> {
        let mut map: HashMap<i64, u64> = HashMap::with_capacity(rows.len());
        for row in rows {
            let entry = map.entry(row.agent_id).or_insert(0);
            *entry = entry.saturating_add(row.count);
        }
        map
    }

    /// Join agents with their counts, preserving gateway order.
    /// Agents missing from `counts` get 0; repeated agent ids keep the first row.
    pub fn with_counts(agents: &[Agent], counts: &HashMap<i64, u64>) -> Vec<AgentWithCount> {
        let mut seen: HashSet<i64> = HashSet::with_capacity(agents.len());
        agents
            .iter()
            .filter(|a| seen.insert(a.id))
            .map(|a| AgentWithCount::new(a.clone(), counts.get(&a.id).copied().unwrap_or(0)))
            .collect()
    }

    /// Rank agents by customer count and split out the top and inactive sets
    pub fn partition_agents(agents: &[Agent], counts: &HashMap<i64, u64>) -> AgentPartition {
        let joined = Self::with_counts(agents, counts);

        let inactive: Vec<AgentWithCount> = joined
            .iter()
            .filter(|a| !a.is_active())
            .cloned()
            .collect();

        // sort_by is stable: equal counts keep gateway order
        let mut all = joined;
        all.sort_by(|a, b| b.customer_count.cmp(&a.customer_count));

        let top = all.iter().take(TOP_AGENTS).cloned().collect();

        AgentPartition { all, top, inactive }
    }
}
