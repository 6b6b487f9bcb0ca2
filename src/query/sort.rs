//! Single-field sorting for list views

use std::cmp::Ordering;
use std::fmt;

use super::search::quote_column;
use crate::services::format::parse_timestamp;
use crate::types::{AgentWithCount, Customer, CustomerRow};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Header arrow for the active sort column
    pub fn arrow(self) -> &'static str {
        match self {
            Self::Asc => "↑",
            Self::Desc => "↓",
        }
    }
}

/// Comparable value extracted from a record. Missing values map to "" / 0.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortKey {
    Number(i64),
    Text(String),
}

impl SortKey {
    /// Strings compare case-insensitively
    pub fn text(value: Option<&str>) -> Self {
        Self::Text(value.unwrap_or_default().to_lowercase())
    }

    /// Timestamps compare chronologically; unparseable ones as 0
    pub fn timestamp(value: Option<&str>) -> Self {
        Self::Number(
            value
                .and_then(parse_timestamp)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or(0),
        )
    }
}

/// A sortable column of some record type
pub trait SortField: Copy + PartialEq + fmt::Debug + 'static {
    type Record;

    /// Column header text
    fn label(self) -> &'static str;

    /// Value used for in-memory comparison
    fn sort_key(self, record: &Self::Record) -> SortKey;

    /// Every selectable field, in header order
    fn all() -> &'static [Self];
}

/// Active sort: one field plus a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec<F> {
    pub field: F,
    pub direction: SortDirection,
}

impl<F: SortField> SortSpec<F> {
    pub fn new(field: F, direction: SortDirection) -> Self {
        Self { field, direction }
    }

    /// Header click: the active field flips direction, a new field starts ascending
    pub fn select(self, field: F) -> Self {
        if self.field == field {
            Self::new(field, self.direction.toggle())
        } else {
            Self::new(field, SortDirection::Asc)
        }
    }

    pub fn compare(&self, a: &F::Record, b: &F::Record) -> Ordering {
        let ord = self.field.sort_key(a).cmp(&self.field.sort_key(b));
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }

    /// Sort in place. Equal keys carry no ordering guarantee beyond the input order.
    pub fn sort(&self, rows: &mut [F::Record]) {
        rows.sort_by(|a, b| self.compare(a, b));
    }
}

/// Sortable customer columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CustomerSortField {
    #[default]
    Id,
    Name,
    CreatedAt,
}

impl CustomerSortField {
    /// Gateway column backing this field
    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "Customer ID",
            Self::Name => "Customer_Name",
            Self::CreatedAt => "Created at",
        }
    }

    /// Parse a CLI name ("id", "name", "created")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "created" | "created_at" | "date" => Some(Self::CreatedAt),
            _ => None,
        }
    }
}

impl SortField for CustomerSortField {
    type Record = Customer;

    fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Name",
            Self::CreatedAt => "Date Added",
        }
    }

    fn sort_key(self, record: &Customer) -> SortKey {
        match self {
            Self::Id => SortKey::Number(record.id),
            Self::Name => SortKey::text(Some(&record.name)),
            Self::CreatedAt => SortKey::timestamp(record.created_at.as_deref()),
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Id, Self::Name, Self::CreatedAt]
    }
}

impl SortSpec<CustomerSortField> {
    /// PostgREST `order` value. Missing values rank lowest, and the id is
    /// appended as a tiebreaker so batched reads see a total order.
    pub fn to_order_param(&self) -> String {
        let nulls = match self.direction {
            SortDirection::Asc => "nullsfirst",
            SortDirection::Desc => "nullslast",
        };
        let primary = format!(
            "{}.{}.{}",
            quote_column(self.field.column()),
            self.direction.as_str(),
            nulls
        );
        if self.field == CustomerSortField::Id {
            primary
        } else {
            format!(
                "{},{}.asc",
                primary,
                quote_column(CustomerSortField::Id.column())
            )
        }
    }

    /// Same ordering applied to joined rows held in memory
    pub fn sort_rows(&self, rows: &mut [CustomerRow]) {
        rows.sort_by(|a, b| self.compare(&a.customer, &b.customer));
    }
}

impl Default for SortSpec<CustomerSortField> {
    /// Newest customers first
    fn default() -> Self {
        Self::new(CustomerSortField::Id, SortDirection::Desc)
    }
}

/// Sortable agent columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgentSortField {
    #[default]
    Id,
    Name,
    CreatedAt,
    CustomerCount,
}

impl AgentSortField {
    /// Parse a CLI name ("id", "name", "created", "customers")
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "created" | "created_at" | "joined" => Some(Self::CreatedAt),
            "customers" | "count" => Some(Self::CustomerCount),
            _ => None,
        }
    }
}

impl SortField for AgentSortField {
    type Record = AgentWithCount;

    fn label(self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::Name => "Agent",
            Self::CreatedAt => "Join Date",
            Self::CustomerCount => "Customers",
        }
    }

    fn sort_key(self, record: &AgentWithCount) -> SortKey {
        match self {
            Self::Id => SortKey::Number(record.agent.id),
            Self::Name => SortKey::text(Some(&record.agent.full_name)),
            Self::CreatedAt => SortKey::timestamp(record.agent.created_at.as_deref()),
            Self::CustomerCount => {
                SortKey::Number(i64::try_from(record.customer_count).unwrap_or(i64::MAX))
            }
        }
    }

    fn all() -> &'static [Self] {
        &[Self::Id, Self::Name, Self::CreatedAt, Self::CustomerCount]
    }
}

impl Default for SortSpec<AgentSortField> {
    fn default() -> Self {
        Self::new(AgentSortField::Id, SortDirection::Asc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Agent;

    fn customer(id: i64, name: &str, created_at: Option<&str>) -> Customer {
        Customer {
            id,
            name: name.to_string(),
            phone: None,
            agent_id: None,
            created_at: created_at.map(String::from),
        }
    }

    #[test]
    fn test_select_toggles_same_field() {
        let spec = SortSpec::new(CustomerSortField::Name, SortDirection::Asc);
        let spec = spec.select(CustomerSortField::Name);
        assert_eq!(spec.direction, SortDirection::Desc);
        let spec = spec.select(CustomerSortField::Name);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_select_new_field_starts_ascending() {
        let spec = SortSpec::<CustomerSortField>::default();
        assert_eq!(spec.direction, SortDirection::Desc);
        let spec = spec.select(CustomerSortField::Name);
        assert_eq!(spec.field, CustomerSortField::Name);
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn test_name_sort_is_case_insensitive() {
        let mut rows = vec![
            customer(1, "bravo", None),
            customer(2, "Alpha", None),
            customer(3, "charlie", None),
        ];
        SortSpec::new(CustomerSortField::Name, SortDirection::Asc).sort(&mut rows);
        let names: Vec<&str> = rows.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "bravo", "charlie"]);
    }

    #[test]
    fn test_missing_timestamp_sorts_lowest() {
        let mut rows = vec![
            customer(1, "a", Some("2024-02-01T10:00:00Z")),
            customer(2, "b", None),
            customer(3, "c", Some("2023-12-01T10:00:00Z")),
        ];
        SortSpec::new(CustomerSortField::CreatedAt, SortDirection::Asc).sort(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3, 1]);

        SortSpec::new(CustomerSortField::CreatedAt, SortDirection::Desc).sort(&mut rows);
        let ids: Vec<i64> = rows.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 3, 2]);
    }

    #[test]
    fn test_agent_sort_by_customer_count() {
        let mut agents = vec![
            AgentWithCount::new(Agent::new(1, "A"), 2),
            AgentWithCount::new(Agent::new(2, "B"), 9),
            AgentWithCount::new(Agent::new(3, "C"), 0),
        ];
        SortSpec::new(AgentSortField::CustomerCount, SortDirection::Desc).sort(&mut agents);
        let ids: Vec<i64> = agents.iter().map(|a| a.agent.id).collect();
        assert_eq!(ids, vec![2, 1, 3]);
    }

    #[test]
    fn test_order_param() {
        assert_eq!(
            SortSpec::<CustomerSortField>::default().to_order_param(),
            "\"Customer ID\".desc.nullslast"
        );
        assert_eq!(
            SortSpec::new(CustomerSortField::Name, SortDirection::Asc).to_order_param(),
            "Customer_Name.asc.nullsfirst,\"Customer ID\".asc"
        );
    }

    #[test]
    fn test_field_from_name() {
        assert_eq!(CustomerSortField::from_name("NAME"), Some(CustomerSortField::Name));
        assert_eq!(CustomerSortField::from_name("bogus"), None);
        assert_eq!(
            AgentSortField::from_name("customers"),
            Some(AgentSortField::CustomerCount)
        );
    }
}
