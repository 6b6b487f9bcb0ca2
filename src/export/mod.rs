//! CSV export of filtered, sorted list results

mod batch;

pub use batch::{
    export_agents, export_customers, fetch_all_customers, write_export, ExportSummary,
    MAX_BATCH_SIZE,
};

use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};

use crate::services::format::{format_date, or_not_available, NOT_AVAILABLE};
use crate::types::{AgentWithCount, CustomerRow, DashError, Result};

/// One exported column: header label plus cell extractor
pub struct ColumnSpec<R> {
    pub label: &'static str,
    pub cell: fn(&R) -> String,
}

impl<R> ColumnSpec<R> {
    pub const fn new(label: &'static str, cell: fn(&R) -> String) -> Self {
        Self { label, cell }
    }
}

/// Render rows as CSV text.
///
/// The header is the comma-joined labels. Every data cell is quoted, with
/// embedded quotes doubled.
pub fn serialize<R>(rows: &[R], columns: &[ColumnSpec<R>]) -> Result<String> {
    let mut out = columns
        .iter()
        .map(|c| c.label)
        .collect::<Vec<_>>()
        .join(",");
    out.push('\n');

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    for row in rows {
        writer
            .write_record(columns.iter().map(|c| (c.cell)(row)))
            .map_err(|e| DashError::Export(format!("Failed to write row: {}", e)))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| DashError::Export(format!("Failed to flush rows: {}", e)))?;
    let body = String::from_utf8(bytes)
        .map_err(|e| DashError::Export(format!("Invalid UTF-8 in export: {}", e)))?;

    out.push_str(&body);
    Ok(out)
}

pub fn customer_columns() -> [ColumnSpec<CustomerRow>; 6] {
    [
        ColumnSpec::new("Customer ID", |r| r.customer.id.to_string()),
        ColumnSpec::new("Customer Name", |r| r.customer.name.clone()),
        ColumnSpec::new("Phone Number", |r| {
            or_not_available(r.customer.phone.as_deref())
        }),
        ColumnSpec::new("Agent Name", |r| r.agent_name.clone()),
        ColumnSpec::new("Agent ID", |r| {
            r.customer
                .agent_id
                .map(|id| id.to_string())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string())
        }),
        ColumnSpec::new("Date Added", |r| format_date(r.customer.created_at.as_deref())),
    ]
}

pub fn agent_columns() -> [ColumnSpec<AgentWithCount>; 7] {
    [
        ColumnSpec::new("Agent ID", |a| a.agent.id.to_string()),
        ColumnSpec::new("Full Name", |a| a.agent.full_name.clone()),
        ColumnSpec::new("Location", |a| or_not_available(a.agent.location.as_deref())),
        ColumnSpec::new("Phone Number", |a| or_not_available(a.agent.phone.as_deref())),
        ColumnSpec::new("Join Date", |a| format_date(a.agent.created_at.as_deref())),
        ColumnSpec::new("Customers", |a| a.customer_count.to_string()),
        ColumnSpec::new("Status", |a| a.status_label().to_string()),
    ]
}

/// Which list is being exported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Customers,
    Agents,
}

impl ExportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Customers => "customers",
            Self::Agents => "agents",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "customers" => Some(Self::Customers),
            "agents" => Some(Self::Agents),
            _ => None,
        }
    }

    /// `customers_export_2024-02-01.csv`
    pub fn file_name(self, date: NaiveDate) -> String {
        format!("{}_export_{}.csv", self.as_str(), date.format("%Y-%m-%d"))
    }
}
