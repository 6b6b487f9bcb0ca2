use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::NaiveDate;
use serde::Serialize;

use super::{agent_columns, customer_columns, serialize, ExportKind};
use crate::gateway::{CustomerQuery, Gateway, Range};
use crate::query::{
    AgentDirectory, AgentPipeline, AgentSortField, CustomerSortField, SearchTerm, SortSpec,
    StatusFilter,
};
use crate::types::{AgentWithCount, Customer, Result};

/// Where an export landed
#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub size_bytes: u64,
    pub duration_ms: u64,
}

/// Largest batch requested per read; hosted PostgREST caps responses at 1000 rows
pub const MAX_BATCH_SIZE: usize = 1000;

/// Pull the whole filtered, sorted customer set in batches.
///
/// The filtered set is counted first and batches are read until that many
/// rows arrived. A server row cap only shortens each batch; the next offset
/// follows the rows actually received. An empty batch ends the read early.
pub fn fetch_all_customers(
    gateway: &dyn Gateway,
    search: Option<&SearchTerm>,
    sort: SortSpec<CustomerSortField>,
    batch_size: usize,
) -> Result<Vec<Customer>> {
    let batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
    let total = usize::try_from(gateway.count_customers(search)?).unwrap_or(usize::MAX);
    let mut all = Vec::with_capacity(total.min(100_000));
    while all.len() < total {
        let query = CustomerQuery {
            search: search.cloned(),
            sort,
            range: Range::new(all.len(), batch_size),
        };
        let batch = gateway.list_customers(&query)?;
        tracing::debug!(offset = query.range.offset, rows = batch.len(), "Fetched export batch");
        if batch.is_empty() {
            tracing::warn!(received = all.len(), total, "Export ended before the counted total");
            break;
        }
        all.extend(batch);
    }
    Ok(all)
}

/// CSV text for every customer matching the on-screen filter and sort
pub fn export_customers(
    gateway: &dyn Gateway,
    directory: &AgentDirectory,
    search: Option<&SearchTerm>,
    sort: SortSpec<CustomerSortField>,
    batch_size: usize,
) -> Result<(String, usize)> {
    let customers = fetch_all_customers(gateway, search, sort, batch_size)?;
    let rows = directory.join(customers);
    Ok((serialize(&rows, &customer_columns())?, rows.len()))
}

/// CSV text for every loaded agent matching the filter, status and sort
pub fn export_agents(
    agents: &[AgentWithCount],
    search: Option<&SearchTerm>,
    status: StatusFilter,
    sort: &SortSpec<AgentSortField>,
) -> Result<(String, usize)> {
    let rows = AgentPipeline::filter_sort(agents, search, status, sort);
    Ok((serialize(&rows, &agent_columns())?, rows.len()))
}

/// Write export text into `dir` under the dated default file name,
/// or to `output` when one is given.
pub fn write_export(
    content: &str,
    rows: usize,
    kind: ExportKind,
    dir: &Path,
    output: Option<&Path>,
    date: NaiveDate,
) -> Result<ExportSummary> {
    let start = Instant::now();
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => dir.join(kind.file_name(date)),
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, content)?;

    let summary = ExportSummary {
        path,
        rows,
        size_bytes: content.len() as u64,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    tracing::info!(
        kind = kind.as_str(),
        rows,
        path = %summary.path.display(),
        "Export written"
    );
    Ok(summary)
}
