//! Dashboard, list, export and rename subcommands

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use super::Context;
use crate::export::{self, ExportKind, ExportSummary};
use crate::gateway::Gateway;
use crate::query::{
    AgentDirectory, AgentPipeline, AgentSortField, CustomerPipeline, CustomerSortField,
    ListParams, Page, PageRequest, SearchTerm, SortDirection, SortField, SortSpec, StatusFilter,
};
use crate::services::aggregator::share_of;
use crate::services::dashboard::{DashboardData, DashboardLoader};
use crate::services::format::{format_date, format_number, or_not_available};
use crate::services::rename::{is_permission_error, rename_agent, READ_PERMISSION_ALERT};
use crate::tui::widgets::dashboard::format_bar;
use crate::tui::widgets::list::fit;
use crate::types::{AgentWithCount, CustomerRow, DashError, DashboardMetrics, Result};

const BAR_WIDTH: usize = 24;

fn parse_customer_sort(name: &str) -> std::result::Result<CustomerSortField, String> {
    CustomerSortField::from_name(name)
        .ok_or_else(|| format!("unknown sort field '{}' (id, name, created)", name))
}

fn parse_agent_sort(name: &str) -> std::result::Result<AgentSortField, String> {
    AgentSortField::from_name(name)
        .ok_or_else(|| format!("unknown sort field '{}' (id, name, created, customers)", name))
}

fn parse_status(name: &str) -> std::result::Result<StatusFilter, String> {
    StatusFilter::from_name(name)
        .ok_or_else(|| format!("unknown status '{}' (all, active, inactive)", name))
}

fn parse_export_kind(name: &str) -> std::result::Result<ExportKind, String> {
    ExportKind::from_name(name).ok_or_else(|| format!("unknown list '{}' (customers, agents)", name))
}

/// Direction flags shared by the list commands
#[derive(Args, Debug, Default, Clone, Copy)]
pub struct OrderArgs {
    /// Ascending order
    #[arg(long, conflicts_with = "desc")]
    pub asc: bool,

    /// Descending order
    #[arg(long)]
    pub desc: bool,
}

impl OrderArgs {
    /// Picking a new field starts ascending, as in the TUI; the flags win over both
    fn resolve<F: SortField>(self, default: SortSpec<F>, field: Option<F>) -> SortSpec<F> {
        let spec = field.map_or(default, |f| {
            if f == default.field {
                default
            } else {
                SortSpec::new(f, SortDirection::Asc)
            }
        });
        if self.asc {
            SortSpec::new(spec.field, SortDirection::Asc)
        } else if self.desc {
            SortSpec::new(spec.field, SortDirection::Desc)
        } else {
            spec
        }
    }
}

/// JSON shape of one list page
#[derive(Serialize)]
struct PageReport<'a, T> {
    page: usize,
    total_pages: usize,
    total_count: u64,
    rows: &'a [T],
}

impl<'a, T> PageReport<'a, T> {
    fn new(page: &'a Page<T>) -> Self {
        Self {
            page: page.request.index(),
            total_pages: page.total_pages(),
            total_count: page.total_count,
            rows: &page.rows,
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ========== dashboard ==========

/// Print the dashboard summary
#[derive(Args, Debug)]
pub struct DashboardArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl DashboardArgs {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let (session, gateway) = ctx.signed_in()?;
        let data =
            DashboardLoader::new(gateway.as_ref(), ctx.config.daily_lookback_days).load(ctx.today());
        if self.json {
            print_json(&DashboardReport::new(&data))
        } else {
            let profile = session.profile();
            println!(
                "Welcome back, {} ({} {})\n",
                profile.display_name, profile.account_name, profile.account_number
            );
            print!("{}", render_dashboard(&data));
            Ok(())
        }
    }
}

#[derive(Serialize)]
struct Bucket {
    label: String,
    count: u64,
}

#[derive(Serialize)]
struct DashboardReport<'a> {
    metrics: &'a DashboardMetrics,
    weekly: Vec<Bucket>,
    monthly: Vec<Bucket>,
    top_agents: &'a [AgentWithCount],
    inactive_agents: &'a [AgentWithCount],
}

impl<'a> DashboardReport<'a> {
    fn new(data: &'a DashboardData) -> Self {
        let series = &data.series;
        let weekly = series
            .weekly_labels()
            .into_iter()
            .zip(series.weekly)
            .map(|(label, count)| Bucket { label, count })
            .collect();
        let monthly = series
            .monthly_labels()
            .into_iter()
            .zip(series.monthly)
            .map(|(label, count)| Bucket {
                label: label.to_string(),
                count,
            })
            .collect();
        Self {
            metrics: &data.metrics,
            weekly,
            monthly,
            top_agents: &data.agents.top,
            inactive_agents: &data.agents.inactive,
        }
    }
}

fn render_bars(out: &mut String, rows: impl Iterator<Item = (String, u64)> + Clone) {
    let max = rows.clone().map(|(_, v)| v).max().unwrap_or(0);
    let total: u64 = rows.clone().map(|(_, v)| v).sum();
    for (label, value) in rows {
        out.push_str(&format!(
            "  {:<14} {} {:>6}  {:>5.1}%\n",
            fit(&label, 14),
            format_bar(value, max, BAR_WIDTH),
            format_number(value),
            share_of(value, total)
        ));
    }
}

fn render_dashboard(data: &DashboardData) -> String {
    let metrics = &data.metrics;
    let series = &data.series;
    let mut out = String::new();

    out.push_str(&format!(
        "Total customers      {}\nActive agents        {}\nAvg customers / day  {:.1}\n",
        format_number(metrics.total_customers),
        format_number(metrics.active_agents),
        metrics.avg_customers_per_day
    ));

    out.push_str("\nTop agents\n");
    if data.agents.top.is_empty() {
        out.push_str("  No data\n");
    } else {
        render_bars(
            &mut out,
            data.agents
                .top
                .iter()
                .map(|a| (a.agent.full_name.clone(), a.customer_count)),
        );
    }

    out.push_str(&format!(
        "\nThis week ({})\n",
        format_number(series.weekly_total())
    ));
    render_bars(
        &mut out,
        series.weekly_labels().into_iter().zip(series.weekly),
    );

    out.push_str(&format!(
        "\nLast 4 months ({})\n",
        format_number(series.monthly_total())
    ));
    render_bars(
        &mut out,
        series
            .monthly_labels()
            .into_iter()
            .map(str::to_string)
            .zip(series.monthly),
    );

    out.push_str(&format!(
        "\nInactive agents ({})\n",
        data.agents.inactive.len()
    ));
    if data.agents.inactive.is_empty() {
        out.push_str("  None\n");
    }
    for agent in &data.agents.inactive {
        out.push_str(&format!("  {}\n", agent.agent.full_name));
    }
    out
}

// ========== customers ==========

/// List customers one page at a time
#[derive(Args, Debug)]
pub struct CustomersArgs {
    /// Match name or mobile; a number also matches the customer ID
    #[arg(long)]
    pub search: Option<String>,

    /// Sort field: id, name or created
    #[arg(long, value_parser = parse_customer_sort)]
    pub sort: Option<CustomerSortField>,

    #[command(flatten)]
    pub order: OrderArgs,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CustomersArgs {
    fn params(&self, default_page_size: usize) -> ListParams<CustomerSortField> {
        ListParams {
            search: self.search.as_deref().and_then(SearchTerm::parse),
            sort: self.order.resolve(SortSpec::default(), self.sort),
            page: PageRequest::new(self.page, self.page_size.unwrap_or(default_page_size)),
        }
    }

    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let (_, gateway) = ctx.signed_in()?;
        let page = query_customers(gateway.as_ref(), &self.params(ctx.config.page_size));
        if self.json {
            print_json(&PageReport::new(&page))
        } else {
            print!("{}", render_customers(&page));
            Ok(())
        }
    }
}

/// Note a failed list read on stderr when it is a permission problem
fn report_read_failure(error: &DashError, what: &str) {
    tracing::warn!(error = %error, "{} unavailable", what);
    if is_permission_error(error) {
        eprintln!("{}", READ_PERMISSION_ALERT);
    }
}

/// One joined page of customers; agent names are fetched first.
/// A failed read yields an empty page.
pub fn query_customers(
    gateway: &dyn Gateway,
    params: &ListParams<CustomerSortField>,
) -> Page<CustomerRow> {
    let directory = AgentDirectory::load(gateway);
    CustomerPipeline::query_page(gateway, params, &directory).unwrap_or_else(|e| {
        report_read_failure(&e, "Customer page");
        Page::empty(params.page)
    })
}

/// Every agent with its customer count; empty when the read fails
pub fn load_agents(gateway: &dyn Gateway) -> Vec<AgentWithCount> {
    AgentPipeline::load(gateway).unwrap_or_else(|e| {
        report_read_failure(&e, "Agent list");
        Vec::new()
    })
}

fn render_customers(page: &Page<CustomerRow>) -> String {
    let mut out = format!(
        "{:>8}  {:<28}  {:<16}  {:<24}  {}\n",
        "ID", "Name", "Mobile", "Agent", "Date Added"
    );
    if page.rows.is_empty() {
        out.push_str("No customers found\n");
    }
    for row in &page.rows {
        out.push_str(&format!(
            "{:>8}  {:<28}  {:<16}  {:<24}  {}\n",
            row.customer.id,
            fit(&row.customer.name, 28),
            fit(&or_not_available(row.customer.phone.as_deref()), 16),
            fit(&row.agent_name, 24),
            format_date(row.customer.created_at.as_deref())
        ));
    }
    out.push_str(&format!("{}  {}\n", page.summary(), page.indicator()));
    out
}

// ========== agents ==========

/// List agents with their customer counts
#[derive(Args, Debug)]
pub struct AgentsArgs {
    /// Match agent name; a number also matches the agent ID
    #[arg(long)]
    pub search: Option<String>,

    /// all, active or inactive
    #[arg(long, value_parser = parse_status, default_value = "all")]
    pub status: StatusFilter,

    /// Sort field: id, name, created or customers
    #[arg(long, value_parser = parse_agent_sort)]
    pub sort: Option<AgentSortField>,

    #[command(flatten)]
    pub order: OrderArgs,

    /// Page number, starting at 1
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page (defaults to the configured page size)
    #[arg(long)]
    pub page_size: Option<usize>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl AgentsArgs {
    fn params(&self, default_page_size: usize) -> ListParams<AgentSortField> {
        ListParams {
            search: self.search.as_deref().and_then(SearchTerm::parse),
            sort: self.order.resolve(SortSpec::default(), self.sort),
            page: PageRequest::new(self.page, self.page_size.unwrap_or(default_page_size)),
        }
    }

    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let (_, gateway) = ctx.signed_in()?;
        let agents = load_agents(gateway.as_ref());
        let page =
            AgentPipeline::query_page(&agents, &self.params(ctx.config.page_size), self.status);
        if self.json {
            print_json(&PageReport::new(&page))
        } else {
            print!("{}", render_agents(&page));
            Ok(())
        }
    }
}

fn render_agents(page: &Page<AgentWithCount>) -> String {
    let mut out = format!(
        "{:>6}  {:<24}  {:<14}  {:<16}  {:<12}  {:>9}  {}\n",
        "ID", "Agent", "Location", "Phone", "Join Date", "Customers", "Status"
    );
    if page.rows.is_empty() {
        out.push_str("No agents found\n");
    }
    for row in &page.rows {
        let agent = &row.agent;
        out.push_str(&format!(
            "{:>6}  {:<24}  {:<14}  {:<16}  {:<12}  {:>9}  {}\n",
            agent.id,
            fit(&agent.full_name, 24),
            fit(&or_not_available(agent.location.as_deref()), 14),
            fit(&or_not_available(agent.phone.as_deref()), 16),
            format_date(agent.created_at.as_deref()),
            format_number(row.customer_count),
            row.status_label()
        ));
    }
    out.push_str(&format!("{}  {}\n", page.summary(), page.indicator()));
    out
}

// ========== export ==========

/// Export the whole filtered list as CSV
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// customers or agents
    #[arg(value_parser = parse_export_kind)]
    pub kind: ExportKind,

    #[arg(long)]
    pub search: Option<String>,

    /// Sort field name for the chosen list
    #[arg(long)]
    pub sort: Option<String>,

    #[command(flatten)]
    pub order: OrderArgs,

    /// Agent status filter (agents only)
    #[arg(long, value_parser = parse_status, default_value = "all")]
    pub status: StatusFilter,

    /// Output file (defaults to <kind>_export_<date>.csv in the export directory)
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

impl ExportArgs {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let (_, gateway) = ctx.signed_in()?;
        let summary = self.export(
            gateway.as_ref(),
            &ctx.config.export_dir(),
            ctx.config.export_batch_size,
            ctx.today(),
        )?;
        println!(
            "Exported {} rows to {} ({} bytes, {} ms)",
            summary.rows,
            summary.path.display(),
            format_number(summary.size_bytes),
            summary.duration_ms
        );
        Ok(())
    }

    fn export(
        &self,
        gateway: &dyn Gateway,
        dir: &Path,
        batch_size: usize,
        today: NaiveDate,
    ) -> Result<ExportSummary> {
        let search = self.search.as_deref().and_then(SearchTerm::parse);
        let (content, rows) = match self.kind {
            ExportKind::Customers => {
                let field = self
                    .sort
                    .as_deref()
                    .map(parse_customer_sort)
                    .transpose()
                    .map_err(DashError::Validation)?;
                let sort = self.order.resolve(SortSpec::default(), field);
                let directory = AgentDirectory::load(gateway);
                export::export_customers(gateway, &directory, search.as_ref(), sort, batch_size)?
            }
            ExportKind::Agents => {
                let field = self
                    .sort
                    .as_deref()
                    .map(parse_agent_sort)
                    .transpose()
                    .map_err(DashError::Validation)?;
                let sort = self.order.resolve(SortSpec::default(), field);
                let agents = AgentPipeline::load(gateway)?;
                export::export_agents(&agents, search.as_ref(), self.status, &sort)?
            }
        };
        export::write_export(
            &content,
            rows,
            self.kind,
            dir,
            self.output.as_deref(),
            today,
        )
    }
}

// ========== rename-agent ==========

/// Change an agent's full name
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Agent ID
    #[arg(value_name = "ID")]
    pub id: i64,

    /// New full name
    #[arg(value_name = "NAME")]
    pub name: String,
}

impl RenameArgs {
    pub fn run(self, ctx: &Context) -> anyhow::Result<()> {
        let (_, gateway) = ctx.signed_in()?;
        let name = rename_agent(gateway.as_ref(), self.id, &self.name)?;
        println!("Agent {} renamed to {}", self.id, name);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::services::aggregator::Aggregator;
    use crate::types::{Agent, Customer, DailyCount};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn try_parse<T: clap::Args>(argv: &[&str]) -> std::result::Result<T, clap::Error> {
        let command = T::augment_args(clap::Command::new("salesdash"));
        let matches =
            command.try_get_matches_from(std::iter::once("salesdash").chain(argv.iter().copied()))?;
        T::from_arg_matches(&matches)
    }

    fn parse<T: clap::Args>(argv: &[&str]) -> T {
        try_parse(argv).unwrap()
    }

    fn gateway() -> MemoryGateway {
        let customers = (1..=12)
            .map(|i| Customer {
                id: i,
                name: format!("Customer {}", i),
                phone: Some(format!("09{:08}", i)),
                agent_id: if i == 12 { Some(99) } else { Some(1 + i % 2) },
                created_at: Some("2024-02-01T09:00:00Z".into()),
            })
            .collect();
        MemoryGateway::new(
            vec![
                Agent::new(1, "Amna"),
                Agent::new(2, "Bashir"),
                Agent::new(3, "Dalia"),
            ],
            customers,
        )
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[test]
    fn test_order_args_resolve() {
        let default = SortSpec::new(CustomerSortField::Id, SortDirection::Desc);
        let none = OrderArgs::default();
        assert_eq!(none.resolve(default, None), default);
        assert_eq!(none.resolve(default, Some(CustomerSortField::Id)), default);
        assert_eq!(
            none.resolve(default, Some(CustomerSortField::Name)),
            SortSpec::new(CustomerSortField::Name, SortDirection::Asc)
        );

        let desc = OrderArgs {
            asc: false,
            desc: true,
        };
        assert_eq!(
            desc.resolve(default, Some(CustomerSortField::Name)),
            SortSpec::new(CustomerSortField::Name, SortDirection::Desc)
        );
        let asc = OrderArgs {
            asc: true,
            desc: false,
        };
        assert_eq!(
            asc.resolve(default, None),
            SortSpec::new(CustomerSortField::Id, SortDirection::Asc)
        );
    }

    #[test]
    fn test_parse_customers_args() {
        let args: CustomersArgs = parse(&[
            "--search", " 0912 ", "--sort", "name", "--desc", "--page", "3", "--page-size", "4",
        ]);
        let params = args.params(10);
        assert_eq!(params.search.unwrap().as_str(), "0912");
        assert_eq!(
            params.sort,
            SortSpec::new(CustomerSortField::Name, SortDirection::Desc)
        );
        assert_eq!(params.page, PageRequest::new(3, 4));
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        assert!(try_parse::<CustomersArgs>(&["--sort", "mobile"]).is_err());
        assert!(try_parse::<CustomersArgs>(&["--asc", "--desc"]).is_err());
        assert!(try_parse::<AgentsArgs>(&["--status", "busy"]).is_err());
        assert!(try_parse::<ExportArgs>(&["orders"]).is_err());
    }

    #[test]
    fn test_parse_agents_args_defaults() {
        let args: AgentsArgs = parse(&[]);
        assert_eq!(args.status, StatusFilter::All);
        let params = args.params(10);
        assert!(params.search.is_none());
        assert_eq!(params.sort, SortSpec::<AgentSortField>::default());
        assert_eq!(params.page, PageRequest::first(10));
    }

    #[test]
    fn test_query_customers_joins_names() {
        let args: CustomersArgs = parse(&["--page-size", "5"]);
        let page = query_customers(&gateway(), &args.params(10));

        assert_eq!(page.total_count, 12);
        // Id descending by default
        assert_eq!(page.rows[0].customer.id, 12);
        assert_eq!(page.rows[0].agent_name, "Unknown Agent");
        assert_eq!(page.rows[1].agent_name, "Bashir");

        let text = render_customers(&page);
        assert!(text.contains("Customer 11"));
        assert!(text.contains("Feb 1, 2024"));
        assert!(text.ends_with("Showing 5 of 12  Page 1/3\n"));
    }

    #[test]
    fn test_render_agents_page() {
        let agents = load_agents(&gateway());
        let args: AgentsArgs = parse(&["--status", "inactive"]);
        let page = AgentPipeline::query_page(&agents, &args.params(10), args.status);

        let text = render_agents(&page);
        assert!(text.contains("Dalia"));
        assert!(text.contains("Inactive"));
        assert!(!text.contains("Amna"));
        assert!(text.contains("Showing 1 of 1"));
    }

    #[test]
    fn test_failed_reads_degrade_to_empty_pages() {
        let args: CustomersArgs = parse(&["--page", "2"]);
        let page = query_customers(&gateway().failing("count_customers"), &args.params(10));
        assert!(page.rows.is_empty());
        assert_eq!(page.total_count, 0);
        assert!(render_customers(&page).contains("No customers found"));

        assert!(load_agents(&gateway().failing("list_agents")).is_empty());
        // Counts alone failing keeps the agents with zero counts
        assert_eq!(load_agents(&gateway().failing("agent_customer_counts")).len(), 3);
    }

    #[test]
    fn test_export_read_failure_writes_nothing() {
        let temp = TempDir::new().unwrap();
        let args: ExportArgs = parse(&["customers"]);
        let err = args
            .export(&gateway().failing("list_customers"), temp.path(), 10, today())
            .unwrap_err();
        assert!(matches!(err, DashError::Gateway { status: 503, .. }));
        assert_eq!(std::fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_render_empty_customers() {
        let page: Page<CustomerRow> = Page::empty(PageRequest::first(10));
        let text = render_customers(&page);
        assert!(text.contains("No customers found"));
        assert!(text.contains("Page 1/1"));
    }

    #[test]
    fn test_export_customers_to_default_file() {
        let temp = TempDir::new().unwrap();
        let args: ExportArgs = parse(&["customers", "--search", "Customer 1", "--sort", "id", "--asc"]);

        let summary = args.export(&gateway(), temp.path(), 2, today()).unwrap();
        // 1, 10, 11, 12
        assert_eq!(summary.rows, 4);
        assert_eq!(
            summary.path,
            temp.path().join("customers_export_2024-02-01.csv")
        );
        let content = std::fs::read_to_string(&summary.path).unwrap();
        assert_eq!(content.lines().count(), 5);
    }

    #[test]
    fn test_export_agents_to_output_path() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out").join("agents.csv");
        let output_arg = output.to_string_lossy().to_string();
        let args: ExportArgs = parse(&["agents", "--status", "active", "-o", &output_arg]);

        let summary = args.export(&gateway(), temp.path(), 1000, today()).unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(summary.path, output);
        assert!(output.exists());
    }

    #[test]
    fn test_export_rejects_sort_for_wrong_list() {
        let temp = TempDir::new().unwrap();
        let args: ExportArgs = parse(&["customers", "--sort", "customers"]);
        let err = args.export(&gateway(), temp.path(), 10, today()).unwrap_err();
        assert!(matches!(err, DashError::Validation(_)));
    }

    #[test]
    fn test_dashboard_report_and_text() {
        let agents = [Agent::new(1, "Amna"), Agent::new(2, "Bashir")];
        let counts = HashMap::from([(1, 4)]);
        let data = DashboardData {
            metrics: DashboardMetrics {
                total_customers: 1234,
                active_agents: 1,
                avg_customers_per_day: 2.5,
            },
            series: Aggregator::time_series(
                &[
                    DailyCount::new(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 3),
                    DailyCount::new(today(), 5),
                ],
                today(),
            ),
            agents: Aggregator::partition_agents(&agents, &counts),
        };

        let json = serde_json::to_value(DashboardReport::new(&data)).unwrap();
        assert_eq!(json["metrics"]["total_customers"], 1234);
        assert_eq!(json["weekly"].as_array().unwrap().len(), 7);
        assert_eq!(json["weekly"][6]["count"], 5);
        assert_eq!(json["monthly"][3]["label"], "Feb");
        assert_eq!(json["inactive_agents"][0]["customer_count"], 0);

        let text = render_dashboard(&data);
        assert!(text.contains("Total customers      1,234"));
        assert!(text.contains("Avg customers / day  2.5"));
        assert!(text.contains("This week (8)"));
        assert!(text.contains("Inactive agents (1)"));
        assert!(text.contains("  Bashir\n"));
    }
}
