//! List query pipeline: filter, count, window, sort and join

use std::collections::HashMap;

use super::page::{Page, PageRequest};
use super::search::SearchTerm;
use super::sort::{AgentSortField, CustomerSortField, SortSpec};
use crate::gateway::{CustomerQuery, Gateway, Range};
use crate::services::aggregator::Aggregator;
use crate::types::{Agent, AgentWithCount, Customer, CustomerRow, Result, UNKNOWN_AGENT};

/// Everything that selects one page of a list
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams<F> {
    pub search: Option<SearchTerm>,
    pub sort: SortSpec<F>,
    pub page: PageRequest,
}

impl<F> ListParams<F>
where
    SortSpec<F>: Default,
{
    pub fn first_page(page_size: usize) -> Self {
        Self {
            search: None,
            sort: SortSpec::default(),
            page: PageRequest::first(page_size),
        }
    }
}

/// Agent id to display name lookup
#[derive(Debug, Clone, Default)]
pub struct AgentDirectory {
    names: HashMap<i64, String>,
}

impl AgentDirectory {
    pub fn from_agents(agents: &[Agent]) -> Self {
        let mut names = HashMap::with_capacity(agents.len());
        for agent in agents {
            names
                .entry(agent.id)
                .or_insert_with(|| agent.full_name.clone());
        }
        Self { names }
    }

    /// Fetch agent names. A failed read leaves every customer unresolved.
    pub fn load(gateway: &dyn Gateway) -> Self {
        match gateway.list_agents() {
            Ok(agents) => Self::from_agents(&agents),
            Err(e) => {
                tracing::warn!(error = %e, "Agent names unavailable");
                Self::default()
            }
        }
    }

    /// Display name for an agent id, "Unknown Agent" when it does not resolve
    pub fn resolve(&self, agent_id: Option<i64>) -> &str {
        agent_id
            .and_then(|id| self.names.get(&id))
            .map(String::as_str)
            .unwrap_or(UNKNOWN_AGENT)
    }

    pub fn join(&self, customers: Vec<Customer>) -> Vec<CustomerRow> {
        customers
            .into_iter()
            .map(|customer| CustomerRow {
                agent_name: self.resolve(customer.agent_id).to_string(),
                customer,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Remote customer pipeline
pub struct CustomerPipeline;

impl CustomerPipeline {
    /// Count the filtered set, clamp the page onto it, then fetch and join
    /// that window.
    pub fn query_page(
        gateway: &dyn Gateway,
        params: &ListParams<CustomerSortField>,
        directory: &AgentDirectory,
    ) -> Result<Page<CustomerRow>> {
        let total_count = gateway.count_customers(params.search.as_ref())?;
        let request = params.page.clamp(total_count);
        if total_count == 0 {
            return Ok(Page::empty(request));
        }

        let query = CustomerQuery {
            search: params.search.clone(),
            sort: params.sort,
            range: Range::new(request.offset(), request.size()),
        };
        let customers = gateway.list_customers(&query)?;
        tracing::debug!(
            page = request.index(),
            rows = customers.len(),
            total = total_count,
            "Loaded customer page"
        );

        Ok(Page {
            rows: directory.join(customers),
            total_count,
            request,
        })
    }
}

/// Agent activity filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl StatusFilter {
    pub fn cycle(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Inactive,
            Self::Inactive => Self::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Inactive => "Inactive",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    pub fn matches(self, agent: &AgentWithCount) -> bool {
        match self {
            Self::All => true,
            Self::Active => agent.is_active(),
            Self::Inactive => !agent.is_active(),
        }
    }
}

/// In-memory agent pipeline over a fully loaded agent list
pub struct AgentPipeline;

impl AgentPipeline {
    /// Fetch every agent joined with its customer count.
    /// A failed count read degrades to zero counts.
    pub fn load(gateway: &dyn Gateway) -> Result<Vec<AgentWithCount>> {
        let agents = gateway.list_agents()?;
        let counts = match gateway.agent_customer_counts() {
            Ok(rows) => Aggregator::count_map(&rows),
            Err(e) => {
                tracing::warn!(error = %e, "Agent customer counts unavailable");
                HashMap::new()
            }
        };
        Ok(Aggregator::with_counts(&agents, &counts))
    }

    /// Filtered and sorted copy of `agents`, unpaginated
    pub fn filter_sort(
        agents: &[AgentWithCount],
        search: Option<&SearchTerm>,
        status: StatusFilter,
        sort: &SortSpec<AgentSortField>,
    ) -> Vec<AgentWithCount> {
        let mut rows: Vec<AgentWithCount> = agents
            .iter()
            .filter(|a| status.matches(a))
            .filter(|a| search.map_or(true, |term| term.matches(*a)))
            .cloned()
            .collect();
        sort.sort(&mut rows);
        rows
    }

    pub fn query_page(
        agents: &[AgentWithCount],
        params: &ListParams<AgentSortField>,
        status: StatusFilter,
    ) -> Page<AgentWithCount> {
        let rows = Self::filter_sort(agents, params.search.as_ref(), status, &params.sort);
        Page::from_rows(rows, params.page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::MemoryGateway;
    use crate::query::SortDirection;

    fn customer(id: i64, name: &str, agent_id: Option<i64>) -> Customer {
        Customer {
            id,
            name: name.to_string(),
            phone: Some(format!("09{:08}", id)),
            agent_id,
            created_at: None,
        }
    }

    fn gateway_with_customers(n: i64) -> MemoryGateway {
        let agents = vec![Agent::new(1, "Amna"), Agent::new(2, "Bashir")];
        let customers = (1..=n)
            .map(|i| customer(i, &format!("Customer {}", i), Some(i % 3)))
            .collect();
        MemoryGateway::new(agents, customers)
    }

    #[test]
    fn test_directory_resolves_and_falls_back() {
        let directory = AgentDirectory::from_agents(&[Agent::new(1, "Amna")]);
        assert_eq!(directory.resolve(Some(1)), "Amna");
        assert_eq!(directory.resolve(Some(99)), UNKNOWN_AGENT);
        assert_eq!(directory.resolve(None), UNKNOWN_AGENT);
    }

    #[test]
    fn test_directory_first_duplicate_wins() {
        let directory =
            AgentDirectory::from_agents(&[Agent::new(1, "First"), Agent::new(1, "Second")]);
        assert_eq!(directory.resolve(Some(1)), "First");
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_directory_load_degrades_to_empty() {
        let gateway = gateway_with_customers(3);
        assert_eq!(AgentDirectory::load(&gateway).len(), 2);

        let gateway = gateway_with_customers(3).failing("list_agents");
        let directory = AgentDirectory::load(&gateway);
        assert!(directory.is_empty());
        assert_eq!(directory.resolve(Some(1)), UNKNOWN_AGENT);
    }

    #[test]
    fn test_customer_page_window_and_join() {
        let gateway = gateway_with_customers(25);
        let directory = AgentDirectory::from_agents(&gateway.list_agents().unwrap());
        let params = ListParams {
            search: None,
            sort: SortSpec::new(CustomerSortField::Id, SortDirection::Asc),
            page: PageRequest::new(2, 10),
        };

        let page = CustomerPipeline::query_page(&gateway, &params, &directory).unwrap();

        assert_eq!(page.total_count, 25);
        let ids: Vec<i64> = page.rows.iter().map(|r| r.customer.id).collect();
        assert_eq!(ids, (11..=20).collect::<Vec<_>>());
        // 12 % 3 == 0, no such agent
        let row = page.rows.iter().find(|r| r.customer.id == 12).unwrap();
        assert_eq!(row.agent_name, UNKNOWN_AGENT);
        let row = page.rows.iter().find(|r| r.customer.id == 13).unwrap();
        assert_eq!(row.agent_name, "Amna");
    }

    #[test]
    fn test_customer_page_clamped_past_end() {
        let gateway = gateway_with_customers(25);
        let params = ListParams {
            search: None,
            sort: SortSpec::default(),
            page: PageRequest::new(7, 10),
        };

        let page =
            CustomerPipeline::query_page(&gateway, &params, &AgentDirectory::default()).unwrap();

        assert_eq!(page.request.index(), 3);
        assert_eq!(page.rows.len(), 5);
    }

    #[test]
    fn test_customer_page_empty_result() {
        let gateway = gateway_with_customers(5);
        let params = ListParams {
            search: SearchTerm::parse("nobody"),
            sort: SortSpec::default(),
            page: PageRequest::new(3, 10),
        };

        let page =
            CustomerPipeline::query_page(&gateway, &params, &AgentDirectory::default()).unwrap();

        assert!(page.rows.is_empty());
        assert_eq!(page.total_count, 0);
        assert_eq!(page.request.index(), 1);
    }

    #[test]
    fn test_customer_page_search_counts_filtered_set() {
        let gateway = gateway_with_customers(30);
        let params = ListParams {
            search: SearchTerm::parse("Customer 2"),
            sort: SortSpec::default(),
            page: PageRequest::first(10),
        };

        let page =
            CustomerPipeline::query_page(&gateway, &params, &AgentDirectory::default()).unwrap();

        // "Customer 2" and "Customer 20".."Customer 29"
        assert_eq!(page.total_count, 11);
        assert_eq!(page.rows.len(), 10);
        assert_eq!(page.rows[0].customer.id, 29);
    }

    #[test]
    fn test_customer_page_propagates_count_error() {
        let gateway = gateway_with_customers(5).failing("count_customers");
        let params = ListParams::first_page(10);
        assert!(
            CustomerPipeline::query_page(&gateway, &params, &AgentDirectory::default()).is_err()
        );
    }

    #[test]
    fn test_status_filter_cycle() {
        assert_eq!(StatusFilter::All.cycle(), StatusFilter::Active);
        assert_eq!(StatusFilter::Active.cycle(), StatusFilter::Inactive);
        assert_eq!(StatusFilter::Inactive.cycle(), StatusFilter::All);
        assert_eq!(StatusFilter::from_name("INACTIVE"), Some(StatusFilter::Inactive));
    }

    #[test]
    fn test_agent_filter_sort() {
        let agents = vec![
            AgentWithCount::new(Agent::new(1, "Amna Osman"), 4),
            AgentWithCount::new(Agent::new(2, "Bashir"), 0),
            AgentWithCount::new(Agent::new(3, "Osman Ali"), 9),
        ];

        let active = AgentPipeline::filter_sort(
            &agents,
            None,
            StatusFilter::Active,
            &SortSpec::new(AgentSortField::CustomerCount, SortDirection::Desc),
        );
        let ids: Vec<i64> = active.iter().map(|a| a.agent.id).collect();
        assert_eq!(ids, vec![3, 1]);

        let term = SearchTerm::parse("osman");
        let found = AgentPipeline::filter_sort(
            &agents,
            term.as_ref(),
            StatusFilter::All,
            &SortSpec::new(AgentSortField::Name, SortDirection::Asc),
        );
        let ids: Vec<i64> = found.iter().map(|a| a.agent.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_agent_query_page() {
        let agents: Vec<AgentWithCount> = (1..=23)
            .map(|i| AgentWithCount::new(Agent::new(i, format!("Agent {}", i)), 1))
            .collect();
        let params = ListParams {
            search: None,
            sort: SortSpec::default(),
            page: PageRequest::new(3, 10),
        };

        let page = AgentPipeline::query_page(&agents, &params, StatusFilter::All);

        assert_eq!(page.total_count, 23);
        assert_eq!(page.rows.len(), 3);
        assert_eq!(page.rows[0].agent.id, 21);
    }

    #[test]
    fn test_agent_load_degrades_counts() {
        let gateway = gateway_with_customers(6).failing("agent_customer_counts");
        let agents = AgentPipeline::load(&gateway).unwrap();
        assert_eq!(agents.len(), 2);
        assert!(agents.iter().all(|a| a.customer_count == 0));
    }

    #[test]
    fn test_agent_load_joins_counts() {
        let gateway = gateway_with_customers(6);
        let agents = AgentPipeline::load(&gateway).unwrap();
        // ids 1..=6 mod 3: agent 1 -> {1, 4}, agent 2 -> {2, 5}
        assert_eq!(agents[0].customer_count, 2);
        assert_eq!(agents[1].customer_count, 2);
    }
}
