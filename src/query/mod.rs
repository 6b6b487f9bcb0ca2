//! List query pipeline: search, sort, pagination and list state

mod page;
mod pipeline;
mod search;
mod sort;
mod state;

pub use page::{Page, PageRequest};
pub use pipeline::{AgentDirectory, AgentPipeline, CustomerPipeline, ListParams, StatusFilter};
pub use search::{quote_column, SearchTerm, Searchable};
pub use sort::{AgentSortField, CustomerSortField, SortDirection, SortField, SortKey, SortSpec};
pub use state::{ListEvent, ListState, Transition};
