//! List view state as a pure reducer

use super::page::PageRequest;
use super::pipeline::{ListParams, StatusFilter};
use super::search::SearchTerm;
use super::sort::{SortField, SortSpec};

/// Inputs that change a list view
#[derive(Debug, Clone, PartialEq)]
pub enum ListEvent<F> {
    /// Search box committed with new text
    Search(String),
    ClearSearch,
    /// Sort header selected
    SortBy(F),
    Status(StatusFilter),
    NextPage,
    PrevPage,
    /// A fetch completed: total rows and the page actually served
    Loaded { total_count: u64, page: PageRequest },
}

/// Result of applying an event
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<F> {
    pub state: ListState<F>,
    /// Query parameters changed, so the visible rows are stale
    pub fetch: bool,
}

/// Search, sort, status filter and page position of one list
#[derive(Debug, Clone, PartialEq)]
pub struct ListState<F> {
    pub search_input: String,
    pub sort: SortSpec<F>,
    pub status: StatusFilter,
    pub page: PageRequest,
    /// Filtered set size from the last completed fetch
    pub total_count: u64,
}

impl<F: SortField> ListState<F>
where
    SortSpec<F>: Default,
{
    pub fn new(page_size: usize) -> Self {
        Self {
            search_input: String::new(),
            sort: SortSpec::default(),
            status: StatusFilter::All,
            page: PageRequest::first(page_size),
            total_count: 0,
        }
    }
}

impl<F: SortField> ListState<F> {
    pub fn search(&self) -> Option<SearchTerm> {
        SearchTerm::parse(&self.search_input)
    }

    pub fn params(&self) -> ListParams<F> {
        ListParams {
            search: self.search(),
            sort: self.sort,
            page: self.page,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.page.total_pages(self.total_count)
    }

    /// Apply one event. Filter, status and sort changes go back to page 1.
    pub fn reduce(self, event: ListEvent<F>) -> Transition<F> {
        let first = PageRequest::first(self.page.size());
        match event {
            ListEvent::Search(input) => {
                if SearchTerm::parse(&input) == self.search() {
                    return Transition::unchanged(Self {
                        search_input: input,
                        ..self
                    });
                }
                Transition::fetch(Self {
                    search_input: input,
                    page: first,
                    ..self
                })
            }
            ListEvent::ClearSearch => {
                if self.search().is_none() {
                    return Transition::unchanged(Self {
                        search_input: String::new(),
                        ..self
                    });
                }
                Transition::fetch(Self {
                    search_input: String::new(),
                    page: first,
                    ..self
                })
            }
            ListEvent::SortBy(field) => Transition::fetch(Self {
                sort: self.sort.select(field),
                page: first,
                ..self
            }),
            ListEvent::Status(status) => {
                if status == self.status {
                    return Transition::unchanged(self);
                }
                Transition::fetch(Self {
                    status,
                    page: first,
                    ..self
                })
            }
            ListEvent::NextPage => {
                if self.page.index() >= self.total_pages() {
                    return Transition::unchanged(self);
                }
                Transition::fetch(Self {
                    page: self.page.next(),
                    ..self
                })
            }
            ListEvent::PrevPage => {
                if self.page.index() <= 1 {
                    return Transition::unchanged(self);
                }
                Transition::fetch(Self {
                    page: self.page.prev(),
                    ..self
                })
            }
            ListEvent::Loaded { total_count, page } => Transition::unchanged(Self {
                total_count,
                page,
                ..self
            }),
        }
    }
}

impl<F> Transition<F> {
    fn fetch(state: ListState<F>) -> Self {
        Self { state, fetch: true }
    }

    fn unchanged(state: ListState<F>) -> Self {
        Self {
            state,
            fetch: false,
        }
    }
}
