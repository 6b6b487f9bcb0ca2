//! Pagination windows

use serde::Serialize;

/// 1-based page index plus page size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    index: usize,
    size: usize,
}

impl PageRequest {
    /// Index below 1 becomes 1, size 0 becomes 1
    pub fn new(index: usize, size: usize) -> Self {
        Self {
            index: index.max(1),
            size: size.max(1),
        }
    }

    pub fn first(size: usize) -> Self {
        Self::new(1, size)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Row offset of the first row on this page
    pub fn offset(&self) -> usize {
        (self.index - 1) * self.size
    }

    /// Number of pages for `total` rows; an empty set still has one page
    pub fn total_pages(&self, total: u64) -> usize {
        let total = usize::try_from(total).unwrap_or(usize::MAX);
        total.div_ceil(self.size).max(1)
    }

    /// Pull the index back onto the last valid page
    pub fn clamp(self, total: u64) -> Self {
        Self::new(self.index.min(self.total_pages(total)), self.size)
    }

    pub fn next(self) -> Self {
        Self::new(self.index + 1, self.size)
    }

    pub fn prev(self) -> Self {
        Self::new(self.index.saturating_sub(1), self.size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::first(10)
    }
}

/// One window of a filtered, sorted result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub rows: Vec<T>,
    /// Size of the whole filtered set, independent of the window
    pub total_count: u64,
    #[serde(skip)]
    pub request: PageRequest,
}

impl<T> Page<T> {
    pub fn empty(request: PageRequest) -> Self {
        Self {
            rows: Vec::new(),
            total_count: 0,
            request: PageRequest::first(request.size()),
        }
    }

    /// Window an already filtered and sorted in-memory result.
    /// The request is clamped first.
    pub fn from_rows(rows: Vec<T>, request: PageRequest) -> Self {
        let total_count = rows.len() as u64;
        let request = request.clamp(total_count);
        let start = request.offset().min(rows.len());
        let rows: Vec<T> = rows.into_iter().skip(start).take(request.size()).collect();
        Self {
            rows,
            total_count,
            request,
        }
    }

    pub fn total_pages(&self) -> usize {
        self.request.total_pages(self.total_count)
    }

    pub fn has_next(&self) -> bool {
        self.request.index() < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.request.index() > 1
    }

    /// "Showing 10 of 42"
    pub fn summary(&self) -> String {
        format!("Showing {} of {}", self.rows.len(), self.total_count)
    }

    /// "Page 2/5"
    pub fn indicator(&self) -> String {
        format!("Page {}/{}", self.request.index(), self.total_pages())
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            rows: self.rows.into_iter().map(f).collect(),
            total_count: self.total_count,
            request: self.request,
        }
    }
}
