//! Customers tab

use ratatui::{buffer::Buffer, layout::Rect, style::Style, widgets::Widget};

use super::list::{Cell, Column, ListView, SearchBox};
use super::tabs::Tab;
use crate::query::{CustomerSortField, ListState, Page, SortField};
use crate::services::format::{format_date, or_not_available};
use crate::tui::theme::Theme;
use crate::types::{CustomerRow, UNKNOWN_AGENT};

const KEYBINDINGS: &[(&str, &str)] = &[
    ("/", "Search"),
    ("c", "Clear"),
    ("s/o", "Sort"),
    ("←→", "Page"),
    ("e", "Export"),
    ("?", "Help"),
];

pub struct CustomersView<'a> {
    page: &'a Page<CustomerRow>,
    list: &'a ListState<CustomerSortField>,
    search: SearchBox<'a>,
    selected: Option<usize>,
    loading: Option<usize>,
    theme: Theme,
}

impl<'a> CustomersView<'a> {
    pub fn new(
        page: &'a Page<CustomerRow>,
        list: &'a ListState<CustomerSortField>,
        search: SearchBox<'a>,
        theme: Theme,
    ) -> Self {
        Self {
            page,
            list,
            search,
            selected: None,
            loading: None,
            theme,
        }
    }

    pub fn with_selected(mut self, selected: Option<usize>) -> Self {
        self.selected = selected;
        self
    }

    pub fn with_loading(mut self, frame: Option<usize>) -> Self {
        self.loading = frame;
        self
    }

    fn header(&self, field: CustomerSortField) -> String {
        if self.list.sort.field == field {
            format!("{} {}", field.label(), self.list.sort.direction.arrow())
        } else {
            field.label().to_string()
        }
    }

    fn row(&self, row: &CustomerRow) -> Vec<Cell> {
        let text = Style::default().fg(self.theme.text());
        let muted = Style::default().fg(self.theme.muted());
        let agent = if row.agent_name == UNKNOWN_AGENT {
            Style::default().fg(self.theme.error())
        } else {
            Style::default().fg(self.theme.accent())
        };
        vec![
            (row.customer.id.to_string(), muted),
            (row.customer.name.clone(), text),
            (or_not_available(row.customer.phone.as_deref()), text),
            (row.agent_name.clone(), agent),
            (format_date(row.customer.created_at.as_deref()), muted),
        ]
    }
}

impl Widget for CustomersView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let columns = vec![
            Column::right(self.header(CustomerSortField::Id), 8),
            Column::left(self.header(CustomerSortField::Name), 28),
            Column::left("Mobile", 18),
            Column::left("Agent", 26),
            Column::left(self.header(CustomerSortField::CreatedAt), 16),
        ];
        let rows = self.page.rows.iter().map(|r| self.row(r)).collect();
        let sort = format!(
            "{} {}",
            self.list.sort.field.label(),
            self.list.sort.direction.arrow()
        );

        ListView {
            tab: Tab::Customers,
            search: self.search,
            filter: None,
            sort,
            columns,
            rows,
            selected: self.selected,
            summary: self.page.summary(),
            indicator: self.page.indicator(),
            loading: self.loading,
            empty_message: "No customers found",
            keybindings: KEYBINDINGS,
            theme: self.theme,
        }
        .render(area, buf);
    }
}
