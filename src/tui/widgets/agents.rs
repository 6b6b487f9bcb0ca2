//! Agents tab

use ratatui::{buffer::Buffer, layout::Rect, style::Style, widgets::Widget};

use super::list::{Cell, Column, ListView, SearchBox};
use super::tabs::Tab;
use crate::query::{AgentSortField, ListState, Page, SortField};
use crate::services::format::{format_date, format_number, or_not_available};
use crate::tui::theme::Theme;
use crate::types::AgentWithCount;

const KEYBINDINGS: &[(&str, &str)] = &[
    ("/", "Search"),
    ("f", "Status"),
    ("s/o", "Sort"),
    ("←→", "Page"),
    ("r", "Rename"),
    ("e", "Export"),
    ("?", "Help"),
];

pub struct AgentsView<'a> {
    page: &'a Page<AgentWithCount>,
    list: &'a ListState<AgentSortField>,
    search: SearchBox<'a>,
    selected: Option<usize>,
    loading: Option<usize>,
    theme: Theme,
}

impl<'a> AgentsView<'a> {
    pub fn new(
        page: &'a Page<AgentWithCount>,
        list: &'a ListState<AgentSortField>,
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

    fn header(&self, field: AgentSortField) -> String {
        if self.list.sort.field == field {
            format!("{} {}", field.label(), self.list.sort.direction.arrow())
        } else {
            field.label().to_string()
        }
    }

    fn row(&self, agent: &AgentWithCount) -> Vec<Cell> {
        let text = Style::default().fg(self.theme.text());
        let muted = Style::default().fg(self.theme.muted());
        let status = self.theme.status(agent.is_active());
        vec![
            (agent.agent.id.to_string(), muted),
            (agent.agent.full_name.clone(), text),
            (or_not_available(agent.agent.location.as_deref()), text),
            (or_not_available(agent.agent.phone.as_deref()), text),
            (format_date(agent.agent.created_at.as_deref()), muted),
            (
                format_number(agent.customer_count),
                Style::default().fg(self.theme.metric()),
            ),
            (agent.status_label().to_string(), status),
        ]
    }
}

impl Widget for AgentsView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let columns = vec![
            Column::right(self.header(AgentSortField::Id), 7),
            Column::left(self.header(AgentSortField::Name), 26),
            Column::left("Location", 16),
            Column::left("Phone", 16),
            Column::left(self.header(AgentSortField::CreatedAt), 15),
            Column::right(self.header(AgentSortField::CustomerCount), 12),
            Column::left("Status", 10),
        ];
        let rows = self.page.rows.iter().map(|a| self.row(a)).collect();
        let sort = format!(
            "{} {}",
            self.list.sort.field.label(),
            self.list.sort.direction.arrow()
        );

        ListView {
            tab: Tab::Agents,
            search: self.search,
            filter: Some(self.list.status.label().to_string()),
            sort,
            columns,
            rows,
            selected: self.selected,
            summary: self.page.summary(),
            indicator: self.page.indicator(),
            loading: self.loading,
            empty_message: "No agents found",
            keybindings: KEYBINDINGS,
            theme: self.theme,
        }
        .render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{PageRequest, StatusFilter};
    use crate::tui::widgets::buffer_text;
    use crate::types::Agent;

    #[test]
    fn test_agents_view_renders_status_and_counts() {
        let agents = vec![
            AgentWithCount::new(Agent::new(1, "Amna Osman"), 1200),
            AgentWithCount::new(Agent::new(2, "Bashir Ali"), 0),
        ];
        let page = Page::from_rows(agents, PageRequest::first(10));
        let list = ListState {
            status: StatusFilter::Active,
            ..ListState::new(10)
        };

        let area = Rect::new(0, 0, 120, 20);
        let mut buf = Buffer::empty(area);
        AgentsView::new(
            &page,
            &list,
            SearchBox {
                input: "",
                editing: false,
            },
            Theme::Dark,
        )
        .with_selected(Some(1))
        .render(area, &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("2 Agents"));
        assert!(text.contains("Status: Active"));
        assert!(text.contains("ID ↑"));
        assert!(text.contains("1,200"));
        assert!(text.contains("Inactive"));
        assert!(text.contains("N/A"));
        assert!(text.contains("Showing 2 of 2"));
    }
}
