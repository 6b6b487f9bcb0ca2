//! Numbered tab strip shown above every view

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Tabs, Widget},
};

use crate::tui::theme::Theme;

const BRAND: &str = "salesdash";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tab {
    #[default]
    Dashboard,
    Agents,
    Customers,
}

impl Tab {
    /// Display order; the number key for a tab is its position plus one
    pub const ALL: [Tab; 3] = [Tab::Dashboard, Tab::Agents, Tab::Customers];

    pub fn label(self) -> &'static str {
        match self {
            Self::Dashboard => "Dashboard",
            Self::Agents => "Agents",
            Self::Customers => "Customers",
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    /// Tab for a number key, `1` being the dashboard
    pub fn from_number(n: u8) -> Option<Self> {
        Self::ALL.get(usize::from(n).checked_sub(1)?).copied()
    }
}

pub struct TabBar {
    selected: Tab,
    theme: Theme,
}

impl TabBar {
    pub fn new(selected: Tab, theme: Theme) -> Self {
        Self { selected, theme }
    }
}

impl Widget for TabBar {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }

        let [brand_area, tabs_area] =
            Layout::horizontal([Constraint::Length(BRAND.len() as u16 + 2), Constraint::Min(0)])
                .areas(area);
        buf.set_string(brand_area.x, brand_area.y, BRAND, self.theme.title());

        let titles = Tab::ALL.iter().enumerate().map(|(i, tab)| {
            Line::from(vec![
                Span::styled(format!("{} ", i + 1), Style::default().fg(self.theme.muted())),
                Span::raw(tab.label()),
            ])
        });
        Tabs::new(titles)
            .select(self.selected.index())
            .style(Style::default().fg(self.theme.muted()))
            .highlight_style(
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            )
            .divider(Span::styled("│", Style::default().fg(self.theme.muted())))
            .render(tabs_area, buf);
    }
}
