//! Dashboard tab: KPIs, acquisition charts and agent rankings

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget},
};

use super::tabs::{Tab, TabBar};
use crate::services::aggregator::share_of;
use crate::services::dashboard::DashboardData;
use crate::services::format::{format_number, initials};
use crate::session::UserProfile;
use crate::tui::theme::Theme;
use crate::types::AgentWithCount;

/// Inactive agents listed before the "show all" toggle
pub const INACTIVE_PREVIEW: usize = 5;

const MAX_CONTENT_WIDTH: u16 = 150;

/// Horizontal bar scaled against `max`
/// Example: value=5, max=10, width=8 → "████░░░░"
pub fn format_bar(value: u64, max: u64, width: usize) -> String {
    if max == 0 || width == 0 {
        return "░".repeat(width);
    }
    let filled = (share_of(value, max) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}

pub struct DashboardView<'a> {
    data: &'a DashboardData,
    profile: &'a UserProfile,
    show_all_inactive: bool,
    theme: Theme,
}

impl<'a> DashboardView<'a> {
    pub fn new(data: &'a DashboardData, profile: &'a UserProfile, theme: Theme) -> Self {
        Self {
            data,
            profile,
            show_all_inactive: false,
            theme,
        }
    }

    pub fn with_all_inactive(mut self, show_all: bool) -> Self {
        self.show_all_inactive = show_all;
        self
    }

    fn visible_inactive(&self) -> &'a [AgentWithCount] {
        let inactive = &self.data.agents.inactive;
        if self.show_all_inactive {
            inactive
        } else {
            &inactive[..inactive.len().min(INACTIVE_PREVIEW)]
        }
    }
}

impl Widget for DashboardView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let content_width = area.width.min(MAX_CONTENT_WIDTH);
        let x_offset = (area.width.saturating_sub(content_width)) / 2;
        let area = Rect {
            x: area.x + x_offset,
            width: content_width,
            ..area
        };

        let chunks = Layout::vertical([
            Constraint::Length(1), // [0] Top padding
            Constraint::Length(1), // [1] Tabs
            Constraint::Length(1), // [2] Separator
            Constraint::Length(2), // [3] Welcome
            Constraint::Length(4), // [4] KPI cards
            Constraint::Length(9), // [5] Charts
            Constraint::Min(4),    // [6] Agent lists
            Constraint::Length(1), // [7] Separator
            Constraint::Length(1), // [8] Keybindings
        ])
        .split(area);

        TabBar::new(Tab::Dashboard, self.theme).render(chunks[1], buf);
        self.render_separator(chunks[2], buf);
        self.render_welcome(chunks[3], buf);
        self.render_kpis(chunks[4], buf);
        self.render_charts(chunks[5], buf);
        self.render_agent_lists(chunks[6], buf);
        self.render_separator(chunks[7], buf);
        self.render_keybindings(chunks[8], buf);
    }
}

impl DashboardView<'_> {
    fn render_separator(&self, area: Rect, buf: &mut Buffer) {
        let line = "─".repeat(area.width as usize);
        buf.set_string(
            area.x,
            area.y,
            &line,
            Style::default().fg(self.theme.muted()),
        );
    }

    fn section(&self, title: String) -> Block<'static> {
        Block::default()
            .title(Span::styled(
                format!(" {} ", title),
                Style::default()
                    .fg(self.theme.heading())
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.muted()))
    }

    fn render_welcome(&self, area: Rect, buf: &mut Buffer) {
        let muted = Style::default().fg(self.theme.muted());
        let lines = vec![
            Line::from(vec![
                Span::styled("  Welcome back, ", Style::default().fg(self.theme.text())),
                Span::styled(
                    self.profile.display_name.as_str(),
                    Style::default()
                        .fg(self.theme.accent())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled("   ", muted),
                Span::styled(self.profile.account_name.as_str(), muted),
                Span::styled(" ", muted),
                Span::styled(self.profile.account_number.as_str(), muted),
            ]),
            Line::from(Span::styled(
                format!("  Last login: {}", self.profile.last_login),
                muted,
            )),
        ];
        Paragraph::new(lines).render(area, buf);
    }

    fn render_kpis(&self, area: Rect, buf: &mut Buffer) {
        let metrics = &self.data.metrics;
        let cards = [
            ("Total Customers", format_number(metrics.total_customers)),
            ("Active Agents", format_number(metrics.active_agents)),
            (
                "Avg Customers / Day",
                format!("{:.1}", metrics.avg_customers_per_day),
            ),
        ];
        let columns = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(area);

        for ((title, value), column) in cards.into_iter().zip(columns.iter()) {
            let block = self.section(title.to_string());
            let inner = block.inner(*column);
            block.render(*column, buf);
            Paragraph::new(Line::from(Span::styled(
                value,
                Style::default()
                    .fg(self.theme.metric())
                    .add_modifier(Modifier::BOLD),
            )))
            .alignment(Alignment::Center)
            .render(inner, buf);
        }
    }

    fn render_charts(&self, area: Rect, buf: &mut Buffer) {
        let columns = Layout::horizontal([Constraint::Ratio(1, 3); 3]).split(area);
        let series = &self.data.series;

        let top: Vec<(String, u64)> = self
            .data
            .agents
            .top
            .iter()
            .map(|a| (a.agent.full_name.clone(), a.customer_count))
            .collect();
        let top_total: u64 = top.iter().map(|(_, v)| v).sum();
        self.render_bars(columns[0], buf, "Top 5 Agents".to_string(), &top, top_total);

        let weekly: Vec<(String, u64)> = series
            .weekly_labels()
            .into_iter()
            .zip(series.weekly)
            .collect();
        self.render_bars(
            columns[1],
            buf,
            format!("This Week · {}", format_number(series.weekly_total())),
            &weekly,
            series.weekly_total(),
        );

        let monthly: Vec<(String, u64)> = series
            .monthly_labels()
            .into_iter()
            .map(str::to_string)
            .zip(series.monthly)
            .collect();
        self.render_bars(
            columns[2],
            buf,
            format!("Last 4 Months · {}", format_number(series.monthly_total())),
            &monthly,
            series.monthly_total(),
        );
    }

    /// Labeled bars scaled to the largest value, with each row's share of `total`
    fn render_bars(
        &self,
        area: Rect,
        buf: &mut Buffer,
        title: String,
        rows: &[(String, u64)],
        total: u64,
    ) {
        let block = self.section(title);
        let inner = block.inner(area);
        block.render(area, buf);

        if rows.is_empty() {
            Paragraph::new(Span::styled(
                "No data",
                Style::default().fg(self.theme.muted()),
            ))
            .alignment(Alignment::Center)
            .render(inner, buf);
            return;
        }

        let max = rows.iter().map(|(_, v)| *v).max().unwrap_or(0);
        let label_width = 10usize;
        // label, bar, " 1,234 100%"
        let bar_width = (inner.width as usize).saturating_sub(label_width + 13);

        let lines: Vec<Line> = rows
            .iter()
            .map(|(label, value)| {
                let label: String = label.chars().take(label_width - 1).collect();
                Line::from(vec![
                    Span::styled(
                        format!("{:<width$}", label, width = label_width),
                        Style::default().fg(self.theme.text()),
                    ),
                    Span::styled(
                        format_bar(*value, max, bar_width),
                        Style::default().fg(self.theme.bar()),
                    ),
                    Span::styled(
                        format!("{:>7}", format_number(*value)),
                        Style::default().fg(self.theme.metric()),
                    ),
                    Span::styled(
                        format!("{:>5.0}%", share_of(*value, total) * 100.0),
                        Style::default().fg(self.theme.muted()),
                    ),
                ])
            })
            .collect();
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_agent_lists(&self, area: Rect, buf: &mut Buffer) {
        let columns = Layout::horizontal([Constraint::Ratio(1, 2); 2]).split(area);

        let top: Vec<Line> = self
            .data
            .agents
            .top
            .iter()
            .map(|a| self.agent_line(a, format!("{} customers", format_number(a.customer_count))))
            .collect();
        self.render_list(columns[0], buf, "Top Performing Agents".to_string(), top);

        let inactive_total = self.data.agents.inactive.len();
        let mut inactive: Vec<Line> = self
            .visible_inactive()
            .iter()
            .map(|a| self.agent_line(a, "Inactive".to_string()))
            .collect();
        let hidden = inactive_total - inactive.len();
        if hidden > 0 {
            inactive.push(Line::from(Span::styled(
                format!("  +{} more (a: show all)", hidden),
                Style::default().fg(self.theme.muted()),
            )));
        }
        self.render_list(
            columns[1],
            buf,
            format!("Inactive Agents · {}", inactive_total),
            inactive,
        );
    }

    fn agent_line(&self, agent: &AgentWithCount, detail: String) -> Line<'static> {
        let detail_style = self.theme.status(agent.is_active());
        Line::from(vec![
            Span::styled(
                format!("  {:<3}", initials(&agent.agent.full_name)),
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:<24}", agent.agent.full_name),
                Style::default().fg(self.theme.text()),
            ),
            Span::styled(detail, detail_style),
        ])
    }

    fn render_list(&self, area: Rect, buf: &mut Buffer, title: String, lines: Vec<Line>) {
        let block = self.section(title);
        let inner = block.inner(area);
        block.render(area, buf);
        if lines.is_empty() {
            Paragraph::new(Span::styled(
                "None",
                Style::default().fg(self.theme.muted()),
            ))
            .alignment(Alignment::Center)
            .render(inner, buf);
            return;
        }
        Paragraph::new(lines).render(inner, buf);
    }

    fn render_keybindings(&self, area: Rect, buf: &mut Buffer) {
        let label = if self.show_all_inactive {
            ": Fewer inactive"
        } else {
            ": All inactive"
        };
        let bindings = Paragraph::new(Line::from(vec![
            Span::styled("a", Style::default().fg(self.theme.accent())),
            Span::styled(label, Style::default().fg(self.theme.muted())),
            Span::raw("  "),
            Span::styled("Tab", Style::default().fg(self.theme.accent())),
            Span::styled(": Switch view", Style::default().fg(self.theme.muted())),
            Span::raw("  "),
            Span::styled("?", Style::default().fg(self.theme.accent())),
            Span::styled(": Help", Style::default().fg(self.theme.muted())),
        ]))
        .alignment(Alignment::Center);

        bindings.render(area, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::aggregator::{Aggregator, TimeSeries};
    use crate::tui::widgets::buffer_text;
    use crate::types::{Agent, DailyCount, DashboardMetrics};
    use chrono::NaiveDate;
    use std::collections::HashMap;

    fn profile() -> UserProfile {
        UserProfile {
            display_name: "Sara".into(),
            account_name: "ACME".into(),
            account_number: "#SD1123".into(),
            last_login: "Just now".into(),
            email: "sara@acme.com".into(),
        }
    }

    fn data(inactive: usize) -> DashboardData {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut agents = vec![Agent::new(1, "Amna Osman")];
        agents.extend((0..inactive).map(|i| Agent::new(100 + i as i64, format!("Idle {}", i))));
        let counts: HashMap<i64, u64> = [(1, 12)].into_iter().collect();
        DashboardData {
            metrics: DashboardMetrics {
                total_customers: 1234,
                active_agents: 1,
                avg_customers_per_day: 2.5,
            },
            series: Aggregator::time_series(&[DailyCount::new(today, 4)], today),
            agents: Aggregator::partition_agents(&agents, &counts),
        }
    }

    fn render(view: DashboardView) -> String {
        let area = Rect::new(0, 0, 140, 40);
        let mut buf = Buffer::empty(area);
        view.render(area, &mut buf);
        buffer_text(&buf)
    }

    #[test]
    fn test_format_bar() {
        assert_eq!(format_bar(5, 10, 8), "████░░░░");
        assert_eq!(format_bar(10, 10, 4), "████");
        assert_eq!(format_bar(0, 0, 3), "░░░");
        assert_eq!(format_bar(3, 10, 0), "");
    }

    #[test]
    fn test_dashboard_renders_kpis_and_rankings() {
        let data = data(2);
        let profile = profile();
        let text = render(DashboardView::new(&data, &profile, Theme::Dark));

        assert!(text.contains("Welcome back, Sara"));
        assert!(text.contains("1,234"));
        assert!(text.contains("2.5"));
        assert!(text.contains("Top Performing Agents"));
        assert!(text.contains("AO"));
        assert!(text.contains("Thu"));
        assert!(text.contains("Feb"));
    }

    #[test]
    fn test_inactive_preview_and_toggle() {
        let data = data(7);
        let profile = profile();

        let text = render(DashboardView::new(&data, &profile, Theme::Dark));
        assert!(text.contains("+2 more"));
        assert!(!text.contains("Idle 6"));

        let text = render(DashboardView::new(&data, &profile, Theme::Dark).with_all_inactive(true));
        assert!(!text.contains("more (a: show all)"));
        assert!(text.contains("Idle 6"));
    }

    #[test]
    fn test_empty_dashboard_renders() {
        let today = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let data = DashboardData::empty(today);
        assert_eq!(data.series, TimeSeries::empty(today));
        let profile = profile();
        let text = render(DashboardView::new(&data, &profile, Theme::Dark));
        assert!(text.contains("No data"));
        assert!(text.contains("None"));
    }
}
