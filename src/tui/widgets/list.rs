//! Shared layout for the paged list tabs

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use super::spinner::Spinner;
use super::tabs::{Tab, TabBar};
use crate::tui::theme::Theme;

const MAX_CONTENT_WIDTH: u16 = 150;

/// One table column
#[derive(Debug, Clone)]
pub struct Column {
    pub header: String,
    pub width: u16,
    pub right: bool,
}

impl Column {
    pub fn left(header: impl Into<String>, width: u16) -> Self {
        Self {
            header: header.into(),
            width,
            right: false,
        }
    }

    pub fn right(header: impl Into<String>, width: u16) -> Self {
        Self {
            header: header.into(),
            width,
            right: true,
        }
    }
}

/// One styled table cell
pub type Cell = (String, Style);

/// Search box contents and whether it has keyboard focus
#[derive(Debug, Clone, Copy)]
pub struct SearchBox<'a> {
    pub input: &'a str,
    pub editing: bool,
}

/// Paged table with a search box, sort indicator and footer
pub struct ListView<'a> {
    pub tab: Tab,
    pub search: SearchBox<'a>,
    /// Extra toolbar text such as the status filter
    pub filter: Option<String>,
    pub sort: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Cell>>,
    pub selected: Option<usize>,
    pub summary: String,
    pub indicator: String,
    /// Spinner frame while a fetch is in flight
    pub loading: Option<usize>,
    pub empty_message: &'a str,
    pub keybindings: &'a [(&'a str, &'a str)],
    pub theme: Theme,
}

/// Fit `text` into `width` cells, marking truncation with "…"
pub fn fit(text: &str, width: usize) -> String {
    let count = text.chars().count();
    if count <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(width - 1).collect();
    out.push('…');
    out
}

impl Widget for ListView<'_> {
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
            Constraint::Length(1), // [3] Toolbar
            Constraint::Length(1), // [4] Padding
            Constraint::Length(1), // [5] Header
            Constraint::Min(1),    // [6] Rows
            Constraint::Length(1), // [7] Footer
            Constraint::Length(1), // [8] Separator
            Constraint::Length(1), // [9] Keybindings
        ])
        .split(area);

        TabBar::new(self.tab, self.theme).render(chunks[1], buf);
        self.render_separator(chunks[2], buf);
        self.render_toolbar(chunks[3], buf);
        self.render_header(chunks[5], buf);
        self.render_rows(chunks[6], buf);
        self.render_footer(chunks[7], buf);
        self.render_separator(chunks[8], buf);
        self.render_keybindings(chunks[9], buf);
    }
}

impl ListView<'_> {
    fn render_separator(&self, area: Rect, buf: &mut Buffer) {
        let line = "─".repeat(area.width as usize);
        buf.set_string(
            area.x,
            area.y,
            &line,
            Style::default().fg(self.theme.muted()),
        );
    }

    fn render_toolbar(&self, area: Rect, buf: &mut Buffer) {
        let label = Style::default().fg(self.theme.muted());
        let input_style = if self.search.editing {
            Style::default()
                .fg(self.theme.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.theme.text())
        };
        let input = if self.search.editing {
            format!("{}▏", self.search.input)
        } else if self.search.input.is_empty() {
            "(press /)".to_string()
        } else {
            self.search.input.to_string()
        };

        let mut spans = vec![
            Span::styled("  Search: ", label),
            Span::styled(input, input_style),
        ];
        if let Some(filter) = &self.filter {
            spans.push(Span::styled("   Status: ", label));
            spans.push(Span::styled(
                filter.clone(),
                Style::default().fg(self.theme.heading()),
            ));
        }
        spans.push(Span::styled("   Sort: ", label));
        spans.push(Span::styled(
            self.sort.clone(),
            Style::default().fg(self.theme.heading()),
        ));
        if let Some(frame) = self.loading {
            spans.push(Span::styled(
                format!("   {} Loading...", Spinner::char_at(frame)),
                Style::default().fg(self.theme.accent()),
            ));
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn cell_text(column: &Column, text: &str) -> String {
        let width = column.width as usize;
        let text = fit(text, width.saturating_sub(1));
        if column.right {
            format!("{:>w$} ", text, w = width.saturating_sub(1))
        } else {
            format!("{:<w$}", text, w = width)
        }
    }

    fn render_header(&self, area: Rect, buf: &mut Buffer) {
        let style = Style::default()
            .fg(self.theme.text())
            .add_modifier(Modifier::BOLD);
        let mut spans = vec![Span::raw("  ")];
        for column in &self.columns {
            spans.push(Span::styled(Self::cell_text(column, &column.header), style));
        }
        Paragraph::new(Line::from(spans)).render(area, buf);
    }

    fn render_rows(&self, area: Rect, buf: &mut Buffer) {
        if self.rows.is_empty() {
            let message = if self.loading.is_some() {
                ""
            } else {
                self.empty_message
            };
            Paragraph::new(Span::styled(
                message,
                Style::default().fg(self.theme.muted()),
            ))
            .alignment(Alignment::Center)
            .render(area, buf);
            return;
        }

        for (i, row) in self.rows.iter().enumerate().take(area.height as usize) {
            let is_selected = self.selected == Some(i);
            let marker = if is_selected { "▸ " } else { "  " };
            let mut spans = vec![Span::styled(
                marker,
                Style::default().fg(self.theme.accent()),
            )];
            for (column, (text, style)) in self.columns.iter().zip(row) {
                spans.push(Span::styled(Self::cell_text(column, text), *style));
            }
            let mut line = Line::from(spans);
            if is_selected {
                line = line.style(Style::default().bg(self.theme.selection()));
            }
            let row_area = Rect {
                y: area.y + i as u16,
                height: 1,
                ..area
            };
            Paragraph::new(line).render(row_area, buf);
        }
    }

    fn render_footer(&self, area: Rect, buf: &mut Buffer) {
        let line = Line::from(vec![
            Span::styled(
                format!("  {}", self.summary),
                Style::default().fg(self.theme.muted()),
            ),
            Span::raw("   "),
            Span::styled(
                self.indicator.clone(),
                Style::default().fg(self.theme.accent()),
            ),
        ]);
        Paragraph::new(line).render(area, buf);
    }

    fn render_keybindings(&self, area: Rect, buf: &mut Buffer) {
        let mut spans = Vec::new();
        for (i, (key, desc)) in self.keybindings.iter().enumerate() {
            if i > 0 {
                spans.push(Span::raw("  "));
            }
            spans.push(Span::styled(*key, Style::default().fg(self.theme.accent())));
            spans.push(Span::styled(
                format!(": {}", desc),
                Style::default().fg(self.theme.muted()),
            ));
        }
        Paragraph::new(Line::from(spans))
            .alignment(Alignment::Center)
            .render(area, buf);
    }
}
