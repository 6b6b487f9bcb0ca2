//! Help popup widget - displays keyboard shortcuts

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::tui::theme::Theme;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const POPUP_WIDTH: u16 = 46;
const POPUP_HEIGHT: u16 = 26;

const SECTIONS: &[(&str, &[(&str, &str)])] = &[
    (
        "Navigation",
        &[
            ("Tab / Shift+Tab", "Switch view"),
            ("1-3", "Jump to view"),
            ("Up/Down or j/k", "Select row"),
            ("Left/Right or h/l", "Previous/next page"),
        ],
    ),
    (
        "Lists",
        &[
            ("/", "Search (Enter to apply)"),
            ("c", "Clear search"),
            ("s / o", "Sort column / order"),
            ("f", "Status filter (Agents)"),
            ("r", "Rename agent"),
            ("e", "Export CSV"),
        ],
    ),
    (
        "General",
        &[
            ("a", "All inactive agents"),
            ("q / Esc", "Quit"),
            ("?", "Toggle help"),
        ],
    ),
];

/// Help popup widget showing keyboard shortcuts
pub struct HelpPopup {
    theme: Theme,
}

impl HelpPopup {
    pub fn new(theme: Theme) -> Self {
        Self { theme }
    }

    /// Calculate centered popup area
    pub fn centered_area(area: Rect) -> Rect {
        let x = area.x + (area.width.saturating_sub(POPUP_WIDTH)) / 2;
        let y = area.y + (area.height.saturating_sub(POPUP_HEIGHT)) / 2;
        Rect {
            x,
            y,
            width: POPUP_WIDTH.min(area.width),
            height: POPUP_HEIGHT.min(area.height),
        }
    }

    fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let sep = "─".repeat(width as usize);
        let mut lines = Vec::new();
        for (title, bindings) in SECTIONS {
            lines.push(Line::raw(""));
            lines.push(Line::from(Span::styled(
                *title,
                Style::default()
                    .fg(self.theme.heading())
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                sep.clone(),
                Style::default().fg(self.theme.muted()),
            )));
            for (key, desc) in *bindings {
                lines.push(keybinding(key, desc, self.theme));
            }
        }
        lines
    }
}

impl Default for HelpPopup {
    fn default() -> Self {
        Self::new(Theme::default())
    }
}

impl Widget for HelpPopup {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let title = format!(" salesdash v{} ", VERSION);
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent()));

        let inner = block.inner(area);
        block.render(area, buf);
        if inner.height == 0 {
            return;
        }

        let mut lines = self.lines(inner.width);
        lines.push(Line::raw(""));
        lines.push(
            Line::from(Span::styled(
                "Press ? to close",
                Style::default().fg(self.theme.muted()),
            ))
            .alignment(Alignment::Center),
        );
        Paragraph::new(lines).render(inner, buf);
    }
}

fn keybinding(key: &str, desc: &str, theme: Theme) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {:<20}", key),
            Style::default().fg(theme.accent()),
        ),
        Span::styled(desc.to_string(), Style::default().fg(theme.text())),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_popup_centered_area() {
        let area = Rect::new(0, 0, 100, 50);
        let popup_area = HelpPopup::centered_area(area);

        assert_eq!(popup_area.width, POPUP_WIDTH);
        assert_eq!(popup_area.height, POPUP_HEIGHT);
        assert_eq!(popup_area.x, (100 - POPUP_WIDTH) / 2);
        assert_eq!(popup_area.y, (50 - POPUP_HEIGHT) / 2);
    }

    #[test]
    fn test_help_popup_small_terminal() {
        let area = Rect::new(0, 0, 30, 10);
        let popup_area = HelpPopup::centered_area(area);

        assert_eq!(popup_area.width, 30);
        assert_eq!(popup_area.height, 10);
    }

    #[test]
    fn test_help_content_fits_popup() {
        let lines = HelpPopup::default().lines(POPUP_WIDTH - 2);
        // borders plus the close hint and its padding line
        assert!(lines.len() as u16 + 2 <= POPUP_HEIGHT - 2);
    }
}
