//! Blocking message popup; any key dismisses it

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget, Wrap},
};

use crate::tui::theme::Theme;

const POPUP_WIDTH: u16 = 56;
const POPUP_HEIGHT: u16 = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Info,
    Error,
}

/// Message shown over the current view
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub kind: AlertKind,
    pub message: String,
}

impl Alert {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: AlertKind::Error,
            message: message.into(),
        }
    }
}

pub struct AlertPopup<'a> {
    alert: &'a Alert,
    theme: Theme,
}

impl<'a> AlertPopup<'a> {
    pub fn new(alert: &'a Alert, theme: Theme) -> Self {
        Self { alert, theme }
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
}

impl Widget for AlertPopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let (title, color) = match self.alert.kind {
            AlertKind::Info => (" Done ", self.theme.bar()),
            AlertKind::Error => (" Error ", self.theme.error()),
        };
        let block = Block::default()
            .title(title)
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(color));

        let inner = block.inner(area);
        block.render(area, buf);

        let lines = vec![
            Line::raw(""),
            Line::from(Span::styled(
                self.alert.message.as_str(),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
            Line::from(Span::styled(
                "Press any key",
                Style::default().fg(self.theme.muted()),
            )),
        ];
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::widgets::buffer_text;

    #[test]
    fn test_alert_popup_small_terminal() {
        let area = Rect::new(0, 0, 30, 5);
        let popup = AlertPopup::centered_area(area);
        assert_eq!(popup.width, 30);
        assert_eq!(popup.height, 5);
    }

    #[test]
    fn test_alert_popup_renders_message() {
        let area = Rect::new(0, 0, 80, 20);
        let mut buf = Buffer::empty(area);
        let alert = Alert::error("Failed to update agent.");
        AlertPopup::new(&alert, Theme::Dark).render(AlertPopup::centered_area(area), &mut buf);

        let text = buffer_text(&buf);
        assert!(text.contains("Error"));
        assert!(text.contains("Failed to update agent."));
        assert!(text.contains("Press any key"));
    }
}
