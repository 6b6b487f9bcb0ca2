//! Agent rename dialog

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
};

use crate::services::rename::RenameForm;
use crate::tui::theme::Theme;

const POPUP_WIDTH: u16 = 50;
const POPUP_HEIGHT: u16 = 10;

/// Rename popup overlay
pub struct RenamePopup<'a> {
    form: &'a RenameForm,
    theme: Theme,
}

impl<'a> RenamePopup<'a> {
    pub fn new(form: &'a RenameForm, theme: Theme) -> Self {
        Self { form, theme }
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

impl Widget for RenamePopup<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Clear.render(area, buf);

        let block = Block::default()
            .title(" Edit Agent ")
            .title_alignment(Alignment::Center)
            .borders(Borders::ALL)
            .border_style(Style::default().fg(self.theme.accent()));

        let inner = block.inner(area);
        block.render(area, buf);

        let chunks = Layout::vertical([
            Constraint::Length(1), // [0] Padding
            Constraint::Length(1), // [1] Agent id
            Constraint::Length(1), // [2] Current name
            Constraint::Length(1), // [3] Padding
            Constraint::Length(1), // [4] Input
            Constraint::Length(1), // [5] Padding
            Constraint::Length(1), // [6] Key hints
            Constraint::Min(0),
        ])
        .split(inner);

        let label = Style::default().fg(self.theme.muted());
        let value = Style::default().fg(self.theme.text());

        Paragraph::new(Line::from(vec![
            Span::styled("  Agent ID  ", label),
            Span::styled(self.form.agent_id.to_string(), value),
        ]))
        .render(chunks[1], buf);

        Paragraph::new(Line::from(vec![
            Span::styled("  Current   ", label),
            Span::styled(self.form.original.as_str(), value),
        ]))
        .render(chunks[2], buf);

        // Keep the tail of long input visible
        let room = (chunks[4].width as usize).saturating_sub(14);
        let input: String = {
            let chars: Vec<char> = self.form.input.chars().collect();
            chars[chars.len().saturating_sub(room)..].iter().collect()
        };
        let cursor = if self.form.is_saving() { "" } else { "▏" };
        Paragraph::new(Line::from(vec![
            Span::styled("  Full name ", label),
            Span::styled(
                format!("{}{}", input, cursor),
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD),
            ),
        ]))
        .render(chunks[4], buf);

        let hints = if self.form.is_saving() {
            Line::from(Span::styled("Saving...", Style::default().fg(self.theme.heading())))
        } else {
            let save_style = if self.form.can_submit() {
                Style::default()
                    .fg(self.theme.accent())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(self.theme.muted())
            };
            Line::from(vec![
                Span::styled("Enter", save_style),
                Span::styled(" Save  ", label),
                Span::styled(
                    "Esc",
                    Style::default()
                        .fg(self.theme.muted())
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(" Cancel", label),
            ])
        };
        Paragraph::new(hints)
            .alignment(Alignment::Center)
            .render(chunks[6], buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::widgets::buffer_text;

    fn render(form: &RenameForm) -> String {
        let area = Rect::new(0, 0, 70, 20);
        let mut buf = Buffer::empty(area);
        RenamePopup::new(form, Theme::Dark).render(RenamePopup::centered_area(area), &mut buf);
        buffer_text(&buf)
    }

    #[test]
    fn test_rename_popup_centered_area() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = RenamePopup::centered_area(area);
        assert_eq!(popup.width, POPUP_WIDTH);
        assert_eq!(popup.height, POPUP_HEIGHT);
        assert_eq!(popup.x, (100 - POPUP_WIDTH) / 2);
    }

    #[test]
    fn test_rename_popup_shows_form() {
        let mut form = RenameForm::new(7, "Amna Osman");
        form.push('!');
        let text = render(&form);
        assert!(text.contains("Edit Agent"));
        assert!(text.contains("Agent ID  7"));
        assert!(text.contains("Amna Osman!"));
        assert!(text.contains("Save"));
    }

    #[test]
    fn test_rename_popup_saving_hides_hints() {
        let mut form = RenameForm::new(7, "Amna");
        form.begin_submit();
        let text = render(&form);
        assert!(text.contains("Saving..."));
        assert!(!text.contains("Cancel"));
    }
}
