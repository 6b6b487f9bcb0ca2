//! Loading placeholder shown while a view waits for its first data

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Paragraph, Widget},
};

use crate::tui::theme::Theme;

/// Braille frames, one per tick
const FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadingStage {
    Dashboard,
    Agents,
    Customers,
}

impl LoadingStage {
    pub fn message(self) -> &'static str {
        match self {
            Self::Dashboard => "Loading dashboard...",
            Self::Agents => "Loading agents...",
            Self::Customers => "Loading customers...",
        }
    }

    fn detail(self) -> &'static str {
        match self {
            Self::Dashboard => "metrics, daily sign-ups and agent activity",
            Self::Agents => "agents and their customer counts",
            Self::Customers => "first page of customers",
        }
    }
}

pub struct Spinner {
    frame: usize,
    stage: LoadingStage,
    theme: Theme,
}

impl Spinner {
    pub fn new(frame: usize, stage: LoadingStage, theme: Theme) -> Self {
        Self {
            frame,
            stage,
            theme,
        }
    }

    pub fn char_at(frame: usize) -> char {
        FRAMES[frame % FRAMES.len()]
    }

    pub fn next_frame(frame: usize) -> usize {
        (frame + 1) % FRAMES.len()
    }
}

impl Widget for Spinner {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let lines = vec![
            Line::from(Span::styled("salesdash", self.theme.title())),
            Line::default(),
            Line::from(vec![
                Span::styled(
                    format!("{} ", Self::char_at(self.frame)),
                    Style::default().fg(self.theme.accent()),
                ),
                Span::styled(self.stage.message(), Style::default().fg(self.theme.text())),
            ]),
            Line::from(Span::styled(
                self.stage.detail(),
                Style::default().fg(self.theme.muted()),
            )),
        ];
        if area.height < lines.len() as u16 {
            return;
        }

        let [_, body, _] = Layout::vertical([
            Constraint::Fill(1),
            Constraint::Length(lines.len() as u16),
            Constraint::Fill(1),
        ])
        .areas(area);
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .render(body, buf);
    }
}
