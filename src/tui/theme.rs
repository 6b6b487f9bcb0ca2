//! Dashboard color palettes for dark and light terminals

use ratatui::style::{Color, Modifier, Style};

/// Background luma above which the light palette is used
const LIGHT_LUMA: f32 = 0.6;

/// Color roles used across the dashboard views
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub text: Color,
    pub accent: Color,
    pub muted: Color,
    pub heading: Color,
    pub metric: Color,
    pub positive: Color,
    pub negative: Color,
    pub selection: Color,
}

// Light variants use ANSI 256 indices dark enough for a white background
const DARK: Palette = Palette {
    text: Color::White,
    accent: Color::Cyan,
    muted: Color::DarkGray,
    heading: Color::Yellow,
    metric: Color::Magenta,
    positive: Color::Green,
    negative: Color::Red,
    selection: Color::Indexed(236),
};

const LIGHT: Palette = Palette {
    text: Color::Black,
    accent: Color::Indexed(25),
    muted: Color::Gray,
    heading: Color::Indexed(130),
    metric: Color::Indexed(90),
    positive: Color::Indexed(22),
    negative: Color::Indexed(124),
    selection: Color::Indexed(254),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    /// Pick a palette from the terminal background.
    /// Must run before raw mode is enabled; undetectable terminals get Dark.
    pub fn detect() -> Self {
        Self::from_luma(terminal_light::luma().ok())
    }

    fn from_luma(luma: Option<f32>) -> Self {
        match luma {
            Some(luma) if luma > LIGHT_LUMA => Self::Light,
            _ => Self::Dark,
        }
    }

    pub fn palette(self) -> &'static Palette {
        match self {
            Self::Dark => &DARK,
            Self::Light => &LIGHT,
        }
    }

    pub fn text(self) -> Color {
        self.palette().text
    }

    /// Selected tab, key hints, agent initials
    pub fn accent(self) -> Color {
        self.palette().accent
    }

    pub fn muted(self) -> Color {
        self.palette().muted
    }

    pub fn heading(self) -> Color {
        self.palette().heading
    }

    /// KPI card values
    pub fn metric(self) -> Color {
        self.palette().metric
    }

    /// Chart bars
    pub fn bar(self) -> Color {
        self.palette().positive
    }

    pub fn error(self) -> Color {
        self.palette().negative
    }

    /// Selected table row background
    pub fn selection(self) -> Color {
        self.palette().selection
    }

    /// Active agents in green, inactive ones in red
    pub fn status(self, active: bool) -> Style {
        let palette = self.palette();
        Style::default().fg(if active {
            palette.positive
        } else {
            palette.negative
        })
    }

    pub fn title(self) -> Style {
        Style::default()
            .fg(self.text())
            .add_modifier(Modifier::BOLD)
    }
}
