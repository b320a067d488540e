use std::fmt;

use ratatui::style::Color;

const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

/// Shared colors for plain terminal output and the TUI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Accent,
    Info,
    Success,
    Warning,
    Danger,
    Border,
}

impl Tone {
    pub const fn tui(self) -> Color {
        match self {
            Tone::Accent => Color::Blue,
            Tone::Info => Color::Cyan,
            Tone::Success => Color::Green,
            Tone::Warning => Color::Yellow,
            Tone::Danger => Color::Red,
            Tone::Border => Color::Gray,
        }
    }

    pub const fn ansi(self) -> &'static str {
        match self {
            Tone::Accent => "\x1b[34m",
            Tone::Info => "\x1b[36m",
            Tone::Success => "\x1b[32m",
            Tone::Warning => "\x1b[33m",
            Tone::Danger => "\x1b[31m",
            Tone::Border => "\x1b[90m",
        }
    }

    pub fn paint(self, value: impl fmt::Display) -> String {
        format!("{}{}{}", self.ansi(), value, RESET)
    }
}

pub fn dim(value: impl fmt::Display) -> String {
    format!("{DIM}{value}{RESET}")
}
