use crate::palette::Tone;

use ratatui::{
    layout::Alignment,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders},
};

/// Styles and widget helpers shared by every quiz screen.
pub struct Theme;

impl Theme {
    pub const KEY_FG: Color = Color::Rgb(255, 255, 255);

    pub fn label() -> Style {
        Self::bold(Tone::Accent)
    }

    pub fn success() -> Style {
        Self::bold(Tone::Success)
    }

    pub fn warning() -> Style {
        Self::bold(Tone::Warning)
    }

    pub fn danger() -> Style {
        Self::bold(Tone::Danger)
    }

    pub fn muted() -> Style {
        Style::default().fg(Tone::Border.tui())
    }

    pub fn emphasis() -> Style {
        Style::default().add_modifier(Modifier::BOLD)
    }

    pub fn selected() -> Style {
        Style::default()
            .fg(Tone::Info.tui())
            .add_modifier(Modifier::BOLD)
    }

    fn bold(tone: Tone) -> Style {
        Style::default()
            .fg(tone.tui())
            .add_modifier(Modifier::BOLD)
    }

    pub fn backdrop<'a>() -> Block<'a> {
        Block::default()
    }

    pub fn panel<'a>(title: impl Into<String>) -> Block<'a> {
        Self::panel_with_line(Self::title_line(title))
    }

    pub fn panel_with_line<'a>(title: Line<'a>) -> Block<'a> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Tone::Border.tui()))
            .title(title)
            .title_alignment(Alignment::Left)
    }

    /// Panel whose border takes the given tone, used for focus and errors.
    pub fn highlighted_panel<'a>(title: impl Into<String>, tone: Tone) -> Block<'a> {
        Self::panel(title).border_style(Style::default().fg(tone.tui()))
    }

    pub fn title_line(title: impl Into<String>) -> Line<'static> {
        Line::from(vec![Span::styled(
            format!(" {} ", title.into()),
            Self::label(),
        )])
    }

    pub fn label_span(text: impl Into<String>) -> Span<'static> {
        Span::styled(text.into(), Self::label())
    }

    pub fn span(text: impl Into<String>) -> Span<'static> {
        Span::raw(text.into())
    }

    pub fn key_chip(text: impl Into<String>) -> Span<'static> {
        Span::styled(
            format!(" {} ", text.into()),
            Style::default()
                .fg(Self::KEY_FG)
                .bg(Tone::Accent.tui())
                .add_modifier(Modifier::BOLD),
        )
    }

    pub fn bullet() -> Span<'static> {
        Self::span(" • ")
    }

    pub fn section_header(text: impl Into<String>) -> Line<'static> {
        Line::from(vec![Span::styled(text.into(), Self::emphasis())])
    }
}
