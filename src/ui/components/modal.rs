use ratatui::buffer::Buffer;
use ratatui::layout::{Alignment, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Clear, Paragraph, Widget, Wrap};

use crate::ui::layout::pack_hint_lines;
use crate::ui::theme::Theme;

/// Bordered dialog drawn over whatever is below it.
pub struct Modal<'a> {
    title: String,
    body: Vec<String>,
    hints: Vec<&'a str>,
    accent: Option<Color>,
    theme: &'a Theme,
}

impl<'a> Modal<'a> {
    pub fn new(title: impl Into<String>, theme: &'a Theme) -> Self {
        Self {
            title: title.into(),
            body: Vec::new(),
            hints: Vec::new(),
            accent: None,
            theme,
        }
    }

    pub fn line(mut self, text: impl Into<String>) -> Self {
        self.body.push(text.into());
        self
    }

    pub fn hints(mut self, hints: &[&'a str]) -> Self {
        self.hints = hints.to_vec();
        self
    }

    pub fn accent(mut self, color: Color) -> Self {
        self.accent = Some(color);
        self
    }
}

impl Widget for Modal<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let accent = self.accent.unwrap_or_else(|| colors.accent());

        Clear.render(area, buf);
        let block = Block::bordered()
            .title(format!(" {} ", self.title))
            .title_alignment(Alignment::Center)
            .border_style(Style::default().fg(accent))
            .style(Style::default().bg(colors.bg()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut lines: Vec<Line> = vec![Line::from("")];
        for text in &self.body {
            lines.push(Line::from(Span::styled(
                text.as_str(),
                Style::default().fg(colors.fg()),
            )));
        }
        lines.push(Line::from(""));
        for hint in pack_hint_lines(&self.hints, inner.width as usize) {
            lines.push(Line::from(Span::styled(
                hint,
                Style::default().fg(accent).add_modifier(Modifier::BOLD),
            )));
        }

        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .render(inner, buf);
    }
}
