use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget};

use crate::exam::session::{PartProgress, SessionSnapshot};
use crate::ui::theme::Theme;

/// Bottom navigation: every part with its answered/required count. Parts of
/// completed skills are shown but dimmed.
pub struct PartNav<'a> {
    snapshot: &'a SessionSnapshot,
    theme: &'a Theme,
}

impl<'a> PartNav<'a> {
    pub fn new(snapshot: &'a SessionSnapshot, theme: &'a Theme) -> Self {
        Self { snapshot, theme }
    }

    fn label(part: &PartProgress) -> String {
        if part.required > 0 {
            format!(" {} {}/{} ", part.id, part.answered, part.required)
        } else {
            format!(" {} ", part.id)
        }
    }
}

impl Widget for PartNav<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(" Parts ")
            .border_style(Style::default().fg(colors.border()));
        let inner = block.inner(area);
        block.render(area, buf);

        let mut spans = Vec::new();
        let mut last_skill = None;
        for part in &self.snapshot.parts {
            if last_skill.is_some_and(|s| s != part.skill) {
                spans.push(Span::styled("│", Style::default().fg(colors.border())));
            }
            last_skill = Some(part.skill);

            let is_current = part.id == self.snapshot.current_part;
            let complete = part.required > 0 && part.answered >= part.required;
            let style = if is_current {
                Style::default()
                    .fg(colors.selected_fg())
                    .bg(colors.selected_bg())
                    .add_modifier(Modifier::BOLD)
            } else if !part.reachable {
                Style::default().fg(colors.locked())
            } else if complete {
                Style::default().fg(colors.answered())
            } else {
                Style::default().fg(colors.fg())
            };
            spans.push(Span::styled(Self::label(part), style));
        }

        let progress = format!(
            "  {}/{} answered",
            self.snapshot.answered_total, self.snapshot.total_answerable
        );
        spans.push(Span::styled(progress, Style::default().fg(colors.text_muted())));

        Paragraph::new(Line::from(spans)).render(inner, buf);
    }
}
