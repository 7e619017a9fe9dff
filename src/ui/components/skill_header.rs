use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Widget};

use crate::exam::session::SessionSnapshot;
use crate::exam::skill::Skill;
use crate::exam::timer::format_clock;
use crate::ui::theme::Theme;

/// Top bar: exam title plus one clock per skill. Only the current skill's
/// clock is highlighted; completed skills are dimmed.
pub struct SkillHeader<'a> {
    title: &'a str,
    snapshot: &'a SessionSnapshot,
    theme: &'a Theme,
}

impl<'a> SkillHeader<'a> {
    pub fn new(title: &'a str, snapshot: &'a SessionSnapshot, theme: &'a Theme) -> Self {
        Self {
            title,
            snapshot,
            theme,
        }
    }
}

impl Widget for SkillHeader<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let base = Style::default().bg(colors.header_bg());

        let mut spans = vec![Span::styled(
            format!(" {} ", self.title),
            base.fg(colors.header_fg()).add_modifier(Modifier::BOLD),
        )];

        for &skill in Skill::all() {
            let remaining = self.snapshot.remaining.get(&skill).copied().unwrap_or(0);
            let is_current = skill == self.snapshot.current_skill;
            let locked = self.snapshot.completed.contains(skill);

            let style = if is_current && remaining == 0 {
                base.fg(colors.error()).add_modifier(Modifier::BOLD)
            } else if is_current {
                base.fg(colors.accent()).add_modifier(Modifier::BOLD)
            } else if locked {
                base.fg(colors.text_muted()).add_modifier(Modifier::CROSSED_OUT)
            } else {
                base.fg(colors.text_muted())
            };
            let marker = if is_current { "▶" } else { " " };
            spans.push(Span::styled(
                format!(" {marker}{} {} ", skill.display_name(), format_clock(remaining)),
                style,
            ));
        }

        Paragraph::new(Line::from(spans))
            .style(base)
            .render(area, buf);
    }
}
