use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::exam::catalog::{Part, PartBody};
use crate::exam::speaking::{SpeakingChoreographer, SpeakingPhase};
use crate::exam::timer::format_clock;
use crate::ui::components::progress_bar::ProgressBar;
use crate::ui::theme::Theme;

/// Speaking part: the task on the left, phase status and input level on the
/// right. The candidate has nothing to operate here; the sequence runs itself.
pub struct SpeakingPanel<'a> {
    part: &'a Part,
    speaking: &'a SpeakingChoreographer,
    theme: &'a Theme,
}

impl<'a> SpeakingPanel<'a> {
    pub fn new(part: &'a Part, speaking: &'a SpeakingChoreographer, theme: &'a Theme) -> Self {
        Self {
            part,
            speaking,
            theme,
        }
    }

    fn status(&self) -> (String, f64) {
        let phase = self.speaking.phase();
        let progress = phase
            .countdown()
            .filter(|cd| cd.total() > 0)
            .map(|cd| cd.elapsed() as f64 / cd.total() as f64)
            .unwrap_or(0.0);
        let clock = phase
            .countdown()
            .map(|cd| format_clock(cd.remaining()))
            .unwrap_or_default();
        let text = match phase {
            SpeakingPhase::Idle => "Waiting".to_string(),
            SpeakingPhase::Preparing(_) => format!("Preparing headset · {clock}"),
            SpeakingPhase::PlayingInstruction(cd) => format!(
                "Instruction audio {}/{}",
                format_clock(cd.elapsed()),
                format_clock(cd.total())
            ),
            SpeakingPhase::PreRecordCountdown(_) => format!("Preparation time · {clock}"),
            SpeakingPhase::Recording(_) => format!("● Recording · {clock} left"),
            SpeakingPhase::PostRecordTransition { .. } => "Recording saved".to_string(),
            SpeakingPhase::Done => "Speaking test finished. Press Enter to submit.".to_string(),
        };
        (text, progress)
    }
}

impl Widget for SpeakingPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let PartBody::Speaking(task) = &self.part.body else {
            return;
        };

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        let mut lines = Vec::new();
        if let Some(instruction) = &self.part.instruction {
            lines.push(Line::from(Span::styled(
                instruction.as_str(),
                Style::default()
                    .fg(colors.text_muted())
                    .add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::from(""));
        }
        lines.push(Line::from(Span::styled(
            task.prompt.as_str(),
            Style::default().fg(colors.fg()).add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::from(""));
        for line in &task.lines {
            lines.push(Line::from(Span::styled(
                format!("  • {line}"),
                Style::default().fg(colors.fg()),
            )));
        }
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(format!(" {} · {} ", self.part.id, self.part.title))
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(columns[0], buf);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(columns[1]);

        let (status, progress) = self.status();
        let status_style = if self.speaking.is_recording() {
            Style::default()
                .fg(colors.recording())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.accent())
        };
        Paragraph::new(Line::from(Span::styled(status, status_style)))
            .wrap(Wrap { trim: true })
            .block(
                Block::bordered()
                    .title(" Status ")
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(right[0], buf);

        ProgressBar::new("Phase", progress, self.theme).render(right[1], buf);

        let level = self.speaking.input_level() / 100.0;
        let label = if self.speaking.using_synthetic_input() {
            "Input level (sim)"
        } else {
            "Input level"
        };
        ProgressBar::new(label, level, self.theme)
            .fill(colors.recording())
            .render(right[2], buf);

        let steps = [
            ("Headset check", self.speaking.preparation_shown()),
            ("Instruction played", self.speaking.playback_finished()),
            ("Answer recorded", self.speaking.recording_completed()),
        ];
        let checklist: Vec<Line> = steps
            .iter()
            .map(|&(name, done)| {
                let (mark, color) = if done {
                    ("✓", colors.success())
                } else {
                    ("·", colors.text_muted())
                };
                Line::from(Span::styled(format!(" {mark} {name}"), Style::default().fg(color)))
            })
            .collect();
        Paragraph::new(checklist).render(right[3], buf);
    }
}
