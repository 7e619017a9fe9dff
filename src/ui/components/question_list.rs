use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::exam::answers::AnswerStore;
use crate::exam::catalog::{Part, PartBody, Question, QuestionLayout};
use crate::ui::layout::wrapped_line_count;
use crate::ui::theme::Theme;

/// Objective part: optional passages and audio labels, then each question
/// with its lettered options. `cursor` indexes questions in part order.
pub struct QuestionList<'a> {
    part: &'a Part,
    answers: &'a AnswerStore,
    cursor: usize,
    theme: &'a Theme,
}

impl<'a> QuestionList<'a> {
    pub fn new(part: &'a Part, answers: &'a AnswerStore, cursor: usize, theme: &'a Theme) -> Self {
        Self {
            part,
            answers,
            cursor,
            theme,
        }
    }

    fn question_lines(&self, question: &Question, index: usize, lines: &mut Vec<Line<'a>>) {
        let colors = &self.theme.colors;
        let focused = index == self.cursor;
        let chosen = self
            .answers
            .objective(question.id)
            .and_then(|label| question.index_of_label(label));

        let prompt_style = if focused {
            Style::default()
                .fg(colors.accent())
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.fg())
        };
        let marker = if focused { "▶ " } else { "  " };
        lines.push(Line::from(Span::styled(
            format!("{marker}{}. {}", question.id, question.prompt),
            prompt_style,
        )));

        for (i, option) in question.options.iter().enumerate() {
            let label = Question::label_for(i).unwrap_or('?');
            let selected = chosen == Some(i);
            let bullet = if selected { "●" } else { "○" };
            let style = if selected {
                Style::default()
                    .fg(colors.answered())
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(colors.text_muted())
            };
            lines.push(Line::from(Span::styled(
                format!("      {bullet} {label}. {option}"),
                style,
            )));
        }
        lines.push(Line::from(""));
    }
}

impl Widget for QuestionList<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;

        let block = Block::bordered()
            .title(format!(" {} · {} ", self.part.id, self.part.title))
            .border_style(Style::default().fg(colors.border_focused()));
        let inner = block.inner(area);
        block.render(area, buf);

        let PartBody::Objective(layout) = &self.part.body else {
            return;
        };

        let mut lines: Vec<Line> = Vec::new();
        if let Some(instruction) = &self.part.instruction {
            lines.push(Line::from(Span::styled(
                instruction.clone(),
                Style::default()
                    .fg(colors.text_muted())
                    .add_modifier(Modifier::ITALIC),
            )));
            lines.push(Line::from(""));
        }

        let mut cursor_line = 0;
        let mut index = 0;
        match layout {
            QuestionLayout::Flat(questions) => {
                for question in questions {
                    if index == self.cursor {
                        cursor_line = lines.len();
                    }
                    self.question_lines(question, index, &mut lines);
                    index += 1;
                }
            }
            QuestionLayout::Sectioned(sections) => {
                for section in sections {
                    let mut heading = section.title.clone().unwrap_or_default();
                    if let Some(audio) = &section.audio_ref {
                        heading.push_str(&format!("  ♪ {audio}"));
                    }
                    if !heading.is_empty() {
                        lines.push(Line::from(Span::styled(
                            heading,
                            Style::default()
                                .fg(colors.warning())
                                .add_modifier(Modifier::BOLD),
                        )));
                    }
                    if let Some(passage) = &section.passage {
                        for paragraph in passage.split("\n\n") {
                            lines.push(Line::from(Span::styled(
                                paragraph.to_string(),
                                Style::default().fg(colors.fg()),
                            )));
                            lines.push(Line::from(""));
                        }
                    }
                    for question in &section.questions {
                        if index == self.cursor {
                            cursor_line = lines.len();
                        }
                        self.question_lines(question, index, &mut lines);
                        index += 1;
                    }
                }
            }
        }

        // Scroll so the focused question starts near the top third.
        let width = inner.width as usize;
        let rows_before: usize = lines[..cursor_line]
            .iter()
            .map(|l| wrapped_line_count(&l.to_string(), width))
            .sum();
        let scroll = rows_before.saturating_sub(inner.height as usize / 3);

        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .render(inner, buf);
    }
}
