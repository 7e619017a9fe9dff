use ratatui::buffer::Buffer;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Paragraph, Widget, Wrap};

use crate::exam::answers::word_count;
use crate::exam::catalog::{Part, PartBody};
use crate::ui::text_editor::TextEditor;
use crate::ui::theme::Theme;

/// Writing task: prompt on top, the candidate's text below with a live word
/// count against the task's limits.
pub struct WritingPanel<'a> {
    part: &'a Part,
    editor: &'a TextEditor,
    focused: bool,
    theme: &'a Theme,
}

impl<'a> WritingPanel<'a> {
    pub fn new(part: &'a Part, editor: &'a TextEditor, focused: bool, theme: &'a Theme) -> Self {
        Self {
            part,
            editor,
            focused,
            theme,
        }
    }
}

impl Widget for WritingPanel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let colors = &self.theme.colors;
        let PartBody::Writing(task) = &self.part.body else {
            return;
        };

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Min(5)])
            .split(area);

        let mut prompt_lines = Vec::new();
        if let Some(instruction) = &self.part.instruction {
            prompt_lines.push(Line::from(Span::styled(
                instruction.as_str(),
                Style::default()
                    .fg(colors.text_muted())
                    .add_modifier(Modifier::ITALIC),
            )));
            prompt_lines.push(Line::from(""));
        }
        for line in task.prompt.lines() {
            prompt_lines.push(Line::from(Span::styled(line, Style::default().fg(colors.fg()))));
        }
        Paragraph::new(prompt_lines)
            .wrap(Wrap { trim: false })
            .block(
                Block::bordered()
                    .title(format!(" {} · {} ", self.part.id, self.part.title))
                    .border_style(Style::default().fg(colors.border())),
            )
            .render(layout[0], buf);

        let words = word_count(self.editor.value());
        let min = task.min_words as usize;
        let limit_text = match task.max_words {
            Some(max) => format!(" {words} words ({min}-{max}) "),
            None => format!(" {words} words (min {min}) "),
        };
        let over = task.max_words.is_some_and(|max| words > max as usize);
        let count_style = if words < min {
            Style::default().fg(colors.warning())
        } else if over {
            Style::default().fg(colors.error())
        } else {
            Style::default().fg(colors.success())
        };

        let border = if self.focused {
            colors.border_focused()
        } else {
            colors.border()
        };
        let title = if self.focused {
            " Your answer (Esc to leave editor) "
        } else {
            " Your answer (i to edit) "
        };
        let block = Block::bordered()
            .title(title)
            .title_bottom(Line::from(Span::styled(limit_text, count_style)).right_aligned())
            .border_style(Style::default().fg(border));

        let (before, cursor_char, after) = self.editor.render_parts();
        let text_style = Style::default().fg(colors.fg());
        let cursor_style = Style::default().fg(colors.bg()).bg(colors.accent());

        // Split on newlines so the cursor span stays on its own row.
        let mut lines: Vec<Line<'static>> = Vec::new();
        let mut current: Vec<Span<'static>> = Vec::new();
        push_text(before, text_style, &mut lines, &mut current);
        if self.focused {
            match cursor_char {
                Some('\n') => {
                    current.push(Span::styled(" ", cursor_style));
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                Some(ch) => current.push(Span::styled(ch.to_string(), cursor_style)),
                None => current.push(Span::styled(" ", cursor_style)),
            }
        } else if let Some(ch) = cursor_char {
            push_text(&ch.to_string(), text_style, &mut lines, &mut current);
        }
        push_text(after, text_style, &mut lines, &mut current);
        lines.push(Line::from(current));

        // Keep the last rows visible as the text grows.
        let inner_height = block.inner(layout[1]).height as usize;
        let scroll = lines.len().saturating_sub(inner_height);
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((u16::try_from(scroll).unwrap_or(u16::MAX), 0))
            .block(block)
            .render(layout[1], buf);
    }
}

/// Append `text` to the row being built, starting a new row at each newline.
fn push_text(
    text: &str,
    style: Style,
    lines: &mut Vec<Line<'static>>,
    current: &mut Vec<Span<'static>>,
) {
    let mut parts = text.split('\n').peekable();
    while let Some(part) = parts.next() {
        current.push(Span::styled(part.to_string(), style));
        if parts.peek().is_some() {
            lines.push(Line::from(std::mem::take(current)));
        }
    }
}
