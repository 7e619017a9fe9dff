use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EditResult {
    Unchanged,
    Changed,
    /// Esc: hand focus back to the exam screen.
    Release,
}

/// Multi-line editor for writing tasks. Enter inserts a line break.
pub struct TextEditor {
    text: String,
    /// Cursor position as a char index (0 = before first char).
    cursor: usize,
}

impl TextEditor {
    pub fn new(text: &str) -> Self {
        let cursor = text.chars().count();
        Self {
            text: text.to_string(),
            cursor,
        }
    }

    pub fn value(&self) -> &str {
        &self.text
    }

    /// Returns (before_cursor, cursor_char, after_cursor) for styled rendering.
    /// When cursor is at end of text, cursor_char is None.
    pub fn render_parts(&self) -> (&str, Option<char>, &str) {
        let byte_offset = self.char_to_byte(self.cursor);
        match self.text[byte_offset..].chars().next() {
            None => (&self.text, None, ""),
            Some(ch) => {
                let next_byte = byte_offset + ch.len_utf8();
                (&self.text[..byte_offset], Some(ch), &self.text[next_byte..])
            }
        }
    }

    pub fn handle(&mut self, key: KeyEvent) -> EditResult {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return EditResult::Release,
            KeyCode::Enter => {
                self.insert('\n');
                return EditResult::Changed;
            }
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(self.len()),
            KeyCode::Home => self.cursor = self.line_start(self.cursor),
            KeyCode::End => self.cursor = self.line_end(self.cursor),
            KeyCode::Up => self.move_vertical(false),
            KeyCode::Down => self.move_vertical(true),
            KeyCode::Backspace => {
                if self.cursor > 0 {
                    self.cursor -= 1;
                    self.remove_at(self.cursor);
                    return EditResult::Changed;
                }
            }
            KeyCode::Delete => {
                if self.cursor < self.len() {
                    self.remove_at(self.cursor);
                    return EditResult::Changed;
                }
            }
            KeyCode::Char('w') if ctrl => {
                if self.delete_word_back() {
                    return EditResult::Changed;
                }
            }
            KeyCode::Char(ch) if !ctrl => {
                self.insert(ch);
                return EditResult::Changed;
            }
            _ => {}
        }
        EditResult::Unchanged
    }

    fn len(&self) -> usize {
        self.text.chars().count()
    }

    fn char_to_byte(&self, char_idx: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_idx)
            .map(|(b, _)| b)
            .unwrap_or(self.text.len())
    }

    fn insert(&mut self, ch: char) {
        let byte_offset = self.char_to_byte(self.cursor);
        self.text.insert(byte_offset, ch);
        self.cursor += 1;
    }

    fn remove_at(&mut self, char_idx: usize) {
        let byte_offset = self.char_to_byte(char_idx);
        if let Some(ch) = self.text[byte_offset..].chars().next() {
            self.text
                .replace_range(byte_offset..byte_offset + ch.len_utf8(), "");
        }
    }

    fn line_start(&self, pos: usize) -> usize {
        self.text
            .chars()
            .take(pos)
            .collect::<Vec<_>>()
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0)
    }

    fn line_end(&self, pos: usize) -> usize {
        self.text
            .chars()
            .skip(pos)
            .position(|c| c == '\n')
            .map(|i| pos + i)
            .unwrap_or_else(|| self.len())
    }

    fn move_vertical(&mut self, down: bool) {
        let start = self.line_start(self.cursor);
        let column = self.cursor - start;
        if down {
            let end = self.line_end(self.cursor);
            if end >= self.len() {
                return;
            }
            let next_start = end + 1;
            let next_end = self.line_end(next_start);
            self.cursor = (next_start + column).min(next_end);
        } else {
            if start == 0 {
                return;
            }
            let prev_start = self.line_start(start - 1);
            self.cursor = (prev_start + column).min(start - 1);
        }
    }

    /// Delete word before cursor (skip whitespace, then non-whitespace).
    fn delete_word_back(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        let chars: Vec<char> = self.text.chars().collect();
        let mut pos = self.cursor;
        while pos > 0 && chars[pos - 1].is_whitespace() {
            pos -= 1;
        }
        while pos > 0 && !chars[pos - 1].is_whitespace() {
            pos -= 1;
        }

        let start_byte = self.char_to_byte(pos);
        let end_byte = self.char_to_byte(self.cursor);
        self.text.replace_range(start_byte..end_byte, "");
        self.cursor = pos;
        true
    }
}
