use ratatui::crossterm::event::{self, KeyCode, KeyModifiers};
use tracing::trace;

/// Single line editor for the command line. Cursor positions count chars.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: event::KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.enter(),
            (KeyCode::Esc, _) => self.escape(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Home, _) => self.home(),
            (KeyCode::End, _) => self.end(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.current_input.clear();
                self.curser_pos = 0;
                self.get()
            }
            (kc, km) => self.key(kc, km),
        }
    }

    /// Replaces the content and puts the cursor behind it.
    pub fn set(&mut self, s: &str) {
        self.current_input = s.to_string();
        self.curser_pos = s.chars().count();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            canceled: self.canceled,
            finished: self.finished,
            input: self.current_input.clone(),
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.canceled = false;
        self.finished = false;
        self.current_input.clear();
        self.curser_pos = 0;
    }

    fn enter(&mut self) -> InputResult {
        self.finished = true;
        trace!("Input finished: {}", self.current_input);
        self.get()
    }

    fn escape(&mut self) -> InputResult {
        self.clear();
        self.canceled = true;
        self.finished = true;
        self.get()
    }

    fn backspace(&mut self) -> InputResult {
        if self.curser_pos > 0 {
            self.curser_pos -= 1;
            self.current_input.remove(self.byte_pos());
        }
        self.get()
    }

    fn delete(&mut self) -> InputResult {
        if self.curser_pos < self.char_count() {
            self.current_input.remove(self.byte_pos());
        }
        self.get()
    }

    fn left(&mut self) -> InputResult {
        self.curser_pos = self.curser_pos.saturating_sub(1);
        self.get()
    }

    fn right(&mut self) -> InputResult {
        if self.curser_pos < self.char_count() {
            self.curser_pos += 1;
        }
        self.get()
    }

    fn home(&mut self) -> InputResult {
        self.curser_pos = 0;
        self.get()
    }

    fn end(&mut self) -> InputResult {
        self.curser_pos = self.char_count();
        self.get()
    }

    fn key(&mut self, code: KeyCode, modifier: KeyModifiers) -> InputResult {
        if modifier.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) {
            return self.get();
        }
        if let Some(chr) = code.as_char() {
            self.current_input.insert(self.byte_pos(), chr);
            self.curser_pos += 1;
        }
        self.get()
    }

    fn char_count(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self) -> usize {
        self.current_input
            .char_indices()
            .nth(self.curser_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}

/// Multi line editor for the template body. `(row, col)` counts lines and chars.
#[derive(Debug)]
pub struct TextEditor {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for TextEditor {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl TextEditor {
    /// Handles one key press. Returns false once editing is done.
    pub fn read(&mut self, key: event::KeyEvent) -> bool {
        match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => return false,
            (KeyCode::Enter, _) => self.newline(),
            (KeyCode::Backspace, _) => self.backspace(),
            (KeyCode::Delete, _) => self.delete(),
            (KeyCode::Left, _) => self.left(),
            (KeyCode::Right, _) => self.right(),
            (KeyCode::Up, _) => self.up(),
            (KeyCode::Down, _) => self.down(),
            (KeyCode::Home, _) => self.col = 0,
            (KeyCode::End, _) => self.col = self.line_len(self.row),
            (KeyCode::Tab, _) => self.insert_str("    "),
            (_, m) if m.intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) => (),
            (code, _) => {
                if let Some(chr) = code.as_char() {
                    self.insert_char(chr);
                }
            }
        }
        true
    }

    /// Replaces the content and puts the cursor at the very end.
    pub fn set(&mut self, text: &str) {
        self.lines = text
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .collect();
        self.row = self.lines.len() - 1;
        self.col = self.line_len(self.row);
    }

    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// Inserts `text` at the cursor, the cursor ends up behind it.
    pub fn insert_str(&mut self, text: &str) {
        for chr in text.chars() {
            match chr {
                '\n' => self.newline(),
                '\r' => (),
                c => self.insert_char(c),
            }
        }
    }

    fn insert_char(&mut self, chr: char) {
        let pos = self.byte_pos();
        self.lines[self.row].insert(pos, chr);
        self.col += 1;
    }

    fn newline(&mut self) {
        let pos = self.byte_pos();
        let rest = self.lines[self.row].split_off(pos);
        self.row += 1;
        self.col = 0;
        self.lines.insert(self.row, rest);
    }

    fn backspace(&mut self) {
        if self.col > 0 {
            self.col -= 1;
            let pos = self.byte_pos();
            self.lines[self.row].remove(pos);
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = self.line_len(self.row);
            self.lines[self.row].push_str(&line);
        }
    }

    fn delete(&mut self) {
        if self.col < self.line_len(self.row) {
            let pos = self.byte_pos();
            self.lines[self.row].remove(pos);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    fn left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = self.line_len(self.row);
        }
    }

    fn right(&mut self) {
        if self.col < self.line_len(self.row) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    fn up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    fn down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(self.line_len(self.row));
        }
    }

    fn line_len(&self, row: usize) -> usize {
        self.lines[row].chars().count()
    }

    fn byte_pos(&self) -> usize {
        let line = &self.lines[self.row];
        line.char_indices()
            .nth(self.col)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(line.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyEvent;

    fn press(input: &mut Inputter, code: KeyCode) -> InputResult {
        input.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_str(input: &mut Inputter, s: &str) {
        for c in s.chars() {
            press(input, KeyCode::Char(c));
        }
    }

    #[test]
    fn typing_and_editing_in_the_middle() {
        let mut input = Inputter::default();
        type_str(&mut input, "<5l");
        press(&mut input, KeyCode::Left);
        press(&mut input, KeyCode::Backspace);
        type_str(&mut input, "1.");
        let result = press(&mut input, KeyCode::Enter);
        assert_eq!(result.input, "<1.l");
        assert!(result.finished);
        assert!(!result.canceled);
    }

    #[test]
    fn multibyte_characters() {
        let mut input = Inputter::default();
        input.set("László");
        press(&mut input, KeyCode::Home);
        press(&mut input, KeyCode::Right);
        press(&mut input, KeyCode::Right);
        let result = press(&mut input, KeyCode::Delete);
        assert_eq!(result.input, "László".replacen('s', "", 1));
        assert_eq!(result.curser_pos, 2);
    }

    #[test]
    fn escape_cancels() {
        let mut input = Inputter::default();
        type_str(&mut input, "open x.csv");
        let result = press(&mut input, KeyCode::Esc);
        assert!(result.canceled && result.finished);
        assert!(result.input.is_empty());
        input.clear();
        assert!(!input.get().finished);
    }

    fn edit(editor: &mut TextEditor, code: KeyCode) -> bool {
        editor.read(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn editor_splits_and_joins_lines() {
        let mut editor = TextEditor::default();
        editor.set("## Hello\r\nSee you");
        assert_eq!(editor.lines(), ["## Hello", "See you"]);
        assert_eq!(editor.cursor(), (1, 7));

        edit(&mut editor, KeyCode::Home);
        edit(&mut editor, KeyCode::Backspace);
        assert_eq!(editor.text(), "## HelloSee you");
        assert_eq!(editor.cursor(), (0, 8));

        edit(&mut editor, KeyCode::Enter);
        editor.insert_str("Dear [[swimmer]],\n");
        assert_eq!(editor.text(), "## Hello\nDear [[swimmer]],\nSee you");
        assert_eq!(editor.cursor(), (2, 0));

        edit(&mut editor, KeyCode::Up);
        edit(&mut editor, KeyCode::End);
        edit(&mut editor, KeyCode::Delete);
        assert_eq!(editor.lines(), ["## Hello", "Dear [[swimmer]],See you"]);
    }

    #[test]
    fn editor_cursor_wraps_between_lines() {
        let mut editor = TextEditor::default();
        editor.set("ab\nLászló");
        edit(&mut editor, KeyCode::Home);
        edit(&mut editor, KeyCode::Left);
        assert_eq!(editor.cursor(), (0, 2));
        edit(&mut editor, KeyCode::Right);
        edit(&mut editor, KeyCode::Right);
        edit(&mut editor, KeyCode::Char('é'));
        assert_eq!(editor.lines()[1], "Léászló");
        assert!(!edit(&mut editor, KeyCode::Esc));
        assert_eq!(editor.text(), "ab\nLéászló");
    }
}
