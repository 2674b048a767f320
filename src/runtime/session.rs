//! The active line: editing operations and their rendering side effects.
//!
//! A session exists from activation until the line is committed, cancelled,
//! or abandoned. Every editing operation mutates the styled buffer and then
//! syncs the view; operations that change content also recompute the hint
//! and colorization first.

use crate::core::style::{Style, StyleWriter};
use crate::core::text::StyledText;
use crate::render::output::{OutputGate, TermSink};
use crate::render::view::TermView;

/// Hint and colorization callbacks. Owned by the reader so they survive
/// across reads; borrowed by the session for the duration of one mutation.
#[derive(Default)]
pub struct Callbacks {
    pub hint: Option<Box<dyn FnMut(&str) -> String + Send>>,
    pub color: Option<Box<dyn FnMut(&str, &mut StyleWriter) + Send>>,
}

pub struct LineSession<S: TermSink> {
    sink: S,
    gate: OutputGate,
    view: TermView,
    buf: StyledText,
    position: usize,
    hint: StyledText,
    hint_style: Style,
    masked: bool,
    popped: bool,
}

impl<S: TermSink> LineSession<S> {
    pub fn new(
        sink: S,
        prompt: StyledText,
        term_columns: Option<usize>,
        masked: bool,
        hint_style: Style,
    ) -> Self {
        let mut session = Self {
            sink,
            gate: OutputGate::new(),
            view: TermView::new(term_columns, prompt),
            buf: StyledText::new(),
            position: 0,
            hint: StyledText::new(),
            hint_style,
            masked,
            popped: false,
        };
        session.sync();
        session
    }

    pub fn current_line(&self) -> String {
        self.buf.to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn buffer(&self) -> &StyledText {
        &self.buf
    }

    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.position
    }

    pub fn cursor_back(&mut self) {
        if self.position == 0 {
            return;
        }
        self.position -= 1;
        self.sync();
    }

    pub fn cursor_forward(&mut self) {
        if self.position == self.buf.len() {
            return;
        }
        self.position += 1;
        self.sync();
    }

    pub fn cursor_home(&mut self) {
        self.position = 0;
        self.sync();
    }

    pub fn cursor_end(&mut self) {
        self.position = self.buf.len();
        self.sync();
    }

    pub fn insert_character(&mut self, ch: char, callbacks: &mut Callbacks) {
        self.buf.insert(self.position, ch);
        self.position += 1;
        self.modified_sync(callbacks);
    }

    pub fn erase_previous_character(&mut self, callbacks: &mut Callbacks) {
        if self.position == 0 {
            return;
        }
        self.buf.erase(self.position - 1..self.position);
        self.position -= 1;
        self.modified_sync(callbacks);
    }

    pub fn erase_current_character(&mut self, callbacks: &mut Callbacks) {
        if self.position == self.buf.len() {
            return;
        }
        self.buf.erase(self.position..self.position + 1);
        self.modified_sync(callbacks);
    }

    pub fn erase_line_backward(&mut self, callbacks: &mut Callbacks) {
        self.buf.erase(0..self.position);
        self.position = 0;
        self.modified_sync(callbacks);
    }

    pub fn erase_line_forward(&mut self, callbacks: &mut Callbacks) {
        self.buf.erase(self.position..self.buf.len());
        self.modified_sync(callbacks);
    }

    /// Swap the code point at the cursor with its predecessor; at the end of
    /// the line, swap the last two. The cursor ends up one past the swap.
    pub fn swap_characters(&mut self, callbacks: &mut Callbacks) {
        if self.position == 0 || self.buf.len() < 2 {
            return;
        }

        if self.position == self.buf.len() {
            self.position -= 1;
        }

        self.buf.swap(self.position, self.position - 1);
        self.position += 1;
        self.modified_sync(callbacks);
    }

    /// Erase back over trailing spaces, then the word before them.
    pub fn erase_previous_word(&mut self, callbacks: &mut Callbacks) {
        if self.position == 0 {
            return;
        }

        let chars = self.buf.chars();
        let mut i = self.position - 1;
        while i > 0 && chars[i] == ' ' {
            i -= 1;
        }
        while i > 0 && chars[i] != ' ' {
            i -= 1;
        }
        let erase_start = if i == 0 { 0 } else { i + 1 };

        self.buf.erase(erase_start..self.position);
        self.position = erase_start;
        self.modified_sync(callbacks);
    }

    pub fn set_line(&mut self, text: &str, callbacks: &mut Callbacks) {
        self.buf = StyledText::from_str(text);
        self.position = self.buf.len();
        self.modified_sync(callbacks);
    }

    /// Commit: drop the hint, settle the frame, and move to a fresh line.
    pub fn pop_line(&mut self) -> String {
        self.popped = true;
        self.hint = StyledText::new();
        self.sync();
        self.gate.push_str("\r\n");
        self.gate.flush(&mut self.sink);
        self.buf.to_string()
    }

    /// Enter on an empty buffer: fresh line, same prompt.
    pub fn new_line(&mut self) {
        self.gate.push_str("\r\n");
        self.view.reset_frame();
        self.sync();
    }

    pub fn clear_screen(&mut self) {
        self.gate.push_str("\x1b[2J\x1b[1;1H");
        self.view.reset_frame();
        self.sync();
    }

    /// Wipe the visible row without touching render state. Callers are
    /// expected to follow up with [`LineSession::redraw`].
    pub fn erase_line_visual(&mut self) {
        self.gate.push_str("\r\x1b[2K");
        self.gate.flush(&mut self.sink);
    }

    pub fn redraw(&mut self) {
        self.view.reset_frame();
        self.sync();
    }

    fn modified_sync(&mut self, callbacks: &mut Callbacks) {
        if !self.masked {
            if let Some(hint_cb) = callbacks.hint.as_mut() {
                let hint = hint_cb(&self.current_line());
                self.hint = StyledText::with_style(&hint, self.hint_style);
            }

            if let Some(color_cb) = callbacks.color.as_mut() {
                let text = self.current_line();
                let mut styles = vec![Style::default(); self.buf.len()];
                {
                    let mut writer = StyleWriter::new(text.as_bytes(), &mut styles);
                    color_cb(&text, &mut writer);
                }
                self.buf.set_styles(styles);
            }
        }

        self.sync();
    }

    fn sync(&mut self) {
        self.view
            .sync(&self.buf, &self.hint, self.position, self.masked, &mut self.gate);
        self.gate.flush(&mut self.sink);
    }
}

impl<S: TermSink> Drop for LineSession<S> {
    fn drop(&mut self) {
        if !self.popped {
            self.gate.push_str("\r\x1b[2K");
            self.gate.flush(&mut self.sink);
        }
    }
}
