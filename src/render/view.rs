//! Width-aware viewport and minimal escape diffing.
//!
//! `TermView` turns the target line (prompt + visible buffer slice + hint)
//! into the smallest escape stream that makes the terminal match, given the
//! frame it rendered last. Diffing walks both frames by display column, not
//! code-point index, so narrow and wide glyphs can replace each other.

use std::fmt::Write as _;

use crate::core::style::Style;
use crate::core::text::StyledText;
use crate::render::output::OutputGate;

/// The exact frame last written to the terminal plus the column the cursor
/// was left on.
#[derive(Debug, Clone, Default)]
struct RenderedFrame {
    text: StyledText,
    column: usize,
}

#[derive(Debug)]
pub struct TermView {
    /// Columns available to the buffer, prompt excluded.
    budget: usize,
    prompt: StyledText,
    view_start: usize,
    prev: RenderedFrame,
    /// Style the terminal is currently left in.
    current_style: Style,
}

impl TermView {
    /// `term_columns` is the full terminal width; `None` when the size query
    /// failed, which falls back to an 80-column assumption.
    pub fn new(term_columns: Option<usize>, prompt: StyledText) -> Self {
        let prompt_width = prompt.total_width();
        let budget = match term_columns {
            Some(columns) if columns > 0 => columns.saturating_sub(prompt_width + 1),
            _ => 79usize.saturating_sub(prompt_width),
        };

        Self {
            budget,
            prompt,
            view_start: 0,
            prev: RenderedFrame::default(),
            current_style: Style::default(),
        }
    }

    pub fn prompt_width(&self) -> usize {
        self.prompt.total_width()
    }

    /// Forget the last rendered frame so the next sync rewrites everything
    /// from column 0.
    pub fn reset_frame(&mut self) {
        self.prev = RenderedFrame::default();
    }

    /// Emit whatever is needed to make the terminal show `buf` (and `hint`,
    /// when the buffer is fully visible) with the cursor on `position`.
    pub fn sync(
        &mut self,
        buf: &StyledText,
        hint: &StyledText,
        position: usize,
        masked: bool,
        gate: &mut OutputGate,
    ) {
        let mask_widths;
        let widths: &[u8] = if masked {
            mask_widths = vec![1u8; buf.len()];
            &mask_widths
        } else {
            buf.widths()
        };

        if position < self.view_start {
            self.view_start = position;
        }

        let (fwd_end, fwd_width) = scan_forward(widths, self.view_start, self.budget);
        let end;
        let visible_width;
        if position > fwd_end {
            // Cursor sits right of the viewport: anchor the view to it.
            let (start, back_width) = scan_backward(widths, position, self.budget);
            self.view_start = start;
            end = position;
            visible_width = back_width;
        } else {
            // Use leftover budget to pull the view left without scrolling.
            let (start, back_width) =
                scan_backward(widths, self.view_start, self.budget - fwd_width);
            self.view_start = start;
            end = fwd_end;
            visible_width = fwd_width + back_width;
        }

        let column = self.prompt.total_width()
            + widths[self.view_start..position]
                .iter()
                .map(|&w| usize::from(w))
                .sum::<usize>();

        let mut frame = self.prompt.clone();
        if masked {
            let stars = "*".repeat(end - self.view_start);
            frame.push_run(&stars, Style::default());
        } else {
            frame.extend(&buf.substr(self.view_start..end));
        }

        if end == buf.len() && !masked {
            let (hint_end, _) = scan_forward(hint.widths(), 0, self.budget - visible_width);
            if hint_end > 0 {
                frame.extend(&hint.substr(0..hint_end));
            }
        }

        self.emit(frame, column, gate);
    }

    fn emit(&mut self, next: StyledText, target_column: usize, gate: &mut OutputGate) {
        let prev = &self.prev.text;

        let mut i = 0usize;
        let mut j = 0usize;
        let mut i_col = 0usize;
        let mut j_col = 0usize;
        let mut start_update = 0usize;
        let mut start_col = 0usize;
        let mut end_update: Option<usize> = None;
        let mut end_col = 0usize;
        let mut first = true;

        while i < next.len() && j < prev.len() {
            if i_col == j_col {
                if next.chars()[i] != prev.chars()[j] || next.styles()[i] != prev.styles()[j] {
                    if first {
                        first = false;
                        start_update = i;
                        start_col = i_col;
                    }
                    end_update = Some(i);
                    end_col = i_col + usize::from(next.widths()[i]);
                }
                i_col += usize::from(next.widths()[i]);
                j_col += usize::from(prev.widths()[j]);
                i += 1;
                j += 1;
            } else if i_col > j_col {
                j_col += usize::from(prev.widths()[j]);
                j += 1;
            } else {
                if first {
                    first = false;
                    start_update = i;
                    start_col = i_col;
                }
                end_update = Some(i);
                end_col = i_col + usize::from(next.widths()[i]);
                i_col += usize::from(next.widths()[i]);
                i += 1;
            }
        }

        if i < next.len() {
            // The new frame extends past the old one.
            if first {
                start_update = i;
                start_col = i_col;
            }
            end_update = Some(next.len() - 1);
            end_col = next.total_width();
        }

        let mut current_column = self.prev.column;

        if let Some(end_update) = end_update {
            move_cursor(gate, &mut current_column, start_col);

            let chars = &next.chars()[start_update..=end_update];
            let styles = &next.styles()[start_update..=end_update];
            let mut idx = 0;
            loop {
                let run_end = styles[idx..]
                    .iter()
                    .position(|style| *style != self.current_style)
                    .map(|offset| idx + offset)
                    .unwrap_or(chars.len());
                for &ch in &chars[idx..run_end] {
                    gate.push_char(ch);
                }
                if run_end == chars.len() {
                    break;
                }
                gate.push_str(&styles[run_end].switch_from(self.current_style));
                self.current_style = styles[run_end];
                idx = run_end;
            }

            current_column = end_col;
            gate.push_str(&Style::default().switch_from(self.current_style));
            self.current_style = Style::default();
        }

        if j < prev.len() {
            // The line got shorter: clear what the old frame left behind.
            move_cursor(gate, &mut current_column, next.total_width());
            gate.push_str("\x1b[K");
        }

        move_cursor(gate, &mut current_column, target_column);

        self.prev = RenderedFrame {
            text: next,
            column: target_column,
        };
    }
}

fn move_cursor(gate: &mut OutputGate, current: &mut usize, column: usize) {
    if column > *current {
        let mut esc = String::new();
        let _ = write!(esc, "\x1b[{}C", column - *current);
        gate.push_str(&esc);
    } else if column < *current {
        let mut esc = String::new();
        let _ = write!(esc, "\x1b[{}D", *current - column);
        gate.push_str(&esc);
    }
    *current = column;
}

/// Consume code points forward from `start` while their widths fit in
/// `max_width`; returns the end index and the width consumed.
fn scan_forward(widths: &[u8], start: usize, max_width: usize) -> (usize, usize) {
    let mut i = start;
    let mut w = 0usize;
    while i < widths.len() && w + usize::from(widths[i]) <= max_width {
        w += usize::from(widths[i]);
        i += 1;
    }
    (i, w)
}

/// Consume code points backward from `start`; returns the new start index
/// and the width consumed.
fn scan_backward(widths: &[u8], start: usize, max_width: usize) -> (usize, usize) {
    let mut i = start;
    let mut w = 0usize;
    while i >= 1 && w + usize::from(widths[i - 1]) <= max_width {
        w += usize::from(widths[i - 1]);
        i -= 1;
    }
    (i, w)
}
