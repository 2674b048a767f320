//! Colors, styles, and SGR escape assembly.

use std::fmt::Write as _;

use crate::core::utf8::is_continuation_byte;

/// A terminal color: unset, a 256-palette index, or 24-bit RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Color {
    #[default]
    None,
    Indexed(u8),
    Rgb(u8, u8, u8),
}

impl Color {
    pub const BLACK: Color = Color::Indexed(0);
    pub const RED: Color = Color::Indexed(1);
    pub const GREEN: Color = Color::Indexed(2);
    pub const YELLOW: Color = Color::Indexed(3);
    pub const BLUE: Color = Color::Indexed(4);
    pub const MAGENTA: Color = Color::Indexed(5);
    pub const CYAN: Color = Color::Indexed(6);
    pub const WHITE: Color = Color::Indexed(7);
    pub const GRAY: Color = Color::Indexed(8);
    pub const BRIGHT_RED: Color = Color::Indexed(9);
    pub const BRIGHT_GREEN: Color = Color::Indexed(10);
    pub const BRIGHT_YELLOW: Color = Color::Indexed(11);
    pub const BRIGHT_BLUE: Color = Color::Indexed(12);
    pub const BRIGHT_MAGENTA: Color = Color::Indexed(13);
    pub const BRIGHT_CYAN: Color = Color::Indexed(14);
    pub const BRIGHT_WHITE: Color = Color::Indexed(15);
}

/// Per-code-point display attributes. The default value doubles as the
/// terminal's implicit reset state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Style {
    pub bold: bool,
    pub fg: Color,
    pub bg: Color,
}

impl Style {
    pub fn is_plain(&self) -> bool {
        *self == Style::default()
    }

    /// The escape that moves the terminal from `from` to `self`.
    ///
    /// Empty when the styles already match; otherwise a single `CSI 0;…m`
    /// that resets and re-applies every attribute, so emission never depends
    /// on which attribute changed.
    pub fn switch_from(&self, from: Style) -> String {
        if *self == from {
            return String::new();
        }

        let mut out = String::from("\x1b[0");
        if self.bold {
            out.push_str(";1");
        }
        match self.fg {
            Color::None => {}
            Color::Indexed(n) => {
                let _ = write!(out, ";38;5;{n}");
            }
            Color::Rgb(r, g, b) => {
                let _ = write!(out, ";38;2;{r};{g};{b}");
            }
        }
        match self.bg {
            Color::None => {}
            Color::Indexed(n) => {
                let _ = write!(out, ";48;5;{n}");
            }
            Color::Rgb(r, g, b) => {
                let _ = write!(out, ";48;2;{r};{g};{b}");
            }
        }
        out.push('m');
        out
    }
}

/// Writable cursor over a line's per-code-point styles.
///
/// Colorization callbacks receive the line as a UTF-8 string; this cursor
/// lets them walk it byte by byte while style slots stay aligned with code
/// points: `advance` moves the slot only when the byte it lands on is not a
/// continuation byte.
pub struct StyleWriter<'a> {
    bytes: &'a [u8],
    byte_pos: usize,
    slot: usize,
    styles: &'a mut [Style],
}

impl<'a> StyleWriter<'a> {
    pub(crate) fn new(bytes: &'a [u8], styles: &'a mut [Style]) -> Self {
        Self {
            bytes,
            byte_pos: 0,
            slot: 0,
            styles,
        }
    }

    /// Assign a style to the code point under the cursor.
    pub fn set(&mut self, style: Style) {
        if self.slot < self.styles.len() {
            self.styles[self.slot] = style;
        }
    }

    /// Step one byte forward.
    pub fn advance(&mut self) {
        self.byte_pos += 1;
        if self.byte_pos >= self.bytes.len() || !is_continuation_byte(self.bytes[self.byte_pos]) {
            self.slot += 1;
        }
    }

    pub fn advance_by(&mut self, n: usize) {
        for _ in 0..n {
            self.advance();
        }
    }

    /// Style every code point that starts inside the given byte range.
    pub fn set_span(&mut self, range: std::ops::Range<usize>, style: Style) {
        let mut slot = 0;
        for (pos, &byte) in self.bytes.iter().enumerate() {
            if is_continuation_byte(byte) {
                continue;
            }
            if pos >= range.end {
                break;
            }
            if pos >= range.start && slot < self.styles.len() {
                self.styles[slot] = style;
            }
            slot += 1;
        }
    }
}
