//! Code-point-indexed text with parallel width and style arrays.

use std::fmt;
use std::fmt::Write as _;
use std::ops::Range;

use unicode_width::UnicodeWidthChar;

use crate::core::style::Style;
use crate::core::utf8::encode_utf8;

/// Columns a code point occupies in a monospace terminal, clamped to {0,1,2}.
///
/// Control and combining marks take no columns; anything a width table calls
/// wider than two is treated as one so column arithmetic stays monotone.
pub fn scalar_width(ch: char) -> u8 {
    match UnicodeWidthChar::width(ch) {
        None => 0,
        Some(w) if w > 2 => 1,
        Some(w) => w as u8,
    }
}

/// The editable line representation: code points, per-position widths, and
/// per-position styles, with a cached total width.
///
/// The three arrays always share one length and the cache always equals the
/// sum of the width array; every mutation maintains both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyledText {
    chars: Vec<char>,
    widths: Vec<u8>,
    styles: Vec<Style>,
    total_width: usize,
}

impl StyledText {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(text: &str) -> Self {
        Self::with_style(text, Style::default())
    }

    pub fn with_style(text: &str, style: Style) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let widths: Vec<u8> = chars.iter().map(|&ch| scalar_width(ch)).collect();
        let total_width = widths.iter().map(|&w| usize::from(w)).sum();
        let styles = vec![style; chars.len()];
        Self {
            chars,
            widths,
            styles,
            total_width,
        }
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn total_width(&self) -> usize {
        self.total_width
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn widths(&self) -> &[u8] {
        &self.widths
    }

    pub fn styles(&self) -> &[Style] {
        &self.styles
    }

    /// Writable style array for colorization.
    pub fn style_mut(&mut self) -> &mut [Style] {
        &mut self.styles
    }

    /// Replace the style array wholesale; the replacement must match the
    /// current length.
    pub fn set_styles(&mut self, styles: Vec<Style>) {
        debug_assert_eq!(styles.len(), self.chars.len());
        if styles.len() == self.chars.len() {
            self.styles = styles;
        }
    }

    pub fn insert(&mut self, index: usize, ch: char) {
        let width = scalar_width(ch);
        self.chars.insert(index, ch);
        self.widths.insert(index, width);
        self.styles.insert(index, Style::default());
        self.total_width += usize::from(width);
    }

    pub fn erase(&mut self, range: Range<usize>) {
        let removed: usize = self.widths[range.clone()]
            .iter()
            .map(|&w| usize::from(w))
            .sum();
        self.total_width -= removed;
        self.chars.drain(range.clone());
        self.widths.drain(range.clone());
        self.styles.drain(range);
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        self.chars.swap(a, b);
        self.widths.swap(a, b);
        self.styles.swap(a, b);
    }

    pub fn substr(&self, range: Range<usize>) -> StyledText {
        let widths = self.widths[range.clone()].to_vec();
        let total_width = widths.iter().map(|&w| usize::from(w)).sum();
        StyledText {
            chars: self.chars[range.clone()].to_vec(),
            widths,
            styles: self.styles[range].to_vec(),
            total_width,
        }
    }

    pub fn extend(&mut self, other: &StyledText) {
        self.chars.extend_from_slice(&other.chars);
        self.widths.extend_from_slice(&other.widths);
        self.styles.extend_from_slice(&other.styles);
        self.total_width += other.total_width;
    }

    /// Append a run of text sharing one style.
    pub fn push_run(&mut self, text: &str, style: Style) {
        for ch in text.chars() {
            let width = scalar_width(ch);
            self.chars.push(ch);
            self.widths.push(width);
            self.styles.push(style);
            self.total_width += usize::from(width);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        encode_utf8(&self.chars)
    }
}

impl fmt::Display for StyledText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &ch in &self.chars {
            f.write_char(ch)?;
        }
        Ok(())
    }
}
