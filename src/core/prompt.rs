//! Styled prompt construction.

use crate::core::style::Style;
use crate::core::text::StyledText;

/// A prompt built from `{text, style}` runs.
///
/// ```
/// use lineflow::{Color, Style, StyledPrompt};
///
/// let prompt = StyledPrompt::new()
///     .style(Style { bold: true, fg: Color::GREEN, ..Style::default() })
///     .text("db")
///     .style(Style::default())
///     .text("> ");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StyledPrompt {
    text: StyledText,
    current: Style,
}

impl StyledPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a run rendered with the currently selected style.
    pub fn text(mut self, text: &str) -> Self {
        self.text.push_run(text, self.current);
        self
    }

    /// Select the style for subsequent runs.
    pub fn style(mut self, style: Style) -> Self {
        self.current = style;
        self
    }

    pub(crate) fn into_text(self) -> StyledText {
        self.text
    }
}

impl From<&str> for StyledPrompt {
    fn from(text: &str) -> Self {
        StyledPrompt::new().text(text)
    }
}

impl From<String> for StyledPrompt {
    fn from(text: String) -> Self {
        StyledPrompt::new().text(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::StyledPrompt;
    use crate::core::style::{Color, Style};

    #[test]
    fn runs_carry_the_selected_style() {
        let bold = Style {
            bold: true,
            fg: Color::BLUE,
            ..Style::default()
        };
        let prompt = StyledPrompt::new()
            .text("a")
            .style(bold)
            .text("bc")
            .into_text();

        assert_eq!(prompt.to_string(), "abc");
        assert_eq!(prompt.styles()[0], Style::default());
        assert_eq!(prompt.styles()[1], bold);
        assert_eq!(prompt.styles()[2], bold);
    }

    #[test]
    fn plain_strings_convert() {
        let prompt: StyledPrompt = "> ".into();
        let text = prompt.into_text();
        assert_eq!(text.to_string(), "> ");
        assert_eq!(text.total_width(), 2);
    }
}
