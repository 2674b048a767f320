//! Byte-exact escape stream assertions for the terminal view.

use lineflow::{Color, OutputGate, Style, StyledText, TermSink, TermView};

#[derive(Default)]
struct Captured(String);

impl TermSink for Captured {
    fn write(&mut self, data: &str) {
        self.0.push_str(data);
    }
}

fn sync(
    view: &mut TermView,
    buf: &StyledText,
    hint: &StyledText,
    position: usize,
    masked: bool,
) -> String {
    let mut gate = OutputGate::new();
    let mut sink = Captured::default();
    view.sync(buf, hint, position, masked, &mut gate);
    gate.flush(&mut sink);
    sink.0
}

#[test]
fn wide_glyphs_scroll_by_columns_not_code_points() {
    // 8 columns, "> " prompt: 5 columns of budget.
    let mut view = TermView::new(Some(8), StyledText::from_str("> "));
    let hint = StyledText::new();
    let buf = StyledText::from_str("漢字測");

    // Only the last two ideographs (4 columns) fit with the cursor at the end.
    assert_eq!(sync(&mut view, &buf, &hint, 3, false), "> 字測");
}

#[test]
fn combining_marks_take_no_columns() {
    let mut view = TermView::new(Some(80), StyledText::from_str("> "));
    let hint = StyledText::new();
    let buf = StyledText::from_str("e\u{0301}x");

    // Three code points, two columns; cursor past 'x' lands on column 4.
    assert_eq!(sync(&mut view, &buf, &hint, 3, false), "> e\u{0301}x");
    assert_eq!(sync(&mut view, &buf, &hint, 1, false), "\x1b[1D");
}

#[test]
fn styled_prompt_runs_switch_and_reset() {
    let mut prompt = StyledText::new();
    prompt.push_run(
        "db",
        Style {
            bold: true,
            fg: Color::GREEN,
            bg: Color::None,
        },
    );
    prompt.push_run("> ", Style::default());

    let mut view = TermView::new(Some(80), prompt);
    let buf = StyledText::new();
    let hint = StyledText::new();

    assert_eq!(
        sync(&mut view, &buf, &hint, 0, false),
        "\x1b[0;1;38;5;2mdb\x1b[0m> "
    );
}

#[test]
fn hint_carries_its_own_style() {
    let mut view = TermView::new(Some(80), StyledText::from_str("> "));
    let buf = StyledText::from_str("gi");
    let hint = StyledText::with_style(
        "t",
        Style {
            bold: false,
            fg: Color::GRAY,
            bg: Color::None,
        },
    );

    assert_eq!(
        sync(&mut view, &buf, &hint, 2, false),
        "> gi\x1b[0;38;5;8mt\x1b[0m\x1b[1D"
    );
}

#[test]
fn shrinking_buffer_clears_stale_hint_columns() {
    let mut view = TermView::new(Some(80), StyledText::from_str("> "));
    let buf = StyledText::from_str("ab");
    let hint = StyledText::from_str("cd");
    sync(&mut view, &buf, &hint, 2, false);

    // The hint disappears: everything past the buffer is cleared.
    let no_hint = StyledText::new();
    assert_eq!(
        sync(&mut view, &buf, &no_hint, 2, false),
        "\x1b[K"
    );
}

#[test]
fn cursor_left_of_viewport_pulls_the_view_back() {
    // 6 columns, "> " prompt: 3 columns of budget.
    let mut view = TermView::new(Some(6), StyledText::from_str("> "));
    let hint = StyledText::new();
    let buf = StyledText::from_str("abcdef");

    assert_eq!(sync(&mut view, &buf, &hint, 6, false), "> def");
    // Jump home: the view follows and rewrites from the prompt edge.
    assert_eq!(sync(&mut view, &buf, &hint, 0, false), "\x1b[3Dabc\x1b[3D");
}

#[test]
fn resync_of_an_identical_frame_is_silent() {
    let mut view = TermView::new(Some(80), StyledText::from_str("$ "));
    let hint = StyledText::from_str("int");
    let mut buf = StyledText::from_str("pr");
    buf.style_mut()[0] = Style {
        bold: false,
        fg: Color::CYAN,
        bg: Color::None,
    };

    let first = sync(&mut view, &buf, &hint, 2, false);
    assert!(!first.is_empty());
    assert_eq!(sync(&mut view, &buf, &hint, 2, false), "");
}
