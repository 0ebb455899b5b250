//! Cursor and scroll state over the wrapped rows of one rendered document.
//!
//! `scroll` is the first visible row and `selected` is relative to it, so
//! the absolute selection is `scroll + selected`. Every mutation keeps
//! `scroll <= total.saturating_sub(height)` and
//! `selected < min(height, total)` (0 when nothing is visible).

use crate::clipboard::Clipboard;
use crate::copy::CopyError;
use crate::copy::CopyMode;
use crate::copy::clean_selection;
use crate::highlight::next_lines_to_highlight;
use crate::wrap::WrappedLine;
use crate::wrap::layout;
use crate::wrap::source_slice;
use std::ops::RangeInclusive;
use tracing::debug;

#[derive(Debug, Clone, Default)]
pub struct Navigator {
    text: String,
    lines: Vec<WrappedLine>,
    width: usize,
    window_height: usize,
    scroll: usize,
    selected: usize,
}

impl Navigator {
    pub fn new(width: usize, window_height: usize) -> Self {
        Self {
            width,
            window_height,
            ..Self::default()
        }
    }

    /// Shows `text` from the top.
    pub fn open(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.relayout();
        self.scroll = 0;
        self.selected = 0;
    }

    /// Replaces the text but keeps the cursor where it was, clamped to the
    /// new content.
    pub fn reload(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.relayout();
        self.clamp();
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn lines(&self) -> &[WrappedLine] {
        &self.lines
    }

    pub fn visible_lines(&self) -> &[WrappedLine] {
        let start = self.scroll.min(self.lines.len());
        let end = (start + self.window_height).min(self.lines.len());
        &self.lines[start..end]
    }

    pub fn scroll(&self) -> usize {
        self.scroll
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    /// Selected row as an index into [`Navigator::lines`].
    pub fn selected_line(&self) -> usize {
        self.scroll + self.selected
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn window_height(&self) -> usize {
        self.window_height
    }

    fn end(&self) -> usize {
        self.lines.len().saturating_sub(self.window_height)
    }

    fn visible_rows(&self) -> usize {
        self.window_height.min(self.lines.len())
    }

    pub fn move_down(&mut self) {
        if self.selected + 1 < self.visible_rows() {
            self.selected += 1;
        } else if self.scroll < self.end() {
            self.scroll += 1;
        }
    }

    pub fn move_up(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        } else if self.scroll > 0 {
            self.scroll -= 1;
        }
    }

    pub fn move_to_top(&mut self) {
        self.scroll = 0;
        self.selected = 0;
    }

    pub fn move_to_bottom(&mut self) {
        self.scroll = self.end();
        self.selected = self.visible_rows().saturating_sub(1);
    }

    /// Selects absolute row `line`, scrolling as little as possible to show
    /// it. Rows past the end select the last row.
    pub fn select(&mut self, line: usize) {
        let target = line.min(self.lines.len().saturating_sub(1));
        if target < self.scroll {
            self.scroll = target;
        } else if self.window_height > 0 && target >= self.scroll + self.window_height {
            self.scroll = target + 1 - self.window_height;
        }
        self.scroll = self.scroll.min(self.end());
        self.selected = target.saturating_sub(self.scroll);
        self.clamp();
    }

    /// Scrolls one window down; once the last page is showing, moves the
    /// selection to the last row instead.
    pub fn page_down(&mut self) {
        let end = self.end();
        if self.scroll < end {
            self.scroll = (self.scroll + self.window_height).min(end);
        } else {
            self.selected = self.visible_rows().saturating_sub(1);
        }
    }

    pub fn page_up(&mut self) {
        if self.scroll > 0 {
            self.scroll = self.scroll.saturating_sub(self.window_height);
        } else {
            self.selected = 0;
        }
    }

    /// Re-wraps for a new viewport, keeping the selected source line in
    /// view.
    pub fn resize(&mut self, width: usize, window_height: usize) {
        let anchor = self.lines.get(self.selected_line()).map(|line| line.logical);
        self.width = width;
        self.window_height = window_height;
        self.relayout();

        match anchor.and_then(|logical| self.lines.iter().position(|line| line.logical == logical)) {
            Some(target) => self.select(target),
            None => self.clamp(),
        }
    }

    /// Absolute rows highlighted for the current selection.
    pub fn highlight_range(&self) -> Option<RangeInclusive<usize>> {
        let start = self.selected_line();
        if start >= self.lines.len() {
            return None;
        }
        let extra = next_lines_to_highlight(&self.lines, start);
        Some(start..=start + extra)
    }

    /// Highlighted source text, cleaned for copying.
    pub fn selection_text(&self, mode: CopyMode) -> Result<String, CopyError> {
        let range = self.highlight_range().ok_or(CopyError::NothingSelected)?;
        let source = source_slice(&self.text, &self.lines[range]);
        Ok(clean_selection(&source, mode))
    }

    /// Puts the highlighted text on `clipboard` and returns it.
    pub fn copy_selection(
        &self,
        mode: CopyMode,
        clipboard: &mut dyn Clipboard,
    ) -> Result<String, CopyError> {
        let text = self.selection_text(mode)?;
        clipboard.write(&text)?;
        debug!(chars = text.len(), ?mode, "copied selection");
        Ok(text)
    }

    fn relayout(&mut self) {
        self.lines = layout(&self.text, self.width);
        debug!(
            rows = self.lines.len(),
            width = self.width,
            "laid out document text"
        );
    }

    fn clamp(&mut self) {
        self.scroll = self.scroll.min(self.end());
        self.selected = self
            .selected
            .min(self.visible_rows().saturating_sub(1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::MemoryClipboard;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    fn numbered(count: usize) -> String {
        let body: Vec<String> = (0..count).map(|n| format!("  \"k{n}\": {n},")).collect();
        format!("{{\n{}\n}}", body.join("\n"))
    }

    fn navigator(rows: usize, height: usize) -> Navigator {
        let mut nav = Navigator::new(80, height);
        nav.open(numbered(rows - 2));
        assert_eq!(nav.lines().len(), rows);
        nav
    }

    #[test]
    fn moving_down_scrolls_at_the_window_edge() {
        let mut nav = navigator(10, 4);
        for _ in 0..3 {
            nav.move_down();
        }
        assert_eq!((nav.scroll(), nav.selected()), (0, 3));
        nav.move_down();
        assert_eq!((nav.scroll(), nav.selected()), (1, 3));
        for _ in 0..20 {
            nav.move_down();
        }
        assert_eq!((nav.scroll(), nav.selected()), (6, 3));
        assert_eq!(nav.selected_line(), 9);
    }

    #[test]
    fn moving_up_mirrors_moving_down() {
        let mut nav = navigator(10, 4);
        nav.move_to_bottom();
        nav.move_up();
        assert_eq!((nav.scroll(), nav.selected()), (6, 2));
        for _ in 0..20 {
            nav.move_up();
        }
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
    }

    #[test]
    fn bottom_then_top_returns_home() {
        let mut nav = navigator(10, 4);
        nav.move_to_bottom();
        assert_eq!((nav.scroll(), nav.selected()), (6, 3));
        nav.move_to_top();
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
    }

    #[test]
    fn content_shorter_than_window() {
        let mut nav = navigator(3, 10);
        nav.move_to_bottom();
        assert_eq!((nav.scroll(), nav.selected()), (0, 2));
        nav.move_down();
        assert_eq!((nav.scroll(), nav.selected()), (0, 2));
        assert_eq!(nav.visible_lines().len(), 3);
    }

    #[test]
    fn empty_document_pins_the_cursor() {
        let mut nav = Navigator::new(80, 5);
        nav.open("");
        nav.move_down();
        nav.move_to_bottom();
        nav.page_down();
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
        assert_eq!(nav.highlight_range(), None);
        assert_matches!(
            nav.selection_text(CopyMode::Full),
            Err(CopyError::NothingSelected)
        );
    }

    #[test]
    fn paging_is_clamped() {
        let mut nav = navigator(10, 4);
        nav.page_down();
        assert_eq!(nav.scroll(), 4);
        nav.page_down();
        assert_eq!(nav.scroll(), 6);
        nav.page_down();
        assert_eq!((nav.scroll(), nav.selected()), (6, 3));
        nav.page_up();
        assert_eq!(nav.scroll(), 2);
        nav.page_up();
        nav.page_up();
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
    }

    #[test]
    fn opening_resets_the_cursor() {
        let mut nav = navigator(10, 4);
        nav.move_to_bottom();
        nav.open(numbered(3));
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
    }

    #[test]
    fn reload_clamps_to_shorter_content() {
        let mut nav = navigator(10, 4);
        nav.move_to_bottom();
        nav.reload(numbered(1));
        assert_eq!((nav.scroll(), nav.selected()), (0, 2));
    }

    #[test]
    fn resize_keeps_the_selected_source_line_visible() {
        let mut nav = navigator(10, 4);
        nav.move_to_bottom();
        nav.move_up();
        let logical = nav.lines()[nav.selected_line()].logical;
        nav.resize(80, 2);
        assert_eq!(nav.lines()[nav.selected_line()].logical, logical);
        assert!(nav.selected() < 2);
        assert!(nav.scroll() <= nav.lines().len() - 2);

        nav.resize(80, 20);
        assert_eq!((nav.scroll(), nav.lines()[nav.selected_line()].logical), (0, logical));
    }

    #[test]
    fn select_scrolls_minimally() {
        let mut nav = navigator(10, 4);
        nav.select(5);
        assert_eq!((nav.scroll(), nav.selected()), (2, 3));
        nav.select(3);
        assert_eq!((nav.scroll(), nav.selected()), (2, 1));
        nav.select(0);
        assert_eq!((nav.scroll(), nav.selected()), (0, 0));
        nav.select(99);
        assert_eq!((nav.scroll(), nav.selected()), (6, 3));
    }

    #[test]
    fn highlight_and_copy_nested_object() {
        let mut nav = Navigator::new(80, 10);
        nav.open("{\n  \"object\": {\n    \"nested\": \"x\"\n  },\n  \"n\": 1\n}");
        nav.move_down();
        assert_eq!(nav.highlight_range(), Some(1..=3));

        let mut clipboard = MemoryClipboard::new();
        let copied = nav
            .copy_selection(CopyMode::Value, &mut clipboard)
            .expect("copy");
        assert_eq!(copied, r#"{ "nested": "x" }"#);
        assert_eq!(clipboard.contents(), Some(r#"{ "nested": "x" }"#));

        assert_eq!(
            nav.selection_text(CopyMode::Full).expect("copy"),
            r#""object": { "nested": "x" }"#
        );
    }

    #[test]
    fn copy_across_wrap_points_uses_the_source_text() {
        let mut nav = Navigator::new(14, 10);
        nav.open("{\n  \"note\": \"one two  three four\",\n  \"n\": 1\n}");
        nav.move_down();
        let range = nav.highlight_range().expect("range");
        assert!(range.end() > range.start(), "value should wrap: {:?}", nav.lines());
        assert_eq!(
            nav.selection_text(CopyMode::Value).expect("copy"),
            r#""one two  three four""#
        );
    }
}
