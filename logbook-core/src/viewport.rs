//! Scrollable, searchable text viewport.
//!
//! The viewport owns the accumulated log text of the selected stream, the
//! visible window into it and the keyword matches. It knows nothing about
//! drawing: a renderer asks for [`Viewport::visible_rows`] and styles the match
//! segments it gets back.
//!
//! Match positions are kept in character offsets over the whole content
//! (lines joined by `\n`). Columns are display columns, so wide characters
//! count for two cells and highlights stay aligned with the cursor math.

use std::collections::VecDeque;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const TAB: &str = "    ";

/// One keyword occurrence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Match {
    /// Character offset into the full content.
    pub offset: usize,
    pub row: usize,
    /// Character index within the row.
    pub char_col: usize,
    /// Display column within the row.
    pub col: usize,
}

/// A highlighted span inside a visible row, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchSegment {
    pub start: usize,
    pub len: usize,
    pub active: bool,
}

#[derive(Debug)]
pub struct VisibleRow<'a> {
    pub row: usize,
    pub text: &'a str,
    pub matches: Vec<MatchSegment>,
}

#[derive(Debug, Default)]
pub struct Viewport {
    lines: VecDeque<String>,
    /// Characters in the content, counting one per line separator.
    total_chars: usize,
    content_width: usize,
    max_lines: Option<usize>,

    view_width: usize,
    view_height: usize,
    x: usize,
    y: usize,
    follow: bool,

    keyword: String,
    keyword_chars: usize,
    matches: Vec<Match>,
    active: Option<usize>,
}

impl Viewport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `max_lines` lines; older lines are dropped on append.
    pub fn with_max_lines(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines.max(1));
        self
    }

    // ========== Content ==========

    /// Append a batch of lines. The window only moves when following.
    pub fn append_lines<I>(&mut self, batch: I)
    where
        I: IntoIterator<Item = String>,
    {
        for raw in batch {
            for line in raw.split('\n') {
                let line = line.strip_suffix('\r').unwrap_or(line).replace('\t', TAB);
                self.push_line(line);
            }
        }
        self.enforce_cap();

        if self.follow {
            self.y = self.max_y();
        }
        self.clamp();
    }

    fn push_line(&mut self, line: String) {
        let start = if self.lines.is_empty() {
            0
        } else {
            self.total_chars + 1
        };
        let row = self.lines.len();
        if self.keyword_chars > 0 {
            let found = find_in_line(&line, &self.keyword, row, start);
            self.matches.extend(found);
        }
        self.total_chars = start + line.chars().count();
        self.content_width = self.content_width.max(line.width());
        self.lines.push_back(line);
    }

    fn enforce_cap(&mut self) {
        let Some(cap) = self.max_lines else {
            return;
        };
        if self.lines.len() <= cap {
            return;
        }

        let dropped_rows = self.lines.len() - cap;
        let mut dropped_chars = 0;
        for line in self.lines.drain(..dropped_rows) {
            dropped_chars += line.chars().count() + 1;
        }
        self.total_chars -= dropped_chars;
        self.content_width = self.lines.iter().map(|l| l.width()).max().unwrap_or(0);

        let dropped_matches = self.matches.partition_point(|m| m.row < dropped_rows);
        self.matches.drain(..dropped_matches);
        for m in &mut self.matches {
            m.row -= dropped_rows;
            m.offset -= dropped_chars;
        }
        self.active = self
            .active
            .and_then(|i| i.checked_sub(dropped_matches));
        self.y = self.y.saturating_sub(dropped_rows);
    }

    /// Drop all content, the keyword and its matches.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.total_chars = 0;
        self.content_width = 0;
        self.keyword.clear();
        self.keyword_chars = 0;
        self.matches.clear();
        self.active = None;
        self.x = 0;
        self.y = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// `(width, height)` of the content in cells.
    pub fn content_size(&self) -> (usize, usize) {
        (self.content_width, self.lines.len())
    }

    // ========== Window ==========

    pub fn resize(&mut self, width: usize, height: usize) {
        self.view_width = width;
        self.view_height = height;
        if self.follow {
            self.y = self.max_y();
        }
        self.clamp();
    }

    pub fn view_size(&self) -> (usize, usize) {
        (self.view_width, self.view_height)
    }

    /// Top-left `(x, y)` of the visible window.
    pub fn offset(&self) -> (usize, usize) {
        (self.x, self.y)
    }

    fn max_y(&self) -> usize {
        self.lines.len().saturating_sub(self.view_height)
    }

    fn max_x(&self) -> usize {
        self.content_width.saturating_sub(self.view_width)
    }

    fn clamp(&mut self) {
        self.y = self.y.min(self.max_y());
        self.x = self.x.min(self.max_x());
    }

    fn half_height(&self) -> usize {
        (self.view_height / 2).max(1)
    }

    // ========== Follow mode ==========

    pub fn is_following(&self) -> bool {
        self.follow
    }

    /// Turning follow on jumps to the bottom; turning it off keeps the window.
    pub fn set_follow(&mut self, follow: bool) {
        self.follow = follow;
        if follow {
            self.y = self.max_y();
        }
    }

    pub fn toggle_follow(&mut self) -> bool {
        self.set_follow(!self.follow);
        self.follow
    }

    // ========== Scrolling ==========
    //
    // Manual scrolling is ignored while following; each method reports
    // whether it was applied.

    pub fn scroll_up(&mut self, n: usize) -> bool {
        if self.follow {
            return false;
        }
        self.y = self.y.saturating_sub(n);
        true
    }

    pub fn scroll_down(&mut self, n: usize) -> bool {
        if self.follow {
            return false;
        }
        self.y = self.y.saturating_add(n).min(self.max_y());
        true
    }

    pub fn scroll_half_page_up(&mut self) -> bool {
        self.scroll_up(self.half_height())
    }

    pub fn scroll_half_page_down(&mut self) -> bool {
        self.scroll_down(self.half_height())
    }

    pub fn scroll_page_up(&mut self) -> bool {
        self.scroll_up(self.view_height.max(1))
    }

    pub fn scroll_page_down(&mut self) -> bool {
        self.scroll_down(self.view_height.max(1))
    }

    pub fn scroll_half_page_left(&mut self) -> bool {
        if self.follow {
            return false;
        }
        self.x = self.x.saturating_sub((self.view_width / 2).max(1));
        true
    }

    pub fn scroll_half_page_right(&mut self) -> bool {
        if self.follow {
            return false;
        }
        self.x = self
            .x
            .saturating_add((self.view_width / 2).max(1))
            .min(self.max_x());
        true
    }

    pub fn scroll_to_top(&mut self) -> bool {
        if self.follow {
            return false;
        }
        self.y = 0;
        true
    }

    pub fn scroll_to_bottom(&mut self) -> bool {
        if self.follow {
            return false;
        }
        self.y = self.max_y();
        true
    }

    /// Move the window so that `(col, row)` sits in its middle.
    fn center(&mut self, col: usize, row: usize) {
        self.y = row.saturating_sub(self.view_height / 2);
        self.x = col.saturating_sub(self.view_width / 2);
        self.clamp();
    }

    /// Vertical position as a percentage. Zero when everything fits.
    pub fn scroll_percent(&self) -> u16 {
        let max_y = self.max_y();
        if max_y == 0 {
            return 0;
        }
        (self.y.min(max_y) * 100 / max_y) as u16
    }

    // ========== Search ==========

    /// Replace the keyword and recompute every match. Only the first line of
    /// `keyword` is used. Clears the active match.
    pub fn set_keyword(&mut self, keyword: &str) {
        let keyword = keyword.lines().next().unwrap_or("");
        self.keyword = keyword.to_string();
        self.keyword_chars = keyword.chars().count();
        self.active = None;
        self.matches.clear();
        if self.keyword_chars == 0 {
            return;
        }

        let mut start = 0;
        for (row, line) in self.lines.iter().enumerate() {
            self.matches
                .extend(find_in_line(line, &self.keyword, row, start));
            start += line.chars().count() + 1;
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn active_match(&self) -> Option<usize> {
        self.active
    }

    /// Display position `(col, row)` of match `index`.
    pub fn highlight_pos(&self, index: usize) -> Option<(usize, usize)> {
        self.matches.get(index).map(|m| (m.col, m.row))
    }

    /// Activate the next match, wrapping to the first. False with no matches.
    pub fn find_next(&mut self) -> bool {
        let count = self.matches.len();
        if count == 0 {
            return false;
        }
        let next = match self.active {
            Some(i) if i + 1 < count => i + 1,
            _ => 0,
        };
        self.activate(next);
        true
    }

    /// Activate the previous match, wrapping to the last. False with no matches.
    pub fn find_prev(&mut self) -> bool {
        let count = self.matches.len();
        if count == 0 {
            return false;
        }
        let prev = match self.active {
            Some(i) if i > 0 => i - 1,
            _ => count - 1,
        };
        self.activate(prev);
        true
    }

    fn activate(&mut self, index: usize) {
        self.active = Some(index);
        if self.follow {
            return;
        }
        let m = self.matches[index];
        self.center(m.col, m.row);
    }

    // ========== Rendering ==========

    /// Rows inside the window, with the match segments that fall on them.
    pub fn visible_rows(&self) -> Vec<VisibleRow<'_>> {
        let end = (self.y + self.view_height).min(self.lines.len());
        let mut next_match = self.matches.partition_point(|m| m.row < self.y);

        (self.y..end)
            .map(|row| {
                let mut segments = Vec::new();
                while let Some(m) = self.matches.get(next_match) {
                    if m.row != row {
                        break;
                    }
                    segments.push(MatchSegment {
                        start: m.char_col,
                        len: self.keyword_chars,
                        active: self.active == Some(next_match),
                    });
                    next_match += 1;
                }
                VisibleRow {
                    row,
                    text: &self.lines[row],
                    matches: segments,
                }
            })
            .collect()
    }
}

/// Non-overlapping occurrences of `keyword` in `line`.
fn find_in_line(line: &str, keyword: &str, row: usize, line_start: usize) -> Vec<Match> {
    let mut found = Vec::new();
    let mut chars_seen = 0;
    let mut cols_seen = 0;
    let mut bytes_seen = 0;

    for (byte_idx, _) in line.match_indices(keyword) {
        for c in line[bytes_seen..byte_idx].chars() {
            chars_seen += 1;
            cols_seen += c.width().unwrap_or(0);
        }
        bytes_seen = byte_idx;
        found.push(Match {
            offset: line_start + chars_seen,
            row,
            char_col: chars_seen,
            col: cols_seen,
        });
    }
    found
}
