// Copyright (C) 2025  Tom Waddington
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published
// by the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Text documents backed by a rope

use anyhow::{Context, Result};
use ropey::Rope;
use std::path::{Path, PathBuf};

use crate::host::Reveal;
use crate::types::{Position, Selection};

pub struct Document {
    text: Rope,
    path: Option<PathBuf>,
    dirty: bool,
    pub selection: Selection,
    // First line shown in the view
    pub scroll_top: usize,
}

impl Document {
    pub fn from_text(text: &str) -> Self {
        Self {
            text: Rope::from_str(text),
            path: None,
            dirty: false,
            selection: Selection::default(),
            scroll_top: 0,
        }
    }

    pub async fn open(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mut document = Self::from_text(&text.replace("\r\n", "\n"));
        document.path = Some(path.to_path_buf());
        Ok(document)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn name(&self) -> String {
        self.path
            .as_ref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn text(&self) -> String {
        self.text.to_string()
    }

    pub fn line_count(&self) -> usize {
        self.text.len_lines()
    }

    pub fn line(&self, idx: usize) -> ropey::RopeSlice<'_> {
        self.text.line(idx)
    }

    pub fn line_len(&self, idx: usize) -> usize {
        // Length excluding newline character
        let line = self.text.line(idx);
        let len = line.len_chars();
        if len > 0 && line.char(len - 1) == '\n' {
            len - 1
        } else {
            len
        }
    }

    /// Pulls a position back inside the document.
    pub fn clamp(&self, pos: Position) -> Position {
        let line = pos.line.min(self.line_count() - 1);
        Position::new(line, pos.column.min(self.line_len(line)))
    }

    pub fn clamp_selection(&self, selection: Selection) -> Selection {
        Selection::new(self.clamp(selection.anchor), self.clamp(selection.active))
    }

    fn char_index(&self, pos: Position) -> usize {
        let pos = self.clamp(pos);
        self.text.line_to_char(pos.line) + pos.column
    }

    fn position_of(&self, idx: usize) -> Position {
        let line = self.text.char_to_line(idx);
        Position::new(line, idx - self.text.line_to_char(line))
    }

    /// Inserts `text` at `at`, carrying a caret that sits there along.
    pub fn insert(&mut self, at: Position, text: &str) -> Position {
        let idx = self.char_index(at);
        let caret_here = self.selection.is_empty() && self.char_index(self.selection.active) == idx;

        self.text.insert(idx, text);
        self.dirty = true;

        let end = self.position_of(idx + text.chars().count());
        if caret_here {
            self.selection = Selection::caret(end);
        }
        end
    }

    pub fn delete(&mut self, from: Position, to: Position) {
        let (start, end) = (self.char_index(from.min(to)), self.char_index(from.max(to)));
        if start < end {
            self.text.remove(start..end);
            self.dirty = true;
        }
        self.selection = Selection::caret(self.position_of(start));
    }

    pub async fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let Some(path) = &self.path else {
            return Ok(());
        };
        tokio::fs::write(path, self.text.to_string())
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.dirty = false;
        Ok(())
    }

    /// Adjusts `scroll_top` so that `line` is visible in `height` rows.
    pub fn reveal(&mut self, line: usize, reveal: Reveal, height: usize) {
        let height = height.max(1);
        let visible = line >= self.scroll_top && line < self.scroll_top + height;
        match reveal {
            Reveal::Default => {
                if line < self.scroll_top {
                    self.scroll_top = line;
                } else if !visible {
                    self.scroll_top = line + 1 - height;
                }
            }
            Reveal::InCenterIfOutsideViewport => {
                if !visible {
                    self.scroll_top = line.saturating_sub(height / 2);
                }
            }
        }
    }

    fn move_caret(&mut self, to: Position) {
        self.selection = Selection::caret(self.clamp(to));
    }

    pub fn cursor_home(&mut self) {
        let line = self.selection.active.line;
        self.move_caret(Position::new(line, 0));
    }

    pub fn cursor_end(&mut self) {
        let line = self.selection.active.line;
        self.move_caret(Position::new(line, usize::MAX));
    }

    pub fn cursor_up(&mut self) {
        let active = self.selection.active;
        self.move_caret(Position::new(active.line.saturating_sub(1), active.column));
    }

    pub fn cursor_down(&mut self) {
        let active = self.selection.active;
        self.move_caret(Position::new(active.line + 1, active.column));
    }

    pub fn cursor_left(&mut self) {
        let idx = self.char_index(self.selection.active);
        let to = self.position_of(idx.saturating_sub(1));
        self.move_caret(to);
    }

    pub fn cursor_right(&mut self) {
        let idx = self.char_index(self.selection.active);
        let to = self.position_of((idx + 1).min(self.text.len_chars()));
        self.move_caret(to);
    }

    pub fn cursor_top(&mut self) {
        self.move_caret(Position::new(0, 0));
    }

    pub fn cursor_bottom(&mut self) {
        self.move_caret(Position::new(usize::MAX, usize::MAX));
    }

    pub fn select_all(&mut self) {
        let end = self.clamp(Position::new(usize::MAX, usize::MAX));
        self.selection = Selection::new(Position::new(0, 0), end);
    }

    /// Deletes the selection, or the character before the caret.
    pub fn delete_left(&mut self) {
        if !self.selection.is_empty() {
            self.delete(self.selection.start(), self.selection.end());
            return;
        }
        let idx = self.char_index(self.selection.active);
        if idx > 0 {
            let from = self.position_of(idx - 1);
            self.delete(from, self.selection.active);
        }
    }

    /// Deletes the selection, or the character after the caret.
    pub fn delete_right(&mut self) {
        if !self.selection.is_empty() {
            self.delete(self.selection.start(), self.selection.end());
            return;
        }
        let idx = self.char_index(self.selection.active);
        if idx < self.text.len_chars() {
            let to = self.position_of(idx + 1);
            self.delete(self.selection.active, to);
        }
    }
}
