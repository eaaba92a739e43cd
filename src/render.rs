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

//! Terminal view of the active document

use anyhow::{Context, Result};
use crossterm::{
    cursor::{Hide, MoveTo, Show},
    execute, queue,
    style::{Attribute, Print, SetAttribute},
    terminal::{
        self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
    },
};
use std::io::{Stdout, Write, stdout};

use crate::document::Document;
use crate::host::Status;

const GUTTER_WIDTH: usize = 5;

// RAII guard for the alternate screen and raw mode
pub struct TerminalGuard;

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        execute!(
            stdout(),
            EnterAlternateScreen,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All)
        )
        .context("Failed to prepare terminal")?;
        Ok(TerminalGuard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = execute!(stdout(), Show, EnableLineWrap, LeaveAlternateScreen);
        let _ = disable_raw_mode();
    }
}

pub struct Renderer {
    out: Stdout,
    width: u16,
    height: u16,
    status: Status,
    message: Option<String>,
}

impl Renderer {
    pub fn new() -> Result<Self> {
        let (width, height) = terminal::size().context("Failed to read terminal size")?;
        Ok(Self {
            out: stdout(),
            width,
            height,
            status: Status::Playing,
            message: None,
        })
    }

    /// Rows available for document text, below which sits the status bar.
    pub fn text_height(&self) -> usize {
        self.height.saturating_sub(1) as usize
    }

    pub fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn render(&mut self, document: Option<&Document>) -> Result<()> {
        if let Ok((width, height)) = terminal::size() {
            self.width = width;
            self.height = height;
        }

        queue!(self.out, Hide)?;
        let rows = self.text_height();
        for row in 0..rows {
            queue!(self.out, MoveTo(0, row as u16), Clear(ClearType::CurrentLine))?;
            if let Some(doc) = document {
                self.render_line(doc, doc.scroll_top + row)?;
            }
        }
        self.render_status_bar(document)?;

        if let Some(doc) = document {
            let caret = doc.selection.active;
            if caret.line >= doc.scroll_top && caret.line < doc.scroll_top + rows {
                let col = (GUTTER_WIDTH + caret.column).min(self.width.saturating_sub(1) as usize);
                let row = caret.line - doc.scroll_top;
                queue!(self.out, MoveTo(col as u16, row as u16), Show)?;
            }
        }

        self.out.flush()?;
        Ok(())
    }

    fn render_line(&mut self, doc: &Document, line: usize) -> Result<()> {
        if line >= doc.line_count() {
            queue!(self.out, Print("    ~"))?;
            return Ok(());
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Dim),
            Print(format!("{:>4} ", line + 1)),
            SetAttribute(Attribute::Reset)
        )?;

        let room = (self.width as usize).saturating_sub(GUTTER_WIDTH);
        let text: String = doc.line(line).chars().take(doc.line_len(line)).collect();
        let (sel_from, sel_to) = selected_columns(doc, line);

        let mut selected = false;
        for (col, c) in text.chars().take(room).enumerate() {
            let in_selection = col >= sel_from && col < sel_to;
            if in_selection != selected {
                let attr = if in_selection {
                    Attribute::Reverse
                } else {
                    Attribute::NoReverse
                };
                queue!(self.out, SetAttribute(attr))?;
                selected = in_selection;
            }
            let c = if c == '\t' { ' ' } else { c };
            queue!(self.out, Print(c))?;
        }
        // Selected line break shows as one highlighted cell
        let len = text.chars().count();
        if sel_to > len && sel_from <= len && len < room {
            if !selected {
                queue!(self.out, SetAttribute(Attribute::Reverse))?;
                selected = true;
            }
            queue!(self.out, Print(' '))?;
        }
        if selected {
            queue!(self.out, SetAttribute(Attribute::NoReverse))?;
        }
        Ok(())
    }

    fn render_status_bar(&mut self, document: Option<&Document>) -> Result<()> {
        let (name, position) = match document {
            Some(doc) => {
                let dirty = if doc.is_dirty() { " [+]" } else { "" };
                let caret = doc.selection.active;
                (
                    format!("{}{}", doc.name(), dirty),
                    format!("Ln {}, Col {}", caret.line + 1, caret.column + 1),
                )
            }
            None => ("no file".to_string(), String::new()),
        };
        let state = match self.status {
            Status::Playing => "playing",
            Status::WaitingForResume => "paused: press space to continue",
            Status::Finished => "finished: press q to exit",
        };

        let mut bar = format!(" {}  {}  {}", name, position, state);
        if let Some(message) = &self.message {
            bar.push_str("  | ");
            bar.push_str(message);
        }
        let width = self.width as usize;
        let bar: String = bar.chars().chain(std::iter::repeat(' ')).take(width).collect();

        queue!(
            self.out,
            MoveTo(0, self.height.saturating_sub(1)),
            SetAttribute(Attribute::Reverse),
            Print(bar),
            SetAttribute(Attribute::Reset)
        )?;
        Ok(())
    }
}

/// Columns `[from, to)` of `line` covered by the selection; `to` past the
/// line length means the line break is selected too.
fn selected_columns(doc: &Document, line: usize) -> (usize, usize) {
    let selection = doc.selection;
    if selection.is_empty() {
        return (0, 0);
    }
    let (start, end) = (selection.start(), selection.end());
    if line < start.line || line > end.line {
        return (0, 0);
    }
    let from = if line == start.line { start.column } else { 0 };
    let to = if line == end.line {
        end.column
    } else {
        doc.line_len(line) + 1
    };
    (from, to)
}
