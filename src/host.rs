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

//! The editor the player drives
//!
//! The player only talks to the editor through these two traits, so it
//! can run against the terminal workbench or a test double.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

use crate::types::{Position, Selection};

/// A single atomic change to a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    Insert { at: Position, text: String },
    Delete { from: Position, to: Position },
}

/// How a reveal scrolls the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reveal {
    // Scroll as little as possible
    Default,
    InCenterIfOutsideViewport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Playing,
    WaitingForResume,
    Finished,
}

/// The document that currently has focus.
pub trait Surface: Send {
    fn selection(&self) -> Selection;
    fn set_selection(&mut self, selection: Selection) -> Result<()>;
    fn apply(&mut self, edit: Edit) -> Result<()>;
    fn reveal(&mut self, range: Selection, reveal: Reveal) -> Result<()>;
}

#[async_trait]
pub trait Host: Send {
    /// Root folder that workspace-relative paths resolve against.
    fn workspace_root(&self) -> Option<&Path>;

    fn active_editor(&mut self) -> Option<Box<dyn Surface + '_>>;

    async fn execute_command(&mut self, command: &str, args: &[Value]) -> Result<()>;

    /// Opens `path` and makes it the active editor.
    async fn open(&mut self, path: &Path) -> Result<()>;

    /// Creates `path` (and its parent folders) if it does not exist yet.
    async fn create(&mut self, path: &Path) -> Result<()>;

    async fn read_file(&mut self, path: &Path) -> Result<String>;

    fn show_error(&mut self, message: &str);

    fn set_status(&mut self, _status: Status) -> Result<()> {
        Ok(())
    }
}
