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

//! Workbench host
//!
//! Keeps open documents, runs the built-in commands, and redraws the
//! terminal view after every change. Without a view it runs headless.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

use crate::document::Document;
use crate::host::{Edit, Host, Reveal, Status, Surface};
use crate::render::Renderer;
use crate::types::Selection;

// Rows assumed for reveals when nothing is drawn
const HEADLESS_HEIGHT: usize = 40;

#[derive(Debug, Error)]
pub enum WorkbenchError {
    #[error("Unknown command '{0}'")]
    UnknownCommand(String),
    #[error("Command '{command}' expects {expected}")]
    BadArguments {
        command: &'static str,
        expected: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    CursorHome,
    CursorEnd,
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    CursorTop,
    CursorBottom,
    DeleteLeft,
    DeleteRight,
    SelectAll,
    Type,
    Save,
    SaveAll,
    Open,
}

impl Builtin {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "cursorHome" => Builtin::CursorHome,
            "cursorEnd" => Builtin::CursorEnd,
            "cursorUp" => Builtin::CursorUp,
            "cursorDown" => Builtin::CursorDown,
            "cursorLeft" => Builtin::CursorLeft,
            "cursorRight" => Builtin::CursorRight,
            "cursorTop" => Builtin::CursorTop,
            "cursorBottom" => Builtin::CursorBottom,
            "deleteLeft" => Builtin::DeleteLeft,
            "deleteRight" => Builtin::DeleteRight,
            "editor.action.selectAll" => Builtin::SelectAll,
            "type" => Builtin::Type,
            "workbench.action.files.save" => Builtin::Save,
            "workbench.action.files.saveAll" => Builtin::SaveAll,
            "vscode.open" => Builtin::Open,
            _ => return None,
        })
    }
}

pub struct Workbench {
    root: Option<PathBuf>,
    documents: Vec<Document>,
    active: Option<usize>,
    view: Option<Renderer>,
    errors: Vec<String>,
}

impl Workbench {
    pub fn headless(root: Option<PathBuf>) -> Self {
        Self {
            root,
            documents: Vec::new(),
            active: None,
            view: None,
            errors: Vec::new(),
        }
    }

    pub fn with_view(root: Option<PathBuf>, view: Renderer) -> Self {
        Self {
            view: Some(view),
            ..Self::headless(root)
        }
    }

    pub fn active_document(&self) -> Option<&Document> {
        self.active.and_then(|idx| self.documents.get(idx))
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// Errors reported so far, oldest first.
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn redraw(&mut self) -> Result<()> {
        if let Some(view) = self.view.as_mut() {
            let document = self.active.and_then(|idx| self.documents.get(idx));
            view.render(document)?;
        }
        Ok(())
    }

    fn active_document_mut(&mut self) -> Option<&mut Document> {
        self.active.and_then(|idx| self.documents.get_mut(idx))
    }

    async fn save_all(&mut self) -> Result<()> {
        for document in &mut self.documents {
            document.save().await?;
        }
        Ok(())
    }

    fn text_argument(args: &[Value]) -> Result<&str, WorkbenchError> {
        args.first()
            .and_then(|arg| arg.get("text"))
            .and_then(Value::as_str)
            .ok_or(WorkbenchError::BadArguments {
                command: "type",
                expected: "[{\"text\": \"...\"}]",
            })
    }

    fn path_argument(&self, args: &[Value]) -> Result<PathBuf, WorkbenchError> {
        let path = args
            .first()
            .and_then(Value::as_str)
            .ok_or(WorkbenchError::BadArguments {
                command: "vscode.open",
                expected: "a path as its first argument",
            })?;
        Ok(match &self.root {
            Some(root) => root.join(path),
            None => PathBuf::from(path),
        })
    }

    async fn run_builtin(&mut self, builtin: Builtin, args: &[Value]) -> Result<()> {
        match builtin {
            Builtin::SaveAll => return self.save_all().await,
            Builtin::Open => {
                let path = self.path_argument(args)?;
                return self.open(&path).await;
            }
            _ => {}
        }

        let Some(doc) = self.active_document_mut() else {
            debug!(?builtin, "no active document");
            return Ok(());
        };
        match builtin {
            Builtin::CursorHome => doc.cursor_home(),
            Builtin::CursorEnd => doc.cursor_end(),
            Builtin::CursorUp => doc.cursor_up(),
            Builtin::CursorDown => doc.cursor_down(),
            Builtin::CursorLeft => doc.cursor_left(),
            Builtin::CursorRight => doc.cursor_right(),
            Builtin::CursorTop => doc.cursor_top(),
            Builtin::CursorBottom => doc.cursor_bottom(),
            Builtin::DeleteLeft => doc.delete_left(),
            Builtin::DeleteRight => doc.delete_right(),
            Builtin::SelectAll => doc.select_all(),
            Builtin::Type => {
                let text = Self::text_argument(args)?;
                let selection = doc.selection;
                if !selection.is_empty() {
                    doc.delete(selection.start(), selection.end());
                }
                let at = doc.selection.active;
                doc.insert(at, text);
            }
            Builtin::Save => doc.save().await?,
            Builtin::SaveAll | Builtin::Open => {}
        }
        Ok(())
    }
}

/// The active document plus the view it is drawn in.
struct ActiveEditor<'a> {
    document: &'a mut Document,
    view: Option<&'a mut Renderer>,
}

impl ActiveEditor<'_> {
    fn redraw(&mut self) -> Result<()> {
        match self.view.as_mut() {
            Some(view) => view.render(Some(&*self.document)),
            None => Ok(()),
        }
    }
}

impl Surface for ActiveEditor<'_> {
    fn selection(&self) -> Selection {
        self.document.selection
    }

    fn set_selection(&mut self, selection: Selection) -> Result<()> {
        self.document.selection = self.document.clamp_selection(selection);
        self.redraw()
    }

    fn apply(&mut self, edit: Edit) -> Result<()> {
        match edit {
            Edit::Insert { at, text } => {
                self.document.insert(at, &text);
            }
            Edit::Delete { from, to } => self.document.delete(from, to),
        }
        self.redraw()
    }

    fn reveal(&mut self, range: Selection, reveal: Reveal) -> Result<()> {
        let height = self
            .view
            .as_ref()
            .map_or(HEADLESS_HEIGHT, |view| view.text_height());
        self.document.reveal(range.active.line, reveal, height);
        self.redraw()
    }
}

#[async_trait]
impl Host for Workbench {
    fn workspace_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn active_editor(&mut self) -> Option<Box<dyn Surface + '_>> {
        let idx = self.active?;
        let document = self.documents.get_mut(idx)?;
        Some(Box::new(ActiveEditor {
            document,
            view: self.view.as_mut(),
        }))
    }

    async fn execute_command(&mut self, command: &str, args: &[Value]) -> Result<()> {
        let builtin = Builtin::from_name(command)
            .ok_or_else(|| WorkbenchError::UnknownCommand(command.to_string()))?;
        debug!(?builtin, "running command");
        self.run_builtin(builtin, args).await?;
        self.redraw()
    }

    async fn open(&mut self, path: &Path) -> Result<()> {
        let existing = self
            .documents
            .iter()
            .position(|doc| doc.path() == Some(path));
        let idx = match existing {
            Some(idx) => idx,
            None => {
                self.documents.push(Document::open(path).await?);
                self.documents.len() - 1
            }
        };
        self.active = Some(idx);
        self.redraw()
    }

    async fn create(&mut self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        Ok(())
    }

    async fn read_file(&mut self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))
    }

    // Headless, the player's log record is the only report
    fn show_error(&mut self, message: &str) {
        if let Some(view) = self.view.as_mut() {
            view.set_message(message);
            let document = self.active.and_then(|idx| self.documents.get(idx));
            if let Err(e) = view.render(document) {
                warn!(error = %e, "failed to redraw");
            }
        }
        self.errors.push(message.to_string());
    }

    fn set_status(&mut self, status: Status) -> Result<()> {
        if let Some(view) = self.view.as_mut() {
            view.set_status(status);
        }
        self.redraw()
    }
}
