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

//! Recording doubles for unit tests

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::host::{Edit, Host, Reveal, Status, Surface};
use crate::timing::Pacer;
use crate::types::{Position, Selection};

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Select(Selection),
    Edit(Edit),
    Reveal(Selection, Reveal),
    Command(String, Vec<Value>),
    Open(PathBuf),
    Create(PathBuf),
    Read(PathBuf),
    Error(String),
    Status(Status),
    Sleep(Duration),
}

#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<Event>>>);

impl Log {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn edits(&self) -> Vec<Edit> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Edit(edit) => Some(edit),
                _ => None,
            })
            .collect()
    }

    pub fn reveals(&self) -> Vec<Selection> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Reveal(range, _) => Some(range),
                _ => None,
            })
            .collect()
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Sleep(duration) => Some(duration),
                _ => None,
            })
            .collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Command(name, _) => Some(name),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Error(message) => Some(message),
                _ => None,
            })
            .collect()
    }
}

pub struct RecordingPacer {
    log: Log,
}

impl RecordingPacer {
    pub fn new() -> (Self, Log) {
        let log = Log::default();
        (Self::with_log(log.clone()), log)
    }

    pub fn with_log(log: Log) -> Self {
        Self { log }
    }
}

#[async_trait]
impl Pacer for RecordingPacer {
    async fn sleep(&mut self, duration: Duration) {
        self.log.push(Event::Sleep(duration));
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Default)]
pub struct SurfaceState {
    pub selection: Selection,
}

impl SurfaceState {
    pub fn at(position: Position) -> Self {
        Self {
            selection: Selection::caret(position),
        }
    }
}

pub struct RecordingSurface<'a> {
    state: &'a mut SurfaceState,
    log: Log,
}

impl<'a> RecordingSurface<'a> {
    pub fn new(state: &'a mut SurfaceState, log: Log) -> Self {
        Self { state, log }
    }
}

impl Surface for RecordingSurface<'_> {
    fn selection(&self) -> Selection {
        self.state.selection
    }

    fn set_selection(&mut self, selection: Selection) -> Result<()> {
        self.state.selection = selection;
        self.log.push(Event::Select(selection));
        Ok(())
    }

    fn apply(&mut self, edit: Edit) -> Result<()> {
        if let Edit::Delete { from, .. } = &edit {
            self.state.selection = Selection::caret(*from);
        }
        self.log.push(Event::Edit(edit));
        Ok(())
    }

    fn reveal(&mut self, range: Selection, reveal: Reveal) -> Result<()> {
        self.log.push(Event::Reveal(range, reveal));
        Ok(())
    }
}

/// A host that records everything and serves files from memory.
pub struct RecordingHost {
    pub log: Log,
    pub root: Option<PathBuf>,
    pub editor: Option<SurfaceState>,
    pub files: HashMap<PathBuf, String>,
    pub failing_commands: Vec<String>,
}

impl RecordingHost {
    pub fn new(log: Log) -> Self {
        Self {
            log,
            root: Some(PathBuf::from("/ws")),
            editor: Some(SurfaceState::default()),
            files: HashMap::new(),
            failing_commands: Vec::new(),
        }
    }

    pub fn without_workspace(mut self) -> Self {
        self.root = None;
        self
    }

    pub fn without_editor(mut self) -> Self {
        self.editor = None;
        self
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: &str) -> Self {
        self.files.insert(path.into(), contents.to_string());
        self
    }
}

#[async_trait]
impl Host for RecordingHost {
    fn workspace_root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    fn active_editor(&mut self) -> Option<Box<dyn Surface + '_>> {
        let log = self.log.clone();
        self.editor
            .as_mut()
            .map(|state| Box::new(RecordingSurface::new(state, log)) as Box<dyn Surface + '_>)
    }

    async fn execute_command(&mut self, command: &str, args: &[Value]) -> Result<()> {
        self.log
            .push(Event::Command(command.to_string(), args.to_vec()));
        if self.failing_commands.iter().any(|c| c == command) {
            bail!("command '{}' failed", command);
        }
        Ok(())
    }

    async fn open(&mut self, path: &Path) -> Result<()> {
        self.log.push(Event::Open(path.to_path_buf()));
        self.editor.get_or_insert_with(SurfaceState::default);
        Ok(())
    }

    async fn create(&mut self, path: &Path) -> Result<()> {
        self.log.push(Event::Create(path.to_path_buf()));
        Ok(())
    }

    async fn read_file(&mut self, path: &Path) -> Result<String> {
        self.log.push(Event::Read(path.to_path_buf()));
        match self.files.get(path) {
            Some(contents) => Ok(contents.clone()),
            None => bail!("no such file: {}", path.display()),
        }
    }

    fn show_error(&mut self, message: &str) {
        self.log.push(Event::Error(message.to_string()));
    }

    fn set_status(&mut self, status: Status) -> Result<()> {
        self.log.push(Event::Status(status));
        Ok(())
    }
}
