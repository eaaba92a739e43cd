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

//! Presenter input
//!
//! Input sources run on their own tasks and only ever resume the gate or
//! ask playback to stop.

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::gate::ManualGate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Resume,
    Quit,
}

/// Stop request shared by every input source.
#[derive(Clone)]
pub struct StopSignal {
    running: Arc<AtomicBool>,
    quit: Arc<Notify>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
            quit: Arc::new(Notify::new()),
        }
    }

    /// Flag the player checks between instructions.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.quit.notify_one();
    }

    pub async fn stopped(&self) {
        self.quit.notified().await;
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

pub fn key_action(key: &KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Quit)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(KeyAction::Quit),
        KeyCode::Char(' ') | KeyCode::Enter | KeyCode::Right | KeyCode::PageDown => {
            Some(KeyAction::Resume)
        }
        _ => None,
    }
}

/// Reads terminal key presses; the terminal must be in raw mode.
pub fn spawn_key_listener(gate: ManualGate, stop: StopSignal) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = EventStream::new();
        while let Some(Ok(event)) = events.next().await {
            let Event::Key(key) = event else {
                continue;
            };
            match key_action(&key) {
                Some(KeyAction::Resume) => {
                    let resumed = gate.resume();
                    debug!(resumed, "resume key pressed");
                }
                Some(KeyAction::Quit) => {
                    stop.stop();
                    break;
                }
                None => {}
            }
        }
    })
}

/// Resumes on every line read from stdin.
pub fn spawn_line_listener(gate: ManualGate) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(_)) = lines.next_line().await {
            let resumed = gate.resume();
            debug!(resumed, "resume line read");
        }
    })
}

pub fn install_ctrlc(stop: StopSignal) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl-C, stopping playback...");
        stop.stop();
    })?;
    Ok(())
}
