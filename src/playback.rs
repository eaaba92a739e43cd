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

//! Playback engine for codecast programs
//!
//! Runs instructions one after another; each handler finishes before the
//! next instruction starts. A failing instruction is reported and the
//! rest of the program still plays.

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::chunks::ChunkRules;
use crate::gate::{GateError, ManualGate};
use crate::host::{Host, Reveal, Status};
use crate::settings::Settings;
use crate::timing::{DelayPolicy, Pacing};
use crate::types::{
    CommandStep, Cursor, FileTarget, Instruction, Program, Selection, TypeChunksFromFile,
    TypeText, TypeTextFromFile, WaitDelay, WaitStep,
};
use crate::typing::type_characters;

pub const SAVE_ALL: &str = "workbench.action.files.saveAll";
pub const CURSOR_HOME: &str = "cursorHome";

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("Unknown instruction type '{0}'")]
    UnknownInstruction(String),
    #[error("Invalid wait delay {0}: expected milliseconds or \"manual\"")]
    InvalidWait(String),
    #[error(transparent)]
    Gate(#[from] GateError),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub executed: usize,
    pub failed: usize,
    pub stopped: bool,
}

pub struct Player<H: Host> {
    host: H,
    settings: Settings,
    pacing: Pacing,
    gate: ManualGate,
    running: Arc<AtomicBool>,
}

impl<H: Host> Player<H> {
    pub fn new(host: H, settings: Settings, pacing: Pacing, gate: ManualGate) -> Self {
        Self {
            host,
            settings,
            pacing,
            gate,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Shares a flag that, once cleared, stops playback before the next
    /// instruction.
    pub fn with_stop_flag(mut self, running: Arc<AtomicBool>) -> Self {
        self.running = running;
        self
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    pub fn gate(&self) -> &ManualGate {
        &self.gate
    }

    fn should_continue(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub async fn execute(&mut self, program: Program) -> Summary {
        let mut summary = Summary::default();
        let total = program.len();
        info!(instructions = total, "starting playback");

        for (index, instruction) in program.instructions.into_iter().enumerate() {
            if !self.should_continue() {
                info!(remaining = total - index, "playback stopped");
                summary.stopped = true;
                break;
            }

            let kind = instruction.kind().to_string();
            debug!(index, %kind, "executing instruction");
            match self.execute_instruction(instruction).await {
                Ok(()) => summary.executed += 1,
                Err(e) => {
                    summary.failed += 1;
                    warn!(index, %kind, error = %format!("{e:#}"), "instruction failed");
                    self.host.show_error(&format!("{e:#}"));
                }
            }
        }

        if let Err(e) = self.host.set_status(Status::Finished) {
            warn!(error = %e, "failed to update status");
        }
        info!(
            executed = summary.executed,
            failed = summary.failed,
            "playback finished"
        );
        summary
    }

    async fn execute_instruction(&mut self, instruction: Instruction) -> Result<()> {
        match instruction {
            Instruction::Command(step) => self.command(&step).await,
            Instruction::Wait(step) => self.wait(&step).await,
            Instruction::TypeText(step) => self.type_text(&step).await,
            Instruction::TypeTextFromFile(step) => self.type_text_from_file(&step).await,
            Instruction::TypeChunksFromFile(step) => self.type_chunks_from_file(&step).await,
            Instruction::OpenFile(target) => self.open_file(&target).await,
            Instruction::CreateFile(target) => self.create_file(&target).await,
            Instruction::GoTo(cursor) => self.goto(cursor).await,
            Instruction::Select(cursor) => self.select(cursor).await,
            Instruction::Unknown { kind } => Err(PlaybackError::UnknownInstruction(kind).into()),
        }
    }

    async fn step_pause(&mut self) {
        self.pacing
            .pause(Duration::from_millis(self.settings.delay))
            .await;
    }

    async fn run_command(&mut self, command: &str) -> Result<()> {
        self.command(&CommandStep {
            command: command.to_string(),
            args: Vec::new(),
            repeat: 1,
        })
        .await
    }

    async fn command(&mut self, step: &CommandStep) -> Result<()> {
        for _ in 0..step.repeat {
            self.host
                .execute_command(&step.command, &step.args)
                .await
                .with_context(|| format!("Command '{}' failed", step.command))?;
            self.step_pause().await;
        }
        Ok(())
    }

    async fn wait(&mut self, step: &WaitStep) -> Result<()> {
        if step.save == Some(true) {
            self.run_command(SAVE_ALL).await?;
        }

        match &step.delay {
            WaitDelay::Millis(ms) => {
                self.pacing.pause(Duration::from_millis(*ms)).await;
                Ok(())
            }
            WaitDelay::Manual => self.manual_wait().await,
            WaitDelay::Invalid(value) => Err(PlaybackError::InvalidWait(value.clone()).into()),
        }
    }

    async fn manual_wait(&mut self) -> Result<()> {
        self.host.set_status(Status::WaitingForResume)?;
        debug!("waiting for manual resume");
        let resumed = self.gate.wait().await;
        self.host.set_status(Status::Playing)?;
        resumed.map_err(PlaybackError::from)?;
        Ok(())
    }

    async fn type_into(&mut self, characters: &[char], delay: Option<u64>) -> Result<()> {
        let policy = DelayPolicy::for_typing(delay, &self.settings);
        let Some(mut editor) = self.host.active_editor() else {
            debug!("no active editor, nothing typed");
            return Ok(());
        };
        type_characters(editor.as_mut(), characters, policy, &mut self.pacing).await
    }

    async fn type_text(&mut self, step: &TypeText) -> Result<()> {
        let characters: Vec<char> = step.text.join("\n").chars().collect();
        self.type_into(&characters, step.delay).await
    }

    // Empty when there is no workspace to read from
    async fn read_source(&mut self, path: &str, qualified: Option<&PathBuf>) -> Result<String> {
        let Some(root) = self.host.workspace_root() else {
            return Ok(String::new());
        };
        let path = qualified.cloned().unwrap_or_else(|| root.join(path));
        let text = self
            .host
            .read_file(&path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Ok(text.replace("\r\n", "\n"))
    }

    async fn type_text_from_file(&mut self, step: &TypeTextFromFile) -> Result<()> {
        let text = self
            .read_source(&step.path, step.qualified_path.as_ref())
            .await?;
        if text.is_empty() {
            return Ok(());
        }
        let characters: Vec<char> = text.chars().collect();
        self.type_into(&characters, step.delay).await
    }

    async fn type_chunks_from_file(&mut self, step: &TypeChunksFromFile) -> Result<()> {
        let text = self
            .read_source(&step.path, step.qualified_path.as_ref())
            .await?;
        if text.is_empty() {
            return Ok(());
        }

        let chunks = ChunkRules::resolve(step, &self.settings).split(&text);
        debug!(chunks = chunks.len(), path = %step.path, "typing chunks");
        for chunk in chunks {
            let characters: Vec<char> = chunk.chars().collect();
            self.type_into(&characters, step.delay).await?;
            if chunk.ends_with('\n') {
                self.run_command(CURSOR_HOME).await?;
            }
            self.manual_wait().await?;
        }
        Ok(())
    }

    async fn open_file(&mut self, target: &FileTarget) -> Result<()> {
        let Some(path) = self.host.workspace_root().map(|root| root.join(&target.path)) else {
            return Ok(());
        };
        self.host
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        self.step_pause().await;
        Ok(())
    }

    async fn create_file(&mut self, target: &FileTarget) -> Result<()> {
        let Some(path) = self.host.workspace_root().map(|root| root.join(&target.path)) else {
            return Ok(());
        };
        self.host
            .create(&path)
            .await
            .with_context(|| format!("Failed to create {}", path.display()))?;
        self.host
            .open(&path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        self.step_pause().await;
        Ok(())
    }

    async fn goto(&mut self, cursor: Cursor) -> Result<()> {
        let Some(mut editor) = self.host.active_editor() else {
            return Ok(());
        };
        let selection = Selection::caret(cursor.to_position());
        editor.set_selection(selection)?;
        editor.reveal(selection, Reveal::InCenterIfOutsideViewport)?;
        drop(editor);

        self.step_pause().await;
        Ok(())
    }

    async fn select(&mut self, cursor: Cursor) -> Result<()> {
        let Some(mut editor) = self.host.active_editor() else {
            return Ok(());
        };
        let selection = Selection::new(editor.selection().start(), cursor.to_position());
        editor.set_selection(selection)?;
        editor.reveal(selection, Reveal::InCenterIfOutsideViewport)?;
        drop(editor);

        self.step_pause().await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Edit;
    use crate::parser::parse_program;
    use crate::testing::{Event, Log, RecordingHost, RecordingPacer, SurfaceState};
    use crate::types::Position;
    use std::path::Path;
    use tokio::task::JoinHandle;

    fn settings() -> Settings {
        Settings {
            delay: 10,
            randomness: 0,
            ..Settings::default()
        }
    }

    fn player(host: RecordingHost, log: &Log) -> Player<RecordingHost> {
        Player::new(
            host,
            settings(),
            Pacing::new(Box::new(RecordingPacer::with_log(log.clone())), Some(1)),
            ManualGate::new(),
        )
    }

    fn program(json: &str) -> Program {
        parse_program(json, Path::new("/ws/.presentation-buddy")).unwrap()
    }

    // Keeps resuming the gate so manual waits never block a test
    fn auto_resume(gate: &ManualGate) -> JoinHandle<()> {
        let gate = gate.clone();
        tokio::spawn(async move {
            loop {
                gate.resume();
                tokio::task::yield_now().await;
            }
        })
    }

    #[tokio::test]
    async fn test_goto_then_type_without_delay() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[
                    {"type": "goto", "line": 2, "column": 1},
                    {"type": "typeText", "text": ["hi"], "delay": 0}
                ]"#,
            ))
            .await;

        assert_eq!(summary.executed, 2);
        assert_eq!(
            log.edits(),
            vec![
                Edit::Insert {
                    at: Position::new(1, 0),
                    text: "h".to_string()
                },
                Edit::Insert {
                    at: Position::new(1, 1),
                    text: "i".to_string()
                },
            ]
        );
        // Only the step pause after goto
        assert_eq!(log.sleeps(), vec![Duration::from_millis(10)]);
    }

    #[tokio::test]
    async fn test_instructions_run_in_order() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        player
            .execute(program(
                r#"[
                    {"type": "command", "command": "first"},
                    {"type": "wait", "delay": 5},
                    {"type": "command", "command": "second", "args": [1], "repeat": 2}
                ]"#,
            ))
            .await;

        let events: Vec<Event> = log
            .events()
            .into_iter()
            .filter(|e| !matches!(e, Event::Status(_)))
            .collect();
        assert_eq!(
            events,
            vec![
                Event::Command("first".to_string(), vec![]),
                Event::Sleep(Duration::from_millis(10)),
                Event::Sleep(Duration::from_millis(5)),
                Event::Command("second".to_string(), vec![serde_json::json!(1)]),
                Event::Sleep(Duration::from_millis(10)),
                Event::Command("second".to_string(), vec![serde_json::json!(1)]),
                Event::Sleep(Duration::from_millis(10)),
            ]
        );
    }

    #[tokio::test]
    async fn test_unknown_instruction_reported_and_skipped() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[{"type": "juggle"}, {"type": "command", "command": "after"}]"#,
            ))
            .await;

        assert_eq!(
            summary,
            Summary {
                executed: 1,
                failed: 1,
                stopped: false
            }
        );
        assert_eq!(log.errors(), vec!["Unknown instruction type 'juggle'"]);
        assert_eq!(log.commands(), vec!["after"]);
    }

    #[tokio::test]
    async fn test_untyped_element_reported_and_skipped() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[
                    {"type": "command", "command": "before"},
                    {"line": 3},
                    {"type": "command", "command": "after"}
                ]"#,
            ))
            .await;

        assert_eq!(summary.executed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(log.errors(), vec!["Unknown instruction type 'undefined'"]);
        assert_eq!(log.commands(), vec!["before", "after"]);
    }

    #[tokio::test]
    async fn test_failed_instruction_does_not_abort() {
        let log = Log::default();
        let mut host = RecordingHost::new(log.clone());
        host.failing_commands.push("broken".to_string());
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[
                    {"type": "command", "command": "broken"},
                    {"type": "wait", "delay": "later"},
                    {"type": "command", "command": "fine"}
                ]"#,
            ))
            .await;

        assert_eq!(summary.failed, 2);
        assert_eq!(summary.executed, 1);
        let errors = log.errors();
        assert!(errors[0].starts_with("Command 'broken' failed"));
        assert!(errors[1].starts_with("Invalid wait delay"));
        assert_eq!(log.commands(), vec!["broken", "fine"]);
    }

    #[tokio::test]
    async fn test_skipped_instruction_has_no_effect() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[{"type": "typeText", "text": ["secret"], "delay": 0, "skip": true}]"#,
            ))
            .await;

        assert_eq!(summary.executed, 0);
        assert!(log.edits().is_empty());
    }

    #[tokio::test]
    async fn test_no_editor_is_silent_noop() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone()).without_editor();
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[
                    {"type": "goto", "line": 3},
                    {"type": "select", "line": 4},
                    {"type": "typeText", "text": ["x"]}
                ]"#,
            ))
            .await;

        assert_eq!(summary.failed, 0);
        assert!(log.errors().is_empty());
        assert!(log.edits().is_empty());
        assert!(log.sleeps().is_empty());
    }

    #[tokio::test]
    async fn test_select_extends_from_selection_start() {
        let log = Log::default();
        let mut host = RecordingHost::new(log.clone());
        host.editor = Some(SurfaceState::at(Position::new(2, 4)));
        let mut player = player(host, &log);

        player
            .execute(program(r#"[{"type": "select", "line": 5, "column": 2}]"#))
            .await;

        let expected = Selection::new(Position::new(2, 4), Position::new(4, 1));
        assert_eq!(player.host().editor.as_ref().unwrap().selection, expected);
        assert_eq!(log.reveals(), vec![expected]);
    }

    #[tokio::test]
    async fn test_wait_with_save_runs_save_all_first() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);

        player
            .execute(program(r#"[{"type": "wait", "delay": 300, "save": true}]"#))
            .await;

        assert_eq!(log.commands(), vec![SAVE_ALL]);
        assert_eq!(
            log.sleeps(),
            vec![Duration::from_millis(10), Duration::from_millis(300)]
        );
    }

    #[tokio::test]
    async fn test_manual_wait_resumes_via_gate() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let mut player = player(host, &log);
        let resumer = auto_resume(player.gate());

        let summary = player
            .execute(program(r#"[{"type": "wait", "delay": "manual"}]"#))
            .await;
        resumer.abort();

        assert_eq!(summary.executed, 1);
        let statuses: Vec<Event> = log
            .events()
            .into_iter()
            .filter(|e| matches!(e, Event::Status(_)))
            .collect();
        assert_eq!(
            statuses,
            vec![
                Event::Status(Status::WaitingForResume),
                Event::Status(Status::Playing),
                Event::Status(Status::Finished),
            ]
        );
    }

    #[tokio::test]
    async fn test_type_text_from_file_normalizes_line_endings() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone())
            .with_file("/ws/.presentation-buddy/hello.rs", "a\r\nb");
        let mut player = player(host, &log);

        player
            .execute(program(
                r#"[{"type": "typeTextFromFile", "path": "hello.rs", "delay": 0}]"#,
            ))
            .await;

        let typed: String = log
            .edits()
            .into_iter()
            .filter_map(|edit| match edit {
                Edit::Insert { text, .. } => Some(text),
                _ => None,
            })
            .collect();
        assert_eq!(typed, "a\nb");
    }

    #[tokio::test]
    async fn test_file_instructions_need_workspace() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone()).without_workspace();
        let mut player = player(host, &log);

        let summary = player
            .execute(program(
                r#"[
                    {"type": "typeTextFromFile", "path": "missing.rs"},
                    {"type": "openFile", "path": "src/main.rs"},
                    {"type": "createFile", "path": "src/new.rs"}
                ]"#,
            ))
            .await;

        assert_eq!(summary.failed, 0);
        assert!(log.events().iter().all(|e| matches!(e, Event::Status(_))));
    }

    #[tokio::test]
    async fn test_create_file_then_open() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone()).without_editor();
        let mut player = player(host, &log);

        player
            .execute(program(r#"[{"type": "createFile", "path": "src/lib.rs"}]"#))
            .await;

        assert_eq!(
            log.events()[..3],
            [
                Event::Create(PathBuf::from("/ws/src/lib.rs")),
                Event::Open(PathBuf::from("/ws/src/lib.rs")),
                Event::Sleep(Duration::from_millis(10)),
            ]
        );
    }

    #[tokio::test]
    async fn test_chunks_pause_after_each_chunk() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone())
            .with_file("/ws/.presentation-buddy/demo.rs", "ab\ncd");
        let mut player = player(host, &log);
        let resumer = auto_resume(player.gate());

        let summary = player
            .execute(program(
                r#"[{"type": "typeChunksFromFile", "path": "demo.rs", "delay": 0}]"#,
            ))
            .await;
        resumer.abort();

        assert_eq!(summary.executed, 1);
        let waits = log
            .events()
            .iter()
            .filter(|e| **e == Event::Status(Status::WaitingForResume))
            .count();
        assert_eq!(waits, 2);
        assert_eq!(log.commands(), vec![CURSOR_HOME]);
        assert_eq!(log.edits().len(), 5);
    }

    #[tokio::test]
    async fn test_stop_flag_halts_before_next_instruction() {
        let log = Log::default();
        let host = RecordingHost::new(log.clone());
        let running = Arc::new(AtomicBool::new(false));
        let mut player = player(host, &log).with_stop_flag(running);

        let summary = player
            .execute(program(r#"[{"type": "command", "command": "never"}]"#))
            .await;

        assert!(summary.stopped);
        assert!(log.commands().is_empty());
    }
}
