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

//! Core types for codecast programs

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Tags accepted in the `type` field of an instruction.
pub const KNOWN_KINDS: &[&str] = &[
    "command",
    "wait",
    "typeText",
    "typeTextFromFile",
    "typeChunksFromFile",
    "openFile",
    "createFile",
    "goto",
    "select",
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Instruction {
    Command(CommandStep),
    Wait(WaitStep),
    TypeText(TypeText),
    TypeTextFromFile(TypeTextFromFile),
    TypeChunksFromFile(TypeChunksFromFile),
    OpenFile(FileTarget),
    CreateFile(FileTarget),
    #[serde(rename = "goto")]
    GoTo(Cursor),
    Select(Cursor),
    // Never deserialized; the loader builds it for unrecognised tags
    #[serde(skip)]
    Unknown { kind: String },
}

impl Instruction {
    pub fn kind(&self) -> &str {
        match self {
            Instruction::Command(_) => "command",
            Instruction::Wait(_) => "wait",
            Instruction::TypeText(_) => "typeText",
            Instruction::TypeTextFromFile(_) => "typeTextFromFile",
            Instruction::TypeChunksFromFile(_) => "typeChunksFromFile",
            Instruction::OpenFile(_) => "openFile",
            Instruction::CreateFile(_) => "createFile",
            Instruction::GoTo(_) => "goto",
            Instruction::Select(_) => "select",
            Instruction::Unknown { kind } => kind.as_str(),
        }
    }

    /// Resolves the `path` of file-reading instructions against `dir`.
    pub(crate) fn qualify(&mut self, dir: &Path) {
        match self {
            Instruction::TypeTextFromFile(step) => {
                step.qualified_path = Some(dir.join(&step.path));
            }
            Instruction::TypeChunksFromFile(step) => {
                step.qualified_path = Some(dir.join(&step.path));
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommandStep {
    pub command: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default = "one")]
    pub repeat: u32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WaitStep {
    pub delay: WaitDelay,
    #[serde(default)]
    pub save: Option<bool>,
}

/// The `delay` of a wait: milliseconds, or `"manual"`.
///
/// Anything else is kept as `Invalid` so that only the offending
/// instruction fails at playback time.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitDelay {
    Millis(u64),
    Manual,
    Invalid(String),
}

impl<'de> Deserialize<'de> for WaitDelay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match &value {
            Value::Number(n) => match n.as_u64() {
                Some(ms) => WaitDelay::Millis(ms),
                None => WaitDelay::Invalid(n.to_string()),
            },
            Value::String(s) if s == "manual" => WaitDelay::Manual,
            other => WaitDelay::Invalid(other.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeText {
    pub text: Vec<String>,
    #[serde(default)]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TypeTextFromFile {
    pub path: String,
    #[serde(skip)]
    pub qualified_path: Option<PathBuf>,
    #[serde(default)]
    pub delay: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeChunksFromFile {
    pub path: String,
    #[serde(skip)]
    pub qualified_path: Option<PathBuf>,
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub wait_instead_of_typing: Option<Vec<String>>,
    #[serde(default)]
    pub wait_after_typing: Option<Vec<String>>,
    #[serde(default)]
    pub wait_after_new_line: Option<bool>,
    #[serde(default)]
    pub skip_lines_containing: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FileTarget {
    pub path: String,
}

/// A 1-based line/column pair as written in instruction files.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Cursor {
    #[serde(default = "one")]
    pub line: u32,
    #[serde(default = "one")]
    pub column: u32,
}

impl Cursor {
    pub fn to_position(self) -> Position {
        Position::new(
            self.line.saturating_sub(1) as usize,
            self.column.saturating_sub(1) as usize,
        )
    }
}

fn one() -> u32 {
    1
}

/// A zero-based location in a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// An anchor/active pair; `active` is where the caret sits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Selection {
    pub anchor: Position,
    pub active: Position,
}

impl Selection {
    pub fn new(anchor: Position, active: Position) -> Self {
        Self { anchor, active }
    }

    pub fn caret(at: Position) -> Self {
        Self::new(at, at)
    }

    pub fn start(&self) -> Position {
        self.anchor.min(self.active)
    }

    pub fn end(&self) -> Position {
        self.anchor.max(self.active)
    }

    pub fn is_empty(&self) -> bool {
        self.anchor == self.active
    }
}

/// An ordered list of instructions ready for playback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub instructions: Vec<Instruction>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }
}
