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

//! Locating and loading instruction files

use anyhow::{Context, Result};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::parser::{ParseError, parse_program};
use crate::settings::Settings;
use crate::types::Program;

pub const PB_DIR: &str = ".presentation-buddy";
pub const PB_FILE: &str = "instructions.json";

const TEMPLATE: &str = include_str!("../templates/instructions.json");

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no instructions.json found")]
    NotFound { searched: Vec<PathBuf> },
    #[error("failed to read {}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {}", path.display())]
    Parse { path: PathBuf, source: ParseError },
}

#[derive(Debug)]
pub struct LoadedProgram {
    pub program: Program,
    // The instruction file the program came from
    pub source: PathBuf,
}

impl LoadedProgram {
    pub fn config_dir(&self) -> &Path {
        self.source.parent().unwrap_or(Path::new("."))
    }

    /// Settings stored beside the instruction file.
    pub fn settings(&self) -> Result<Settings> {
        Settings::load(self.config_dir())
    }
}

/// Where an instruction file may live for `workspace`, closest first.
///
/// For `/a/b` that is `/a/b/.presentation-buddy/instructions.json`, then
/// `/a/.presentation-buddy/b/instructions.json`, then
/// `/.presentation-buddy/a/b/instructions.json`.
pub fn candidate_paths(workspace: &Path) -> Vec<PathBuf> {
    let components: Vec<Component> = workspace.components().collect();
    (1..=components.len())
        .rev()
        .map(|split| {
            let mut path: PathBuf = components[..split].iter().collect();
            path.push(PB_DIR);
            path.extend(&components[split..]);
            path.push(PB_FILE);
            path
        })
        .collect()
}

pub fn load_program(workspace: &Path) -> Result<LoadedProgram, LoadError> {
    let searched = candidate_paths(workspace);
    let Some(source) = searched.iter().find(|path| path.is_file()).cloned() else {
        return Err(LoadError::NotFound { searched });
    };

    let text = std::fs::read_to_string(&source).map_err(|e| LoadError::Io {
        path: source.clone(),
        source: e,
    })?;
    let dir = source.parent().unwrap_or(Path::new("."));
    let program = parse_program(&text, dir).map_err(|e| LoadError::Parse {
        path: source.clone(),
        source: e,
    })?;

    info!(path = %source.display(), instructions = program.len(), "loaded program");
    Ok(LoadedProgram { program, source })
}

pub fn not_found_message(searched: &[PathBuf]) -> String {
    let mut message =
        format!("Couldn't start playback - no {PB_FILE} found.\n\nSearched:\n");
    for path in searched {
        message.push_str(&format!("\n• {}", path.display()));
    }
    message
}

#[derive(Debug, PartialEq, Eq)]
pub enum InitOutcome {
    Created(PathBuf),
    Overwritten(PathBuf),
    Kept(PathBuf),
}

/// Writes the starter instruction file into `workspace`.
///
/// `confirm_overwrite` is asked before an existing file is replaced.
pub fn init(
    workspace: &Path,
    confirm_overwrite: impl FnOnce(&Path) -> Result<bool>,
) -> Result<InitOutcome> {
    let dir = workspace.join(PB_DIR);
    let path = dir.join(PB_FILE);

    if path.exists() {
        if !confirm_overwrite(&path)? {
            return Ok(InitOutcome::Kept(path));
        }
        std::fs::write(&path, TEMPLATE)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(InitOutcome::Overwritten(path));
    }

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    std::fs::write(&path, TEMPLATE)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(InitOutcome::Created(path))
}
