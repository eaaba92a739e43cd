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

//! Playback settings
//!
//! Defaults used whenever an instruction leaves a field out. Read from an
//! optional `settings.json` that sits next to `instructions.json`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::parser::strip_jsonc;

pub const SETTINGS_FILE: &str = "settings.json";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // Milliseconds between keystrokes, and between steps
    pub delay: u64,
    // Maximum +/- variation in milliseconds, capped at `delay`
    pub randomness: u64,
    pub wait_instead_of_typing: Vec<String>,
    pub wait_after_typing: Vec<String>,
    pub skip_lines_containing: Vec<String>,
    pub wait_after_new_line: Option<bool>,
    // Fixed jitter seed for reproducible rehearsals
    pub seed: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            delay: 100,
            randomness: 25,
            wait_instead_of_typing: Vec::new(),
            wait_after_typing: Vec::new(),
            skip_lines_containing: Vec::new(),
            wait_after_new_line: None,
            seed: None,
        }
    }
}

impl Settings {
    /// Loads `settings.json` from `dir`, or the defaults if there is none.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str(&strip_jsonc(&text))
            .with_context(|| format!("Failed to parse {}", path.display()))
    }
}
