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

//! Splits file content into typed bursts
//!
//! A chunk ends where a pause goes. Markers in `split_instead_of` end a
//! chunk and are never typed; markers in `split_after` are typed and then
//! end the chunk. Lines containing any of `skip_lines_containing` are
//! removed before splitting.

use crate::settings::Settings;
use crate::types::TypeChunksFromFile;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkRules {
    pub split_instead_of: Vec<String>,
    pub split_after: Vec<String>,
    pub skip_lines_containing: Vec<String>,
}

impl ChunkRules {
    /// Combines an instruction's markers with the settings fallbacks.
    pub fn resolve(step: &TypeChunksFromFile, settings: &Settings) -> Self {
        let pick = |own: &Option<Vec<String>>, fallback: &Vec<String>| {
            own.clone().unwrap_or_else(|| fallback.clone())
        };

        let mut split_after = pick(&step.wait_after_typing, &settings.wait_after_typing);
        let wait_after_new_line = step
            .wait_after_new_line
            .or(settings.wait_after_new_line)
            .unwrap_or(true);
        if wait_after_new_line {
            split_after.push("\n".to_string());
        }

        Self {
            split_instead_of: pick(&step.wait_instead_of_typing, &settings.wait_instead_of_typing),
            split_after,
            skip_lines_containing: pick(
                &step.skip_lines_containing,
                &settings.skip_lines_containing,
            ),
        }
    }

    pub fn split(&self, text: &str) -> Vec<String> {
        split(
            text,
            &self.split_instead_of,
            &self.split_after,
            &self.skip_lines_containing,
        )
    }
}

/// Removes every line (with its newline) that contains one of `needles`.
pub fn remove_lines_containing(text: &str, needles: &[String]) -> String {
    let needles: Vec<&str> = non_empty(needles).collect();
    if needles.is_empty() {
        return text.to_string();
    }

    text.split_inclusive('\n')
        .filter(|line| {
            let content = line.strip_suffix('\n').unwrap_or(line);
            !needles.iter().any(|needle| content.contains(needle))
        })
        .collect()
}

fn non_empty(markers: &[String]) -> impl Iterator<Item = &str> {
    markers.iter().map(String::as_str).filter(|m| !m.is_empty())
}

// Longest marker wins; equal lengths go to the first declared
fn longest_match<'a>(remaining: &str, markers: &'a [String]) -> Option<&'a str> {
    let mut best: Option<&str> = None;
    for marker in non_empty(markers) {
        if remaining.starts_with(marker) && best.is_none_or(|b| marker.len() > b.len()) {
            best = Some(marker);
        }
    }
    best
}

pub fn split(
    text: &str,
    split_instead_of: &[String],
    split_after: &[String],
    skip_lines_containing: &[String],
) -> Vec<String> {
    let text = remove_lines_containing(text, skip_lines_containing);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut remaining = text.as_str();

    while let Some(c) = remaining.chars().next() {
        if let Some(marker) = longest_match(remaining, split_instead_of) {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
            }
            remaining = &remaining[marker.len()..];
        } else if let Some(marker) = longest_match(remaining, split_after) {
            current.push_str(marker);
            chunks.push(std::mem::take(&mut current));
            remaining = &remaining[marker.len()..];
        } else {
            current.push(c);
            remaining = &remaining[c.len_utf8()..];
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
