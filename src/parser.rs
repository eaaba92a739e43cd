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

//! Instruction file parser
//!
//! Instruction files are JSON with two relaxations:
//! - `//` line comments and `/* */` block comments
//! - trailing commas before `]` or `}`
//!
//! The relaxations are stripped first, then the array is mapped onto
//! [`Instruction`] one element at a time.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped, tag, take_until},
    character::complete::{anychar, char, multispace1, none_of, not_line_ending},
    combinator::{opt, recognize},
    multi::many0_count,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

use crate::types::{Instruction, KNOWN_KINDS, Program};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("instruction file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("instruction file must contain an array of instructions")]
    NotAnArray,
    #[error("instruction {index} ({kind}) is malformed: {source}")]
    Malformed {
        index: usize,
        kind: String,
        source: serde_json::Error,
    },
}

fn string_literal(input: &str) -> IResult<&str, &str> {
    recognize((
        char('"'),
        opt(escaped(none_of("\\\""), '\\', anychar)),
        char('"'),
    ))
    .parse(input)
}

fn line_comment(input: &str) -> IResult<&str, &str> {
    recognize((tag("//"), not_line_ending)).parse(input)
}

fn block_comment(input: &str) -> IResult<&str, &str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

fn trivia(input: &str) -> IResult<&str, usize> {
    many0_count(alt((multispace1, line_comment, block_comment))).parse(input)
}

fn closes_container(input: &str) -> bool {
    match trivia(input) {
        Ok((rest, _)) => rest.starts_with(']') || rest.starts_with('}'),
        Err(_) => false,
    }
}

/// Rewrites JSON-with-comments into plain JSON.
///
/// Comments become whitespace so that serde error positions still point
/// at the right line.
pub fn strip_jsonc(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut remaining = input;

    while let Some(c) = remaining.chars().next() {
        if c == '"' {
            if let Ok((rest, literal)) = string_literal(remaining) {
                result.push_str(literal);
                remaining = rest;
                continue;
            }
        } else if c == '/' {
            if let Ok((rest, _)) = line_comment(remaining) {
                remaining = rest;
                continue;
            }
            if let Ok((rest, comment)) = block_comment(remaining) {
                result.extend(comment.chars().filter(|&ch| ch == '\n'));
                result.push(' ');
                remaining = rest;
                continue;
            }
        } else if c == ',' && closes_container(&remaining[1..]) {
            remaining = &remaining[1..];
            continue;
        }

        result.push(c);
        remaining = &remaining[c.len_utf8()..];
    }

    result
}

fn parse_instruction(index: usize, value: Value) -> Result<Instruction, ParseError> {
    // An untyped element is reported at playback like any other unknown kind
    let kind = match value.get("type") {
        Some(Value::String(kind)) => kind.clone(),
        Some(other) => other.to_string(),
        None => "undefined".to_string(),
    };

    if !KNOWN_KINDS.contains(&kind.as_str()) {
        return Ok(Instruction::Unknown { kind });
    }

    Instruction::deserialize(value).map_err(|source| ParseError::Malformed {
        index,
        kind,
        source,
    })
}

/// Parses an instruction file into a [`Program`].
///
/// Elements with `"skip": true` are dropped before anything else looks
/// at them. File-reading instructions get their path resolved against
/// `base_dir`, the directory that holds the instruction file.
pub fn parse_program(input: &str, base_dir: &Path) -> Result<Program, ParseError> {
    let document: Value = serde_json::from_str(&strip_jsonc(input))?;
    let Value::Array(elements) = document else {
        return Err(ParseError::NotAnArray);
    };

    let mut instructions = Vec::with_capacity(elements.len());
    for (index, value) in elements.into_iter().enumerate() {
        if value.get("skip").and_then(Value::as_bool).unwrap_or(false) {
            continue;
        }
        let mut instruction = parse_instruction(index, value)?;
        instruction.qualify(base_dir);
        instructions.push(instruction);
    }

    Ok(Program { instructions })
}
