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

//! Scripted live-coding playback
//!
//! A program of instructions is loaded from
//! `.presentation-buddy/instructions.json` and replayed against an editor
//! with human-looking typing.

pub mod chunks;
pub mod document;
pub mod gate;
pub mod host;
pub mod input;
pub mod loader;
pub mod parser;
pub mod playback;
pub mod render;
pub mod settings;
pub mod timing;
pub mod types;
pub mod typing;
pub mod workbench;

#[cfg(test)]
pub(crate) mod testing;

pub use gate::ManualGate;
pub use host::{Host, Surface};
pub use playback::{Player, Summary};
pub use settings::Settings;
pub use timing::Pacing;
pub use types::{Instruction, Program};
pub use workbench::Workbench;
