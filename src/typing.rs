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

//! Character-by-character typing into a surface

use anyhow::Result;

use crate::host::{Edit, Reveal, Surface};
use crate::timing::{DelayPolicy, Pacing};
use crate::types::{Position, Selection};

/// Types `characters` one edit at a time, replacing any selection first.
///
/// Each character is committed to the surface before the pause that
/// follows it, so the audience sees it appear.
pub async fn type_characters(
    surface: &mut dyn Surface,
    characters: &[char],
    policy: DelayPolicy,
    pacing: &mut Pacing,
) -> Result<()> {
    if characters.is_empty() {
        return Ok(());
    }

    let selection = surface.selection();
    if !selection.is_empty() {
        surface.apply(Edit::Delete {
            from: selection.start(),
            to: selection.end(),
        })?;
    }

    let mut pos = selection.start();
    for (i, &c) in characters.iter().enumerate() {
        if i > 0 {
            pacing.keystroke_pause(policy).await;
        }

        surface.set_selection(Selection::caret(pos))?;
        surface.apply(Edit::Insert {
            at: pos,
            text: c.to_string(),
        })?;

        if c == '\n' {
            pos = Position::new(pos.line + 1, 0);
            surface.reveal(Selection::caret(pos), Reveal::Default)?;
        } else {
            pos.column += 1;
        }
    }

    surface.set_selection(Selection::caret(pos))
}
