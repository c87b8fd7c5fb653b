/*
 * This file is part of x62fan.
 *
 * Copyright (C) 2025 x62fan contributors
 *
 * x62fan is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * x62fan is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with x62fan. If not, see <https://www.gnu.org/licenses/>.
 */

//! The temperature-to-fan-speed ladder and its hysteresis walk.

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// One rung of the ladder.
///
/// A rung's `enter` is the threshold into the rung above and sits well
/// above the upper rung's `leave`, so adjacent bands overlap and a
/// small temperature wobble near a threshold cannot flip the level
/// back and forth.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempLevel {
    /// Temperature at/above which the next higher level is entered.
    pub enter: u8,
    /// Temperature at/below which this level is left downwards.
    pub leave: u8,
    /// Fan speed command for this level. 0 off; 1-100 variable with
    /// lower meaning faster; 101-255 fixed maximum.
    pub fan_speed: u8,
}

/// Default table, tuned for a 4th-batch X62 with the 1210 BIOS. A speed
/// around 80 would be nicer than 0 for the idle rung, but on this board
/// that speed produces an annoying whine.
pub const DEFAULT_LEVELS: [TempLevel; 5] = [
    TempLevel { enter: 40, leave: 0, fan_speed: 100 },
    TempLevel { enter: 55, leave: 40, fan_speed: 99 },
    TempLevel { enter: 65, leave: 45, fan_speed: 60 },
    TempLevel { enter: 70, leave: 55, fan_speed: 20 },
    TempLevel { enter: 85, leave: 60, fan_speed: 1 },
];

/// Validated, immutable ladder: non-empty, ordered by increasing
/// temperature range, each rung's band overlapping.
#[derive(Clone, Debug)]
pub struct LevelLadder {
    levels: Vec<TempLevel>,
}

impl LevelLadder {
    pub fn new(levels: Vec<TempLevel>) -> Result<Self, ControlError> {
        if levels.is_empty() {
            return Err(ControlError::InvalidArgument(
                "level table must not be empty".into(),
            ));
        }
        for (i, l) in levels.iter().enumerate() {
            if l.leave > l.enter {
                return Err(ControlError::InvalidArgument(format!(
                    "level {}: leave ({}) above enter ({})",
                    i, l.leave, l.enter
                )));
            }
        }
        Ok(LevelLadder { levels })
    }

    pub fn default_table() -> Self {
        // the built-in table is known good
        LevelLadder { levels: DEFAULT_LEVELS.to_vec() }
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn levels(&self) -> &[TempLevel] {
        &self.levels
    }
}

/// The single mutable value of the whole program: which rung we are on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ControllerState {
    level: usize,
}

impl ControllerState {
    pub fn new() -> Self {
        ControllerState { level: 0 }
    }

    pub fn level(&self) -> usize {
        self.level
    }

    pub fn current<'a>(&self, ladder: &'a LevelLadder) -> &'a TempLevel {
        &ladder.levels()[self.level]
    }

    /// One tick of the hysteresis walk. Moves at most one rung in
    /// either direction; the next tick continues the climb or descent
    /// if the temperature still warrants it. The current rung's `enter`
    /// is the threshold into the rung above, its `leave` the threshold
    /// into the rung below; the gap between a rung's `leave` and the
    /// rung below's `enter` is the hysteresis band.
    pub fn step(&mut self, ladder: &LevelLadder, temp: u8) -> usize {
        let levels = ladder.levels();
        if self.level > 0 && temp < levels[self.level].leave {
            self.level -= 1;
        } else if self.level < levels.len() - 1 && temp > levels[self.level].enter {
            self.level += 1;
        }
        self.level
    }
}
