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

//! The temperature poll loop.

use std::thread;
use std::time::Duration;

use crate::ec::Ec;
use crate::error::ControlError;
use crate::levels::{ControllerState, LevelLadder};
use crate::logger;
use crate::ports::PortIo;

pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);

/// One tick: sample the temperature, walk the ladder, command the fan.
///
/// The speed is written even when the level did not change. The EC is
/// known to spontaneously revert to its own firmware-driven control,
/// and only a repeated explicit write reliably keeps it in the
/// externally commanded state.
pub fn tick<P: PortIo>(
    ec: &mut Ec<P>,
    ladder: &LevelLadder,
    state: &mut ControllerState,
) -> Result<(), ControlError> {
    let temp = ec.read_temperature()?;
    println!("Current temperature: {}", temp);

    let before = state.level();
    let level = state.step(ladder, temp);
    let rung = state.current(ladder);

    if level < before {
        println!(
            "  Leaving level {} since the temperature is below {}",
            before,
            ladder.levels()[before].leave
        );
        println!("  New fan speed: {}", rung.fan_speed);
    } else if level > before {
        println!(
            "  Leaving level {} since the temperature is above {}",
            before,
            ladder.levels()[before].enter
        );
        println!("  New fan speed: {}", rung.fan_speed);
    } else {
        println!("  Fan speed: {}", rung.fan_speed);
    }

    ec.set_fan_speed(rung.fan_speed)?;
    logger::log_event(
        "tick",
        serde_json::json!({
            "temp": temp,
            "level": level,
            "fan_speed": rung.fan_speed,
        }),
    );
    Ok(())
}

/// Drive [`tick`] forever at the given interval. No termination
/// condition of its own; killing the process is the only way out.
pub fn run_manager<P: PortIo>(
    ec: &mut Ec<P>,
    ladder: &LevelLadder,
    interval: Duration,
) -> Result<(), ControlError> {
    let mut state = ControllerState::new();
    loop {
        tick(ec, ladder, &mut state)?;
        thread::sleep(interval);
    }
}
