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

//! x62fan - fan control for the 51nb X62 laptop
//!
//! Speaks the reverse-engineered port-level protocol of the X62's
//! embedded controller and runs a hysteresis-based control loop that
//! maps temperature samples onto a ladder of fan-speed levels.

pub mod ec;
pub mod error;
pub mod levels;
pub mod logger;
pub mod manager;
pub mod pci;
pub mod ports;

#[cfg(test)]
pub mod test_utils;
