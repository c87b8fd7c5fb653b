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

use std::io;

use thiserror::Error;

/// Everything that can go fatally wrong while talking to the EC.
///
/// None of these are retried inside the core; each surfaces to `main`,
/// which turns it into a diagnostic and an exit code.
#[derive(Error, Debug)]
pub enum ControlError {
    #[error("could not get permission for I/O ports 0x{port:02X}..0x{:02X}: {source}", .port + .len - 1)]
    PermissionDenied {
        port: u16,
        len: u16,
        source: io::Error,
    },
    #[error("could not match any PCI device")]
    DeviceNotFound,
    #[error("matched multiple PCI devices")]
    AmbiguousDevice,
    #[error("EC handshake timed out: {0}")]
    HandshakeTimeout(&'static str),
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ControlError {
    /// Exit code policy: a handshake timeout gets its own code so a
    /// supervisor can tell "EC in an unexpected state" (typically after
    /// a suspend/resume cycle) apart from ordinary fatal errors.
    pub fn exit_code(&self) -> i32 {
        match self {
            ControlError::HandshakeTimeout(_) => 2,
            _ => 1,
        }
    }
}
