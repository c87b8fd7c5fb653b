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

//! Privileged I/O port access.
//!
//! This is the only module that touches raw ports. Everything above it
//! works through the [`PortIo`] trait, so the protocol and control
//! layers can be exercised against fakes in tests.

use std::io;

use crate::error::ControlError;

/// Index half of the Super I/O index/data pair used during routing setup.
pub const INDEX_PORT: u16 = 0x4E;
/// Data half of the Super I/O index/data pair.
pub const DATA_PORT: u16 = 0x4F;
/// EC data port: command payloads and results.
pub const EC_DATA: u16 = 0x68;
/// EC status/command port: busy/ready bits, command bytes.
pub const EC_STATUS: u16 = 0x6C;

/// Byte-wide port reads and writes.
#[cfg_attr(test, mockall::automock)]
pub trait PortIo {
    fn inb(&mut self, port: u16) -> u8;
    fn outb(&mut self, port: u16, value: u8);
}

/// The real thing. Can only be constructed through [`RawPorts::request`],
/// which acquires ioperm for exactly the ranges the protocol touches.
pub struct RawPorts {
    _private: (),
}

fn request_range(port: u16, len: u16) -> Result<(), ControlError> {
    let rc = unsafe { libc::ioperm(port as libc::c_ulong, len as libc::c_ulong, 1) };
    if rc != 0 {
        return Err(ControlError::PermissionDenied {
            port,
            len,
            source: io::Error::last_os_error(),
        });
    }
    Ok(())
}

impl RawPorts {
    /// Acquire port access for the index/data pair, the EC data port and
    /// the EC status port. Requires root (or CAP_SYS_RAWIO).
    pub fn request() -> Result<Self, ControlError> {
        request_range(INDEX_PORT, 2)?;
        request_range(EC_DATA, 1)?;
        request_range(EC_STATUS, 1)?;
        Ok(RawPorts { _private: () })
    }
}

impl PortIo for RawPorts {
    #[inline]
    fn inb(&mut self, port: u16) -> u8 {
        let value: u8;
        unsafe {
            core::arch::asm!(
                "in al, dx",
                in("dx") port,
                out("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
        value
    }

    #[inline]
    fn outb(&mut self, port: u16, value: u8) {
        unsafe {
            core::arch::asm!(
                "out dx, al",
                in("dx") port,
                in("al") value,
                options(nomem, nostack, preserves_flags)
            );
        }
    }
}
