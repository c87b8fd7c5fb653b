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

//! The embedded controller's command/response protocol.
//!
//! Every exchange follows the same shape: wait until the EC is ready,
//! write a command byte to the status/command port, wait until the EC
//! has consumed it, then move the payload or result through the data
//! port. The EC offers no interrupt; all waiting is bounded busy
//! polling, and an exhausted wait is fatal because it means the EC came
//! up in a state we don't understand (seen after suspend/resume).

use std::thread;
use std::time::Duration;

use crate::error::ControlError;
use crate::logger;
use crate::pci;
use crate::ports::{PortIo, RawPorts, DATA_PORT, EC_DATA, EC_STATUS, INDEX_PORT};

/// Bounded wait: 1000 samples at 1 ms granularity, roughly one second.
const HANDSHAKE_ATTEMPTS: u32 = 1000;
const HANDSHAKE_POLL: Duration = Duration::from_millis(1);

/// Status port bit 0: a result byte is ready on the data port.
const STATUS_OUTPUT_READY: u8 = 0x01;
/// Status port bit 1: the EC is still consuming the last write.
const STATUS_BUSY: u8 = 0x02;

const CMD_UNLOCK: u8 = 0x33;
const CMD_READ_TEMP: u8 = 0x44;
const CMD_SET_FAN: u8 = 0x55;

/// Index/data writes that configure the Super I/O routing registers.
/// Reverse engineered; empirically required, not understood. Values and
/// order must be preserved exactly.
const ROUTING_SEQUENCE: [(u16, u8); 10] = [
    (INDEX_PORT, 0x07),
    (DATA_PORT, 0x12),
    (INDEX_PORT, 0x30),
    (DATA_PORT, 0x00),
    (INDEX_PORT, 0x61),
    (DATA_PORT, 0x68),
    (INDEX_PORT, 0x63),
    (DATA_PORT, 0x6C),
    (INDEX_PORT, 0x30),
    (DATA_PORT, 0x01),
];

/// Protocol handle. Generic over [`PortIo`] so the whole command layer
/// can run against scripted ports in tests.
pub struct Ec<P: PortIo> {
    ports: P,
}

impl<P: PortIo> Ec<P> {
    pub fn new(ports: P) -> Self {
        Ec { ports }
    }

    /// Wait for the busy bit to clear. The EC must never be handed a
    /// new command while it is set.
    fn wait_busy_clear(&mut self) -> Result<(), ControlError> {
        for _ in 0..HANDSHAKE_ATTEMPTS {
            if self.ports.inb(EC_STATUS) & STATUS_BUSY == 0 {
                return Ok(());
            }
            thread::sleep(HANDSHAKE_POLL);
        }
        Err(ControlError::HandshakeTimeout("busy bit never cleared"))
    }

    /// Wait for the output-ready bit, i.e. for the EC to finish
    /// producing a result byte (a temperature conversion takes a while).
    fn wait_output_ready(&mut self) -> Result<(), ControlError> {
        for _ in 0..HANDSHAKE_ATTEMPTS {
            if self.ports.inb(EC_STATUS) & STATUS_OUTPUT_READY != 0 {
                return Ok(());
            }
            thread::sleep(HANDSHAKE_POLL);
        }
        Err(ControlError::HandshakeTimeout("output-ready bit never set"))
    }

    /// Issue one command byte. The wait on both sides matters: the EC
    /// must be ready to accept, and must have consumed the command
    /// before the caller touches the data port.
    fn send_command(&mut self, cmd: u8) -> Result<(), ControlError> {
        self.wait_busy_clear()?;
        self.ports.outb(EC_STATUS, cmd);
        self.wait_busy_clear()
    }

    /// Current temperature as the raw byte the EC reports (roughly
    /// Celsius). Deliberately not range checked; the hardware's value
    /// range is undocumented.
    pub fn read_temperature(&mut self) -> Result<u8, ControlError> {
        self.send_command(CMD_READ_TEMP)?;
        self.ports.outb(EC_DATA, 0x00);
        self.wait_output_ready()?;
        Ok(self.ports.inb(EC_DATA))
    }

    /// Command a fan speed. 0 is off; 1-100 is variable, lower number
    /// meaning faster; 101-255 is fixed maximum, faster than value 1.
    pub fn set_fan_speed(&mut self, speed: u8) -> Result<(), ControlError> {
        self.send_command(CMD_SET_FAN)?;
        self.ports.outb(EC_DATA, speed);
        Ok(())
    }

    /// Emit the routing-register writes. Plain port writes, no
    /// handshake involved.
    fn configure_routing(&mut self) {
        for (port, value) in ROUTING_SEQUENCE {
            self.ports.outb(port, value);
        }
    }

    /// One more exchange the EC wants before temperature and fan
    /// commands behave. Purpose unknown; kept verbatim.
    fn unlock(&mut self) -> Result<(), ControlError> {
        self.send_command(CMD_UNLOCK)?;
        self.ports.outb(EC_DATA, 0x06);
        Ok(())
    }

    /// Routing writes plus the unlock exchange, in that order. Split
    /// from [`initialize`] so the sequence can run against fake ports.
    pub fn setup(&mut self) -> Result<(), ControlError> {
        self.configure_routing();
        self.unlock()
    }

    #[cfg(test)]
    pub fn ports_ref(&self) -> &P {
        &self.ports
    }

    #[cfg(test)]
    pub fn ports_mut(&mut self) -> &mut P {
        &mut self.ports
    }
}

/// One-shot device initialization. Each step is a hard precondition for
/// the next; the first failure aborts, no retries at this layer.
pub fn initialize() -> Result<Ec<RawPorts>, ControlError> {
    pci::enable_fan_control()?;
    logger::log_event("pci_enabled", serde_json::json!({}));

    let ports = RawPorts::request()?;
    logger::log_event("ports_acquired", serde_json::json!({}));

    let mut ec = Ec::new(ports);
    ec.setup()?;
    logger::log_event("ec_initialized", serde_json::json!({}));
    Ok(ec)
}
