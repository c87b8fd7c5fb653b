/*
 * Test utilities and fakes for x62fan
 *
 * Shared helpers for exercising the EC protocol and the poll loop
 * without hardware.
 */

use std::collections::VecDeque;

use crate::ports::{PortIo, EC_DATA, EC_STATUS};

/// A well-behaved fake EC on the other side of the port pair.
///
/// The status port always reads 0x01: never busy, output always ready,
/// so handshakes complete on the first poll and tests run without the
/// 1 ms waits. Temperature reads are served from a queue; every write
/// is recorded.
pub struct FakeEcPorts {
    temps: VecDeque<u8>,
    writes: Vec<(u16, u8)>,
    ec_speed: Option<u8>,
    wedged: bool,
}

impl FakeEcPorts {
    pub fn with_temps(temps: &[u8]) -> Self {
        FakeEcPorts {
            temps: temps.iter().copied().collect(),
            writes: Vec::new(),
            ec_speed: None,
            wedged: false,
        }
    }

    /// An EC whose busy bit never clears, as seen after a bad
    /// suspend/resume cycle.
    pub fn wedged() -> Self {
        let mut fake = FakeEcPorts::with_temps(&[]);
        fake.wedged = true;
        fake
    }

    /// The EC snatching fan control back on its own. Leaves no trace
    /// on the ports; it only overwrites the fake's notion of the
    /// active speed.
    pub fn simulate_firmware_override(&mut self) {
        self.ec_speed = Some(0);
    }

    /// Speed the fake EC currently believes it was commanded.
    pub fn ec_speed(&self) -> Option<u8> {
        self.ec_speed
    }

    pub fn writes(&self) -> &[(u16, u8)] {
        &self.writes
    }

    /// All speed bytes that arrived through a 0x55 command, in order:
    /// each (EC_STATUS, 0x55) write followed by the next (EC_DATA,
    /// value) write.
    pub fn fan_speed_writes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut pending = false;
        for &(port, value) in &self.writes {
            match port {
                EC_STATUS => pending = value == 0x55,
                EC_DATA if pending => {
                    out.push(value);
                    pending = false;
                }
                _ => {}
            }
        }
        out
    }
}

impl PortIo for FakeEcPorts {
    fn inb(&mut self, port: u16) -> u8 {
        match port {
            EC_STATUS if self.wedged => 0x02,
            EC_STATUS => 0x01,
            EC_DATA => self.temps.pop_front().unwrap_or(0),
            _ => 0,
        }
    }

    fn outb(&mut self, port: u16, value: u8) {
        if port == EC_DATA {
            if let Some(&(last_port, last_cmd)) = self.writes.last() {
                if last_port == EC_STATUS && last_cmd == 0x55 {
                    self.ec_speed = Some(value);
                }
            }
        }
        self.writes.push((port, value));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fake_serves_temps_in_order() {
        let mut fake = FakeEcPorts::with_temps(&[40, 50]);
        assert_eq!(fake.inb(EC_DATA), 40);
        assert_eq!(fake.inb(EC_DATA), 50);
        assert_eq!(fake.inb(EC_DATA), 0);
    }

    #[test]
    fn test_fake_extracts_fan_speed_writes() {
        let mut fake = FakeEcPorts::with_temps(&[]);
        fake.outb(EC_STATUS, 0x55);
        fake.outb(EC_DATA, 60);
        fake.outb(EC_STATUS, 0x44);
        fake.outb(EC_DATA, 0x00);
        fake.outb(EC_STATUS, 0x55);
        fake.outb(EC_DATA, 20);
        assert_eq!(fake.fan_speed_writes(), vec![60, 20]);
        assert_eq!(fake.ec_speed(), Some(20));
    }

    #[test]
    fn test_wedged_fake_always_reads_busy() {
        let mut fake = FakeEcPorts::wedged();
        for _ in 0..5 {
            assert_eq!(fake.inb(EC_STATUS) & 0x02, 0x02);
        }
    }
}
