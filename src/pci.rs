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

//! PCI side of the one-shot device setup.
//!
//! The EC's fan subsystem only accepts external control after a magic
//! dword is written into the LPC bridge's configuration space. We find
//! the bridge by exact vendor/device id in sysfs and patch its `config`
//! file directly, which is what libpci-based tools do under the hood.

use std::fs::{self, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::ControlError;

const SYSFS_PCI_ROOT: &str = "/sys/bus/pci/devices";

/// Intel LPC bridge of the X62 board.
const VENDOR_ID: u16 = 0x8086;
const DEVICE_ID: u16 = 0x9cc3;

/// Config-space offset and value that switch the EC into externally
/// controllable fan mode. Reverse engineered; meaning unknown.
const FAN_MODE_OFFSET: u64 = 0x84;
const FAN_MODE_VALUE: u32 = 0x0004_0069;

fn read_trimmed<P: AsRef<Path>>(path: P) -> io::Result<String> {
    Ok(fs::read_to_string(path)?.trim().to_string())
}

/// Sysfs id files hold values like "0x8086\n".
fn parse_sysfs_id(raw: &str) -> Option<u16> {
    let hex = raw.strip_prefix("0x").unwrap_or(raw);
    u16::from_str_radix(hex, 16).ok()
}

/// Locate the one device matching the expected vendor/device pair.
///
/// The protocol assumes exactly one instance exists; matching more than
/// one means the assumption is wrong and we refuse to pick silently.
fn find_device(root: &Path) -> Result<PathBuf, ControlError> {
    let mut matched: Option<PathBuf> = None;

    let entries = fs::read_dir(root).map_err(|_| ControlError::DeviceNotFound)?;
    for ent in entries.flatten() {
        let dir = ent.path();
        if !dir.is_dir() {
            continue;
        }
        let vendor = match read_trimmed(dir.join("vendor")).ok().as_deref().and_then(parse_sysfs_id) {
            Some(v) => v,
            None => continue,
        };
        let device = match read_trimmed(dir.join("device")).ok().as_deref().and_then(parse_sysfs_id) {
            Some(v) => v,
            None => continue,
        };
        if vendor == VENDOR_ID && device == DEVICE_ID {
            if matched.is_some() {
                return Err(ControlError::AmbiguousDevice);
            }
            matched = Some(dir);
        }
    }

    matched.ok_or(ControlError::DeviceNotFound)
}

fn write_fan_mode(device_dir: &Path) -> Result<(), ControlError> {
    let mut cfg = OpenOptions::new()
        .write(true)
        .open(device_dir.join("config"))?;
    cfg.seek(SeekFrom::Start(FAN_MODE_OFFSET))?;
    cfg.write_all(&FAN_MODE_VALUE.to_le_bytes())?;
    Ok(())
}

fn enable_fan_control_in(root: &Path) -> Result<(), ControlError> {
    let dir = find_device(root)?;
    write_fan_mode(&dir)
}

/// Match the LPC bridge and flip the EC into externally controllable
/// fan mode. Must run before any handshake traffic.
pub fn enable_fan_control() -> Result<(), ControlError> {
    enable_fan_control_in(Path::new(SYSFS_PCI_ROOT))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Read;
    use tempfile::TempDir;

    fn add_device(root: &Path, name: &str, vendor: &str, device: &str) -> PathBuf {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("vendor"), format!("{}\n", vendor)).unwrap();
        fs::write(dir.join("device"), format!("{}\n", device)).unwrap();
        fs::write(dir.join("config"), vec![0u8; 256]).unwrap();
        dir
    }

    #[test]
    fn test_parse_sysfs_id() {
        assert_eq!(parse_sysfs_id("0x8086"), Some(0x8086));
        assert_eq!(parse_sysfs_id("9cc3"), Some(0x9cc3));
        assert_eq!(parse_sysfs_id("garbage"), None);
        assert_eq!(parse_sysfs_id(""), None);
    }

    #[test]
    fn test_find_device_no_match() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "0000:00:02.0", "0x8086", "0x1616");
        add_device(tmp.path(), "0000:01:00.0", "0x10de", "0x1c82");
        match find_device(tmp.path()) {
            Err(ControlError::DeviceNotFound) => {}
            other => panic!("expected DeviceNotFound, got {:?}", other.map(|p| p.display().to_string())),
        }
    }

    #[test]
    fn test_find_device_missing_root() {
        let tmp = TempDir::new().unwrap();
        let gone = tmp.path().join("does-not-exist");
        assert!(matches!(find_device(&gone), Err(ControlError::DeviceNotFound)));
    }

    #[test]
    fn test_find_device_single_match() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "0000:00:02.0", "0x8086", "0x1616");
        let want = add_device(tmp.path(), "0000:00:1f.3", "0x8086", "0x9cc3");
        let got = find_device(tmp.path()).unwrap();
        assert_eq!(got, want);
    }

    #[test]
    fn test_find_device_ambiguous() {
        let tmp = TempDir::new().unwrap();
        add_device(tmp.path(), "0000:00:1f.3", "0x8086", "0x9cc3");
        add_device(tmp.path(), "0000:00:1f.4", "0x8086", "0x9cc3");
        assert!(matches!(find_device(tmp.path()), Err(ControlError::AmbiguousDevice)));
    }

    #[test]
    fn test_find_device_skips_incomplete_entries() {
        let tmp = TempDir::new().unwrap();
        // entry with no id files at all
        fs::create_dir_all(tmp.path().join("power")).unwrap();
        let want = add_device(tmp.path(), "0000:00:1f.3", "0x8086", "0x9cc3");
        assert_eq!(find_device(tmp.path()).unwrap(), want);
    }

    #[test]
    fn test_enable_writes_dword_at_offset() {
        let tmp = TempDir::new().unwrap();
        let dir = add_device(tmp.path(), "0000:00:1f.3", "0x8086", "0x9cc3");

        enable_fan_control_in(tmp.path()).unwrap();

        let mut buf = Vec::new();
        File::open(dir.join("config")).unwrap().read_to_end(&mut buf).unwrap();
        // 0x0004_0069 little endian at 0x84, rest untouched
        assert_eq!(&buf[0x84..0x88], &[0x69, 0x00, 0x04, 0x00]);
        assert!(buf[..0x84].iter().all(|&b| b == 0));
        assert!(buf[0x88..].iter().all(|&b| b == 0));
    }
}
