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

use std::process;

use x62fan::ec;
use x62fan::error::ControlError;
use x62fan::levels::LevelLadder;
use x62fan::logger;
use x62fan::manager;

fn usage() {
    eprintln!(
        "In every command below we'll fail with exit code 2 in\n\
         the case of unexpected data from an IO port, which is\n\
         useful since this seems to happen after a resume.\n\
         \n\
         x62fan temp\n\
         \tDisplays the current temperature.\n\
         \n\
         x62fan set-fan-speed <fan-speed>\n\
         \tSets the current fan speed (0-255). The EC will kick back\n\
         \tin after a few seconds.\n\
         \n\
         x62fan manager\n\
         \tManages the fan speed for you.\n\
         \n\
         Pass --logging anywhere to append JSON events to\n\
         /etc/x62fan/logs.json."
    );
}

fn dispatch(args: &[String]) -> anyhow::Result<()> {
    match (args.get(1).map(String::as_str), args.len()) {
        (Some("temp"), 2) => {
            let mut ec = ec::initialize()?;
            let temp = ec.read_temperature()?;
            println!("Current temperature: {}", temp);
            Ok(())
        }
        (Some("set-fan-speed"), 3) => {
            let mut ec = ec::initialize()?;
            let speed: u8 = args[2].parse().map_err(|_| {
                ControlError::InvalidArgument(format!("invalid fan speed {}", args[2]))
            })?;
            println!("Setting fan speed to {}", speed);
            ec.set_fan_speed(speed)?;
            Ok(())
        }
        (Some("manager"), 2) => {
            let mut ec = ec::initialize()?;
            let ladder = LevelLadder::default_table();
            manager::run_manager(&mut ec, &ladder, manager::DEFAULT_INTERVAL)?;
            Ok(())
        }
        _ => {
            usage();
            Ok(())
        }
    }
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<ControlError>()
        .map(ControlError::exit_code)
        .unwrap_or(1)
}

fn main() {
    // Port and config-space access need root no matter what.
    if unsafe { libc::geteuid() } != 0 {
        eprintln!("Error: x62fan requires root privileges to reach the EC's IO ports.");
        eprintln!(
            "Please run with: sudo {}",
            std::env::args().next().unwrap_or_else(|| "x62fan".to_string())
        );
        process::exit(1);
    }

    let args: Vec<String> = std::env::args().collect();

    let logging_enabled = args.iter().any(|a| a == "--logging");
    if logging_enabled {
        logger::init_logging();
        logger::log_event("startup", serde_json::json!({ "args": args }));
    }

    let args: Vec<String> = args.into_iter().filter(|a| a != "--logging").collect();

    if let Err(err) = dispatch(&args) {
        eprintln!("x62fan: {}", err);
        if logging_enabled {
            logger::log_event("fatal_error", serde_json::json!({ "error": err.to_string() }));
        }
        process::exit(exit_code_for(&err));
    }
}
