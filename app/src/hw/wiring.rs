//! Two-phase hardware wiring. Phase one records every descriptor from the
//! configuration; phase two resolves name-based cross references. A device
//! whose dependency cannot be resolved is reported and omitted, never
//! dropped silently, and never fatal to the rest of the wiring.

use log::info;

use internal::domain::error::WiringError;

use crate::config::hardware_config::HardwareEntry;
use crate::hw::{pid::Pid, serial::SerialDevice};

pub struct Wiring {
    entries: Vec<HardwareEntry>,
}

/// The resolved devices the controller needs. `None` means the descriptor
/// was absent or failed to resolve (reported alongside).
#[derive(Default)]
pub struct WiredHardware {
    pub moving: Option<SerialDevice>,
    pub extruder: Option<SerialDevice>,
    pub mix_pid: Option<Pid>,
}

impl Wiring {
    pub fn record(entries: Vec<HardwareEntry>) -> Self {
        Wiring { entries }
    }

    pub fn resolve(self) -> (WiredHardware, Vec<WiringError>) {
        let mut hardware = WiredHardware::default();
        let mut failures = Vec::new();

        for entry in &self.entries {
            let outcome = match entry.kind.as_str() {
                // Leaf transports; consumed through the entries that
                // reference them.
                "uart" => Ok(()),
                "smoothie" => self
                    .serial_for(entry)
                    .map(|device| hardware.moving = Some(device)),
                "extruder" => self
                    .serial_for(entry)
                    .map(|device| hardware.extruder = Some(device)),
                "pid" => Self::pid_for(entry).map(|pid| hardware.mix_pid = Some(pid)),
                other => Err(WiringError::UnknownKind(other.to_string())),
            };
            match outcome {
                Ok(()) => info!("wired hardware '{}' ({})", entry.name, entry.kind),
                Err(err) => failures.push(err),
            }
        }
        (hardware, failures)
    }

    /// Resolves the `dev` reference of `entry` to a uart descriptor and
    /// builds the line device on its port.
    fn serial_for(&self, entry: &HardwareEntry) -> Result<SerialDevice, WiringError> {
        let dependency = entry.dev.as_ref().ok_or(WiringError::InvalidEntry {
            name: entry.name.clone(),
            reason: "missing 'dev' reference".into(),
        })?;
        let uart = self
            .entries
            .iter()
            .find(|candidate| candidate.kind == "uart" && &candidate.name == dependency)
            .ok_or(WiringError::UnresolvedDependency {
                name: entry.name.clone(),
                dependency: dependency.clone(),
            })?;

        let path = uart.path.as_ref().ok_or(WiringError::InvalidEntry {
            name: uart.name.clone(),
            reason: "missing 'path'".into(),
        })?;
        let baud = uart.baud.ok_or(WiringError::InvalidEntry {
            name: uart.name.clone(),
            reason: "missing 'baud'".into(),
        })?;
        Ok(SerialDevice::new(entry.name.clone(), path.clone(), baud))
    }

    fn pid_for(entry: &HardwareEntry) -> Result<Pid, WiringError> {
        match (entry.kp, entry.ki, entry.kd) {
            (Some(kp), Some(ki), Some(kd)) => Ok(Pid::new(kp, ki, kd)),
            _ => Err(WiringError::InvalidEntry {
                name: entry.name.clone(),
                reason: "missing pid gains".into(),
            }),
        }
    }
}
