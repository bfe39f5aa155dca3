use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use anyhow::{Context, anyhow};
use log::{info, warn};

use internal::port::device::DevicePort;

const READ_TIMEOUT: Duration = Duration::from_millis(50);
const RECONNECT_PAUSE: Duration = Duration::from_millis(500);

/// Line-protocol device over a serial port: newline-terminated instructions
/// out, buffered line reads in. The port is opened lazily by `connect`.
pub struct SerialDevice {
    name: String,
    path: String,
    baud: u32,
    port: Option<Box<dyn serialport::SerialPort>>,
    buffer: String,
}

impl SerialDevice {
    pub fn new(name: String, path: String, baud: u32) -> Self {
        SerialDevice {
            name,
            path,
            baud,
            port: None,
            buffer: String::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn pop_line(&mut self) -> Option<String> {
        let newline = self.buffer.find('\n')?;
        let line = self.buffer[..newline].trim_end_matches('\r').to_string();
        self.buffer.drain(..=newline);
        Some(line)
    }
}

impl DevicePort for SerialDevice {
    fn connect(&mut self, retries: u32) -> anyhow::Result<()> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match serialport::new(&self.path, self.baud)
                .timeout(READ_TIMEOUT)
                .open()
            {
                Ok(port) => {
                    info!("device '{}' connected on '{}'", self.name, self.path);
                    self.port = Some(port);
                    return Ok(());
                }
                Err(err) if attempt < retries => {
                    warn!(
                        "device '{}' attempt {attempt} on '{}' failed: {err}",
                        self.name, self.path
                    );
                    std::thread::sleep(RECONNECT_PAUSE);
                }
                Err(err) => {
                    return Err(anyhow!(
                        "could not open '{}' for device '{}' after {attempt} attempts: {err}",
                        self.path,
                        self.name
                    ));
                }
            }
        }
    }

    fn send(&mut self, instruction: &str) -> anyhow::Result<()> {
        let port = self
            .port
            .as_mut()
            .with_context(|| format!("device '{}' is not connected", self.name))?;
        port.write_all(instruction.as_bytes())?;
        port.write_all(b"\n")?;
        Ok(())
    }

    fn recv(&mut self) -> Option<String> {
        if let Some(line) = self.pop_line() {
            return Some(line);
        }
        let port = self.port.as_mut()?;

        let mut chunk = [0u8; 256];
        match port.read(&mut chunk) {
            Ok(0) => None,
            Ok(n) => {
                self.buffer.push_str(&String::from_utf8_lossy(&chunk[..n]));
                self.pop_line()
            }
            Err(err) if err.kind() == ErrorKind::TimedOut => None,
            Err(err) => {
                warn!("device '{}' read failed: {err}", self.name);
                None
            }
        }
    }
}
