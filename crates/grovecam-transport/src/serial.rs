use std::io::{ErrorKind, Read, Write};
use std::time::Duration;

use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};
use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::traits::SerialTransport;

/// Driver-level timeout for a single read call. Reads only ever request
/// bytes that `bytes_to_read` reported, so this is rarely reached.
const DRIVER_TIMEOUT: Duration = Duration::from_millis(100);

/// Serial device backed by the `serialport` crate. The device is released
/// by [`SerialTransport::close`]; later I/O fails with
/// [`TransportError::Closed`].
pub struct SerialPortTransport {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl SerialPortTransport {
    /// Open `port` at `baud` with 8 data bits, no parity, one stop bit.
    pub fn open(port: &str, baud: u32) -> Result<Self> {
        let handle = serialport::new(port, baud)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(DRIVER_TIMEOUT)
            .open()
            .map_err(|err| TransportError::Open {
                port: port.to_string(),
                baud,
                source: err.into(),
            })?;

        info!(port, baud, "opened serial port");
        Ok(Self::from_port(handle, port))
    }

    /// Wrap an already opened port.
    pub fn from_port(port: Box<dyn SerialPort>, name: impl Into<String>) -> Self {
        Self {
            port: Some(port),
            name: name.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>> {
        self.port.as_mut().ok_or(TransportError::Closed)
    }

    /// Device path this transport was opened on.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl SerialTransport for SerialPortTransport {
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port()?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let port = self.port()?;
        loop {
            match port.read(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::TimedOut => return Ok(0),
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn available(&mut self) -> Result<usize> {
        let pending = self
            .port()?
            .bytes_to_read()
            .map_err(|err| TransportError::Io(err.into()))?;
        Ok(pending as usize)
    }

    fn close(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!(port = %self.name, "released serial port");
        }
        Ok(())
    }
}

/// A serial device found on the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub name: String,
    pub kind: &'static str,
    pub description: Option<String>,
}

/// Enumerate serial devices visible to the host.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().map_err(|err| TransportError::Io(err.into()))?;
    Ok(ports
        .into_iter()
        .map(|port| {
            let (kind, description) = match port.port_type {
                SerialPortType::UsbPort(usb) => (
                    "usb",
                    usb.product
                        .or(usb.manufacturer)
                        .or_else(|| Some(format!("{:04x}:{:04x}", usb.vid, usb.pid))),
                ),
                SerialPortType::PciPort => ("pci", None),
                SerialPortType::BluetoothPort => ("bluetooth", None),
                SerialPortType::Unknown => ("unknown", None),
            };
            PortInfo {
                name: port.port_name,
                kind,
                description,
            }
        })
        .collect())
}

#[cfg(all(test, unix))]
mod tests {
    use serialport::TTYPort;

    use super::*;

    #[test]
    fn close_releases_the_device() {
        let (host, _device) = TTYPort::pair().expect("pseudo terminal pair");
        let mut transport = SerialPortTransport::from_port(Box::new(host), "pty");
        assert!(transport.is_open());
        assert_eq!(transport.available().unwrap(), 0);

        transport.close().unwrap();

        assert!(!transport.is_open());
        assert!(matches!(transport.available(), Err(TransportError::Closed)));
        assert!(matches!(
            transport.write_all(&[0xAA]),
            Err(TransportError::Closed)
        ));
        assert!(matches!(
            transport.read(&mut [0u8; 1]),
            Err(TransportError::Closed)
        ));
        transport.close().unwrap();
    }
}
