//! TCP bridge: the stand-in bus driver for running the two firmware images
//! as host processes.
//!
//! Each Component listens on `base_port + addr`; the AP connects lazily per
//! address. Frames travel as a one-byte length prefix followed by the
//! payload, and the controller answers every peripheral frame with a single
//! ACK byte, mirroring the frame/ACK contract of the real bus driver.

use super::{check_buffer_fit, check_frame_len, BusController, BusPeripheral, FrameLink};
use crate::wire::BusAddr;
use crate::{Error, Result};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;
use tracing::debug;

/// Default port window; address 0x24 becomes port 28100.
pub const DEFAULT_BASE_PORT: u16 = 28064;

const ACK: u8 = 0x06;

fn transport_err(e: std::io::Error) -> Error {
    Error::Transport(e.to_string())
}

fn write_frame(stream: &mut TcpStream, frame: &[u8]) -> Result<()> {
    check_frame_len(frame.len())?;
    stream.write_all(&[frame.len() as u8]).map_err(transport_err)?;
    stream.write_all(frame).map_err(transport_err)?;
    stream.flush().map_err(transport_err)
}

fn read_frame(stream: &mut TcpStream, out: &mut [u8]) -> Result<usize> {
    let mut len_byte = [0u8; 1];
    stream.read_exact(&mut len_byte).map_err(transport_err)?;
    let len = len_byte[0] as usize;
    check_buffer_fit(len, out.len())?;
    stream.read_exact(&mut out[..len]).map_err(transport_err)?;
    Ok(len)
}

/// Controller end of the bridge.
pub struct TcpBusController {
    host: String,
    base_port: u16,
    timeout: Duration,
    conns: HashMap<BusAddr, TcpStream>,
}

impl TcpBusController {
    pub fn new(host: impl Into<String>, base_port: u16, timeout: Duration) -> Self {
        Self { host: host.into(), base_port, timeout, conns: HashMap::new() }
    }

    fn stream(&mut self, addr: BusAddr) -> Result<&mut TcpStream> {
        match self.conns.entry(addr) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let target = (self.host.as_str(), self.base_port + addr as u16);
                let stream = TcpStream::connect(target).map_err(|e| {
                    Error::Transport(format!("no device at address 0x{addr:02x}: {e}"))
                })?;
                stream.set_nodelay(true).map_err(transport_err)?;
                stream
                    .set_read_timeout(Some(self.timeout))
                    .map_err(transport_err)?;
                debug!(addr = format_args!("0x{addr:02x}"), "bridge connected");
                Ok(entry.insert(stream))
            }
        }
    }
}

impl BusController for TcpBusController {
    fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<usize> {
        let stream = self.stream(addr)?;
        if let Err(e) = write_frame(stream, frame) {
            // A dead connection is indistinguishable from an absent device;
            // drop it so the next transaction redials.
            self.conns.remove(&addr);
            return Err(e);
        }
        Ok(frame.len())
    }

    fn poll_and_receive(&mut self, addr: BusAddr, out: &mut [u8]) -> Result<usize> {
        let stream = self.stream(addr)?;
        let result = read_frame(stream, out)
            .and_then(|n| stream.write_all(&[ACK]).map_err(transport_err).map(|_| n));
        if result.is_err() {
            self.conns.remove(&addr);
        }
        result
    }
}

/// Peripheral end of the bridge. Accepts exactly one controller.
pub struct TcpBusPeripheral {
    stream: TcpStream,
}

impl TcpBusPeripheral {
    /// Listen at `base_port + addr` and block until the controller dials in.
    pub fn bind(host: &str, base_port: u16, addr: BusAddr) -> Result<Self> {
        let listener =
            TcpListener::bind((host, base_port + addr as u16)).map_err(transport_err)?;
        debug!(
            addr = format_args!("0x{addr:02x}"),
            port = base_port + addr as u16,
            "bridge listening"
        );
        let (stream, peer) = listener.accept().map_err(transport_err)?;
        stream.set_nodelay(true).map_err(transport_err)?;
        debug!(%peer, "controller attached");
        Ok(Self { stream })
    }
}

impl BusPeripheral for TcpBusPeripheral {
    fn wait_and_receive(&mut self, out: &mut [u8]) -> Result<usize> {
        read_frame(&mut self.stream, out)
    }

    fn send_and_ack(&mut self, frame: &[u8]) -> Result<usize> {
        write_frame(&mut self.stream, frame)?;
        let mut ack = [0u8; 1];
        self.stream.read_exact(&mut ack).map_err(transport_err)?;
        if ack[0] != ACK {
            return Err(Error::Transport(format!(
                "expected ACK, controller sent 0x{:02x}",
                ack[0]
            )));
        }
        Ok(frame.len())
    }
}

/// A peripheral is a frame link to its controller.
impl FrameLink for TcpBusPeripheral {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize> {
        self.send_and_ack(frame)
    }

    fn recv_frame(&mut self, out: &mut [u8]) -> Result<usize> {
        self.wait_and_receive(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_bridge_roundtrip() {
        // Atypical base port keeps parallel test runs off each other's toes
        let base: u16 = 41200;
        let addr: BusAddr = 0x24;

        let server = thread::spawn(move || {
            let mut periph = TcpBusPeripheral::bind("127.0.0.1", base, addr).unwrap();
            let mut buf = [0u8; 255];
            let n = periph.wait_and_receive(&mut buf).unwrap();
            assert_eq!(&buf[..n], b"ping");
            periph.send_and_ack(b"pong").unwrap();
        });

        // Give the listener a moment to come up
        thread::sleep(Duration::from_millis(50));
        let mut bus = TcpBusController::new("127.0.0.1", base, Duration::from_secs(1));
        bus.send(addr, b"ping").unwrap();
        let mut buf = [0u8; 255];
        let n = bus.poll_and_receive(addr, &mut buf).unwrap();
        assert_eq!(&buf[..n], b"pong");
        server.join().unwrap();
    }

    #[test]
    fn test_absent_device_is_transport_error() {
        let mut bus = TcpBusController::new("127.0.0.1", 41900, Duration::from_millis(100));
        assert!(matches!(bus.send(0x24, b"ping"), Err(Error::Transport(_))));
    }
}
