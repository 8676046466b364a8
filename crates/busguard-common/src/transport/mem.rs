//! In-process loopback bus.
//!
//! Peripherals attach to a [`MemBus`] by address and run on their own
//! threads; frames travel over channels. Receive paths carry a timeout so a
//! silent peer (an unplugged Component, a refused BOOT) surfaces as a
//! `Transport` error instead of hanging the controller forever.

use super::{check_buffer_fit, check_frame_len, BusController, BusPeripheral, FrameLink};
use crate::wire::BusAddr;
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_millis(500);

struct Tap {
    cmd_tx: Sender<Vec<u8>>,
    rsp_rx: Receiver<Vec<u8>>,
    ack_tx: Sender<()>,
}

/// Controller end of the loopback bus.
pub struct MemBus {
    taps: HashMap<BusAddr, Tap>,
    timeout: Duration,
}

/// Peripheral handle produced by [`MemBus::attach`]. Send it to the thread
/// running the Component firmware.
pub struct MemPeripheral {
    cmd_rx: Receiver<Vec<u8>>,
    rsp_tx: Sender<Vec<u8>>,
    ack_rx: Receiver<()>,
    timeout: Duration,
}

impl MemBus {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { taps: HashMap::new(), timeout }
    }

    /// Wire a peripheral into the bus at `addr`. A re-attach replaces the
    /// previous device at that address.
    pub fn attach(&mut self, addr: BusAddr) -> MemPeripheral {
        let (cmd_tx, cmd_rx) = channel();
        let (rsp_tx, rsp_rx) = channel();
        let (ack_tx, ack_rx) = channel();
        self.taps.insert(addr, Tap { cmd_tx, rsp_rx, ack_tx });
        MemPeripheral { cmd_rx, rsp_tx, ack_rx, timeout: self.timeout }
    }

    fn tap(&mut self, addr: BusAddr) -> Result<&mut Tap> {
        self.taps
            .get_mut(&addr)
            .ok_or_else(|| Error::Transport(format!("no device at address 0x{addr:02x}")))
    }
}

impl Default for MemBus {
    fn default() -> Self {
        Self::new()
    }
}

impl BusController for MemBus {
    fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<usize> {
        check_frame_len(frame.len())?;
        let tap = self.tap(addr)?;
        tap.cmd_tx
            .send(frame.to_vec())
            .map_err(|_| Error::Transport(format!("device at 0x{addr:02x} is gone")))?;
        Ok(frame.len())
    }

    fn poll_and_receive(&mut self, addr: BusAddr, out: &mut [u8]) -> Result<usize> {
        let timeout = self.timeout;
        let tap = self.tap(addr)?;
        let frame = tap.rsp_rx.recv_timeout(timeout).map_err(|e| match e {
            RecvTimeoutError::Timeout => {
                Error::Transport(format!("receive from 0x{addr:02x} timed out"))
            }
            RecvTimeoutError::Disconnected => {
                Error::Transport(format!("device at 0x{addr:02x} is gone"))
            }
        })?;
        check_buffer_fit(frame.len(), out.len())?;
        out[..frame.len()].copy_from_slice(&frame);
        // Peripheral's send_and_ack is parked on this
        let _ = tap.ack_tx.send(());
        Ok(frame.len())
    }
}

impl BusPeripheral for MemPeripheral {
    fn wait_and_receive(&mut self, out: &mut [u8]) -> Result<usize> {
        let frame = self
            .cmd_rx
            .recv()
            .map_err(|_| Error::Transport("controller is gone".into()))?;
        check_buffer_fit(frame.len(), out.len())?;
        out[..frame.len()].copy_from_slice(&frame);
        Ok(frame.len())
    }

    fn send_and_ack(&mut self, frame: &[u8]) -> Result<usize> {
        check_frame_len(frame.len())?;
        self.rsp_tx
            .send(frame.to_vec())
            .map_err(|_| Error::Transport("controller is gone".into()))?;
        self.ack_rx.recv_timeout(self.timeout).map_err(|_| {
            Error::Transport("controller never acknowledged the frame".into())
        })?;
        Ok(frame.len())
    }
}

/// A peripheral is a frame link to its controller.
impl FrameLink for MemPeripheral {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize> {
        self.send_and_ack(frame)
    }

    fn recv_frame(&mut self, out: &mut [u8]) -> Result<usize> {
        self.wait_and_receive(out)
    }
}
