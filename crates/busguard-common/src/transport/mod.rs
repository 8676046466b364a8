//! Bus transport seam.
//!
//! The protocol stack sees only opaque, length-limited frames. The vendor
//! I²C driver sits behind two traits: the AP drives a [`BusController`] and
//! each Component services a [`BusPeripheral`]. Host-side stand-ins are
//! provided: an in-process loopback bus for tests ([`mem`]) and a TCP bridge
//! for running the two firmware binaries on a workstation ([`tcp`]).
//!
//! Once a controller is bound to one peer address, both ends speak the same
//! [`FrameLink`] send/receive pair; the secure channel is written against
//! that seam alone.

pub mod mem;
pub mod tcp;

use crate::wire::BusAddr;
use crate::{Error, Result};

/// Largest frame the bus carries.
pub const MAX_FRAME_LEN: usize = 255;

/// Controller (AP) side of the bus.
pub trait BusController {
    /// Deliver a frame to the peripheral at `addr`. Returns bytes accepted.
    fn send(&mut self, addr: BusAddr, frame: &[u8]) -> Result<usize>;

    /// Block until the peripheral at `addr` produces a frame. Returns the
    /// frame length.
    fn poll_and_receive(&mut self, addr: BusAddr, out: &mut [u8]) -> Result<usize>;

    /// Bind this controller to a single peer address.
    fn link(&mut self, addr: BusAddr) -> AddressedLink<'_, Self>
    where
        Self: Sized,
    {
        AddressedLink { bus: self, addr }
    }
}

/// Peripheral (Component) side of the bus.
pub trait BusPeripheral {
    /// Block until the controller delivers a frame. Returns the frame length.
    fn wait_and_receive(&mut self, out: &mut [u8]) -> Result<usize>;

    /// Transmit a frame and wait for the controller's ACK.
    fn send_and_ack(&mut self, frame: &[u8]) -> Result<usize>;
}

/// The address-bound frame pair both secure-channel ends speak.
pub trait FrameLink {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize>;
    fn recv_frame(&mut self, out: &mut [u8]) -> Result<usize>;
}

/// A [`BusController`] bound to one peripheral address.
pub struct AddressedLink<'a, B: BusController> {
    bus: &'a mut B,
    addr: BusAddr,
}

impl<B: BusController> FrameLink for AddressedLink<'_, B> {
    fn send_frame(&mut self, frame: &[u8]) -> Result<usize> {
        self.bus.send(self.addr, frame)
    }

    fn recv_frame(&mut self, out: &mut [u8]) -> Result<usize> {
        self.bus.poll_and_receive(self.addr, out)
    }
}

pub(crate) fn check_frame_len(len: usize) -> Result<()> {
    if len > MAX_FRAME_LEN {
        return Err(Error::Transport(format!(
            "frame of {len} bytes exceeds the {MAX_FRAME_LEN}-byte MTU"
        )));
    }
    Ok(())
}

pub(crate) fn check_buffer_fit(len: usize, capacity: usize) -> Result<()> {
    if len > capacity {
        return Err(Error::Transport(format!(
            "received frame of {len} bytes overflows a {capacity}-byte buffer"
        )));
    }
    Ok(())
}
