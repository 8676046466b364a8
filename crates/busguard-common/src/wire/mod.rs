//! Wire formats exchanged between the AP and Components.
//!
//! All multi-byte fields are little-endian and the layouts are fixed, so
//! encoding is done by hand with `bytes` rather than a self-describing
//! serializer. A command travels AP → Component; a validate reply travels
//! Component → AP.

use crate::{Error, Result};
use bytes::{Buf, BufMut};

/// 32-bit Component identifier, globally unique within a deployment.
pub type ComponentId = u32;

/// 64-bit freshness challenge. Valid only within a single handshake.
pub type Nonce = u64;

/// 7-bit bus address.
pub type BusAddr = u8;

/// Bus addresses that must never be assigned to a Component (hardware quirk).
pub const DEFAULT_RESERVED_ADDRS: [BusAddr; 3] = [0x18, 0x28, 0x36];

/// Deterministic Component ID to bus address mapping.
pub fn id_to_addr(id: ComponentId) -> BusAddr {
    (id & 0x7f) as u8
}

/// Command opcodes understood by a Component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
    None = 0,
    Scan = 1,
    Validate = 2,
    Boot = 3,
    Attest = 4,
}

impl Opcode {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Scan),
            2 => Some(Self::Validate),
            3 => Some(Self::Boot),
            4 => Some(Self::Attest),
            _ => None,
        }
    }
}

/// A command message: one opcode byte plus an opcode-specific payload.
///
/// SCAN and VALIDATE carry the AP's `nonce1` challenge; BOOT carries the
/// `nonce2` proof previously issued by the Component; ATTEST is bare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Scan { challenge: Nonce },
    Validate { challenge: Nonce },
    Boot { proof: Nonce },
    Attest,
}

impl Command {
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Scan { .. } => Opcode::Scan,
            Self::Validate { .. } => Opcode::Validate,
            Self::Boot { .. } => Opcode::Boot,
            Self::Attest => Opcode::Attest,
        }
    }

    /// Serialize to wire bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(9);
        buf.put_u8(self.opcode() as u8);
        match self {
            Self::Scan { challenge } | Self::Validate { challenge } => {
                buf.put_u64_le(*challenge);
            }
            Self::Boot { proof } => buf.put_u64_le(*proof),
            Self::Attest => {}
        }
        buf
    }

    /// Deserialize from wire bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let mut data = data;
        if !data.has_remaining() {
            return Err(Error::Transport("empty command frame".into()));
        }
        let raw = data.get_u8();
        let opcode = Opcode::from_u8(raw)
            .ok_or_else(|| Error::Transport(format!("unrecognized opcode {raw}")))?;

        let mut take_nonce = |data: &mut &[u8]| -> Result<Nonce> {
            if data.remaining() < 8 {
                return Err(Error::Transport("truncated command frame".into()));
            }
            Ok(data.get_u64_le())
        };

        match opcode {
            Opcode::Scan => Ok(Self::Scan { challenge: take_nonce(&mut data)? }),
            Opcode::Validate => Ok(Self::Validate { challenge: take_nonce(&mut data)? }),
            Opcode::Boot => Ok(Self::Boot { proof: take_nonce(&mut data)? }),
            Opcode::Attest => Ok(Self::Attest),
            Opcode::None => Err(Error::Transport("NONE opcode on the wire".into())),
        }
    }
}

/// A Component's reply to SCAN and VALIDATE (20 bytes).
///
/// `nonce1` echoes the AP's challenge; `nonce2` is the Component's own
/// challenge, zero in SCAN replies where none is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidateReply {
    pub component_id: ComponentId,
    pub nonce1: Nonce,
    pub nonce2: Nonce,
}

impl ValidateReply {
    /// Size of a validate reply on the wire.
    pub const SIZE: usize = 20;

    /// Serialize to wire bytes (little-endian).
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.put_u32_le(self.component_id);
        buf.put_u64_le(self.nonce1);
        buf.put_u64_le(self.nonce2);
        buf
    }

    /// Deserialize from wire bytes (little-endian).
    pub fn from_bytes(mut data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE {
            return Err(Error::Transport(format!(
                "validate reply too short: {} bytes",
                data.len()
            )));
        }
        Ok(Self {
            component_id: data.get_u32_le(),
            nonce1: data.get_u64_le(),
            nonce2: data.get_u64_le(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_to_addr() {
        assert_eq!(id_to_addr(0x11111124), 0x24);
        assert_eq!(id_to_addr(0x11111125), 0x25);
        // Only the low 7 bits survive
        assert_eq!(id_to_addr(0xFFFFFFFF), 0x7f);
    }

    #[test]
    fn test_command_roundtrip() {
        let commands = [
            Command::Scan { challenge: 0xDEAD_BEEF_CAFE_F00D },
            Command::Validate { challenge: 1 },
            Command::Boot { proof: u64::MAX },
            Command::Attest,
        ];
        for cmd in commands {
            let bytes = cmd.to_bytes();
            let parsed = Command::from_bytes(&bytes).unwrap();
            assert_eq!(parsed, cmd);
        }
    }

    #[test]
    fn test_command_wire_layout() {
        let bytes = Command::Scan { challenge: 0x0102030405060708 }.to_bytes();
        assert_eq!(bytes, hex::decode("010807060504030201").unwrap());
        assert_eq!(Command::Attest.to_bytes(), vec![0x04]);
    }

    #[test]
    fn test_command_rejects_garbage() {
        assert!(Command::from_bytes(&[]).is_err());
        assert!(Command::from_bytes(&[0x09]).is_err());
        // BOOT with a truncated proof
        assert!(Command::from_bytes(&[0x03, 0x01, 0x02]).is_err());
        // NONE never travels
        assert!(Command::from_bytes(&[0x00]).is_err());
    }

    #[test]
    fn test_validate_reply_roundtrip() {
        let reply = ValidateReply {
            component_id: 0x11111124,
            nonce1: 0xAAAA_BBBB_CCCC_DDDD,
            nonce2: 0x1111_2222_3333_4444,
        };
        let bytes = reply.to_bytes();
        assert_eq!(bytes.len(), ValidateReply::SIZE);
        assert_eq!(ValidateReply::from_bytes(&bytes).unwrap(), reply);
    }

    #[test]
    fn test_validate_reply_layout() {
        let reply = ValidateReply { component_id: 0x11111124, nonce1: 2, nonce2: 3 };
        let bytes = reply.to_bytes();
        assert_eq!(&bytes[0..4], &[0x24, 0x11, 0x11, 0x11]);
        assert_eq!(&bytes[4..12], &2u64.to_le_bytes());
        assert_eq!(&bytes[12..20], &3u64.to_le_bytes());
    }

    #[test]
    fn test_validate_reply_too_short() {
        let reply = ValidateReply { component_id: 1, nonce1: 2, nonce2: 3 };
        let bytes = reply.to_bytes();
        assert!(ValidateReply::from_bytes(&bytes[..19]).is_err());
    }
}
