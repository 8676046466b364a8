//! Per-message secure channel.
//!
//! Every message is an independent RSA-OAEP envelope: there is no session
//! key and no key exchange. A message occupies two frames on the bus: the
//! constant-length ciphertext, then a SHA-256 digest of the plaintext that
//! the receiver must verify. Both firmware images use the same construction;
//! only the key pair differs (AP: seal under the Component channel key, open
//! with the AP attestation key; Component: the reverse).
//!
//! The sealed pass-through exists for the attestation release, whose
//! payloads are already modulus-length ciphertexts under the attestation
//! key and cannot be re-enveloped; their integrity rides on the attestation
//! digest instead of a per-message digest.

use crate::crypto::{sha256, OpenKey, SealKey, HASH_SIZE};
use crate::transport::{FrameLink, MAX_FRAME_LEN};
use crate::{Error, Result};
use tracing::trace;

pub struct SecureChannel {
    seal: SealKey,
    open: OpenKey,
}

impl SecureChannel {
    /// Build a channel end from the peer's public key and the local private
    /// key. Rejects key material whose ciphertexts cannot fit one frame.
    pub fn new(seal: SealKey, open: OpenKey) -> Result<Self> {
        for len in [seal.modulus_len(), open.modulus_len()] {
            if len > MAX_FRAME_LEN {
                return Err(Error::Crypto(format!(
                    "a {len}-byte RSA ciphertext cannot fit the {MAX_FRAME_LEN}-byte MTU"
                )));
            }
        }
        Ok(Self { seal, open })
    }

    /// Largest plaintext one message can carry.
    pub fn max_plaintext_len(&self) -> usize {
        self.seal.max_plaintext_len()
    }

    /// Encrypt `plain` under the peer's key and transmit it, followed by the
    /// plaintext digest frame. Returns the plaintext length.
    pub fn send<L: FrameLink>(&self, link: &mut L, plain: &[u8]) -> Result<usize> {
        let cipher = self.seal.seal(plain)?;
        trace!(plain_len = plain.len(), cipher_len = cipher.len(), "channel send");
        link.send_frame(&cipher)?;
        link.send_frame(&sha256(plain))?;
        Ok(plain.len())
    }

    /// Receive one message: ciphertext frame, decrypt, digest frame, verify.
    /// The recovered plaintext lands in `out`; returns its length.
    pub fn receive<L: FrameLink>(&self, link: &mut L, out: &mut [u8]) -> Result<usize> {
        let mut frame = [0u8; MAX_FRAME_LEN];
        let cipher_len = link.recv_frame(&mut frame)?;
        if cipher_len > self.open.modulus_len() {
            return Err(Error::Transport(format!(
                "ciphertext frame of {cipher_len} bytes exceeds the envelope"
            )));
        }
        let plain = self.open.open(&frame[..cipher_len])?;

        let mut digest_frame = [0u8; MAX_FRAME_LEN];
        let digest_len = link.recv_frame(&mut digest_frame)?;
        if digest_len != HASH_SIZE || digest_frame[..HASH_SIZE] != sha256(&plain) {
            return Err(Error::ChannelIntegrity);
        }

        if plain.len() > out.len() {
            return Err(Error::Transport(format!(
                "recovered plaintext of {} bytes overflows the caller's buffer",
                plain.len()
            )));
        }
        out[..plain.len()].copy_from_slice(&plain);
        trace!(plain_len = plain.len(), "channel receive");
        Ok(plain.len())
    }

    /// Transmit a payload that is already sealed to the final recipient.
    pub fn send_sealed<L: FrameLink>(&self, link: &mut L, frame: &[u8]) -> Result<usize> {
        link.send_frame(frame)
    }

    /// Receive a payload sealed to someone else (or a bare digest); no
    /// decryption, no per-message digest.
    pub fn receive_sealed<L: FrameLink>(&self, link: &mut L, out: &mut [u8]) -> Result<usize> {
        link.recv_frame(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mem::MemBus;
    use crate::transport::{BusController, BusPeripheral};
    use rand::rngs::OsRng;
    use rsa::RsaPrivateKey;
    use std::thread;
    use std::time::Duration;

    /// A matched pair of channel ends sharing two freshly generated keypairs.
    fn channel_pair() -> (SecureChannel, SecureChannel) {
        let ap_open = OpenKey::from_private(RsaPrivateKey::new(&mut OsRng, 1024).unwrap());
        let comp_open = OpenKey::from_private(RsaPrivateKey::new(&mut OsRng, 1024).unwrap());
        let ap_end = SecureChannel::new(comp_open.seal_key(), ap_open.clone()).unwrap();
        let comp_end = SecureChannel::new(ap_open.seal_key(), comp_open).unwrap();
        (ap_end, comp_end)
    }

    #[test]
    fn test_send_receive_roundtrip() {
        let (ap_end, comp_end) = channel_pair();
        let mut bus = MemBus::new();
        let mut periph = bus.attach(0x24);

        let worker = thread::spawn(move || {
            let mut buf = [0u8; MAX_FRAME_LEN];
            let n = comp_end.receive(&mut periph, &mut buf).unwrap();
            assert_eq!(&buf[..n], b"validate me");
            comp_end.send(&mut periph, b"ok").unwrap();
        });

        ap_end.send(&mut bus.link(0x24), b"validate me").unwrap();
        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = ap_end.receive(&mut bus.link(0x24), &mut buf).unwrap();
        assert_eq!(&buf[..n], b"ok");
        worker.join().unwrap();
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let (ap_end, comp_end) = channel_pair();

        // Capture a legitimate message at the peripheral side
        let mut bus = MemBus::new();
        let mut periph = bus.attach(0x24);
        ap_end.send(&mut bus.link(0x24), b"boot").unwrap();
        let mut frame = [0u8; MAX_FRAME_LEN];
        let n = periph.wait_and_receive(&mut frame).unwrap();
        let mut cipher = frame[..n].to_vec();
        let dn = periph.wait_and_receive(&mut frame).unwrap();
        let digest = frame[..dn].to_vec();

        // Flip one ciphertext bit and feed both frames to the receiver
        cipher[0] ^= 0x80;
        let mut bus2 = MemBus::new();
        let mut periph2 = bus2.attach(0x24);
        bus2.send(0x24, &cipher).unwrap();
        bus2.send(0x24, &digest).unwrap();

        let mut buf = [0u8; MAX_FRAME_LEN];
        assert!(matches!(
            comp_end.receive(&mut periph2, &mut buf),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_tampered_digest_is_integrity_error() {
        let (ap_end, comp_end) = channel_pair();
        let mut bus = MemBus::new();
        let mut periph = bus.attach(0x24);

        let worker = thread::spawn(move || {
            comp_end.send(&mut periph, b"banner").unwrap();
        });

        // Intercept: take the ciphertext frame as-is, corrupt the digest
        let mut cipher = [0u8; MAX_FRAME_LEN];
        let n = bus.poll_and_receive(0x24, &mut cipher).unwrap();
        let mut digest = [0u8; MAX_FRAME_LEN];
        let dn = bus.poll_and_receive(0x24, &mut digest).unwrap();
        worker.join().unwrap();

        // Re-run the receive against a replaying peer with the bad digest
        let mut bus2 = MemBus::new();
        let mut periph2 = bus2.attach(0x24);
        let cipher = cipher[..n].to_vec();
        let mut digest = digest[..dn].to_vec();
        digest[0] ^= 0x01;
        let replayer = thread::spawn(move || {
            periph2.send_and_ack(&cipher).unwrap();
            periph2.send_and_ack(&digest).unwrap();
        });

        let mut buf = [0u8; MAX_FRAME_LEN];
        let result = ap_end.receive(&mut bus2.link(0x24), &mut buf);
        assert!(matches!(result, Err(Error::ChannelIntegrity)));
        replayer.join().unwrap();
    }

    #[test]
    fn test_oversized_plaintext_rejected() {
        let (ap_end, _) = channel_pair();
        let mut bus = MemBus::with_timeout(Duration::from_millis(50));
        let _periph = bus.attach(0x24);
        let too_big = vec![0u8; ap_end.max_plaintext_len() + 1];
        assert!(matches!(
            ap_end.send(&mut bus.link(0x24), &too_big),
            Err(Error::Crypto(_))
        ));
    }

    #[test]
    fn test_sealed_passthrough_is_verbatim() {
        let (ap_end, comp_end) = channel_pair();
        let mut bus = MemBus::new();
        let mut periph = bus.attach(0x24);

        let blob: Vec<u8> = (0..128u32).map(|i| (i * 7) as u8).collect();
        let sent = blob.clone();
        let worker = thread::spawn(move || {
            comp_end.send_sealed(&mut periph, &sent).unwrap();
        });

        let mut buf = [0u8; MAX_FRAME_LEN];
        let n = ap_end.receive_sealed(&mut bus.link(0x24), &mut buf).unwrap();
        assert_eq!(&buf[..n], &blob[..]);
        worker.join().unwrap();
    }
}
