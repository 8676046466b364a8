//! BusGuard Component
//!
//! A Component is a reactive bus peripheral: it seals its attestation
//! record at startup, then services one command at a time (SCAN, VALIDATE,
//! BOOT, ATTEST) from the AP. The binary in `main.rs` binds the dispatcher
//! to the TCP bus bridge.

pub mod attest;
pub mod config;
pub mod dispatch;
pub mod params;

pub use dispatch::ComponentContext;
