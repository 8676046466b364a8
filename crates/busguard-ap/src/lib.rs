//! BusGuard Application Processor
//!
//! The AP owns the provisioned-Component list, drives every bus
//! transaction, and fronts the operator over the host UART line protocol.
//! The binary in `main.rs` wires the engine to the TCP bus bridge and a
//! file-backed flash page; the modules here hold everything testable.

pub mod attest;
pub mod config;
pub mod console;
pub mod context;
pub mod credential;
pub mod flash;
pub mod handshake;
pub mod params;
pub mod provision;

pub use context::ApContext;
