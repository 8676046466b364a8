//! Host UART line protocol.
//!
//! Output classes carry a machine-parseable prefix so the host tooling can
//! sort debug chatter from results. Internal diagnostics go to `tracing`
//! (stderr); only the protocol lines below touch stdout.

use busguard_common::ComponentId;
use std::io::{self, BufRead, Write};

pub fn print_debug(msg: &str) {
    println!("%debug: {msg}");
}

pub fn print_info(msg: &str) {
    println!("%info: {msg}");
}

pub fn print_success(msg: &str) {
    println!("%success: {msg}");
}

pub fn print_error(msg: &str) {
    println!("%error: {msg}");
}

pub fn print_ack() {
    println!("%ack");
}

/// Prompt the operator and read one line, terminator stripped.
pub fn recv_input(prompt: &str) -> io::Result<String> {
    print_debug(prompt);
    io::stdout().flush()?;
    print_ack();

    let mut line = String::new();
    let n = io::stdin().lock().read_line(&mut line)?;
    if n == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "host closed the line"));
    }
    println!();
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Parse an operator-supplied Component ID (hex, `0x` prefix optional).
pub fn parse_component_id(input: &str) -> Option<ComponentId> {
    let digits = input
        .trim()
        .strip_prefix("0x")
        .or_else(|| input.trim().strip_prefix("0X"))
        .unwrap_or_else(|| input.trim());
    ComponentId::from_str_radix(digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_component_id() {
        assert_eq!(parse_component_id("0x11111124"), Some(0x11111124));
        assert_eq!(parse_component_id("11111124"), Some(0x11111124));
        assert_eq!(parse_component_id("  0Xdeadbeef "), Some(0xDEADBEEF));
        assert_eq!(parse_component_id("xyz"), None);
        assert_eq!(parse_component_id(""), None);
    }
}
