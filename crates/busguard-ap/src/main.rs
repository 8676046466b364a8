//! BusGuard Application Processor firmware, host build.
//!
//! Wires the engine to the TCP bus bridge and a file-backed flash page,
//! then serves the operator command prompt forever. A successful `boot`
//! hands control to the post-boot application and never returns.

use anyhow::{Context, Result};
use busguard_ap::config::Config;
use busguard_ap::console;
use busguard_ap::context::ApContext;
use busguard_ap::credential::CredentialGate;
use busguard_ap::flash::{FileFlash, FlashPage};
use busguard_ap::params;
use busguard_common::transport::tcp::TcpBusController;
use busguard_common::transport::BusController;
use std::time::Duration;
use tracing::{debug, info};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;
    debug!(?config, "configuration loaded");

    let bus = TcpBusController::new(
        config.bus.host.clone(),
        config.bus.base_port,
        Duration::from_millis(config.bus.timeout_ms),
    );
    let flash = FileFlash::new(&config.flash_path);
    let mut ctx = ApContext::init(bus, flash).context("failed to initialize")?;
    let gate = CredentialGate::new(params::AP_PIN_HASH, params::AP_TOKEN_HASH);

    console::print_info("Application Processor Started");
    info!("application processor started");

    loop {
        let command = match console::recv_input("Enter Command: ") {
            Ok(line) => line,
            Err(e) => {
                info!(%e, "host line closed, shutting down");
                return Ok(());
            }
        };

        match command.as_str() {
            "list" => {
                ctx.scan_components();
            }
            "boot" => {
                if ctx.attempt_boot().is_ok() {
                    post_boot();
                }
            }
            "replace" => attempt_replace(&mut ctx, &gate),
            "attest" => attempt_attest(&mut ctx, &gate),
            other => console::print_error(&format!("Unrecognized command '{other}'")),
        }
    }
}

/// `replace`: token gate, then swap one provisioned ID for another.
fn attempt_replace<B: BusController, F: FlashPage>(
    ctx: &mut ApContext<B, F>,
    gate: &CredentialGate,
) {
    if gate.check_token().is_err() {
        return;
    }

    let Some(id_in) = prompt_id("Component ID In: ") else {
        return;
    };
    let Some(id_out) = prompt_id("Component ID Out: ") else {
        return;
    };

    match ctx.store.replace(id_out, id_in) {
        Ok(()) => {
            console::print_debug(&format!("Replaced 0x{id_out:08x} with 0x{id_in:08x}"));
            console::print_success("Replace");
        }
        Err(e) => console::print_error(&e.to_string()),
    }
}

/// `attest`: PIN gate, then release one Component's record.
fn attempt_attest<B: BusController, F: FlashPage>(
    ctx: &mut ApContext<B, F>,
    gate: &CredentialGate,
) {
    if gate.check_pin().is_err() {
        return;
    }

    let Some(id) = prompt_id("Component ID: ") else {
        return;
    };

    match ctx.attest_component(id) {
        Ok(_) => console::print_success("Attest"),
        Err(e) => {
            console::print_error("Could not attest component");
            debug!(%e, "attestation failed");
        }
    }
}

fn prompt_id(prompt: &str) -> Option<busguard_common::ComponentId> {
    let line = console::recv_input(prompt).ok()?;
    let id = console::parse_component_id(&line);
    if id.is_none() {
        console::print_error(&format!("Invalid component ID '{line}'"));
    }
    id
}

/// Post-boot application. The secure channel stays available to it; the
/// reference build just idles.
fn post_boot() -> ! {
    info!("entering post-boot");
    loop {
        std::thread::sleep(Duration::from_secs(1));
    }
}
