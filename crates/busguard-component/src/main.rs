//! BusGuard Component firmware, host build.
//!
//! Seals the attestation record, binds the bus bridge at this Component's
//! address, and services commands until the AP commits a boot.

use anyhow::{Context, Result};
use busguard_common::transport::tcp::TcpBusPeripheral;
use busguard_common::wire::id_to_addr;
use busguard_common::Error;
use busguard_component::config::Config;
use busguard_component::params;
use busguard_component::ComponentContext;
use tracing::{info, warn};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = Config::load().context("failed to load configuration")?;
    let mut ctx = ComponentContext::from_params().context("failed to initialize")?;

    let addr = id_to_addr(params::COMPONENT_ID);
    let mut link = TcpBusPeripheral::bind(&config.bus.host, config.bus.base_port, addr)
        .context("failed to bind the bus bridge")?;

    info!(
        id = format_args!("0x{:08x}", params::COMPONENT_ID),
        addr = format_args!("0x{addr:02x}"),
        "component started"
    );

    while !ctx.is_booted() {
        match ctx.service(&mut link) {
            Ok(()) => {}
            // A dead bridge cannot recover; protocol rejects are logged and
            // the next command is awaited
            Err(e @ Error::Transport(_)) => return Err(e.into()),
            Err(e) => warn!(%e, "command rejected"),
        }
    }

    post_boot()
}

/// Post-boot application. The secure channel stays available to it; the
/// reference build just idles.
fn post_boot() -> ! {
    info!("entering post-boot");
    loop {
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}
