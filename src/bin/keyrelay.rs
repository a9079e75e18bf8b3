// Keyrelay CLI
// Grab one input device and relay it, remapped, through a virtual keyboard

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use keyrelay_core::config::{DEFAULT_DEVICE_NAME, DEFAULT_VERSION};
use keyrelay_core::{DeviceIdentity, RelayConfig, RemapProfile, ShutdownController};

/// Relay a grabbed input device through a remapping virtual keyboard
#[derive(Parser, Debug)]
#[command(name = "keyrelay")]
#[command(version)]
#[command(about = "Relay a grabbed input device through a remapping virtual keyboard", long_about = None)]
struct Args {
    /// Input device to grab, e.g. /dev/input/event5
    #[arg(value_name = "DEVICE", required_unless_present = "show_profile")]
    device: Option<PathBuf>,

    /// Name of the virtual device
    #[arg(long, value_name = "NAME", default_value = DEFAULT_DEVICE_NAME)]
    name: String,

    /// USB vendor id of the virtual device (hex)
    #[arg(long, value_name = "HEX", value_parser = parse_hex_u16, default_value = "0xDEAD")]
    vendor: u16,

    /// USB product id of the virtual device (hex)
    #[arg(long, value_name = "HEX", value_parser = parse_hex_u16, default_value = "0xBEEF")]
    product: u16,

    /// How long one wait for input may block before the shutdown flag is re-checked
    #[arg(long, value_name = "MS", default_value_t = 100)]
    poll_timeout_ms: u64,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Print the compiled-in remap profile and exit
    #[arg(long)]
    show_profile: bool,
}

impl Args {
    fn relay_config(&self, device: PathBuf) -> RelayConfig {
        RelayConfig::new(device)
            .with_identity(DeviceIdentity {
                name: self.name.clone(),
                vendor_id: self.vendor,
                product_id: self.product,
                version: DEFAULT_VERSION,
            })
            .with_poll_timeout(Duration::from_millis(self.poll_timeout_ms))
    }
}

/// Accept `dead`, `0xdead` or `0XDEAD`
fn parse_hex_u16(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id '{}': {}", value, e))
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .init();
}

fn show_profile(profile: &RemapProfile) {
    println!("Profile: {}", profile.name());
    for (from, to) in profile.entries() {
        println!("  {:<10} -> {}", from.to_string(), to);
    }
    let required: Vec<String> = profile.required().iter().map(|key| key.to_string()).collect();
    println!("Always declared: {}", required.join(", "));
}

fn run(args: Args) -> Result<()> {
    let profile = RemapProfile::active();

    if args.show_profile {
        show_profile(profile);
        return Ok(());
    }

    let device = args
        .device
        .clone()
        .context("an input device path is required")?;
    let config = args.relay_config(device);

    let shutdown = ShutdownController::new();
    shutdown
        .install_signal_handlers()
        .context("failed to install signal handlers")?;

    let summary = keyrelay_core::relay(&config, profile, shutdown)
        .with_context(|| format!("relaying {}", config.device_path.display()))?;

    log::info!("Stats: {}", summary.stats);
    log::debug!("Teardown: {}", summary.teardown);
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
