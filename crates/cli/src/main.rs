//! corsair-rgb CLI: paint every key of a Corsair keyboard one static color.

use anyhow::{Context, Result};
use clap::Parser;
use corsair_rgb_core::color::{Color, LedFrame};
use corsair_rgb_core::device::{discover_devices, KeyboardModel};
use corsair_rgb_core::keymap::K70_MK2;
use corsair_rgb_core::session::{AttachOutcome, CancellationToken, DeviceSession};
use corsair_rgb_core::transport::HidApiBackend;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "corsair-rgb",
    version,
    about = "Set a Corsair K70 RGB MK.2 to a single static color"
)]
struct Cli {
    /// Red channel (decimal; values above 255 keep their low 8 bits).
    #[arg(required_unless_present = "list_devices")]
    red: Option<u64>,
    /// Green channel.
    #[arg(required_unless_present = "list_devices")]
    green: Option<u64>,
    /// Blue channel.
    #[arg(required_unless_present = "list_devices")]
    blue: Option<u64>,

    /// USB vendor ID (hex).
    #[arg(long, default_value = "1B1C", value_parser = parse_hex_u16)]
    vid: u16,
    /// USB product ID (hex).
    #[arg(long, default_value = "1B6B", value_parser = parse_hex_u16)]
    pid: u16,

    /// Print firmware and device identification after attaching.
    #[arg(long)]
    identify: bool,
    /// Print identification as JSON.
    #[arg(long, requires = "identify")]
    json: bool,

    /// List connected supported keyboards and exit.
    #[arg(long)]
    list_devices: bool,
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s
        .strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex ID '{s}': {e}"))
}

/// Keep the low 8 bits, matching the firmware's byte-wide channels.
fn channel_byte(name: &str, value: u64) -> u8 {
    if value > u8::MAX as u64 {
        warn!("{name} value {value} truncated to {}", value as u8);
    }
    value as u8
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    let backend = HidApiBackend::new().context("Failed to initialize HID")?;

    if cli.list_devices {
        let devices = discover_devices(&backend);
        if devices.is_empty() {
            println!("No supported Corsair keyboards found.");
        } else {
            for dev in &devices {
                println!(
                    "{} (VID: 0x{:04X}, PID: 0x{:04X}, path: {})",
                    dev.model.name(),
                    dev.vid,
                    dev.pid,
                    dev.path
                );
            }
        }
        return Ok(());
    }

    let color = Color::new(
        channel_byte("red", cli.red.unwrap_or_default()),
        channel_byte("green", cli.green.unwrap_or_default()),
        channel_byte("blue", cli.blue.unwrap_or_default()),
    );

    let token = CancellationToken::new();
    let handler = token.clone();
    if let Err(e) = ctrlc::set_handler(move || handler.cancel()) {
        warn!("Could not install Ctrl-C handler: {e}");
    }

    let table = match KeyboardModel::from_pid(cli.pid) {
        Some(model) => model.table(),
        None => {
            warn!(
                "PID 0x{:04X} is not a known K70 RGB MK.2; using its key table",
                cli.pid
            );
            &K70_MK2
        }
    };

    let mut session = DeviceSession::new(&backend, table);
    match session.attach_until(cli.vid, cli.pid, &token)? {
        AttachOutcome::Attached => {}
        AttachOutcome::Cancelled => {
            info!("Interrupted before the keyboard appeared");
            return Ok(());
        }
    }

    if cli.identify {
        match session.read_identity() {
            Ok(identity) if cli.json => println!("{}", serde_json::to_string_pretty(&identity)?),
            Ok(identity) => println!("{identity}"),
            Err(e) => warn!("Identification failed: {e}"),
        }
    }

    let frame = LedFrame::uniform(table, color);
    match session.send_frame(&frame) {
        Ok(()) => info!(%color, keys = frame.colors().len(), "Lighting frame sent"),
        Err(e) => warn!("Lighting frame not fully sent: {e}"),
    }

    session.close();
    Ok(())
}
