//! etherp - raw Ethernet throughput and frame loss testing

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use etherp::backend::RawSocketTransport;
use etherp::config::{Config, RecvDefaults, SendDefaults};
use etherp::frame::{SizeCycler, SizePolicy};
use etherp::net::{self, MacAddr, PacketSocketOptions};
use etherp::output::json::save_json;
use etherp::output::{output_json, output_rate_plain, output_recv_plain, output_send_plain};
use etherp::protocol::{
    ChecksumOrder, DEFAULT_FRAME_SIZE, ETH_DATA_LEN, ETHERTYPE_ETHERP, JUMBO_PAYLOAD_LEN,
    MIN_PAYLOAD_LEN,
};
use etherp::receiver::{ReceiverConfig, receive_frames};
use etherp::sender::{SenderConfig, send_frames};
use etherp::stats::{RateCounter, UnitSystem};

const DEFAULT_INTERFACE: &str = "eth0";

/// Initialize logging with optional file output
fn init_logging(log_file: Option<&str>, log_level: Option<&str>) -> anyhow::Result<()> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = log_level.unwrap_or("info");
    let env_filter =
        EnvFilter::from_default_env().add_directive(format!("etherp={}", level).parse()?);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .without_time()
        .with_writer(io::stderr);

    if let Some(file_path) = log_file {
        // Expand tilde to home directory
        let expanded_path = if let Some(rest) = file_path.strip_prefix("~/") {
            dirs::home_dir()
                .map(|home| home.join(rest))
                .unwrap_or_else(|| PathBuf::from(file_path))
        } else {
            PathBuf::from(file_path)
        };

        if let Some(parent) = expanded_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file_appender = tracing_appender::rolling::daily(
            expanded_path
                .parent()
                .unwrap_or_else(|| std::path::Path::new(".")),
            expanded_path
                .file_name()
                .unwrap_or_else(|| std::ffi::OsStr::new("etherp.log")),
        );
        let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

        // Keep guard alive for the duration of the program
        std::mem::forget(_guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(non_blocking)
            .with_ansi(false);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "etherp")]
#[command(author, version, about = "Raw Ethernet throughput and frame loss testing")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Generate shell completions
    #[arg(long, value_name = "SHELL", value_parser = ["bash", "zsh", "fish", "powershell", "elvish"])]
    completions: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send Ethernet frames ("pings") to MAC_ADDRESS
    Send(SendArgs),

    /// Receive Ethernet frames sent by `etherp send`
    Recv(RecvArgs),
}

#[derive(Args)]
struct SendArgs {
    /// Destination hardware address
    #[arg(value_name = "MAC_ADDRESS")]
    mac: MacAddr,

    /// Interface used to send raw frames
    #[arg(short = 'I', long, env = "ETHERP_INTERFACE")]
    interface: Option<String>,

    /// Wait between frames (e.g., 100us, 2ms; a bare number is microseconds)
    #[arg(short = 'i', long, value_parser = parse_interval)]
    interval: Option<Duration>,

    /// Send NB frames and exit
    #[arg(short = 'c', long, value_name = "NB", value_parser = clap::value_parser!(u64).range(1..))]
    count: Option<u64>,

    /// Size of frames, Ethernet payload bytes (default 1500)
    #[arg(short = 's', long, value_parser = parse_frame_size, conflicts_with = "vary_size")]
    size: Option<usize>,

    /// Send frames with various sizes
    #[arg(short = 'V', long)]
    vary_size: bool,

    /// Smallest size when varying sizes
    #[arg(long, value_parser = parse_frame_size, requires = "vary_size")]
    min_size: Option<usize>,

    /// Largest size when varying sizes
    #[arg(long, value_parser = parse_frame_size, requires = "vary_size")]
    max_size: Option<usize>,

    /// Send zeroed payloads without checksums (pure rate testing)
    #[arg(long)]
    no_data: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct RecvArgs {
    /// Interface to listen on
    #[arg(short = 'I', long, env = "ETHERP_INTERFACE")]
    interface: Option<String>,

    /// Put the interface in promiscuous mode
    #[arg(long)]
    promisc: bool,

    /// Do not verify payload checksums
    #[arg(long)]
    no_verify: bool,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Args)]
struct CommonArgs {
    /// Checksum byte order on the wire (network, little)
    #[arg(long, env = "ETHERP_CHECKSUM_ORDER")]
    checksum_order: Option<ChecksumOrder>,

    /// Display units (decimal, binary)
    #[arg(long, env = "ETHERP_UNITS")]
    units: Option<UnitSystem>,

    /// Activate the verbose (per-frame logging, no live rate)
    #[arg(short = 'v', long)]
    verbose: bool,

    /// JSON summary output
    #[arg(long)]
    json: bool,

    /// Save the JSON summary to a file
    #[arg(short = 'o', long)]
    output: Option<PathBuf>,

    /// Log file path (e.g., "~/.config/etherp/etherp.log")
    #[arg(long, env = "ETHERP_LOG_FILE")]
    log_file: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, env = "ETHERP_LOG_LEVEL")]
    log_level: Option<String>,
}

impl CommonArgs {
    fn init_logging(&self, file_log: Option<&String>, file_level: Option<&String>) -> Result<()> {
        let log_file = self.log_file.as_ref().or(file_log);
        let log_level = if self.verbose {
            Some("debug")
        } else {
            self.log_level.as_ref().or(file_level).map(|s| s.as_str())
        };
        init_logging(log_file.map(|s| s.as_str()), log_level)
    }

    /// Live rate display is off in verbose and JSON modes
    fn live_rate(&self) -> bool {
        !self.verbose && !self.json
    }
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    let duration = if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse::<u64>()
            .map(Duration::from_micros)
            .map_err(|e| e.to_string())?
    } else {
        humantime::parse_duration(s).map_err(|e| e.to_string())?
    };
    if duration.is_zero() {
        return Err("The interval must be greater than 0".to_string());
    }
    Ok(duration)
}

fn parse_frame_size(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .ok()
        .filter(|size| (MIN_PAYLOAD_LEN..=JUMBO_PAYLOAD_LEN).contains(size))
        .ok_or_else(|| {
            format!(
                "The size must be an integer between {} and {}",
                MIN_PAYLOAD_LEN, JUMBO_PAYLOAD_LEN
            )
        })
}

fn generate_completions(shell: &str) {
    use clap::CommandFactory;
    use clap_complete::{Shell, generate};

    let mut cmd = Cli::command();
    let shell = match shell {
        "bash" => Shell::Bash,
        "zsh" => Shell::Zsh,
        "fish" => Shell::Fish,
        "powershell" => Shell::PowerShell,
        "elvish" => Shell::Elvish,
        _ => {
            eprintln!("Unknown shell: {}", shell);
            std::process::exit(1);
        }
    };
    generate(shell, &mut cmd, "etherp", &mut std::io::stdout());
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(ref shell) = cli.completions {
        generate_completions(shell);
        return Ok(());
    }

    // Load config file (falls back to defaults if not found)
    let file_config = Config::load().unwrap_or_default();

    match cli.command {
        Some(Commands::Send(args)) => run_send(args, &file_config.send).await,
        Some(Commands::Recv(args)) => run_recv(args, &file_config.recv).await,
        None => {
            eprintln!("Usage: etherp send [OPTIONS] <MAC_ADDRESS>");
            eprintln!("       etherp recv [OPTIONS]");
            std::process::exit(1);
        }
    }
}

async fn run_send(args: SendArgs, defaults: &SendDefaults) -> Result<()> {
    let common = &args.common;
    common.init_logging(defaults.log_file.as_ref(), defaults.log_level.as_ref())?;

    let interface = args
        .interface
        .clone()
        .or_else(|| defaults.interface.clone())
        .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

    let interval = match args.interval {
        Some(interval) => Some(interval),
        None => defaults
            .interval
            .as_deref()
            .map(parse_interval)
            .transpose()
            .map_err(anyhow::Error::msg)
            .context("Invalid interval in config file")?,
    };

    let size = if args.vary_size || (args.size.is_none() && defaults.vary_size.unwrap_or(false)) {
        let min = args.min_size.or(defaults.min_size).unwrap_or(MIN_PAYLOAD_LEN);
        let max = args.max_size.or(defaults.max_size).unwrap_or(ETH_DATA_LEN);
        SizePolicy::Vary(SizeCycler::new(min, max)?)
    } else {
        SizePolicy::fixed(args.size.or(defaults.size).unwrap_or(DEFAULT_FRAME_SIZE))?
    };

    let units = common.units.or(defaults.units).unwrap_or_default();

    let source = net::interface_mac(&interface)?;
    if args.mac.is_multicast() {
        warn!("Destination {} is a group address", args.mac);
    }

    let config = SenderConfig {
        destination: args.mac,
        source,
        interval,
        count: args.count,
        size,
        fill_payload: !(args.no_data || defaults.no_data.unwrap_or(false)),
        checksum_order: common
            .checksum_order
            .or(defaults.checksum_order)
            .unwrap_or_default(),
        units,
        seed: None,
    };
    config.validate()?;

    let transport = RawSocketTransport::open(&interface, PacketSocketOptions::default())
        .with_context(|| format!("Cannot open the raw socket on {}", interface))?;

    let rate = Arc::new(RateCounter::new(units));
    let cancel_rx = cancel_on_ctrl_c();
    let reporter = common
        .live_rate()
        .then(|| spawn_rate_reporter(rate.clone(), "Sending"));

    let result = send_frames(&transport, &config, &rate, cancel_rx).await;
    if let Some(reporter) = reporter {
        reporter.abort();
    }
    let totals = result?;

    emit_summary(&totals, output_send_plain(&totals), common)
}

async fn run_recv(args: RecvArgs, defaults: &RecvDefaults) -> Result<()> {
    let common = &args.common;
    common.init_logging(defaults.log_file.as_ref(), defaults.log_level.as_ref())?;

    let interface = args
        .interface
        .clone()
        .or_else(|| defaults.interface.clone())
        .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());

    let units = common.units.or(defaults.units).unwrap_or_default();
    let config = ReceiverConfig {
        checksum_order: common
            .checksum_order
            .or(defaults.checksum_order)
            .unwrap_or_default(),
        verify_checksum: !(args.no_verify || defaults.no_verify.unwrap_or(false)),
        units,
    };

    let opts = PacketSocketOptions {
        ethertype: Some(ETHERTYPE_ETHERP),
        promiscuous: args.promisc || defaults.promisc.unwrap_or(false),
    };
    let transport = RawSocketTransport::open(&interface, opts)
        .with_context(|| format!("Cannot open the raw socket on {}", interface))?;

    let rate = Arc::new(RateCounter::new(units));
    let cancel_rx = cancel_on_ctrl_c();
    let reporter = common
        .live_rate()
        .then(|| spawn_rate_reporter(rate.clone(), "Receiving"));

    let result = receive_frames(&transport, &config, &rate, cancel_rx).await;
    if let Some(reporter) = reporter {
        reporter.abort();
    }
    let totals = result?;

    emit_summary(&totals, output_recv_plain(&totals), common)
}

/// Cancellation channel flipped by the first Ctrl-C; a second one exits
fn cancel_on_ctrl_c() -> watch::Receiver<bool> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(watch_interrupts(tokio::signal::ctrl_c, cancel_tx, || {
        std::process::exit(130)
    }));
    cancel_rx
}

/// First interrupt requests a graceful finish, the second calls `force_exit`
async fn watch_interrupts<F, Fut>(
    mut next_interrupt: F,
    cancel_tx: watch::Sender<bool>,
    force_exit: impl FnOnce(),
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<()>>,
{
    if let Err(e) = next_interrupt().await {
        warn!("Cannot listen for interrupts: {}", e);
        return;
    }
    info!("Interrupt received, finishing session (interrupt again to abort)");
    let _ = cancel_tx.send(true);

    if next_interrupt().await.is_ok() {
        warn!("Second interrupt received, aborting");
        force_exit();
    }
}

/// Print the rate accumulated over each second on a single refreshed line
fn spawn_rate_reporter(rate: Arc<RateCounter>, verb: &'static str) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let sample = rate.sample();
            print!("{}\r", output_rate_plain(verb, &sample));
            let _ = io::stdout().flush();
        }
    })
}

fn emit_summary<T: Serialize>(totals: &T, plain: String, common: &CommonArgs) -> Result<()> {
    if common.json {
        println!("{}", output_json(totals));
    } else {
        if common.live_rate() {
            // Leave the refreshed rate line
            println!();
        }
        print!("{}", plain);
    }

    if let Some(ref path) = common.output {
        save_to(totals, path)?;
    }
    Ok(())
}

fn save_to<T: Serialize>(totals: &T, path: &Path) -> Result<()> {
    save_json(totals, path).with_context(|| format!("Cannot write {}", path.display()))?;
    info!("Results saved to {}", path.display());
    Ok(())
}
