//! Inference Link
//!
//! Host-side client for a microcontroller running a small MLP behind a UART.
//! One transaction writes four input bytes and the `I` command marker, then
//! reads the two output bytes the firmware computes.
//!
//! # Usage
//!
//! ```bash
//! # Run inference (requires serial feature)
//! inference-link infer -p /dev/ttyUSB1 100 50 200 30
//!
//! # Same, with RTS/CTS flow control instead of pacing delays
//! inference-link infer --profile mlp-rtscts 100 50 200 30
//!
//! # List available serial ports (requires serial feature)
//! inference-link ports list
//!
//! # Write a config file to edit
//! inference-link config generate -o inference-link.toml
//! ```
//!
//! `infer` prints `Output: [a, b]` and exits 0, or prints `No response` and
//! exits 2. Open, write and read failures exit 1.

#![cfg_attr(not(feature = "serial"), allow(dead_code, unused_imports))]

mod config;
mod exchange;
mod profiles;
#[cfg(feature = "serial")]
mod serial;
mod transcript;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use config::{ConfigOverrides, LinkConfig};
use exchange::OutputVector;
use profiles::{get_profile, profile_names, LinkProfile};

#[cfg(feature = "serial")]
use exchange::{describe_response, run_inference, InputVector};
#[cfg(feature = "serial")]
use serial::SerialConnection;
#[cfg(feature = "serial")]
use std::path::Path;
#[cfg(feature = "serial")]
use transcript::Transcript;

const EXIT_OK: i32 = 0;

/// Exit status when the device does not answer in time
const EXIT_NO_RESPONSE: i32 = 2;

/// Status for a completed transaction. Fatal errors never get here; they
/// propagate out of `main` as `Err` and exit 1.
fn exit_status(output: Option<&OutputVector>) -> i32 {
    match output {
        Some(_) => EXIT_OK,
        None => EXIT_NO_RESPONSE,
    }
}

/// Inference Link
///
/// Run inference on a serial-attached MLP microcontroller
#[derive(Parser)]
#[command(name = "inference-link")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Run inference on a serial-attached MLP microcontroller")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Send four inputs and read the two-byte result (requires --features serial)
    #[cfg(feature = "serial")]
    Infer(InferArgs),

    /// Serial port operations (requires --features serial)
    #[cfg(feature = "serial")]
    #[command(subcommand)]
    Ports(PortCommands),

    /// Link profile operations
    #[command(subcommand)]
    Profiles(ProfileCommands),

    /// Configuration file operations
    #[command(subcommand)]
    Config(ConfigCommands),
}

/// Link settings shared by every command that touches the port
#[derive(Args, Debug, Default)]
struct LinkArgs {
    /// Serial port path (e.g., /dev/ttyUSB1)
    #[arg(short, long, env = "INFERENCE_LINK_PORT")]
    port: Option<String>,

    /// Link profile supplying default settings
    #[arg(short = 'd', long, default_value = "mlp")]
    profile: String,

    /// TOML config file (overrides the profile)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Baud rate (overrides profile and config file)
    #[arg(short, long)]
    baud: Option<u32>,

    /// Total wait for the response, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Pause after each input byte, in milliseconds
    #[arg(long)]
    byte_delay_ms: Option<u64>,

    /// Pause after the command marker, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// Wait after opening the port for the board to come out of reset, in milliseconds
    #[arg(long)]
    open_delay_ms: Option<u64>,
}

#[cfg(feature = "serial")]
#[derive(Args, Debug)]
struct InferArgs {
    /// Four input values, each 0-255
    #[arg(num_args = 4, required = true, value_name = "INPUT")]
    inputs: Vec<u8>,

    #[command(flatten)]
    link: LinkArgs,

    /// Append a timestamped TX/RX transcript to this file
    #[arg(long)]
    transcript: Option<PathBuf>,
}

#[cfg(feature = "serial")]
#[derive(Subcommand)]
enum PortCommands {
    /// List available serial ports
    List {
        /// Port to mark as configured (default: /dev/ttyUSB1)
        #[arg(short, long, env = "INFERENCE_LINK_PORT")]
        port: Option<String>,
    },
}

#[derive(Subcommand)]
enum ProfileCommands {
    /// List built-in link profiles
    List,

    /// Show the settings of a link profile
    Show {
        /// Profile name (e.g., mlp, mlp-rtscts)
        profile: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Generate a config file from a profile
    Generate {
        /// Link profile
        #[arg(short = 'd', long, default_value = "mlp")]
        profile: String,

        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a config file and show the settings it resolves to
    Check {
        /// Path to the TOML config file
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match cli.command {
        #[cfg(feature = "serial")]
        Commands::Infer(args) => handle_infer(args),
        #[cfg(feature = "serial")]
        Commands::Ports(cmd) => handle_ports(cmd),
        Commands::Profiles(cmd) => handle_profiles(cmd),
        Commands::Config(cmd) => handle_config(cmd),
    }
}

fn lookup_profile(name: &str) -> Result<&'static LinkProfile> {
    get_profile(name).ok_or_else(|| {
        anyhow::anyhow!(
            "Unknown link profile: {}. Use 'inference-link profiles list' to see available profiles.",
            name
        )
    })
}

/// Profile defaults, then config file, then command-line flags
fn resolve_config(args: &LinkArgs) -> Result<LinkConfig> {
    let mut config = lookup_profile(&args.profile)?.config.clone();

    if let Some(ref path) = args.config {
        config.apply(ConfigOverrides::load(path)?);
    }

    config.apply(ConfigOverrides {
        port: args.port.clone(),
        baud_rate: args.baud,
        timeout_ms: args.timeout_ms,
        byte_delay_ms: args.byte_delay_ms,
        settle_ms: args.settle_ms,
        open_delay_ms: args.open_delay_ms,
        flow_control: None,
    });

    config.validate()?;
    Ok(config)
}

#[cfg(feature = "serial")]
fn handle_infer(args: InferArgs) -> Result<()> {
    let config = resolve_config(&args.link)?;
    let inputs = InputVector::try_from(args.inputs.as_slice())?;

    eprintln!(
        "{} Sending {} to {} at {} baud",
        "[TX]".cyan().bold(),
        inputs,
        config.port,
        config.baud_rate
    );

    let output = run_transaction(&config, &inputs, args.transcript.as_deref())?;
    println!("{}", describe_response(output.as_ref()));

    let status = exit_status(output.as_ref());
    if status != EXIT_OK {
        std::process::exit(status);
    }
    Ok(())
}

/// Open the link, run one exchange, and release the link on every path
#[cfg(feature = "serial")]
fn run_transaction(
    config: &LinkConfig,
    inputs: &InputVector,
    transcript_path: Option<&Path>,
) -> Result<Option<OutputVector>> {
    let mut transcript = transcript_path
        .map(|path| {
            Transcript::open(path)
                .with_context(|| format!("Failed to open transcript: {}", path.display()))
        })
        .transpose()?;

    let mut conn = SerialConnection::open(config)?;

    // The board may reset when the port opens
    std::thread::sleep(config.open_delay());
    conn.clear_input()?;

    if let Some(ref mut t) = transcript {
        t.record_tx(inputs)
            .with_context(|| format!("Failed to write transcript: {}", t.path().display()))?;
    }

    let output = run_inference(&mut conn, inputs, &config.pacing())
        .with_context(|| format!("Inference on {} failed", conn.port_path()))?;

    if let Some(ref mut t) = transcript {
        t.record_rx(output.as_ref())
            .with_context(|| format!("Failed to write transcript: {}", t.path().display()))?;
    }

    Ok(output)
}

#[cfg(feature = "serial")]
fn handle_ports(cmd: PortCommands) -> Result<()> {
    match cmd {
        PortCommands::List { port } => {
            serial::port::print_ports(port.as_deref().unwrap_or(config::DEFAULT_PORT))
        }
    }
}

fn handle_profiles(cmd: ProfileCommands) -> Result<()> {
    match cmd {
        ProfileCommands::List => {
            println!("{}", "=".repeat(60));
            println!("{}", "Link Profiles".cyan().bold());
            println!("{}", "=".repeat(60));

            for name in profile_names() {
                if let Some(profile) = get_profile(name) {
                    println!("\n  {}: {}", name.white().bold(), profile.name);
                    println!("    {}", profile.description);
                }
            }

            println!("\n{}", "=".repeat(60));
            println!(
                "Use {} to see profile settings",
                "inference-link profiles show <profile>".cyan()
            );
        }

        ProfileCommands::Show { profile } => {
            print_profile(lookup_profile(&profile)?);
        }
    }

    Ok(())
}

fn print_profile(profile: &LinkProfile) {
    println!("{}", "=".repeat(60));
    println!("{}", format!("Link Profile: {}", profile.name).cyan().bold());
    println!("{}", "=".repeat(60));
    println!("  ID: {}", profile.id);
    println!("  Description: {}", profile.description);
    print_settings(&profile.config);
    println!("{}", "=".repeat(60));
}

fn print_settings(c: &LinkConfig) {
    println!("\n{}", "Serial Settings:".white().bold());
    println!("  Port: {}", c.port);
    println!("  Baud rate: {}", c.baud_rate);
    println!("  Framing: 8N1");
    println!("  Flow control: {}", c.flow_control);
    println!("\n{}", "Timing:".white().bold());
    println!("  Read timeout: {} ms", c.timeout_ms);
    println!("  Inter-byte delay: {} ms", c.byte_delay_ms);
    println!("  Settle delay: {} ms", c.settle_ms);
    println!("  Open delay: {} ms", c.open_delay_ms);
}

fn handle_config(cmd: ConfigCommands) -> Result<()> {
    match cmd {
        ConfigCommands::Generate { profile, output } => {
            let toml = lookup_profile(&profile)?.config.to_toml()?;

            if let Some(path) = output {
                std::fs::write(&path, &toml)
                    .with_context(|| format!("Failed to write {}", path.display()))?;
                println!(
                    "{} Config written to {}",
                    "[OK]".green().bold(),
                    path.display()
                );
            } else {
                print!("{}", toml);
            }
        }

        ConfigCommands::Check { path } => {
            let config = LinkConfig::load(&path)
                .with_context(|| format!("Config check failed: {}", path.display()))?;

            println!("{} {} is valid", "[OK]".green().bold(), path.display());
            print_settings(&config);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FlowControlSetting;
    use std::io::Write;
    use std::path::Path;
    use tempfile::NamedTempFile;

    fn link_args(profile: &str) -> LinkArgs {
        LinkArgs {
            profile: profile.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_profile_defaults() {
        let config = resolve_config(&link_args("mlp-rtscts")).unwrap();
        assert_eq!(config.flow_control, FlowControlSetting::Hardware);
        assert_eq!(config.byte_delay_ms, 0);
    }

    #[test]
    fn test_resolve_layering() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "port = \"/dev/ttyACM3\"").unwrap();
        writeln!(file, "baud_rate = 57600").unwrap();
        writeln!(file, "settle_ms = 50").unwrap();

        let args = LinkArgs {
            config: Some(file.path().to_path_buf()),
            baud: Some(230400),
            ..link_args("mlp")
        };
        let config = resolve_config(&args).unwrap();

        assert_eq!(config.port, "/dev/ttyACM3");
        assert_eq!(config.baud_rate, 230400);
        assert_eq!(config.settle_ms, 50);
        assert_eq!(config.timeout_ms, 1000);
    }

    #[test]
    fn test_resolve_rejects_bad_values() {
        assert!(resolve_config(&link_args("nope")).is_err());

        let args = LinkArgs {
            timeout_ms: Some(0),
            ..link_args("mlp")
        };
        assert!(resolve_config(&args).is_err());
    }

    #[test]
    fn test_cli_parses_config_generate() {
        let cli = Cli::try_parse_from([
            "inference-link",
            "config",
            "generate",
            "--profile",
            "mlp-rtscts",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Generate { ref profile, output: None }) if profile == "mlp-rtscts"
        ));
    }

    #[test]
    fn test_exit_status_mapping() {
        let out = OutputVector::new([7, 42]);
        assert_eq!(exit_status(Some(&out)), 0);
        assert_eq!(exit_status(None), 2);
        // 1 is reserved for errors returned from main
        assert_ne!(exit_status(None), 1);
    }

    #[test]
    fn test_resolve_open_delay() {
        let config = resolve_config(&link_args("mlp-rtscts")).unwrap();
        assert_eq!(config.open_delay_ms, 100);

        let args = LinkArgs {
            open_delay_ms: Some(2000),
            ..link_args("mlp-rtscts")
        };
        assert_eq!(resolve_config(&args).unwrap().open_delay_ms, 2000);
    }

    #[test]
    fn test_cli_parses_config_check() {
        let cli =
            Cli::try_parse_from(["inference-link", "config", "check", "board.toml"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config(ConfigCommands::Check { ref path }) if path == Path::new("board.toml")
        ));
    }

    #[test]
    fn test_config_check_validates_file() {
        let mut good = NamedTempFile::new().unwrap();
        writeln!(good, "port = \"/dev/ttyACM0\"").unwrap();
        writeln!(good, "open_delay_ms = 500").unwrap();
        assert!(handle_config(ConfigCommands::Check {
            path: good.path().to_path_buf()
        })
        .is_ok());

        let mut bad = NamedTempFile::new().unwrap();
        writeln!(bad, "baud_rate = 0").unwrap();
        assert!(handle_config(ConfigCommands::Check {
            path: bad.path().to_path_buf()
        })
        .is_err());
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_cli_parses_infer() {
        let cli = Cli::try_parse_from([
            "inference-link",
            "infer",
            "-p",
            "/dev/ttyUSB0",
            "100",
            "50",
            "200",
            "30",
        ])
        .unwrap();
        match cli.command {
            Commands::Infer(args) => {
                assert_eq!(args.inputs, vec![100, 50, 200, 30]);
                assert_eq!(args.link.port.as_deref(), Some("/dev/ttyUSB0"));
                assert_eq!(args.link.open_delay_ms, None);
            }
            _ => panic!("expected infer"),
        }
    }

    #[cfg(feature = "serial")]
    #[test]
    fn test_cli_rejects_bad_inputs() {
        // out of range
        assert!(Cli::try_parse_from(["inference-link", "infer", "1", "2", "256", "4"]).is_err());
        // wrong count
        assert!(Cli::try_parse_from(["inference-link", "infer", "1", "2", "3"]).is_err());
        assert!(Cli::try_parse_from(["inference-link", "infer", "1", "2", "3", "4", "5"]).is_err());
    }
}
