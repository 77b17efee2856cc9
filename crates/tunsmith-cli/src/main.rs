// ============================================
// File: crates/tunsmith-cli/src/main.rs
// ============================================
//! # Tunsmith Entry Point
//!
//! ## Creation Reason
//! Operator-facing binary for provisioning a tunnel interface by hand, and
//! for checking a configuration file before an embedder uses it.
//!
//! ## Main Functionality
//! - CLI argument parsing with clap
//! - Logging initialization with tracing
//! - Configuration loading
//! - Provisioning with human-readable or JSON output
//!
//! ## Usage
//! ```bash
//! # Linux: open /dev/net/tun and bind it
//! sudo tunsmith setup
//!
//! # Linux: bind a descriptor inherited from the parent process
//! sudo tunsmith setup --fd 3 --json
//!
//! # Windows (elevated prompt): bring up the TAP adapter
//! tunsmith setup
//!
//! # Other commands
//! tunsmith validate -c /etc/tunsmith/tunsmith.toml
//! tunsmith defaults > tunsmith.toml
//! ```
//!
//! ## ⚠️ Important Note for Next Developer
//! - Logs go to stderr so `--json` output on stdout stays parseable
//! - On Linux the interface disappears at exit unless `tunnel.persist` is set
//! - Exit status is 1 whenever provisioning fails
//!
//! ## Last Modified
//! v0.1.0 - Initial CLI implementation

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tunsmith_cli::CliConfig;
use tunsmith_transport::{ProvisioningOutcome, RawDescriptor, TunnelHandle, WireOutcome};

// ============================================
// CLI Definition
// ============================================

/// Tunsmith tunnel interface provisioning
///
/// Linux: binds a /dev/net/tun descriptor to a TUN interface.
/// Windows: brings up the TAP-Windows adapter.
#[derive(Parser, Debug)]
#[command(name = "tunsmith")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Provision the tunnel interface
    ///
    /// On Linux without --fd the configured device node is opened first.
    Setup {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/tunsmith/tunsmith.toml")]
        config: PathBuf,

        /// Already-open descriptor of the tunnel device node (Linux)
        #[arg(long)]
        fd: Option<RawDescriptor>,

        /// Print the outcome as a single JSON object
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Path to configuration file
        #[arg(short, long, default_value = "/etc/tunsmith/tunsmith.toml")]
        config: PathBuf,
    },

    /// Print the default configuration as TOML
    Defaults,
}

// ============================================
// Main
// ============================================

fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute command
    let result = match cli.command {
        Commands::Setup { config, fd, json } => cmd_setup(&config, fd, json),
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Defaults => cmd_defaults(),
    };

    // Handle errors
    if let Err(e) = result {
        init_logging("info");
        error!("{}", e);
        std::process::exit(1);
    }
}

// ============================================
// Commands
// ============================================

/// Provisions the tunnel and reports the outcome.
fn cmd_setup(config_path: &Path, fd: Option<RawDescriptor>, json: bool) -> anyhow::Result<()> {
    let config = CliConfig::load_or_default(config_path)?;

    // Logging level comes from the config
    init_logging(&config.logging.level);

    info!("Provisioning tunnel...");

    let mut held = None;
    let outcome = provision(fd, &config, &mut held);
    let needs_privileges = matches!(&outcome, Err(e) if e.requires_privileges());
    let wire = WireOutcome::from(outcome);

    if json {
        println!("{}", wire.to_json()?);
    } else {
        print_outcome(&wire, needs_privileges);
    }

    if !wire.is_success() {
        std::process::exit(1);
    }

    if held.is_some() && !config.tunnel.persist {
        warn!("Interface is removed when tunsmith exits; set tunnel.persist to keep it");
    }

    Ok(())
}

/// Validates configuration file.
fn cmd_validate(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("⚠️  Config file not found: {}", config_path.display());
        println!("   Default values will be used.");
        return Ok(());
    }

    let config = CliConfig::load(config_path)?;

    println!("✅ Configuration is valid");
    println!();
    println!("Tunnel (Linux):");
    println!("   Interface:  {}", config.tunnel.interface_name);
    println!("   Device:     {}", config.tunnel.device_path.display());
    println!("   Persist:    {}", config.tunnel.persist);
    println!();
    println!("TAP (Windows):");
    println!("   Component:  {}", config.tap.component_id);
    println!("   Strict:     {}", config.tap.strict_control);
    println!();
    println!("Addressing:");
    println!("   Local:      {}", config.addressing.local_address);
    println!("   Network:    {}/{}", config.addressing.network, config.addressing.prefix_len());
    println!();

    Ok(())
}

/// Prints the default configuration.
fn cmd_defaults() -> anyhow::Result<()> {
    print!("{}", CliConfig::default().to_toml()?);
    Ok(())
}

// ============================================
// Helper Functions
// ============================================

/// Runs provisioning for this platform.
///
/// On Linux without `fd` the device node is opened here and the resulting
/// handle is kept in `held` so the interface lives until the process exits.
#[cfg(target_os = "linux")]
fn provision(
    fd: Option<RawDescriptor>,
    config: &CliConfig,
    held: &mut Option<TunnelHandle>,
) -> ProvisioningOutcome {
    use tunsmith_transport::{open_tun_device, Provisioned};

    let tunnel = config.to_tunnel_config();
    if fd.is_some() {
        return tunsmith_transport::setup_tunnel(fd, &tunnel);
    }

    tunnel.validate()?;
    let (handle, bound) = open_tun_device(&config.tunnel.device_path, &tunnel)?;
    *held = Some(handle);
    Ok(Provisioned::Bound(bound))
}

/// Runs provisioning for this platform.
#[cfg(not(target_os = "linux"))]
fn provision(
    fd: Option<RawDescriptor>,
    config: &CliConfig,
    _held: &mut Option<TunnelHandle>,
) -> ProvisioningOutcome {
    tunsmith_transport::setup_tunnel(fd, &config.to_tunnel_config())
}

/// Prints a provisioning outcome for humans.
fn print_outcome(wire: &WireOutcome, needs_privileges: bool) {
    match wire {
        WireOutcome::Interface { interface, fd } => {
            println!("✅ Interface {} bound to fd {}", interface, fd);
        }
        WireOutcome::Handle { handle } => {
            println!("✅ TAP adapter is up (handle {})", handle);
        }
        WireOutcome::Error { error } => {
            println!("❌ {}", error);
            if needs_privileges {
                println!();
                println!("Provisioning needs elevated privileges:");
                println!("  • Linux: run as root or grant CAP_NET_ADMIN");
                println!("  • Windows: run from an Administrator prompt");
            }
        }
    }
}

/// Initializes the tracing subscriber.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .try_init()
        .ok();
}
