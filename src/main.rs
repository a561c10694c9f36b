use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cmd;
mod config;
mod patlite;
mod server;
mod transport;
mod utils;

use cmd::{EncodeArgs, SendArgs, ServeArgs};
use config::GatewayConfig;

/// Patlite Gateway - HTTP front door for a signal light driven over rsh
///
/// Command layout:
///   patlite-gateway serve  [--listen ADDR]
///   patlite-gateway encode <alert|clear|status|test> [--opt k=v ...] [--json]
///   patlite-gateway send   <alert|clear|status|test> [--opt k=v ...] [--json]
///
/// Global flags / env:
///   -v / -vv          Increase verbosity (RUST_LOG overrides)
///   -q / --quiet      Errors only
///   -c / --config     YAML config file (or PATLITE_CONFIG)
///   PATLITE_HOST      Device host
///   PATLITE_RUSER     Remote user (default: patlite)
///   PATLITE_INVOKER   Remote shell program (default: rsh)
///
/// Alert options:
///   r, y, g   lamp state   0 1 2 3 9   (default 9)
///   z         buzzer       0 1 2 3 4 9 (default 9)
///   sec       duration     0-99 or empty (default 0)
///
/// Clear options:
///   p, z      1 = clear lamps / buzzer
///
/// Examples:
///   patlite-gateway encode alert --opt r=1 --opt z=1 --opt sec=2
///   PATLITE_HOST=10.0.0.5 patlite-gateway send clear --opt p=1
///   patlite-gateway -c gateway.yaml serve
#[derive(Parser, Debug)]
#[command(
    name = "patlite-gateway",
    version,
    about = "Patlite Gateway - validated remote control of a signal light",
    propagate_version = true,
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Silence all non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Configuration file (YAML)
    #[arg(short = 'c', long = "config", global = true, env = "PATLITE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve(ServeArgs),

    /// Validate and encode a command without executing it
    Encode(EncodeArgs),

    /// Encode and execute a command once
    Send(SendArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = match GatewayConfig::load(cli.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Invalid configuration: {e:#}");
            std::process::exit(2);
        }
    };

    let level = utils::derive_level(cli.verbose, cli.quiet);
    utils::init_logging(level, cfg.log_file.as_deref())?;

    match cli.command {
        Commands::Serve(args) => cmd::execute_serve(args, cfg),
        Commands::Encode(args) => cmd::execute_encode(args, &cfg),
        Commands::Send(args) => cmd::execute_send(args, &cfg),
    }
}
