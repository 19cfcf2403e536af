//! natlink CLI
//!
//! Inspects the local addresses NAT discovery controllers would announce on.

mod config;

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use natlink_core::{PrivateRangeCheck, address};
use std::net::IpAddr;
use std::path::PathBuf;

use config::Config;

/// natlink - NAT discovery address tooling
#[derive(Parser)]
#[command(name = "natlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Configuration file path (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the local host's addresses in resolver order
    Addresses {
        /// Include IPv6 addresses
        #[arg(long)]
        ipv6: bool,

        /// Only show addresses classified as private
        #[arg(long)]
        private_only: bool,
    },

    /// Classify addresses as private or public
    Classify {
        /// Addresses to classify
        #[arg(required = true)]
        addresses: Vec<IpAddr>,
    },
}

/// Private-range classification of a single address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Private,
    Public,
    Unsupported,
}

impl Scope {
    fn of(addr: IpAddr, check: PrivateRangeCheck) -> Self {
        match check.classify(addr) {
            Ok(true) => Self::Private,
            Ok(false) => Self::Public,
            Err(_) => Self::Unsupported,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Public => "public",
            Self::Unsupported => "n/a",
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = if cli.config.is_some() {
        Config::load(&config_path)?
    } else {
        Config::load_or_create(&config_path)?
    };
    config.validate()?;

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "debug"
        } else {
            config.logging.level.as_str()
        })
        .init();

    tracing::debug!(path = %config_path.display(), "Loaded configuration");

    match cli.command {
        Commands::Addresses { ipv6, private_only } => {
            list_addresses(ipv6 || config.addresses.include_ipv6, private_only, &config)?;
        }
        Commands::Classify { addresses } => {
            classify(&addresses);
        }
    }

    Ok(())
}

/// List local addresses with their scope
fn list_addresses(include_ipv6: bool, private_only: bool, config: &Config) -> anyhow::Result<()> {
    let check = config.addresses.private_ranges;
    let addrs = local_addresses(include_ipv6)?;

    println!("Local addresses ({check} ranges):");
    let mut shown = 0usize;
    for addr in addrs {
        let scope = Scope::of(addr, check);
        if private_only && scope != Scope::Private {
            continue;
        }
        shown += 1;
        let label = match scope {
            Scope::Private => style(scope.label()).green(),
            Scope::Public => style(scope.label()).yellow(),
            Scope::Unsupported => style(scope.label()).dim(),
        };
        println!("  {addr:<40} {label}");
    }

    if shown == 0 {
        println!("  (none)");
    }
    Ok(())
}

fn local_addresses(include_ipv6: bool) -> anyhow::Result<Vec<IpAddr>> {
    address::local_addresses(include_ipv6).context("could not enumerate local addresses")
}

/// Classify addresses under both predicates
fn classify(addresses: &[IpAddr]) {
    for line in classify_lines(addresses) {
        println!("{line}");
    }
}

fn classify_lines(addresses: &[IpAddr]) -> Vec<String> {
    addresses
        .iter()
        .map(|&addr| {
            let compatible = Scope::of(addr, PrivateRangeCheck::Compatible);
            let strict = Scope::of(addr, PrivateRangeCheck::Rfc1918);
            let mut line = format!(
                "{addr:<40} compatible={:<8} rfc1918={}",
                compatible.label(),
                strict.label()
            );
            if compatible != strict {
                line.push_str("  (predicates disagree)");
            }
            line
        })
        .collect()
}
