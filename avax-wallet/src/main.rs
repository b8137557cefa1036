//! Avalanche Hardware Wallet CLI
//!
//! Command line access to an Avalanche X-Chain account held on a Ledger.

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use avax_wallet::commands::{self, DeviceOptions, NodeOptions};
use avax_wallet::{Chain, WalletConfig};

#[derive(Parser)]
#[command(name = "avax-wallet")]
#[command(about = "Avalanche X-Chain wallet backed by a Ledger device")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Get the id of the wallet loaded on the device
    GetWalletId {
        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Get a public key and its address from the device
    GetWalletPubkey {
        /// Path below m/44'/9000'/, e.g. 0'/0/0
        path: String,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Get a public key and chain code from the device
    GetWalletExtpubkey {
        /// Path below m/44'/9000'/, e.g. 0'
        path: String,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Get the balance of a particular address
    GetBalance {
        address: String,

        #[command(flatten)]
        node: NodeOptions,
    },

    /// List the UTXOs of a particular address
    GetUtxos {
        address: String,

        #[command(flatten)]
        node: NodeOptions,
    },

    /// Get the total balance of all addresses of this wallet
    GetWalletBalance {
        /// Display a breakdown for individual addresses
        #[arg(long)]
        accounts: bool,

        #[command(flatten)]
        node: NodeOptions,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Get the next unused change address
    GetChangeAddress {
        #[command(flatten)]
        node: NodeOptions,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Get the next unused receive address
    GetReceiveAddress {
        #[command(flatten)]
        node: NodeOptions,

        #[command(flatten)]
        device: DeviceOptions,
    },

    /// Transfer AVAX to another address
    Transfer {
        /// Amount to transfer, specified in nanoAVAX
        #[arg(long)]
        amount: String,

        /// Recipient address
        #[arg(long)]
        to: String,

        #[command(flatten)]
        node: NodeOptions,

        #[command(flatten)]
        device: DeviceOptions,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only command output
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    if let Err(e) = run(cli).await {
        commands::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = WalletConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::GetWalletId { device } => commands::device::wallet_id(&config, &device).await,
        Commands::GetWalletPubkey { path, device } => {
            commands::device::public_key(&config, &device, &path).await
        }
        Commands::GetWalletExtpubkey { path, device } => {
            commands::device::extended_public_key(&config, &device, &path).await
        }
        Commands::GetBalance { address, node } => {
            commands::balance::run(&config, &node, &address).await
        }
        Commands::GetUtxos { address, node } => commands::utxos::run(&config, &node, &address).await,
        Commands::GetWalletBalance {
            accounts,
            node,
            device,
        } => commands::balance::run_wallet(&config, &node, &device, accounts).await,
        Commands::GetChangeAddress { node, device } => {
            commands::address::run(&config, &node, &device, Chain::Internal).await
        }
        Commands::GetReceiveAddress { node, device } => {
            commands::address::run(&config, &node, &device, Chain::External).await
        }
        Commands::Transfer {
            amount,
            to,
            node,
            device,
        } => commands::transfer::run(&config, &node, &device, &amount, &to).await,
    }
}
