//! # Address Subcommand
//!
//! Derives the escrow address a coordinator would compute for a contract
//! request, so a party can check it out of band.
//!
//! ```bash
//! cosign address --network liquid \
//!     --client <x-only hex> --client <x-only hex> \
//!     --arbitrator <x-only hex> --quorum 1
//! ```

use anyhow::{Context, Result};
use clap::Args;

use cosign_core::{Network, PartyKey};
use cosign_escrow::derive_escrow_address;

/// Arguments for `cosign address`.
#[derive(Args, Debug)]
pub struct AddressArgs {
    /// Network the escrow lives on: bitcoin, testnet, signet, regtest,
    /// liquid, liquidtestnet or elementsregtest.
    #[arg(long)]
    pub network: Network,

    /// Client key, in script order. Repeat for each client.
    #[arg(long = "client", required = true)]
    pub clients: Vec<PartyKey>,

    /// Arbitrator key, in script order. Repeat for each arbitrator.
    #[arg(long = "arbitrator", required = true)]
    pub arbitrators: Vec<PartyKey>,

    /// Arbitrator signatures required on the dispute path.
    #[arg(long)]
    pub quorum: u32,
}

/// Execute `cosign address`.
pub fn run_address(args: &AddressArgs) -> Result<u8> {
    let address = cmd_address(args.network, &args.clients, &args.arbitrators, args.quorum)?;
    println!("{address}");
    Ok(0)
}

/// Derive the address, adding the network to any error.
pub fn cmd_address(
    network: Network,
    clients: &[PartyKey],
    arbitrators: &[PartyKey],
    quorum: u32,
) -> Result<String> {
    derive_escrow_address(network, clients, arbitrators, quorum)
        .with_context(|| format!("cannot derive {network} escrow address"))
}
