//! Command-line surface, parsed with `clap` and folded into a [`super::NodeConfig`].

use std::path::PathBuf;

use clap::Parser;

use super::Network;

#[derive(Debug, Parser)]
#[command(name = "pandachain-node", about = "Proof-of-work ledger node")]
pub struct Args {
    /// Network to join.
    #[arg(long, value_enum, default_value_t = Network::Main)]
    pub network: Network,

    /// Overrides the default per-network data directory.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Overrides the default per-network listen port.
    #[arg(long)]
    pub port: Option<u16>,

    /// Explicit genesis file path; defaults to `<data-dir>/genesis.json`.
    #[arg(long)]
    pub genesis_path: Option<PathBuf>,

    /// Host-source URLs to query for peer lists at startup (§4.5).
    #[arg(long = "host-source", value_delimiter = ',')]
    pub host_source_urls: Vec<String>,

    /// Log per-peer header download progress every 30s.
    #[arg(long)]
    pub show_header_stats: bool,

    /// Minimum peer protocol version accepted by AddPeer.
    #[arg(long)]
    pub min_host_version: Option<u32>,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}
