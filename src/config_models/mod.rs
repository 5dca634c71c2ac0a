//! Node configuration: CLI parsing, network parameters, and the
//! read-once-at-startup filesystem inputs (blacklist/whitelist/invalid.json).

pub mod cli;
pub mod network;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use crate::errors::{NodeError, NodeResult};
use crate::models::wallet_address::WalletAddress;
pub use network::Network;

#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub network: Network,
    pub data_dir: PathBuf,
    pub listen_port: u16,
    pub host_source_urls: Vec<String>,
    pub show_header_stats: bool,
    pub min_host_version: u32,
    pub genesis_path: PathBuf,
}

impl NodeConfig {
    pub fn from_args(args: cli::Args) -> NodeResult<NodeConfig> {
        let network = args.network;
        let data_dir = args.data_dir.unwrap_or_else(|| default_data_dir(network));
        let genesis_path = args
            .genesis_path
            .unwrap_or_else(|| data_dir.join("genesis.json"));

        Ok(NodeConfig {
            network,
            listen_port: args.port.unwrap_or_else(|| network.default_port()),
            host_source_urls: args.host_source_urls,
            show_header_stats: args.show_header_stats,
            min_host_version: args.min_host_version.unwrap_or(1),
            data_dir,
            genesis_path,
        })
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger")
    }

    pub fn blocks_path(&self) -> PathBuf {
        self.data_dir.join("blocks")
    }

    pub fn txdb_path(&self) -> PathBuf {
        self.data_dir.join("txdb")
    }
}

fn default_data_dir(network: Network) -> PathBuf {
    ProjectDirs::from("", "", "pandachain-node")
        .map(|dirs| dirs.data_dir().join(network.dir_name()))
        .unwrap_or_else(|| PathBuf::from(format!("./.pandachain-{}", network.dir_name())))
}

/// Loads a one-host-per-line file (`#` comments, trailing slash stripped).
/// Missing files are treated as empty, not an error — both lists are
/// optional (§6).
pub fn load_host_list(path: &Path) -> NodeResult<HashSet<String>> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Ok(HashSet::new());
    };
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.trim_end_matches('/').to_string())
        .collect())
}

/// Loads the historical (blockId, wallet) exception list used to suppress
/// repeated failure logging during replay (§6). Never written at runtime.
pub fn load_invalid_exceptions(path: &Path) -> NodeResult<HashMap<u64, HashSet<WalletAddress>>> {
    let Ok(contents) = std::fs::read_to_string(path) else {
        return Ok(HashMap::new());
    };
    let raw: Vec<(u64, WalletAddress)> =
        serde_json::from_str(&contents).map_err(|e| NodeError::Config(format!("invalid.json: {e}")))?;
    let mut map: HashMap<u64, HashSet<WalletAddress>> = HashMap::new();
    for (block_id, wallet) in raw {
        map.entry(block_id).or_default().insert(wallet);
    }
    Ok(map)
}
