//! Node: the composition root (§2 item 9). Owns the three components and
//! drives their five background tasks at the cadences fixed in
//! [`crate::constants`]. Construction resolves the BlockChain/MemPool
//! cycle by building both from their storage handles independently, then
//! wiring each in as the other's trait-object view.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::task::JoinSet;
use tokio::time::{interval, Duration};
use tracing::{info, warn};

use crate::blockchain::BlockChain;
use crate::config_models::NodeConfig;
use crate::constants::{
    CHAIN_SYNC_INTERVAL_SEC, HEADER_STATS_INTERVAL_SEC, MEMPOOL_CLEANUP_INTERVAL_SEC,
    MEMPOOL_GOSSIP_INTERVAL_MS, PEER_PING_INTERVAL_SEC,
};
use crate::database::block_store::BlockStore;
use crate::database::ledger_store::Ledger;
use crate::database::tx_store::TxStore;
use crate::errors::{NodeError, NodeResult};
use crate::host::HostManager;
use crate::mempool::MemPool;
use crate::models::block::Block;
use crate::peer_client::{HttpPeerClient, PeerClient};

pub struct Node {
    pub blockchain: Arc<BlockChain>,
    pub mempool: Arc<MemPool>,
    pub host_manager: Arc<HostManager>,
    client: Arc<dyn PeerClient>,
    show_header_stats: bool,
}

fn unix_now() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default().as_secs()
}

fn load_genesis(config: &NodeConfig) -> NodeResult<Block> {
    let contents = std::fs::read_to_string(&config.genesis_path)
        .map_err(|e| NodeError::Genesis(format!("{}: {e}", config.genesis_path.display())))?;
    serde_json::from_str(&contents).map_err(|e| NodeError::Genesis(format!("malformed genesis file: {e}")))
}

impl Node {
    pub fn assemble(config: &NodeConfig) -> NodeResult<Node> {
        std::fs::create_dir_all(&config.data_dir)?;

        let ledger = Arc::new(Ledger::open(config.ledger_path())?);
        let blocks = Arc::new(BlockStore::open(config.blocks_path())?);
        let txdb = Arc::new(TxStore::open(config.txdb_path())?);
        let genesis = load_genesis(config)?;

        let blockchain = Arc::new(BlockChain::new(ledger, blocks, txdb, genesis)?);
        let mempool = Arc::new(MemPool::new(blockchain.clone()));
        blockchain.register_mempool(mempool.clone());

        let blacklist = crate::config_models::load_host_list(&config.data_dir.join("blacklist.txt"))?;
        let whitelist = crate::config_models::load_host_list(&config.data_dir.join("whitelist.txt"))?;
        let client: Arc<dyn PeerClient> = Arc::new(HttpPeerClient::new());
        let host_manager = Arc::new(HostManager::new(
            client.clone(),
            blacklist,
            whitelist,
            config.min_host_version,
            config.network.dir_name().to_string(),
        ));

        for url in &config.host_source_urls {
            info!(url, "configured host-source URL");
        }

        Ok(Node {
            blockchain,
            mempool,
            host_manager,
            client,
            show_header_stats: config.show_header_stats,
        })
    }

    /// RefreshHostList (§4.5): pull peer lists from the configured
    /// host-source URLs and admit each through the usual AddPeer filters.
    pub async fn refresh_host_list(&self, source_urls: &[String]) {
        let mut seen = HashSet::new();
        for url in source_urls {
            let Ok(resp) = reqwest::get(url).await else {
                warn!(url, "host-source URL unreachable");
                continue;
            };
            let Ok(hosts) = resp.json::<Vec<String>>().await else {
                warn!(url, "host-source URL returned malformed peer list");
                continue;
            };
            for host in hosts {
                if !seen.insert(host.clone()) {
                    continue;
                }
                let Ok(info) = self.client.ping(&host).await else {
                    continue;
                };
                let now = unix_now();
                let _ = self
                    .host_manager
                    .add_peer(&host, info.timestamp, info.version, &info.network_name, now)
                    .await;
            }
        }
    }

    /// Runs all five background workers until the process is asked to
    /// shut down; returns once every task has wound down.
    pub async fn run(self: Arc<Self>) -> NodeResult<()> {
        let mut tasks = JoinSet::new();

        {
            let node = self.clone();
            tasks.spawn(async move {
                let mut tick = interval(Duration::from_secs(CHAIN_SYNC_INTERVAL_SEC));
                loop {
                    tick.tick().await;
                    let now = node.host_manager.network_timestamp(unix_now());
                    node.host_manager
                        .sync_headers_with_peers(node.client.as_ref(), now)
                        .await;
                    if let Err(e) = node
                        .blockchain
                        .start_chain_sync(&node.host_manager, node.client.as_ref(), now)
                        .await
                    {
                        warn!(error = %e, "chain sync tick failed");
                    }
                }
            });
        }

        {
            let node = self.clone();
            tasks.spawn(async move {
                let mut tick = interval(Duration::from_secs(PEER_PING_INTERVAL_SEC));
                loop {
                    tick.tick().await;
                    node.host_manager.ping_all_known_hosts(unix_now()).await;
                }
            });
        }

        {
            let node = self.clone();
            tasks.spawn(async move {
                let mut tick = interval(Duration::from_millis(MEMPOOL_GOSSIP_INTERVAL_MS));
                loop {
                    tick.tick().await;
                    node.mempool
                        .gossip_once(&node.host_manager, node.client.as_ref(), unix_now())
                        .await;
                }
            });
        }

        {
            let node = self.clone();
            tasks.spawn(async move {
                let mut tick = interval(Duration::from_secs(MEMPOOL_CLEANUP_INTERVAL_SEC));
                loop {
                    tick.tick().await;
                    node.mempool.cleanup_expired();
                }
            });
        }

        if self.show_header_stats {
            let node = self.clone();
            tasks.spawn(async move {
                let mut tick = interval(Duration::from_secs(HEADER_STATS_INTERVAL_SEC));
                loop {
                    tick.tick().await;
                    for (host, downloaded) in node.host_manager.header_progress() {
                        info!(host, downloaded, "header sync progress");
                    }
                }
            });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                warn!(error = %e, "background task panicked");
            }
        }
        Ok(())
    }
}
