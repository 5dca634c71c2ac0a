use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use pandachain_node::config_models::{cli::Args, NodeConfig};
use pandachain_node::node::Node;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = NodeConfig::from_args(args)?;

    tracing::info!(network = ?config.network, data_dir = %config.data_dir.display(), "starting node");

    let node = Arc::new(Node::assemble(&config)?);
    if !config.host_source_urls.is_empty() {
        node.refresh_host_list(&config.host_source_urls).await;
    }
    node.run().await?;
    Ok(())
}
