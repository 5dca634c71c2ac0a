//! PeerClient: the wire contract a peer exposes to the rest of the node
//! (§4.7). `HttpPeerClient` is the one concrete implementation, built on
//! the ambient HTTP client with per-call timeouts matching §5.

use std::time::Duration;

use async_trait::async_trait;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BLOCK_FETCH_TIMEOUT_SEC, BLOCK_SUBMIT_TIMEOUT_SEC, HEADER_FETCH_TIMEOUT_SEC,
    PEER_HTTP_TIMEOUT_SEC,
};
use crate::errors::{NodeError, NodeResult};
use crate::models::block::Block;
use crate::models::hash::Digest;
use crate::models::status::ExecutionStatus;
use crate::models::transaction::Transaction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerInfo {
    pub version: u32,
    pub network_name: String,
    pub timestamp: u64,
}

/// A header as exchanged between peers during sync, independent of the
/// full block body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerBlockHeader {
    pub id: u64,
    pub hash: Digest,
    pub last_block_hash: Digest,
    pub difficulty: u8,
}

#[async_trait]
pub trait PeerClient: Send + Sync {
    async fn ping(&self, addr: &str) -> NodeResult<PeerInfo>;
    async fn get_block_count(&self, addr: &str) -> NodeResult<u64>;
    async fn get_total_work(&self, addr: &str) -> NodeResult<BigUint>;
    async fn get_block_hash(&self, addr: &str, id: u64) -> NodeResult<Digest>;
    async fn get_headers(&self, addr: &str, start: u64, count: u64) -> NodeResult<Vec<PeerBlockHeader>>;
    async fn get_blocks(&self, addr: &str, start: u64, count: u64) -> NodeResult<Vec<Block>>;
    async fn get_name(&self, addr: &str) -> NodeResult<PeerInfo>;
    async fn submit_transaction(&self, addr: &str, tx: &Transaction) -> NodeResult<ExecutionStatus>;
}

pub struct HttpPeerClient {
    short: reqwest::Client,
    block_fetch: reqwest::Client,
    header_fetch: reqwest::Client,
    submit: reqwest::Client,
}

impl HttpPeerClient {
    pub fn new() -> HttpPeerClient {
        let build = |secs: u64| {
            reqwest::Client::builder()
                .timeout(Duration::from_secs(secs))
                .build()
                .expect("reqwest client builds with a plain timeout")
        };
        HttpPeerClient {
            short: build(PEER_HTTP_TIMEOUT_SEC),
            block_fetch: build(BLOCK_FETCH_TIMEOUT_SEC),
            header_fetch: build(HEADER_FETCH_TIMEOUT_SEC),
            submit: build(BLOCK_SUBMIT_TIMEOUT_SEC),
        }
    }

    fn map_err(e: reqwest::Error) -> NodeError {
        NodeError::Storage(format!("peer request failed: {e}"))
    }
}

impl Default for HttpPeerClient {
    fn default() -> HttpPeerClient {
        HttpPeerClient::new()
    }
}

#[async_trait]
impl PeerClient for HttpPeerClient {
    async fn ping(&self, addr: &str) -> NodeResult<PeerInfo> {
        let url = format!("{addr}/ping");
        let resp = self.short.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<PeerInfo>().await.map_err(Self::map_err)?)
    }

    async fn get_block_count(&self, addr: &str) -> NodeResult<u64> {
        let url = format!("{addr}/block_count");
        let resp = self.short.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<u64>().await.map_err(Self::map_err)?)
    }

    async fn get_total_work(&self, addr: &str) -> NodeResult<BigUint> {
        let url = format!("{addr}/total_work");
        let resp = self.short.get(url).send().await.map_err(Self::map_err)?;
        let text = resp.text().await.map_err(Self::map_err)?;
        text.trim()
            .parse::<BigUint>()
            .map_err(|e| NodeError::Storage(format!("malformed total_work from peer: {e}")))
    }

    async fn get_block_hash(&self, addr: &str, id: u64) -> NodeResult<Digest> {
        let url = format!("{addr}/block_hash/{id}");
        let resp = self.short.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<Digest>().await.map_err(Self::map_err)?)
    }

    async fn get_headers(&self, addr: &str, start: u64, count: u64) -> NodeResult<Vec<PeerBlockHeader>> {
        let url = format!("{addr}/headers?start={start}&count={count}");
        let resp = self.header_fetch.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<Vec<PeerBlockHeader>>().await.map_err(Self::map_err)?)
    }

    async fn get_blocks(&self, addr: &str, start: u64, count: u64) -> NodeResult<Vec<Block>> {
        let url = format!("{addr}/blocks?start={start}&count={count}");
        let resp = self.block_fetch.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<Vec<Block>>().await.map_err(Self::map_err)?)
    }

    async fn get_name(&self, addr: &str) -> NodeResult<PeerInfo> {
        let url = format!("{addr}/name");
        let resp = self.short.get(url).send().await.map_err(Self::map_err)?;
        Ok(resp.json::<PeerInfo>().await.map_err(Self::map_err)?)
    }

    async fn submit_transaction(&self, addr: &str, tx: &Transaction) -> NodeResult<ExecutionStatus> {
        let url = format!("{addr}/submit_transaction");
        let resp = self
            .submit
            .post(url)
            .json(tx)
            .send()
            .await
            .map_err(Self::map_err)?;
        Ok(resp.json::<ExecutionStatus>().await.map_err(Self::map_err)?)
    }
}
