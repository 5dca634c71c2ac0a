pub mod block_store;
pub mod kv_store;
pub mod ledger_store;
pub mod rusty;
pub mod tx_store;
