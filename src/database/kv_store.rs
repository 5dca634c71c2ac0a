//! Narrow contract for the on-disk key-value store backing the ledger,
//! block store, and transaction index: one abstraction, one concrete
//! adapter ([`crate::database::rusty::RustyLevelDb`]), so the storage
//! engine can be swapped without touching `Ledger`/`BlockStore`/`TxStore`.

use std::path::Path;

use crate::errors::NodeResult;

pub trait KvStore<Key, Value> {
    fn open<P: AsRef<Path>>(db_path: P, db_name: &str) -> NodeResult<Self>
    where
        Self: Sized;

    fn get(&mut self, key: &Key) -> NodeResult<Option<Value>>;
    fn put(&mut self, key: &Key, value: &Value) -> NodeResult<()>;
    fn delete(&mut self, key: &Key) -> NodeResult<Option<Value>>;

    /// Full key/value snapshot, consistent with respect to concurrent
    /// single-key operations on the same store instance. Used by
    /// `Ledger::get_state` and chain replay.
    fn iter_all(&mut self) -> NodeResult<Vec<(Key, Value)>>;

    fn clear(&mut self) -> NodeResult<()>;
}
