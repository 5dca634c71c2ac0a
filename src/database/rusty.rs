//! Concrete [`KvStore`] adapter over an embedded LSM engine: bincode-over-
//! bytes framing on top of `rusty-leveldb`, returning `NodeResult` instead
//! of panicking on I/O failure. Treating storage failure as fatal is a
//! decision for the caller to make, not this adapter.

use serde::{de::DeserializeOwned, Serialize};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use rusty_leveldb::{LdbIterator, DB};

use crate::database::kv_store::KvStore;
use crate::errors::{NodeError, NodeResult};

pub struct RustyLevelDb<Key, Value> {
    database: DB,
    _key: PhantomData<Key>,
    _value: PhantomData<Value>,
}

// `State`-bearing structs built on top of this type are logged via
// `tracing::instrument`, which requires every argument to implement
// `Debug`; the embedded database itself has no meaningful `Debug` output.
impl<Key, Value> core::fmt::Debug for RustyLevelDb<Key, Value> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RustyLevelDb").finish()
    }
}

impl<Key, Value> KvStore<Key, Value> for RustyLevelDb<Key, Value>
where
    Key: Serialize + DeserializeOwned,
    Value: Serialize + DeserializeOwned,
{
    fn open<P: AsRef<Path>>(db_path: P, db_name: &str) -> NodeResult<Self> {
        let mut path = PathBuf::new();
        path.push(db_path);
        path.push(db_name);
        let options = rusty_leveldb::Options::default();
        let database =
            DB::open(path, options).map_err(|e| NodeError::Storage(e.to_string()))?;

        Ok(Self {
            database,
            _key: PhantomData,
            _value: PhantomData,
        })
    }

    fn get(&mut self, key: &Key) -> NodeResult<Option<Value>> {
        let key_bytes = bincode::serialize(key)?;
        let value_bytes = self.database.get(&key_bytes);
        value_bytes
            .map(|bytes| bincode::deserialize(&bytes).map_err(NodeError::from))
            .transpose()
    }

    fn put(&mut self, key: &Key, value: &Value) -> NodeResult<()> {
        let key_bytes = bincode::serialize(key)?;
        let value_bytes = bincode::serialize(value)?;
        self.database
            .put(&key_bytes, &value_bytes)
            .map_err(|e| NodeError::Storage(e.to_string()))
    }

    fn delete(&mut self, key: &Key) -> NodeResult<Option<Value>> {
        let key_bytes = bincode::serialize(key)?;
        let existing = self.database.get(&key_bytes);
        self.database
            .delete(&key_bytes)
            .map_err(|e| NodeError::Storage(e.to_string()))?;
        existing
            .map(|bytes| bincode::deserialize(&bytes).map_err(NodeError::from))
            .transpose()
    }

    fn iter_all(&mut self) -> NodeResult<Vec<(Key, Value)>> {
        let mut iter = self
            .database
            .new_iter()
            .map_err(|e| NodeError::Storage(e.to_string()))?;
        let mut out = Vec::new();
        let (mut k, mut v) = (Vec::new(), Vec::new());
        while iter.current(&mut k, &mut v) {
            let key: Key = bincode::deserialize(&k)?;
            let value: Value = bincode::deserialize(&v)?;
            out.push((key, value));
            iter.advance();
        }
        Ok(out)
    }

    fn clear(&mut self) -> NodeResult<()> {
        let entries = self.iter_all()?;
        for (key, _) in entries {
            self.delete(&key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod rusty_leveldb_tests {
    use super::*;
    use tempfile_shim::TempDir;

    mod tempfile_shim {
        use std::path::PathBuf;

        /// Minimal scratch-directory helper so store tests do not depend on
        /// a dev-dependency crate purely to clean up after themselves.
        pub struct TempDir(PathBuf);

        impl TempDir {
            pub fn new(label: &str) -> TempDir {
                let mut path = std::env::temp_dir();
                path.push(format!(
                    "pandachain-{}-{}-{:?}",
                    label,
                    std::process::id(),
                    std::time::SystemTime::now()
                ));
                TempDir(path)
            }

            pub fn path(&self) -> &std::path::Path {
                &self.0
            }
        }

        impl Drop for TempDir {
            fn drop(&mut self) {
                let _ = std::fs::remove_dir_all(&self.0);
            }
        }
    }

    #[test]
    fn put_then_get_roundtrips() {
        let dir = TempDir::new("put-get");
        let mut db: RustyLevelDb<String, u64> = RustyLevelDb::open(dir.path(), "t").unwrap();
        db.put(&"a".to_string(), &42u64).unwrap();
        assert_eq!(db.get(&"a".to_string()).unwrap(), Some(42));
    }

    #[test]
    fn missing_key_returns_none() {
        let dir = TempDir::new("missing");
        let mut db: RustyLevelDb<String, u64> = RustyLevelDb::open(dir.path(), "t").unwrap();
        assert_eq!(db.get(&"nope".to_string()).unwrap(), None);
    }

    #[test]
    fn delete_returns_previous_value() {
        let dir = TempDir::new("delete");
        let mut db: RustyLevelDb<String, u64> = RustyLevelDb::open(dir.path(), "t").unwrap();
        db.put(&"a".to_string(), &1u64).unwrap();
        assert_eq!(db.delete(&"a".to_string()).unwrap(), Some(1));
        assert_eq!(db.get(&"a".to_string()).unwrap(), None);
    }

    #[test]
    fn clear_empties_the_store() {
        let dir = TempDir::new("clear");
        let mut db: RustyLevelDb<String, u64> = RustyLevelDb::open(dir.path(), "t").unwrap();
        db.put(&"a".to_string(), &1u64).unwrap();
        db.put(&"b".to_string(), &2u64).unwrap();
        db.clear().unwrap();
        assert!(db.iter_all().unwrap().is_empty());
    }
}
