//! Storage backend detection and master-key record lookup.
//!
//! A wallet file is either a Berkeley DB btree file or a SQLite database.
//! Neither exposes a marker that is cheap to check up front, so
//! [`open_wallet`] probes by actually reading the file with each [`Backend`]
//! in [`Backend::PROBE_ORDER`] and keeps the first that succeeds. A backend
//! that does not recognize the file reports [`WdatError::NotThisFormat`] and
//! the next one is tried.
//!
//! Each backend also knows where its master-key record lives
//! ([`Backend::locate`]):
//!
//! - Berkeley DB: the key whose CompactSize-prefixed type tag is `mkey`
//! - SQLite: the fixed key `04 'mkey' 01 00 00 00` (master key id 1). Only
//!   that one record is ever looked at, so a SQLite wallet holding several
//!   master keys yields the first.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::wallet::constants::SQLITE_MKEY_KEY;
use crate::wallet::record::{is_master_key, MasterKeyRecord};
use crate::wallet::{bdb, sqlite};
use crate::WdatError;

/// Raw wallet records: key bytes to value bytes, ordered by key.
pub type RecordMap = BTreeMap<Vec<u8>, Vec<u8>>;

/// Wallet storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Backend {
    /// Berkeley DB btree file with a `main` database.
    BerkeleyDb,
    /// SQLite database with a `main` table.
    Sqlite,
}

impl Backend {
    /// Order in which backends are probed.
    pub const PROBE_ORDER: [Backend; 2] = [Backend::BerkeleyDb, Backend::Sqlite];

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Backend::BerkeleyDb => "Berkeley DB",
            Backend::Sqlite => "SQLite",
        }
    }

    /// Read every record of the wallet at `path`.
    pub fn read<P: AsRef<Path>>(&self, path: P) -> Result<RecordMap, WdatError> {
        match self {
            Backend::BerkeleyDb => bdb::read(path),
            Backend::Sqlite => sqlite::read(path),
        }
    }

    /// Find the raw value of the master-key record in `records`.
    pub fn locate<'a>(&self, records: &'a RecordMap) -> Result<&'a [u8], WdatError> {
        let found = match self {
            Backend::BerkeleyDb => records
                .iter()
                .find(|(key, _)| is_master_key(key))
                .map(|(_, value)| value.as_slice()),
            Backend::Sqlite => records
                .get(SQLITE_MKEY_KEY.as_slice())
                .map(|value| value.as_slice()),
        };
        found.ok_or_else(|| {
            WdatError::NotFound(format!(
                "{} wallet has no mkey record ({} records)",
                self.name(),
                records.len()
            ))
        })
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A wallet file read by a recognized backend.
#[derive(Debug, Clone)]
pub struct Wallet {
    backend: Backend,
    records: RecordMap,
}

impl Wallet {
    /// Wrap records already read by `backend`.
    pub fn new(backend: Backend, records: RecordMap) -> Self {
        Wallet { backend, records }
    }

    /// Backend that recognized the file.
    pub fn backend(&self) -> Backend {
        self.backend
    }

    /// All raw records.
    pub fn records(&self) -> &RecordMap {
        &self.records
    }

    /// Raw value of the master-key record.
    pub fn master_key_value(&self) -> Result<&[u8], WdatError> {
        self.backend.locate(&self.records)
    }

    /// Locate and decode the master-key record.
    pub fn master_key(&self) -> Result<MasterKeyRecord, WdatError> {
        MasterKeyRecord::extract(self.master_key_value()?)
    }
}

/// Open a wallet file, detecting its backend.
///
/// Backends are tried in [`Backend::PROBE_ORDER`]. I/O errors are returned
/// as-is; if no backend recognizes the file the result is
/// [`WdatError::NotThisFormat`].
pub fn open_wallet<P: AsRef<Path>>(path: P) -> Result<Wallet, WdatError> {
    let path = path.as_ref();
    let mut reasons = Vec::new();

    for backend in Backend::PROBE_ORDER {
        match backend.read(path) {
            Ok(records) => {
                debug!("{}: read as {} ({} records)", path.display(), backend, records.len());
                return Ok(Wallet::new(backend, records));
            }
            Err(WdatError::NotThisFormat(reason)) => {
                debug!("{}: not a {} wallet: {}", path.display(), backend, reason);
                reasons.push(format!("{}: {}", backend, reason));
            }
            Err(e) => return Err(e),
        }
    }

    Err(WdatError::NotThisFormat(format!(
        "not a Berkeley DB or SQLite wallet ({})",
        reasons.join("; ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(key: &[u8], value: &[u8]) -> (Vec<u8>, Vec<u8>) {
        (key.to_vec(), value.to_vec())
    }

    fn map<const N: usize>(entries: [(Vec<u8>, Vec<u8>); N]) -> RecordMap {
        entries.into_iter().collect()
    }

    #[test]
    fn test_bdb_locate_finds_tagged_key_among_others() {
        let records = map([
            rec(b"\x07version", b"\x01\x00\x00\x00"),
            rec(b"\x03key\x21\x02", b"secret"),
            rec(b"\x04mkey\x01\x00\x00\x00", b"blob"),
            rec(b"\x04name\x01a", b"\x00"),
            rec(b"\xfd", b"undecodable key"),
        ]);
        assert_eq!(Backend::BerkeleyDb.locate(&records).unwrap(), b"blob");
    }

    #[test]
    fn test_bdb_locate_ignores_insertion_order() {
        let forward = map([rec(b"\x04mkey\x01\x00\x00\x00", b"blob"), rec(b"\x04pool", b"x")]);
        let mut reverse = RecordMap::new();
        reverse.insert(b"\x04pool".to_vec(), b"x".to_vec());
        reverse.insert(b"\x04mkey\x01\x00\x00\x00".to_vec(), b"blob".to_vec());
        assert_eq!(
            Backend::BerkeleyDb.locate(&forward).unwrap(),
            Backend::BerkeleyDb.locate(&reverse).unwrap()
        );
    }

    #[test]
    fn test_bdb_locate_not_found() {
        let records = map([rec(b"\x05mkeys", b"blob"), rec(b"\x02mk", b"x")]);
        assert!(matches!(
            Backend::BerkeleyDb.locate(&records),
            Err(WdatError::NotFound(_))
        ));
    }

    #[test]
    fn test_sqlite_locate_requires_exact_key() {
        let records = map([rec(b"\x04mkey\x02\x00\x00\x00", b"second")]);
        assert!(matches!(
            Backend::Sqlite.locate(&records),
            Err(WdatError::NotFound(_))
        ));

        let records = map([
            rec(b"\x04mkey\x02\x00\x00\x00", b"second"),
            rec(b"\x04mkey\x01\x00\x00\x00", b"first"),
        ]);
        assert_eq!(Backend::Sqlite.locate(&records).unwrap(), b"first");
    }

    #[test]
    fn test_wallet_master_key_propagates_not_found() {
        let wallet = Wallet::new(Backend::Sqlite, RecordMap::new());
        assert!(matches!(wallet.master_key(), Err(WdatError::NotFound(_))));
    }
}
