//! SQLite wallet reader.
//!
//! Descriptor-era wallets are SQLite databases with a single `main` table of
//! `(key BLOB, value BLOB)` rows using the same key/value serialization as the
//! Berkeley DB format. The file is opened read-only without the create flag,
//! so probing a non-SQLite file never modifies or creates anything.

use std::path::Path;

use log::{debug, warn};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};

use crate::wallet::backend::RecordMap;
use crate::WdatError;

const SELECT_RECORDS: &str = "SELECT key, value FROM main";

fn map_db_err(err: rusqlite::Error) -> WdatError {
    WdatError::NotThisFormat(err.to_string())
}

/// Open a wallet database read-only.
pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<Connection, WdatError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    Connection::open_with_flags(path, flags).map_err(map_db_err)
}

/// Read every `(key, value)` row of the `main` table.
///
/// Rows whose key or value is not a BLOB are skipped. A file that is not a
/// SQLite database, or has no `main` table, is [`WdatError::NotThisFormat`].
pub fn read<P: AsRef<Path>>(path: P) -> Result<RecordMap, WdatError> {
    let conn = open_read_only(path)?;
    let mut stmt = conn.prepare(SELECT_RECORDS).map_err(map_db_err)?;
    let mut rows = stmt.query([]).map_err(map_db_err)?;

    let mut records = RecordMap::new();
    let mut skipped = 0usize;
    while let Some(row) = rows.next().map_err(map_db_err)? {
        let key = row.get_ref(0).map_err(map_db_err)?;
        let value = row.get_ref(1).map_err(map_db_err)?;
        match (key, value) {
            (ValueRef::Blob(k), ValueRef::Blob(v)) => {
                records.insert(k.to_vec(), v.to_vec());
            }
            _ => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("skipped {} rows with non-blob key or value", skipped);
    }
    debug!("read {} records from SQLite table main", records.len());
    Ok(records)
}
