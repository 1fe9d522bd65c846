//! Wallet summaries.
//!
//! [`summarize`] walks every record of an opened [`Wallet`] and reports what a
//! recovery operator needs to know before starting a crack: which backend
//! holds the file, whether it is encrypted, the master-key derivation
//! parameters, the public keys it holds, and its address labels. Private-key
//! material is counted, never copied into the summary.

use log::debug;
use serde::Serialize;

use crate::util::hex::format_bytes;
use crate::wallet::backend::{Backend, Wallet};
use crate::wallet::hash::HashString;
use crate::wallet::record::{parse_key_record_pubkey, parse_name_record, NameRecord, RecordKind};

/// Master-key parameters as reported by `wdat info`.
#[derive(Debug, Clone, Serialize)]
pub struct MasterKeySummary {
    /// Length of the full encrypted key field, IV included.
    pub encrypted_key_len: usize,
    /// Salt as lowercase hex.
    pub salt: String,
    pub derivation_method: u32,
    pub iterations: u32,
    /// `$bitcoin$` line, absent when the fields fail validation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<HashString>,
    /// Why no hash could be produced.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash_error: Option<String>,
}

/// Record counts by type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub mkey: usize,
    pub key: usize,
    pub ckey: usize,
    pub keymeta: usize,
    pub name: usize,
    pub other: usize,
    pub unrecognized: usize,
}

impl RecordCounts {
    fn add(&mut self, kind: &RecordKind) {
        match kind {
            RecordKind::MasterKey => self.mkey += 1,
            RecordKind::Key => self.key += 1,
            RecordKind::CryptedKey => self.ckey += 1,
            RecordKind::KeyMeta => self.keymeta += 1,
            RecordKind::Name => self.name += 1,
            RecordKind::Other(_) => self.other += 1,
            RecordKind::Unrecognized => self.unrecognized += 1,
        }
    }
}

/// Summary of one wallet file.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub file: String,
    pub backend: Backend,
    pub records: usize,
    /// True when a master-key record was found and decoded.
    pub encrypted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_key: Option<MasterKeySummary>,
    /// Why the master-key record is missing or unreadable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub master_key_error: Option<String>,
    pub counts: RecordCounts,
    /// Public keys of `key` and `ckey` records, as lowercase hex.
    pub public_keys: Vec<String>,
    pub addresses: Vec<NameRecord>,
}

/// Build a summary of `wallet`, read from `file`.
pub fn summarize(file: &str, wallet: &Wallet) -> WalletSummary {
    let mut counts = RecordCounts::default();
    let mut public_keys = Vec::new();
    let mut addresses = Vec::new();

    for (key, value) in wallet.records() {
        let kind = RecordKind::of_key(key);
        match kind {
            RecordKind::Name => match parse_name_record(key, value) {
                Ok(entry) => addresses.push(entry),
                Err(e) => debug!("{}: skipping unreadable name record: {}", file, e),
            },
            RecordKind::Key | RecordKind::CryptedKey => match parse_key_record_pubkey(key) {
                Ok(pubkey) => public_keys.push(format_bytes(&pubkey)),
                Err(e) => debug!("{}: skipping unreadable key record: {}", file, e),
            },
            _ => {}
        }
        counts.add(&kind);
    }

    let (master_key, master_key_error) = match wallet.master_key() {
        Ok(mkey) => {
            let (hash, hash_error) = match mkey.to_hash() {
                Ok(h) => (Some(h), None),
                Err(e) => (None, Some(e.to_string())),
            };
            let summary = MasterKeySummary {
                encrypted_key_len: mkey.encrypted_key.len(),
                salt: format_bytes(&mkey.salt),
                derivation_method: mkey.derivation_method,
                iterations: mkey.iterations,
                hash,
                hash_error,
            };
            (Some(summary), None)
        }
        Err(e) => (None, Some(e.to_string())),
    };

    WalletSummary {
        file: file.to_string(),
        backend: wallet.backend(),
        records: wallet.records().len(),
        encrypted: master_key.is_some(),
        master_key,
        master_key_error,
        counts,
        public_keys,
        addresses,
    }
}
