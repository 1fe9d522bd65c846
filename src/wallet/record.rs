//! Wallet record parsing.
//!
//! Every wallet key starts with a CompactSize-prefixed type tag (`mkey`, `key`,
//! `ckey`, `keymeta`, `name`, ...) followed by type-specific fields. This module
//! classifies keys by that tag ([`RecordKind`]) and decodes the two record
//! shapes the toolkit cares about:
//!
//! - the master-key value ([`MasterKeyRecord::extract`]):
//!   `[len][encrypted_key][len][salt]` optionally followed by
//!   `[derivation_method: u32 LE][iterations: u32 LE]`
//! - address book entries ([`parse_name_record`]): key `[4]"name"[len][address]`,
//!   value `[len][label]`

use serde::Serialize;

use crate::wallet::compact_size::ByteCursor;
use crate::wallet::constants::*;
use crate::WdatError;

/// Fields of an encrypted master-key (`mkey`) record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterKeyRecord {
    /// Encrypted master key, possibly prefixed by an encryption IV.
    pub encrypted_key: Vec<u8>,
    /// Key-derivation salt.
    pub salt: Vec<u8>,
    /// Key-derivation method (0 = SHA-512 based EVP_BytesToKey).
    pub derivation_method: u32,
    /// Key-derivation iteration count.
    pub iterations: u32,
}

impl MasterKeyRecord {
    /// Extract the master-key fields from a raw `mkey` value blob.
    ///
    /// When fewer than 8 bytes follow the salt, the derivation method and
    /// iteration count fall back to `0` and `1`. A blob shorter than its
    /// declared encrypted-key or salt lengths is a [`WdatError::MalformedRecord`].
    ///
    /// # Examples
    ///
    /// ```
    /// use wdat::wallet::record::MasterKeyRecord;
    ///
    /// let blob = [0x02, 0xAA, 0xBB, 0x01, 0x07];
    /// let rec = MasterKeyRecord::extract(&blob).unwrap();
    /// assert_eq!(rec.encrypted_key, vec![0xAA, 0xBB]);
    /// assert_eq!(rec.salt, vec![0x07]);
    /// assert_eq!((rec.derivation_method, rec.iterations), (0, 1));
    /// ```
    pub fn extract(value: &[u8]) -> Result<Self, WdatError> {
        let mut cur = ByteCursor::new(value);

        let encrypted_key = cur
            .read_var_bytes()
            .map_err(|e| WdatError::MalformedRecord(format!("encrypted key: {}", e)))?
            .to_vec();
        let salt = cur
            .read_var_bytes()
            .map_err(|e| WdatError::MalformedRecord(format!("salt: {}", e)))?
            .to_vec();

        let (derivation_method, iterations) = if cur.remaining() >= 8 {
            (cur.read_u32_le()?, cur.read_u32_le()?)
        } else {
            (DEFAULT_DERIVATION_METHOD, DEFAULT_ITERATIONS)
        };

        Ok(MasterKeyRecord {
            encrypted_key,
            salt,
            derivation_method,
            iterations,
        })
    }
}

/// Wallet record type, taken from the tag at the start of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKind {
    /// Encrypted master key (`mkey`).
    MasterKey,
    /// Unencrypted private key (`key`).
    Key,
    /// Encrypted private key (`ckey`).
    CryptedKey,
    /// Key metadata such as creation time (`keymeta`).
    KeyMeta,
    /// Address book label (`name`).
    Name,
    /// Any other well-formed tag (`version`, `pool`, `tx`, ...).
    Other(String),
    /// Key does not start with a decodable tag.
    Unrecognized,
}

impl RecordKind {
    /// Classify a raw record key.
    pub fn of_key(key: &[u8]) -> Self {
        match record_tag(key) {
            Some(MKEY_TAG) => RecordKind::MasterKey,
            Some(KEY_TAG) => RecordKind::Key,
            Some(CKEY_TAG) => RecordKind::CryptedKey,
            Some(KEYMETA_TAG) => RecordKind::KeyMeta,
            Some(NAME_TAG) => RecordKind::Name,
            Some(other) => RecordKind::Other(String::from_utf8_lossy(other).into_owned()),
            None => RecordKind::Unrecognized,
        }
    }
}

/// Return the CompactSize-prefixed type tag at the start of `key`.
///
/// Returns `None` when the key is too short to hold the declared tag.
pub fn record_tag(key: &[u8]) -> Option<&[u8]> {
    ByteCursor::new(key).read_var_bytes().ok()
}

/// Returns true if `key` is tagged as a master-key record.
pub fn is_master_key(key: &[u8]) -> bool {
    record_tag(key) == Some(MKEY_TAG)
}

/// An address book entry from a `name` record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRecord {
    pub address: String,
    pub label: String,
}

/// Decode a `name` record into its address and label.
pub fn parse_name_record(key: &[u8], value: &[u8]) -> Result<NameRecord, WdatError> {
    let mut kcur = ByteCursor::new(key);
    let tag = kcur.read_var_bytes()?;
    if tag != NAME_TAG {
        return Err(WdatError::MalformedRecord(format!(
            "expected name record, found tag {:?}",
            String::from_utf8_lossy(tag)
        )));
    }
    let address = kcur.read_var_string()?;
    let label = ByteCursor::new(value).read_var_string()?;
    Ok(NameRecord { address, label })
}

/// Return the public key stored in a `key` or `ckey` record key.
///
/// Only the key side is read; the value holds private key material.
pub fn parse_key_record_pubkey(key: &[u8]) -> Result<Vec<u8>, WdatError> {
    let mut kcur = ByteCursor::new(key);
    let tag = kcur.read_var_bytes()?;
    if tag != KEY_TAG && tag != CKEY_TAG {
        return Err(WdatError::MalformedRecord(format!(
            "expected key or ckey record, found tag {:?}",
            String::from_utf8_lossy(tag)
        )));
    }
    let pubkey = kcur.read_var_bytes()?;
    if pubkey.is_empty() {
        return Err(WdatError::MalformedRecord("empty public key".to_string()));
    }
    Ok(pubkey.to_vec())
}
