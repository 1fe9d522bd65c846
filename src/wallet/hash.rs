//! `$bitcoin$` hash formatting.
//!
//! Serializes master-key fields into the line format consumed by offline
//! password-recovery tools:
//!
//! ```text
//! $bitcoin$<len(hex_master)>$<hex_master>$<len(hex_salt)>$<hex_salt>$<iterations>$2$00$2$00
//! ```
//!
//! `hex_master` is the lowercase hex of the last 32 bytes of the encrypted key
//! (any IV prefix is dropped). Length fields count hex characters, not bytes.
//! The trailing `$2$00$2$00` groups are fixed and never derived from input.

use std::fmt;

use log::warn;
use serde::Serialize;

use crate::util::hex::format_bytes;
use crate::wallet::constants::{DEFAULT_DERIVATION_METHOD, MASTER_KEY_LEN};
use crate::wallet::record::MasterKeyRecord;
use crate::WdatError;

const HASH_PREFIX: &str = "$bitcoin$";
const HASH_SUFFIX: &str = "$2$00$2$00";

/// A complete, validated `$bitcoin$` hash line (without trailing newline).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HashString(String);

impl HashString {
    /// The hash as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Format master-key fields as a `$bitcoin$` hash.
///
/// Fails with [`WdatError::Invalid`] if `encrypted_key` is shorter than 32
/// bytes or `salt` is empty. The derivation method is not part of the output;
/// a non-default method only produces a warning.
///
/// # Examples
///
/// ```
/// use wdat::wallet::hash::format_hash;
///
/// let hash = format_hash(&[0xAA; 32], &[1, 2, 3, 4], 1000, 0).unwrap();
/// assert!(hash.as_str().starts_with("$bitcoin$64$aaaa"));
/// assert!(hash.as_str().ends_with("$8$01020304$1000$2$00$2$00"));
///
/// assert!(format_hash(&[0xAA; 31], &[1], 1000, 0).is_err());
/// ```
pub fn format_hash(
    encrypted_key: &[u8],
    salt: &[u8],
    iterations: u32,
    derivation_method: u32,
) -> Result<HashString, WdatError> {
    if encrypted_key.is_empty() {
        return Err(WdatError::Invalid("encrypted key is empty".to_string()));
    }
    if encrypted_key.len() < MASTER_KEY_LEN {
        return Err(WdatError::Invalid(format!(
            "encrypted key is {} bytes, need at least {}",
            encrypted_key.len(),
            MASTER_KEY_LEN
        )));
    }
    if salt.is_empty() {
        return Err(WdatError::Invalid("salt is empty".to_string()));
    }
    if derivation_method != DEFAULT_DERIVATION_METHOD {
        warn!(
            "derivation method {} is not the standard method {}; hash may not be crackable",
            derivation_method, DEFAULT_DERIVATION_METHOD
        );
    }

    let master = &encrypted_key[encrypted_key.len() - MASTER_KEY_LEN..];
    let hex_master = format_bytes(master);
    let hex_salt = format_bytes(salt);

    Ok(HashString(format!(
        "{}{}${}${}${}${}{}",
        HASH_PREFIX,
        hex_master.len(),
        hex_master,
        hex_salt.len(),
        hex_salt,
        iterations,
        HASH_SUFFIX
    )))
}

impl MasterKeyRecord {
    /// Format this record as a `$bitcoin$` hash. See [`format_hash`].
    pub fn to_hash(&self) -> Result<HashString, WdatError> {
        format_hash(
            &self.encrypted_key,
            &self.salt,
            self.iterations,
            self.derivation_method,
        )
    }
}
