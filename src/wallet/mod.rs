//! Wallet file parsing.
//!
//! Reads the key/value records of a `wallet.dat` from either storage backend,
//! finds the encrypted master-key record, and formats it as a hash line.
//!
//! Start with [`backend::open_wallet`], which detects the backend and returns
//! a [`backend::Wallet`]. From there, [`backend::Wallet::master_key`] decodes
//! the `mkey` record and [`record::MasterKeyRecord::to_hash`] renders it.
//! [`details::summarize`] produces the broader report behind `wdat info`.

pub mod backend;
pub mod bdb;
pub mod compact_size;
pub mod constants;
pub mod details;
pub mod hash;
pub mod record;
pub mod sqlite;
pub mod write;
