//! Wallet file analysis toolkit.
//!
//! The `walletdat-utils` crate (library name `wdat`) reads cryptocurrency
//! `wallet.dat` files stored either as Berkeley DB btree databases or as
//! SQLite databases, locates the encrypted master-key (`mkey`) record, and
//! renders it as a `$bitcoin$` hash line for offline password recovery tools.
//! Nothing is ever decrypted and wallet files are only opened read-only.
//!
//! # CLI Reference
//!
//! | Command | Purpose |
//! |---------|---------|
//! | [`wdat hash`](cli::app::Commands::Hash) | Print one `$bitcoin$` hash line per recognized wallet |
//! | [`wdat info`](cli::app::Commands::Info) | Summarize wallet contents (backend, mkey parameters, record counts, labels) |
//! | [`wdat completions`](cli::app::Commands::Completions) | Generate shell completion scripts |
//!
//! With no file arguments, `hash` and `info` scan the working directory for
//! `*.dat` files. Hash lines go to stdout (or `--output`); every diagnostic
//! goes to stderr, so the output can be piped straight into a cracker.
//!
//! # Library API
//!
//! ```no_run
//! use wdat::wallet::backend::open_wallet;
//! use wdat::wallet::hash::format_hash;
//!
//! let wallet = open_wallet("wallet.dat").unwrap();
//! let mkey = wallet.master_key().unwrap();
//! let hash = format_hash(&mkey.encrypted_key, &mkey.salt, mkey.iterations, mkey.derivation_method).unwrap();
//! println!("{}", hash);
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`wallet::compact_size`] | CompactSize integers and the byte cursor every parser uses |
//! | [`wallet::record`] | `mkey` value extraction and key-type classification |
//! | [`wallet::bdb`] | Pure-Rust Berkeley DB btree reader (`main` sub-database) |
//! | [`wallet::sqlite`] | SQLite `main` table reader |
//! | [`wallet::backend`] | Backend auto-detection and master-key record lookup |
//! | [`wallet::hash`] | `$bitcoin$` hash formatting |
//! | [`wallet::details`] | Wallet summaries for `wdat info` |
//! | [`wallet::write`] | Synthetic wallet builders for both backends |

#[cfg(feature = "cli")]
pub mod cli;
pub mod util;
pub mod wallet;

use thiserror::Error;

/// Errors returned by `wdat` operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WdatError {
    /// An I/O error occurred (file missing, unreadable, or output write failure).
    #[error("I/O error: {0}")]
    Io(String),

    /// The file does not match the structure a backend expects.
    #[error("not this format: {0}")]
    NotThisFormat(String),

    /// The backend recognized the file but it holds no master-key record.
    #[error("no mkey record found: {0}")]
    NotFound(String),

    /// A read ran past the end of a byte buffer.
    #[error("decode error: {0}")]
    Decode(String),

    /// A master-key record is present but its fields cannot be carved out.
    #[error("malformed mkey record: {0}")]
    MalformedRecord(String),

    /// Extracted fields fail the minimum-size checks of the hash format.
    #[error("invalid mkey fields: {0}")]
    Invalid(String),

    /// An invalid argument was supplied (empty file list, bad option, etc.).
    #[error("Invalid argument: {0}")]
    Argument(String),
}
