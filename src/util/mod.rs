//! Shared utilities (hex formatting, wallet file discovery).

#[cfg(feature = "cli")]
pub mod fs;
pub mod hex;
