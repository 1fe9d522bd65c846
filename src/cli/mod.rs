//! CLI subcommand implementations for the `wdat` binary.
//!
//! CLI argument parsing uses clap derive macros, with the top-level
//! [`app::Cli`] struct and [`app::Commands`] enum defined in [`app`] and shared
//! between `main.rs` and `build.rs` (for man page generation) via `include!()`.
//!
//! Each subcommand module follows the same pattern: an `Options` struct holding
//! the parsed arguments and a `pub fn execute(opts, writer) -> Result<(), WdatError>`
//! entry point. The `writer: &mut dyn Write` parameter allows output to be
//! captured in tests or redirected to a file via the global `--output` flag.
//!
//! # Subcommands
//!
//! | Command | Module | Purpose |
//! |---------|--------|---------|
//! | `wdat hash` | [`hash`] | Print a `$bitcoin$` line for every wallet with a readable master key |
//! | `wdat info` | [`info`] | Summarize wallet backend, encryption parameters, and record counts |
//!
//! Both subcommands are best-effort batches: each file is processed on its
//! own, results go to the writer, and a failing file only produces a
//! `file: error` line on stderr. The `wprintln!` macro wraps `writeln!` to
//! convert `io::Error` into `WdatError`.

pub mod app;
pub mod hash;
pub mod info;

/// Write a line to the given writer, converting io::Error to WdatError.
macro_rules! wprintln {
    ($w:expr) => {
        writeln!($w).map_err(|e| $crate::WdatError::Io(e.to_string()))
    };
    ($w:expr, $($arg:tt)*) => {
        writeln!($w, $($arg)*).map_err(|e| $crate::WdatError::Io(e.to_string()))
    };
}

pub(crate) use wprintln;

use std::path::Path;

use rayon::prelude::*;

use crate::util::fs::find_wallet_files;
use crate::wallet::constants::WALLET_EXTENSIONS;
use crate::WdatError;

/// Resolve the list of wallet files to process.
///
/// Explicit arguments are used as given. With none, `dir` (the working
/// directory for the CLI) is scanned for wallet files. An empty result is an
/// error.
pub(crate) fn resolve_files(files: &[String], dir: &Path) -> Result<Vec<String>, WdatError> {
    let resolved: Vec<String> = if files.is_empty() {
        find_wallet_files(dir, WALLET_EXTENSIONS)?
            .into_iter()
            .map(|p| p.display().to_string())
            .collect()
    } else {
        files.to_vec()
    };

    if resolved.is_empty() {
        return Err(WdatError::Argument(
            format!("no wallet files given and no *.dat files in {}", dir.display()),
        ));
    }
    Ok(resolved)
}

/// Check that a wallet file exists before any backend touches it.
pub(crate) fn ensure_exists(file: &str) -> Result<(), WdatError> {
    if Path::new(file).is_file() {
        Ok(())
    } else {
        Err(WdatError::Io("file not found".to_string()))
    }
}

/// Apply `f` to every file, in parallel when `threads > 0`.
///
/// Results are returned in input order either way.
pub(crate) fn map_files<T, F>(files: &[String], threads: usize, f: F) -> Vec<Result<T, WdatError>>
where
    T: Send,
    F: Fn(&str) -> Result<T, WdatError> + Sync,
{
    if threads > 0 {
        files.par_iter().map(|file| f(file.as_str())).collect()
    } else {
        files.iter().map(|file| f(file.as_str())).collect()
    }
}
