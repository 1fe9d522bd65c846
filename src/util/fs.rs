//! Filesystem helpers for wallet file discovery.
//!
//! Provides [`find_wallet_files`] to list candidate wallet files in a single
//! directory. Used by the `hash` and `info` subcommands when no files are
//! given on the command line.

use std::path::{Path, PathBuf};

use crate::WdatError;

/// Find regular files in `dir` whose extension matches one of `extensions`.
///
/// Matching is case-insensitive (`wallet.DAT` matches `"dat"`) and does not
/// descend into subdirectories. Results are sorted by path. Files found in
/// `.` are returned as bare file names.
pub fn find_wallet_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, WdatError> {
    let mut files = Vec::new();

    let entries = std::fs::read_dir(dir)
        .map_err(|e| WdatError::Io(format!("Cannot read directory {}: {}", dir.display(), e)))?;

    for entry in entries {
        let entry =
            entry.map_err(|e| WdatError::Io(format!("Cannot read directory entry: {}", e)))?;
        let path = if dir == Path::new(".") {
            PathBuf::from(entry.file_name())
        } else {
            entry.path()
        };

        if path.is_file() && has_matching_extension(&path, extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_matching_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)))
}
