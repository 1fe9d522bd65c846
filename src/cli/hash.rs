use std::io::Write;
use std::path::Path;

use log::info;

use crate::cli::{ensure_exists, map_files, resolve_files, wprintln};
use crate::wallet::backend::open_wallet;
use crate::wallet::hash::HashString;
use crate::WdatError;

/// Options for the `wdat hash` subcommand.
pub struct HashOptions {
    /// Wallet files; empty means scan the working directory.
    pub files: Vec<String>,
    /// Prefix each line with `<file>: `.
    pub with_filename: bool,
    /// Worker threads (0 = sequential).
    pub threads: usize,
}

/// Extract the master key of a single wallet file as a hash line.
pub fn hash_file(file: &str) -> Result<HashString, WdatError> {
    ensure_exists(file)?;
    let wallet = open_wallet(file)?;
    info!("{}: {} wallet", file, wallet.backend());
    wallet.master_key()?.to_hash()
}

/// Print one `$bitcoin$` line per wallet with a usable master key.
///
/// Files that cannot be hashed are reported on stderr and skipped. The only
/// error returned is an empty file list (or a failed write to `writer`).
pub fn execute(opts: &HashOptions, writer: &mut dyn Write) -> Result<(), WdatError> {
    let files = resolve_files(&opts.files, Path::new("."))?;
    let results = map_files(&files, opts.threads, hash_file);

    let mut hashed = 0usize;
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(hash) => {
                if opts.with_filename {
                    wprintln!(writer, "{}: {}", file, hash)?;
                } else {
                    wprintln!(writer, "{}", hash)?;
                }
                hashed += 1;
            }
            Err(e) => eprintln!("{}: {}", file, e),
        }
    }

    info!("hashed {} of {} files", hashed, files.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::backend::RecordMap;
    use crate::wallet::write::{mkey_key, mkey_value, write_sqlite_wallet};
    use tempfile::TempDir;

    #[test]
    fn test_hash_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.dat");
        assert!(matches!(
            hash_file(&path.display().to_string()),
            Err(WdatError::Io(_))
        ));
    }

    #[test]
    fn test_with_filename_prefix() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("wallet.dat");
        let mut records = RecordMap::new();
        records.insert(mkey_key(1), mkey_value(&[0xAA; 32], &[1, 2, 3, 4], Some((0, 1000))));
        write_sqlite_wallet(&path, &records).unwrap();
        let file = path.display().to_string();

        let mut out = Vec::new();
        let opts = HashOptions {
            files: vec![file.clone()],
            with_filename: true,
            threads: 0,
        };
        execute(&opts, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with(&format!("{}: $bitcoin$64$", file)));
        assert!(text.ends_with("$8$01020304$1000$2$00$2$00\n"));
    }
}
