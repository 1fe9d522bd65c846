#![cfg(feature = "cli")]
//! End-to-end tests of the `wdat` binary: output streams and exit status.

use std::process::{Command, Output};

use tempfile::TempDir;

use wdat::wallet::backend::RecordMap;
use wdat::wallet::write::*;

fn wdat(dir: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_wdat"))
        .args(args)
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .output()
        .expect("failed to run wdat")
}

fn lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}

/// One valid wallet, one SQLite wallet without an mkey, one unrecognized file.
fn write_mixed_batch(dir: &TempDir) {
    let mut records = RecordMap::new();
    records.insert(mkey_key(1), mkey_value(&[0xAA; 32], &[1, 2, 3, 4], Some((0, 1000))));
    write_bdb_wallet(dir.path().join("valid.dat"), &records, &BdbLayout::default()).unwrap();

    let mut records = RecordMap::new();
    records.insert(tagged_key(b"version", &[]), 169_900u32.to_le_bytes().to_vec());
    write_sqlite_wallet(dir.path().join("no_mkey.dat"), &records).unwrap();

    std::fs::write(dir.path().join("junk.dat"), vec![0x42; 5000]).unwrap();
}

#[test]
fn test_mixed_batch_one_hash_two_diagnostics_exit_zero() {
    let dir = TempDir::new().unwrap();
    write_mixed_batch(&dir);

    let out = wdat(&dir, &["hash", "valid.dat", "no_mkey.dat", "junk.dat"]);
    assert!(out.status.success());

    let stdout = lines(&out.stdout);
    assert_eq!(stdout.len(), 1);
    assert_eq!(
        stdout[0],
        "$bitcoin$64$aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa$8$01020304$1000$2$00$2$00"
    );

    let stderr = lines(&out.stderr);
    assert_eq!(stderr.len(), 2, "stderr: {:?}", stderr);
    assert!(stderr[0].starts_with("no_mkey.dat: "));
    assert!(stderr[1].starts_with("junk.dat: "));
}

#[test]
fn test_scans_working_directory_without_args() {
    let dir = TempDir::new().unwrap();
    write_mixed_batch(&dir);

    let out = wdat(&dir, &["hash", "--with-filename"]);
    assert!(out.status.success());
    let stdout = lines(&out.stdout);
    assert_eq!(stdout.len(), 1);
    assert!(stdout[0].starts_with("valid.dat: $bitcoin$64$"));
    assert_eq!(lines(&out.stderr).len(), 2);
}

#[test]
fn test_missing_files_only_still_exit_zero() {
    let dir = TempDir::new().unwrap();
    let out = wdat(&dir, &["hash", "gone.dat"]);
    assert!(out.status.success());
    assert!(out.stdout.is_empty());
    assert_eq!(lines(&out.stderr).len(), 1);
}

#[test]
fn test_empty_directory_exits_one() {
    let dir = TempDir::new().unwrap();
    let out = wdat(&dir, &["hash"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Invalid argument"));
}
