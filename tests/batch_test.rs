#![cfg(feature = "cli")]
//! Integration tests for the `wdat hash` batch driver.

use tempfile::TempDir;

use wdat::cli::hash::{execute, hash_file, HashOptions};
use wdat::wallet::backend::RecordMap;
use wdat::wallet::write::*;
use wdat::WdatError;

fn write_fixtures(dir: &TempDir) -> Vec<String> {
    let valid = dir.path().join("valid.dat");
    let mut records = RecordMap::new();
    records.insert(mkey_key(1), mkey_value(&[0xAA; 32], &[1, 2, 3, 4], Some((0, 1000))));
    write_bdb_wallet(&valid, &records, &BdbLayout::default()).unwrap();

    let no_mkey = dir.path().join("no_mkey.dat");
    let mut records = RecordMap::new();
    records.insert(tagged_key(b"version", &[]), 169_900u32.to_le_bytes().to_vec());
    write_sqlite_wallet(&no_mkey, &records).unwrap();

    let unknown = dir.path().join("unknown.dat");
    std::fs::write(&unknown, vec![0x42; 5000]).unwrap();

    [valid, no_mkey, unknown]
        .iter()
        .map(|p| p.display().to_string())
        .collect()
}

#[test]
fn test_batch_prints_only_successes() {
    let dir = TempDir::new().unwrap();
    let files = write_fixtures(&dir);

    for threads in [0, 4] {
        let opts = HashOptions {
            files: files.clone(),
            with_filename: false,
            threads,
        };
        let mut out = Vec::new();
        execute(&opts, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1);
        assert_eq!(
            lines[0],
            "$bitcoin$64$aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa$8$01020304$1000$2$00$2$00"
        );
    }
}

#[test]
fn test_per_file_failures() {
    let dir = TempDir::new().unwrap();
    let files = write_fixtures(&dir);

    assert!(hash_file(&files[0]).is_ok());
    assert!(matches!(hash_file(&files[1]), Err(WdatError::NotFound(_))));
    assert!(matches!(hash_file(&files[2]), Err(WdatError::NotThisFormat(_))));
}

#[test]
fn test_output_follows_input_order() {
    let dir = TempDir::new().unwrap();
    let mut files = Vec::new();
    for i in 1..=6u32 {
        let path = dir.path().join(format!("w{}.dat", i));
        let mut records = RecordMap::new();
        records.insert(mkey_key(1), mkey_value(&[0x10; 32], &[0x20; 8], Some((0, i))));
        write_sqlite_wallet(&path, &records).unwrap();
        files.push(path.display().to_string());
    }
    files.reverse();

    let opts = HashOptions {
        files,
        with_filename: false,
        threads: 3,
    };
    let mut out = Vec::new();
    execute(&opts, &mut out).unwrap();

    let iterations: Vec<String> = String::from_utf8(out)
        .unwrap()
        .lines()
        .map(|line| line.split('$').nth(6).unwrap().to_string())
        .collect();
    assert_eq!(iterations, vec!["6", "5", "4", "3", "2", "1"]);
}

#[test]
fn test_all_files_failing_is_still_ok() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.dat").display().to_string();
    let opts = HashOptions {
        files: vec![missing],
        with_filename: false,
        threads: 0,
    };
    let mut out = Vec::new();
    assert!(execute(&opts, &mut out).is_ok());
    assert!(out.is_empty());
}
