use std::io::Write;
use std::path::Path;

use colored::Colorize;

use crate::cli::{ensure_exists, map_files, resolve_files, wprintln};
use crate::util::hex::format_len;
use crate::wallet::backend::open_wallet;
use crate::wallet::details::{summarize, WalletSummary};
use crate::WdatError;

/// Options for the `wdat info` subcommand.
pub struct InfoOptions {
    /// Wallet files; empty means scan the working directory.
    pub files: Vec<String>,
    /// Emit a JSON array instead of text.
    pub json: bool,
    /// Worker threads (0 = sequential).
    pub threads: usize,
}

/// Open a single wallet file and summarize it.
pub fn summarize_file(file: &str) -> Result<WalletSummary, WdatError> {
    ensure_exists(file)?;
    let wallet = open_wallet(file)?;
    Ok(summarize(file, &wallet))
}

/// Print a summary of every recognized wallet.
pub fn execute(opts: &InfoOptions, writer: &mut dyn Write) -> Result<(), WdatError> {
    let files = resolve_files(&opts.files, Path::new("."))?;
    let results = map_files(&files, opts.threads, summarize_file);

    let mut summaries = Vec::with_capacity(files.len());
    for (file, result) in files.iter().zip(results) {
        match result {
            Ok(summary) => summaries.push(summary),
            Err(e) => eprintln!("{}: {}", file, e),
        }
    }

    if opts.json {
        let json = serde_json::to_string_pretty(&summaries)
            .map_err(|e| WdatError::Io(format!("JSON serialization error: {}", e)))?;
        wprintln!(writer, "{}", json)?;
        return Ok(());
    }

    for (i, summary) in summaries.iter().enumerate() {
        if i > 0 {
            wprintln!(writer)?;
        }
        print_summary(summary, writer)?;
    }
    Ok(())
}

fn print_summary(summary: &WalletSummary, writer: &mut dyn Write) -> Result<(), WdatError> {
    wprintln!(writer, "{}", summary.file.bold())?;
    wprintln!(writer, "  Backend:    {}", summary.backend)?;
    wprintln!(writer, "  Records:    {}", summary.records)?;

    match (&summary.master_key, &summary.master_key_error) {
        (Some(mkey), _) => {
            wprintln!(writer, "  Encrypted:  {}", "yes".green())?;
            wprintln!(writer, "  Key length: {}", format_len(mkey.encrypted_key_len))?;
            wprintln!(writer, "  Salt:       {}", mkey.salt)?;
            let method = if mkey.derivation_method == 0 {
                format!("{}", mkey.derivation_method).normal()
            } else {
                format!("{} (non-standard)", mkey.derivation_method).yellow()
            };
            wprintln!(writer, "  Method:     {}", method)?;
            wprintln!(writer, "  Iterations: {}", mkey.iterations)?;
            match (&mkey.hash, &mkey.hash_error) {
                (Some(hash), _) => wprintln!(writer, "  Hash:       {}", hash)?,
                (None, Some(err)) => wprintln!(writer, "  Hash:       {}", err.red())?,
                (None, None) => {}
            }
        }
        (None, Some(err)) => {
            wprintln!(writer, "  Encrypted:  {} ({})", "no".yellow(), err)?;
        }
        (None, None) => {
            wprintln!(writer, "  Encrypted:  {}", "no".yellow())?;
        }
    }

    let c = &summary.counts;
    wprintln!(
        writer,
        "  Keys:       {} key, {} ckey, {} keymeta",
        c.key,
        c.ckey,
        c.keymeta
    )?;
    wprintln!(
        writer,
        "  Other:      {} name, {} other, {} unrecognized",
        c.name,
        c.other,
        c.unrecognized
    )?;

    if !summary.public_keys.is_empty() {
        wprintln!(writer, "  Public keys ({}):", summary.public_keys.len())?;
        for pubkey in &summary.public_keys {
            wprintln!(writer, "    {} ({} bytes)", pubkey, pubkey.len() / 2)?;
        }
    }

    if !summary.addresses.is_empty() {
        wprintln!(writer, "  Address book:")?;
        for entry in &summary.addresses {
            wprintln!(writer, "    {}  {}", entry.address, entry.label.cyan())?;
        }
    }
    Ok(())
}
