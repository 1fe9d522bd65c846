#[cfg(not(feature = "cli"))]
compile_error!("The `wdat` binary requires the `cli` feature. Build with `--features cli`.");

use clap::Parser;
use env_logger::{Builder, Env};
use std::fs::File;
use std::io::Write;
use std::process;

use wdat::cli;
use wdat::cli::app::{Cli, ColorMode, Commands};
use wdat::WdatError;

fn main() {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    // Configure rayon thread pool if --threads was specified
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .ok(); // Ignore if already initialized
    }

    match cli.color {
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Auto => {} // colored auto-detects tty
    }

    let writer_result: Result<Box<dyn Write>, WdatError> = match &cli.output {
        Some(path) => File::create(path)
            .map(|f| Box::new(f) as Box<dyn Write>)
            .map_err(|e| WdatError::Io(format!("Cannot create {}: {}", path, e))),
        None => Ok(Box::new(std::io::stdout()) as Box<dyn Write>),
    };

    let mut writer = match writer_result {
        Ok(w) => w,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Hash {
            files,
            with_filename,
        } => cli::hash::execute(
            &cli::hash::HashOptions {
                files,
                with_filename,
                threads: cli.threads,
            },
            &mut writer,
        ),

        Commands::Info { files, json } => cli::info::execute(
            &cli::info::InfoOptions {
                files,
                json,
                threads: cli.threads,
            },
            &mut writer,
        ),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "wdat", &mut std::io::stdout());
            Ok(())
        }
    };

    let result = result.and_then(|()| {
        writer
            .flush()
            .map_err(|e| WdatError::Io(format!("Cannot flush output: {}", e)))
    });

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
