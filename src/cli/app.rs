use clap::{ArgAction, Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "wdat")]
#[command(about = "Wallet file master-key extraction toolkit")]
#[command(version)]
pub struct Cli {
    /// Control colored output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Write output to a file instead of stdout
    #[arg(short, long, global = true)]
    pub output: Option<String>,

    /// Number of threads for processing files (0 = one file at a time)
    #[arg(long, default_value = "0", global = true)]
    pub threads: usize,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the master key of each wallet as a $bitcoin$ hash line
    Hash {
        /// Wallet files (default: every *.dat file in the current directory)
        files: Vec<String>,

        /// Prefix each hash line with the wallet file name
        #[arg(short = 'H', long = "with-filename")]
        with_filename: bool,
    },

    /// Summarize wallet backend, encryption parameters, and records
    Info {
        /// Wallet files (default: every *.dat file in the current directory)
        files: Vec<String>,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: clap_complete::Shell,
    },
}
