use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tarfs_core::repo_factory::Backend;

#[derive(Parser)]
#[command(author, version, about = "tarfsdev CLI (alpha)", long_about = None)]
pub struct Cli {
    /// Where archive bytes are served from
    #[arg(long, global = true, value_enum, default_value_t = BackendArg::Auto)]
    pub backend: BackendArg,

    /// JSON file with indexing limits
    #[arg(long, global = true)]
    pub policy: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum BackendArg {
    /// Sniff the archive: plain tar stays on disk, zstd goes to memory
    Auto,
    /// Positioned reads against the archive file
    Fs,
    /// Decode the whole archive into memory
    Memory,
}

impl From<BackendArg> for Backend {
    fn from(b: BackendArg) -> Self {
        match b {
            BackendArg::Auto => Backend::Auto,
            BackendArg::Fs => Backend::Fs,
            BackendArg::Memory => Backend::Memory,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List every path in the archive, depth first
    List {
        archive: PathBuf,
        /// only paths under this directory
        #[arg(long)]
        prefix: Option<String>,
        /// show mode, size and mtime
        #[arg(long)]
        long: bool,
    },

    /// List one directory, reading it page by page
    Ls {
        archive: PathBuf,
        #[arg(default_value = ".")]
        path: String,
        /// entries per page; 0 reads everything at once
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long)]
        long: bool,
    },

    /// Show metadata for one path
    Stat {
        archive: PathBuf,
        path: String,
        #[arg(long)]
        json: bool,
    },

    /// Stream a file (or range) to stdout
    Cat {
        archive: PathBuf,
        path: String,
        #[arg(long, default_value_t = 0, conflicts_with = "from_end")]
        start: u64,
        #[arg(long)]
        len: Option<u64>,
        /// start this many bytes before the end
        #[arg(long = "from-end")]
        from_end: Option<u64>,
    },

    /// Copy one file (or range) to an output path
    Get {
        archive: PathBuf,
        path: String,
        out: PathBuf,
        #[arg(long, default_value_t = 0)]
        start: u64,
        #[arg(long)]
        len: Option<u64>,
    },

    /// BLAKE3 digest of every regular file under a directory
    Sum {
        archive: PathBuf,
        #[arg(default_value = ".")]
        path: String,
        #[arg(long)]
        json: bool,
    },

    /// Archive summary
    Info {
        archive: PathBuf,
        #[arg(long)]
        json: bool,
    },
}
