use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "skiff",
    version,
    about = "Object-storage namespace browser and parallel transfer engine"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v for verbose, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode: suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Override the config directory (mainly for tests)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Save connection parameters (endpoint and credentials)
    Connect(ConnectArgs),

    /// Set the output folder for downloads
    Output(OutputArgs),

    /// List buckets in the store
    Buckets(StoreArgs),

    /// Print the namespace tree for all buckets (or one)
    Tree(TreeArgs),

    /// Download selected remote paths to the output folder
    Get(GetArgs),

    /// Upload local files or directories into a bucket
    Put(PutArgs),
}

#[derive(clap::Args, Debug)]
pub struct ConnectArgs {
    /// Store endpoint (host:port, or a local directory acting as the store)
    pub endpoint: String,

    /// Access key (opaque, passed through to the storage client)
    #[arg(long, default_value = "")]
    pub access_key: String,

    /// Secret key (opaque, passed through to the storage client)
    #[arg(long, default_value = "")]
    pub secret_key: String,
}

#[derive(clap::Args, Debug)]
pub struct OutputArgs {
    /// Folder downloads are written into
    pub folder: PathBuf,
}

#[derive(clap::Args, Debug)]
pub struct StoreArgs {
    /// Store root directory (defaults to the configured endpoint)
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct TreeArgs {
    /// Only show this bucket
    pub bucket: Option<String>,

    /// Store root directory (defaults to the configured endpoint)
    #[arg(long)]
    pub store: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Remote paths (bucket/key); a directory path selects its whole subtree
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Store root directory (defaults to the configured endpoint)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Override the configured output folder
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Concurrent download tasks
    #[arg(short, long, default_value_t = crate::engine::DOWNLOAD_JOBS)]
    pub jobs: usize,
}

#[derive(clap::Args, Debug)]
pub struct PutArgs {
    /// Local files or directories to upload
    #[arg(required = true)]
    pub sources: Vec<PathBuf>,

    /// Target bucket
    #[arg(short, long)]
    pub bucket: String,

    /// Key prefix to upload under
    #[arg(short, long, default_value = "")]
    pub prefix: String,

    /// Store root directory (defaults to the configured endpoint)
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Concurrent upload tasks
    #[arg(short, long, default_value_t = crate::engine::UPLOAD_JOBS)]
    pub jobs: usize,
}
