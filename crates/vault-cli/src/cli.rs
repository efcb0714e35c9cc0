use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "vault",
    about = "Vault — chunked blob store with an integrity-gated asset loader",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Storage directory (overrides the configuration file)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Directory exported files are written to
    #[arg(long, global = true, default_value = ".")]
    pub export_dir: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Make sure the reference asset is stored and valid, fetching it if needed
    Ensure,
    /// Store a local file
    Put(PutArgs),
    /// Print or save a stored file
    Cat(CatArgs),
    /// Delete a stored file
    Rm(NameArgs),
    /// List stored files
    Ls,
    /// Delete every stored file
    Clear,
    /// Export a stored file to the export directory
    Export(NameArgs),
    /// Export every save file to the export directory
    ExportSaves,
    /// Print a temporary file URL for a stored file
    Url(NameArgs),
}

#[derive(Args)]
pub struct PutArgs {
    pub path: PathBuf,
    /// Store under this name instead of the file name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct CatArgs {
    pub name: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args)]
pub struct NameArgs {
    pub name: String,
}
