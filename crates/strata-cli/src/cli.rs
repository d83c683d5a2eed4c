use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "strata",
    about = "Strata: JSON documents in secondary-indexed buckets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Configuration file (defaults to ./strata.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding `store.path` from the configuration
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Store a JSON document
    Put(PutArgs),
    /// Print the document stored under a key
    Get(KeyArgs),
    /// Remove the document stored under a key
    Delete(KeyArgs),
    /// List documents whose index value matches
    Find(FindArgs),
    /// List documents in key order
    Scan(ScanArgs),
}

#[derive(Args, Debug)]
pub struct PutArgs {
    pub bucket: String,
    /// Document body; must be a JSON object
    pub json: String,
    /// Primary key (`0x` prefix for hex); allocated from the bucket sequence when omitted
    #[arg(short, long)]
    pub key: Option<String>,
}

#[derive(Args, Debug)]
pub struct KeyArgs {
    pub bucket: String,
    pub key: String,
}

#[derive(Args, Debug)]
pub struct FindArgs {
    pub bucket: String,
    pub index: String,
    pub value: String,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    pub bucket: String,
    /// Only keys starting with this prefix
    #[arg(long)]
    pub prefix: Option<String>,
    /// Descending key order
    #[arg(short, long)]
    pub reverse: bool,
}
