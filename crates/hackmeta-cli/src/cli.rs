use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "hackmeta",
    about = "Hackathon metadata on IPFS: upload, pin, fetch and verify records",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// TOML configuration file. IPFS_* environment variables override it.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum RecordKindArg {
    Hackathon,
    Project,
    Score,
}

#[derive(Subcommand)]
pub enum Command {
    /// Upload a file's bytes
    Upload(UploadArgs),
    /// Print the content stored under an identifier
    Fetch(FetchArgs),
    /// Ask the node to retain content
    Pin(PinArgs),
    /// Check identifier syntax without touching the network
    Validate(ValidateArgs),
    /// Print gateway URLs for an identifier
    Url(UrlArgs),
    /// Check whether the gateway serves an identifier
    Probe(ProbeArgs),
    /// Build a record from form JSON, then upload and pin it
    Record(RecordArgs),
    /// Fetch and decode a stored record
    Get(GetArgs),
    /// Upload a hackathon with its projects and scores as one directory
    Directory(DirectoryArgs),
    /// Compute a weighted overall score offline
    Score(ScoreArgs),
}

#[derive(Args)]
pub struct UploadArgs {
    pub file: PathBuf,
    /// Name to store the content under; defaults to the file name
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub pin: bool,
}

#[derive(Args)]
pub struct FetchArgs {
    pub cid: String,
    /// Write to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct PinArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct ValidateArgs {
    #[arg(required = true)]
    pub cids: Vec<String>,
}

#[derive(Args)]
pub struct UrlArgs {
    pub cid: String,
    /// Also list the alternate gateways
    #[arg(long)]
    pub alternates: bool,
}

#[derive(Args)]
pub struct ProbeArgs {
    pub cid: String,
}

#[derive(Args)]
pub struct RecordArgs {
    pub kind: RecordKindArg,
    /// JSON file holding the form input
    pub form: PathBuf,
}

#[derive(Args)]
pub struct GetArgs {
    pub kind: RecordKindArg,
    pub cid: String,
}

#[derive(Args)]
pub struct DirectoryArgs {
    /// JSON file with `metadata`, `projects` and `scores` records
    pub bundle: PathBuf,
}

#[derive(Args)]
pub struct ScoreArgs {
    /// Scores as criterion=value, e.g. innovation=9
    #[arg(required = true)]
    pub scores: Vec<String>,
}
