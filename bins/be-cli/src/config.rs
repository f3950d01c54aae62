use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "be-cli", version, about = "Client for the BinaryEdge scanning platform")]
pub struct Cli {
    /// Path to TOML configuration file (default: ~/.binaryedge/config).
    #[arg(long, global = true, env = "BE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Echo requests and responses, and log at debug level.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stream results of your jobs
    Stream(StreamArgs),
    /// Stream the global results feed
    Firehose(FirehoseArgs),
    /// Create a job in the platform
    CreateJob(CreateJobArgs),
}

impl Commands {
    pub fn name(&self) -> &'static str {
        match self {
            Commands::Stream(_) => "stream",
            Commands::Firehose(_) => "firehose",
            Commands::CreateJob(_) => "create-job",
        }
    }
}

/// Options shared by every subcommand that talks to the platform.
#[derive(Args)]
pub struct AccessArgs {
    /// Authentication token issued by BinaryEdge.
    #[arg(long, env = "BE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

/// Output selection for subcommands that open a stream.
#[derive(Args)]
pub struct SinkArgs {
    /// Sink kind to dispatch records to (repeatable); replaces `[[sinks]]`.
    #[arg(long = "sink", value_name = "KIND")]
    pub sinks: Vec<String>,
}

#[derive(Args)]
pub struct StreamArgs {
    #[command(flatten)]
    pub access: AccessArgs,

    #[command(flatten)]
    pub output: SinkArgs,

    /// Only deliver records produced by this job.
    #[arg(long)]
    pub job_id: Option<String>,
}

#[derive(Args)]
pub struct FirehoseArgs {
    #[command(flatten)]
    pub access: AccessArgs,

    #[command(flatten)]
    pub output: SinkArgs,
}

#[derive(Args)]
pub struct CreateJobArgs {
    #[command(flatten)]
    pub access: AccessArgs,

    #[command(flatten)]
    pub output: SinkArgs,

    /// Type of scan.
    #[arg(long = "type", default_value = "scan")]
    pub job_type: String,

    /// Port of the targeted hosts.
    #[arg(long)]
    pub port: u16,

    /// Number of results wanted.
    #[arg(long)]
    pub sample: Option<u32>,

    /// Modules to run, e.g. "ssh,ftp,service".
    #[arg(long, default_value = "")]
    pub modules: String,

    /// Comma separated IPs or CIDRs, e.g. "8.8.8.8".
    #[arg(long)]
    pub targets: String,

    /// Stream the job's results right after creating it.
    #[arg(long)]
    pub redirect: bool,
}
