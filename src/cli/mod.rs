//! CLI surface for the broker-state toolkit.
//!
//! Three operator-driven runs: `merge` consolidates duplicate state
//! shards, `convert` migrates legacy plan values to the canonical
//! encoding, `repair` rebuilds null values from a backup. Handlers stay
//! thin: build the config, connect the store, dispatch into the library.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand};

use crate::Result;
use crate::config::{Config, DEFAULT_BASE_URL};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "brokerstate",
    version,
    about = "Broker state reconciliation and repair toolkit",
    arg_required_else_help = true
)]
pub struct Cli {
    /// Debug output (repeat for more).
    #[arg(short = 'v', long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Merge duplicate broker-state shards into one.
    Merge(MergeArgs),

    /// Convert legacy plan values to the canonical encoding.
    Convert(ConvertArgs),

    /// Rebuild and repair null state values from a backup.
    Repair(RepairArgs),
}

/// Credentials and identifiers every run needs.
#[derive(Args, Debug)]
pub struct ApiArgs {
    /// Public half of the admin API key pair.
    #[arg(long, value_name = "KEY")]
    pub public_key: String,

    /// Private half of the admin API key pair.
    #[arg(long, value_name = "KEY")]
    pub private_key: String,

    /// Organization owning the service instances.
    #[arg(long, value_name = "ID")]
    pub org_id: String,

    /// Project holding the broker-state shards.
    #[arg(long, value_name = "ID")]
    pub project_id: String,

    /// Admin API base URL.
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,
}

impl ApiArgs {
    fn into_config(self) -> Config {
        Config {
            public_key: self.public_key,
            private_key: self.private_key,
            org_id: self.org_id,
            project_id: self.project_id,
            base_url: self.base_url,
        }
    }
}

#[derive(Args, Debug)]
pub struct MergeArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Log intended operations without mutating the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Directory the pre-merge backup snapshot is written to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub backup_dir: PathBuf,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Log intended operations without mutating the store.
    #[arg(long)]
    pub dry_run: bool,

    /// Path to a JSON array of instance ids to retain; values absent from
    /// the list are deleted as stale.
    #[arg(long, value_name = "PATH")]
    pub instance_list: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct RepairArgs {
    #[command(flatten)]
    pub api: ApiArgs,

    /// Backup snapshot file to rebuild from.
    #[arg(long, value_name = "PATH")]
    pub backup_file: PathBuf,

    /// Archive inventory directory (service_instances/, service_plans/).
    #[arg(long, value_name = "DIR")]
    pub archive_dir: PathBuf,

    /// Shard id in the snapshot that must never be replayed.
    #[arg(long, value_name = "ID")]
    pub skip_shard: Option<String>,

    /// Stop after the first successful repair for inspection.
    #[arg(long)]
    pub canary: bool,
}

pub fn parse_from<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::parse_from(args)
}

pub fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Merge(args) => commands::merge::handle(args),
        Commands::Convert(args) => commands::convert::handle(args),
        Commands::Repair(args) => commands::repair::handle(args),
    }
}
