//! Command line and environment configuration for `dialect-sync`.
//!
//! Every option can come from a flag or a `DIALECT_*` variable (a `.env` file
//! is loaded first). Flags win.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use dialect_core::reconcile::{ParentChangePolicy, ReconcileOptions};
use dialect_postgres::{DialectTables, DEFAULT_LOCK_KEY};

#[derive(Debug, Parser)]
#[command(name = "dialect-sync")]
#[command(version)]
#[command(about = "Reconcile configured code dialects and inspect the language resolver")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Dialect catalog (YAML, `preference.codeDialects.dialects`)
    #[arg(
        long,
        short = 'c',
        global = true,
        env = "DIALECT_CONFIG_PATH",
        default_value = "config/dialects.yaml"
    )]
    pub config: PathBuf,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Elect, reconcile the store against the catalog, print the report
    Sync(SyncArgs),

    /// List every valid submission language (canonical, then dialects)
    Languages,

    /// List configured dialects with their parents
    Dialects,

    /// Validate an options payload or a whole submission body
    Validate(ValidateArgs),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LeaderMode {
    /// Postgres session advisory lock
    Advisory,
    /// Always write-eligible (single instance)
    Always,
    /// Never write; publish from config only
    Never,
}

#[derive(Debug, Args)]
pub struct SyncArgs {
    #[arg(long, env = "DIALECT_DATABASE_URL")]
    pub database_url: String,

    #[arg(long, env = "DIALECT_LEADER", value_enum, default_value = "advisory")]
    pub leader: LeaderMode,

    #[arg(long, env = "DIALECT_LEADER_LOCK_KEY", default_value_t = DEFAULT_LOCK_KEY)]
    pub lock_key: i64,

    /// rewrite-history | repoint-only
    #[arg(long, env = "DIALECT_PARENT_CHANGE", default_value = "rewrite-history")]
    pub parent_change: ParentChangePolicy,

    #[arg(long, env = "DIALECT_RESWEEP", default_value_t = true, action = ArgAction::Set)]
    pub resweep: bool,

    #[arg(long, env = "DIALECT_MAX_CONNECTIONS", default_value_t = 5)]
    pub max_connections: u32,

    #[command(flatten)]
    pub tables: TableArgs,
}

impl SyncArgs {
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            parent_change: self.parent_change,
            resweep_after_cascade: self.resweep,
        }
    }
}

#[derive(Debug, Args)]
pub struct TableArgs {
    #[arg(long, env = "DIALECT_TABLE", default_value = "code_dialect")]
    pub dialect_table: String,

    #[arg(long, env = "DIALECT_SUBMISSION_TABLE", default_value = "submission")]
    pub submission_table: String,

    #[arg(long, env = "DIALECT_SUBMISSION_LANGUAGE_COLUMN", default_value = "code_language")]
    pub submission_language_column: String,
}

impl From<&TableArgs> for DialectTables {
    fn from(args: &TableArgs) -> Self {
        DialectTables {
            dialect_table: args.dialect_table.clone(),
            submission_table: args.submission_table.clone(),
            submission_language_column: args.submission_language_column.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Language or dialect the options are for
    #[arg(long, short = 'l', required_unless_present = "submission", conflicts_with = "submission")]
    pub language: Option<String>,

    /// compileAndRunOptions as JSON
    #[arg(long, default_value = "{}")]
    pub options: String,

    /// Whole submission body as JSON
    #[arg(long)]
    pub submission: Option<String>,
}
