//! CLI definitions for wcdump.
//!
//! Uses clap for argument parsing with derive macros.

use crate::decoder::BinaryBodyMode;
use crate::logging::LogFormat;
use crate::window::WindowSpec;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Default folder for `export`.
pub const DEFAULT_EXPORT_DIR: &str = "wechat_export";

/// wcdump - WeChat conversation extractor for iOS backups
#[derive(Parser, Debug)]
#[command(name = "wcdump")]
#[command(version)]
#[command(about = "Extract WeChat conversations from an unencrypted iOS backup")]
#[command(long_about = r#"
wcdump reads the SQLite stores WeChat keeps inside an unencrypted iTunes or
Finder backup and turns them into time-ordered conversations.

Every account found under a 'Documents' folder is processed: contacts come
from WCDB_Contact.sqlite, messages from MM.sqlite and message_<n>.sqlite.

Quick start:
  1. Extract the backup (or point at the app container folder)
  2. Run: wcdump list /path/to/backup
  3. Dump: wcdump dump /path/to/backup --last-days 7 -o week.json
"#)]
pub struct Cli {
    /// Configuration file (default: ~/.config/wcdump/config.toml)
    #[arg(long, env = "WCDUMP_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// IANA time zone for --from-date/--to-date
    #[arg(long = "tz", value_name = "ZONE", global = true)]
    pub time_zone: Option<String>,

    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Be quiet (errors only, no progress or summary)
    #[arg(long, short = 'q', global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Log layout: compact, pretty or full
    #[arg(long, value_name = "FORMAT", env = "WCDUMP_LOG_FORMAT", global = true)]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Dump every conversation as JSON
    Dump(DumpArgs),

    /// List accounts, message stores and contacts
    List(ListArgs),

    /// Export conversations as CSV files with their media
    Export(ExportArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Backup root (any folder above the 'Documents' folders)
    pub root: PathBuf,

    /// Output file, '-' for stdout (default: dump.json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Write single-line JSON
    #[arg(long)]
    pub compact: bool,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Backup root (any folder above the 'Documents' folders)
    pub root: PathBuf,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Backup root (any folder above the 'Documents' folders)
    pub root: PathBuf,

    /// Destination folder
    #[arg(long, default_value = DEFAULT_EXPORT_DIR)]
    pub out: PathBuf,

    /// Skip copying image, voice and video files
    #[arg(long)]
    pub no_media: bool,

    #[command(flatten)]
    pub window: WindowArgs,

    #[command(flatten)]
    pub decode: DecodeArgs,
}

/// Time window flags. Combinations are checked before the backup is read.
#[derive(Args, Debug, Clone, Default)]
pub struct WindowArgs {
    /// Only messages on or after this local date (YYYY-MM-DD[THH:MM[:SS]])
    #[arg(long, value_name = "DATE")]
    pub from_date: Option<String>,

    /// Only messages on or before this local date (YYYY-MM-DD[THH:MM[:SS]])
    #[arg(long, value_name = "DATE")]
    pub to_date: Option<String>,

    /// Only messages from the last N days
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub last_days: Option<i64>,

    /// Only messages from the last N hours
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub last_hours: Option<i64>,
}

impl WindowArgs {
    #[must_use]
    pub fn to_spec(&self) -> WindowSpec {
        WindowSpec {
            from_date: self.from_date.clone(),
            to_date: self.to_date.clone(),
            last_days: self.last_days,
            last_hours: self.last_hours,
        }
    }
}

/// Decoding overrides for config values.
#[derive(Args, Debug, Clone, Default)]
pub struct DecodeArgs {
    /// 'Des' value of messages you sent
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    pub outgoing_flag: Option<i64>,

    /// How to render non-text bodies: placeholder or hex
    #[arg(long, value_name = "MODE")]
    pub binary_bodies: Option<BinaryBodyMode>,

    /// Process accounts one at a time
    #[arg(long)]
    pub sequential: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
