//! wcdump - WeChat conversation extraction from iOS backups
//!
//! This library reads the SQLite stores that WeChat keeps inside an
//! unencrypted iOS backup and assembles them into time-ordered conversations.
//!
//! # Modules
//!
//! - [`locator`] - Account discovery and shard chains
//! - [`roster`] - Contacts, group members and identifier hashing
//! - [`tables`] - Per-shard chat table registry
//! - [`decoder`] - Message body decoding
//! - [`extractor`] - Reading message rows
//! - [`assembler`] - Merging shards into conversations
//! - [`window`] - Time window resolution
//! - [`export`] - JSON and CSV output
//! - [`error`] - Custom error types with rich context

pub mod assembler;
pub mod cli;
pub mod config;
pub mod decoder;
pub mod error;
pub mod export;
pub mod extractor;
pub mod locator;
pub mod logging;
pub mod model;
pub mod roster;
pub mod schema;
pub mod storage;
pub mod tables;
pub mod window;

pub use assembler::{ScanOptions, assemble_all, build_conversations};
pub use cli::*;
pub use decoder::{BinaryBodyMode, decode_body};
pub use error::{Result, WcError, format_error, format_wc_error};
pub use extractor::{ExtractOptions, fetch_messages};
pub use locator::{scan_accounts, shard_chain};
pub use model::*;
pub use roster::{Roster, load_roster, md5_hex};
pub use tables::ChatTableRegistry;
pub use window::{WindowSpec, parse_time_zone};

use std::path::Path;

/// Scan `root` and assemble every conversation of every account.
///
/// # Errors
///
/// Returns [`WcError::BackupNotFound`] if `root` is not a directory.
pub fn extract_backup(
    root: &Path,
    window: Option<TimeWindow>,
    options: &ScanOptions,
) -> Result<Vec<Conversation>> {
    let accounts = scan_accounts(root)?;
    Ok(assemble_all(&accounts, window, options))
}

/// Format an integer with thousands separators.
#[must_use]
pub fn format_number(value: i64) -> String {
    let abs = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(abs.len() + abs.len() / 3);

    for (idx, ch) in abs.chars().rev().enumerate() {
        if idx > 0 && idx % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }

    let mut formatted: String = out.chars().rev().collect();
    if value < 0 {
        formatted.insert(0, '-');
    }
    formatted
}

/// Format a count with thousands separators.
#[must_use]
pub fn format_count(value: usize) -> String {
    format_number(i64::try_from(value).unwrap_or(i64::MAX))
}

/// Format a long identifier as a short token (e.g., 1234...6789).
#[must_use]
pub fn format_short_id(id: &str) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 10 {
        return id.to_string();
    }
    let start: String = chars.iter().take(4).collect();
    let end: String = chars.iter().rev().take(4).rev().collect();
    format!("{start}...{end}")
}

#[cfg(test)]
mod tests {
    use super::{format_count, format_number, format_short_id};

    #[test]
    fn format_number_adds_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1000), "1,000");
        assert_eq!(format_number(12_345_678), "12,345,678");
        assert_eq!(format_number(-12_345), "-12,345");
        assert_eq!(format_count(1_234), "1,234");
    }

    #[test]
    fn format_short_id_truncates_long_ids() {
        assert_eq!(format_short_id("short"), "short");
        assert_eq!(
            format_short_id("d41d8cd98f00b204e9800998ecf8427e"),
            "d41d...427e"
        );
    }
}
