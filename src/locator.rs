//! Account discovery and shard chains.
//!
//! A backup may contain several `Documents` folders (one per app container
//! copy). Every child of a `Documents` folder that has a contacts store is an
//! account; its message stores form an ordered chain of shards.

use crate::error::{Result, WcError};
use crate::model::{Account, Shard, ShardKind};
use crate::schema;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

static SHARD_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^{}(\d+)\.{}$",
        regex::escape(schema::SHARD_PREFIX),
        regex::escape(schema::SHARD_EXTENSION)
    ))
    .expect("shard name pattern is valid")
});

/// Find every account directory under `root`.
///
/// Accounts are returned sorted by path. A root without accounts yields an
/// empty list.
///
/// # Errors
///
/// Returns [`WcError::BackupNotFound`] if `root` is not a directory.
pub fn scan_accounts(root: &Path) -> Result<Vec<Account>> {
    if !root.is_dir() {
        return Err(WcError::backup_not_found(root));
    }

    let mut accounts = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!(error = %err, "Skipping unreadable path during scan");
                continue;
            }
        };
        if !entry.file_type().is_dir() || entry.file_name() != schema::DOCUMENTS_DIR {
            continue;
        }

        let children = match std::fs::read_dir(entry.path()) {
            Ok(children) => children,
            Err(err) => {
                warn!(path = %entry.path().display(), error = %err, "Cannot list Documents folder");
                continue;
            }
        };
        for child in children.flatten() {
            let account = Account::new(child.path());
            if account.contact_db().is_file() {
                debug!(uid = %account.uid, path = %account.path.display(), "Found account");
                accounts.push(account);
            }
        }
    }

    accounts.sort_by(|a, b| a.path.cmp(&b.path));
    accounts.dedup_by(|a, b| a.path == b.path);
    info!(root = %root.display(), accounts = accounts.len(), "Scanned backup");
    Ok(accounts)
}

/// Parse the numeric suffix out of a `message_<n>.sqlite` file name.
#[must_use]
pub fn shard_index(file_name: &str) -> Option<u32> {
    SHARD_NAME
        .captures(file_name)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Ordered message stores of `account`: `MM.sqlite` first, then numbered
/// shards ascending by their integer suffix.
///
/// # Errors
///
/// Returns an error if the account's `DB` directory exists but cannot be read.
pub fn shard_chain(account: &Account) -> Result<Vec<Shard>> {
    let db_dir = account.db_dir();
    if !db_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut numbered = Vec::new();
    let entries =
        std::fs::read_dir(&db_dir).map_err(|e| WcError::path_error("read", &db_dir, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| WcError::path_error("read", &db_dir, e))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !name.starts_with(schema::SHARD_PREFIX) {
            continue;
        }
        let is_store = Path::new(name)
            .extension()
            .is_some_and(|ext| ext == schema::SHARD_EXTENSION);
        if !is_store {
            continue;
        }
        match shard_index(name) {
            Some(n) if entry.path().is_file() => {
                numbered.push(Shard::new(ShardKind::Numbered(n), entry.path()));
            }
            Some(_) => {}
            None => warn!(file = name, "Ignoring shard with non-numeric suffix"),
        }
    }
    // Zero-padded names can share an index; the file name breaks the tie.
    numbered.sort_by(|a, b| a.kind.cmp(&b.kind).then_with(|| a.path.cmp(&b.path)));

    let mut chain = Vec::with_capacity(numbered.len() + 1);
    let legacy = db_dir.join(schema::LEGACY_SHARD);
    if legacy.is_file() {
        chain.push(Shard::new(ShardKind::Legacy, legacy));
    }
    chain.extend(numbered);

    debug!(
        uid = %account.uid,
        shards = chain.len(),
        "Resolved shard chain"
    );
    Ok(chain)
}
