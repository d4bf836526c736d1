//! Writing assembled conversations to disk.
//!
//! `dump` produces one JSON document; `export` produces a folder per account
//! with a CSV file per conversation and the media files it references.

use crate::error::{Result, WcError};
use crate::model::{Account, Conversation};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Output path meaning "write to standard output".
pub const STDOUT_PATH: &str = "-";

/// CSV header for conversation exports.
pub const CSV_HEADER: &str = "CreateTime,Direction,Type,Message,MesLocalID,Shard";

const MEDIA_DIR: &str = "media";

/// Write `conversations` as a JSON array to `path`, or stdout for `-`.
///
/// Non-ASCII text is written as-is.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_json(path: &Path, conversations: &[Conversation], pretty: bool) -> Result<()> {
    if path.as_os_str() == STDOUT_PATH {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        write_json_to(&mut handle, conversations, pretty)?;
        handle.flush()?;
        return Ok(());
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| WcError::path_error("create", parent, e))?;
    }
    let file = File::create(path).map_err(|e| WcError::path_error("create", path, e))?;
    let mut writer = BufWriter::new(file);
    write_json_to(&mut writer, conversations, pretty)?;
    writer
        .flush()
        .map_err(|e| WcError::path_error("write", path, e))?;
    info!(path = %path.display(), conversations = conversations.len(), "Wrote JSON dump");
    Ok(())
}

/// Serialize to any writer, followed by a newline.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn write_json_to<W: Write>(
    writer: &mut W,
    conversations: &[Conversation],
    pretty: bool,
) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, conversations)?;
    } else {
        serde_json::to_writer(&mut *writer, conversations)?;
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Totals reported after an export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub conversations: usize,
    pub messages: usize,
    pub media_files: usize,
}

/// Export every conversation of `account` under `<out_dir>/<uid>/`.
///
/// Conversations belonging to other accounts are ignored.
///
/// # Errors
///
/// Returns an error if an output file or directory cannot be written.
pub fn export_account(
    account: &Account,
    conversations: &[Conversation],
    out_dir: &Path,
    with_media: bool,
) -> Result<ExportStats> {
    let account_dir = out_dir.join(sanitize_file_name(&account.uid));
    fs::create_dir_all(&account_dir)
        .map_err(|e| WcError::path_error("create", &account_dir, e))?;

    let mut stats = ExportStats::default();
    let mut used_names = HashSet::new();

    for conv in conversations.iter().filter(|c| c.account_uid == account.uid) {
        let name = unique_name(&mut used_names, conv);
        let csv_path = account_dir.join(format!("{name}.csv"));
        write_conversation_csv(&csv_path, conv)?;

        stats.conversations += 1;
        stats.messages += conv.messages.len();

        if with_media {
            let media_dest = account_dir.join(MEDIA_DIR).join(&name);
            stats.media_files += copy_media(account, conv, &media_dest)?;
        }
    }

    info!(
        uid = %account.uid,
        conversations = stats.conversations,
        messages = stats.messages,
        media = stats.media_files,
        "Exported account"
    );
    Ok(stats)
}

/// Write one conversation as CSV.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn write_conversation_csv(path: &Path, conv: &Conversation) -> Result<()> {
    let file = File::create(path).map_err(|e| WcError::path_error("create", path, e))?;
    let mut writer = BufWriter::new(file);
    let mut write = || -> io::Result<()> {
        writeln!(writer, "{CSV_HEADER}")?;
        for msg in &conv.messages {
            writeln!(
                writer,
                "{},{},{},\"{}\",{},{}",
                msg.timestamp,
                msg.direction.as_str(),
                msg.msg_type,
                csv_escape_text(&msg.body),
                msg.mes_local_id,
                msg.shard,
            )?;
        }
        writer.flush()
    };
    write().map_err(|e| WcError::path_error("write", path, e))?;
    debug!(path = %path.display(), messages = conv.messages.len(), "Wrote conversation CSV");
    Ok(())
}

/// Escape text for a double-quoted CSV field. Line breaks become spaces so
/// every message stays on one line.
#[must_use]
pub fn csv_escape_text(text: &str) -> String {
    text.replace('"', "\"\"").replace(['\n', '\r'], " ")
}

/// Copy the media files referenced by `conv` into `dest`.
///
/// Files are looked up in the account's `Img`, `Audio` and `Video` folders,
/// both at the top level and in a sub-folder named after the conversation
/// hash. A file belongs to a message when its name up to the first `.` equals
/// the message's local id. Returns the number of files copied.
///
/// # Errors
///
/// Returns an error if a file cannot be copied.
pub fn copy_media(account: &Account, conv: &Conversation, dest: &Path) -> Result<usize> {
    let wanted: BTreeSet<(&'static str, String)> = conv
        .messages
        .iter()
        .filter_map(|m| Some((m.kind.media_dir()?, m.mes_local_id.to_string())))
        .collect();
    if wanted.is_empty() {
        return Ok(0);
    }

    let mut indexes: HashMap<&'static str, HashMap<String, Vec<PathBuf>>> = HashMap::new();
    let mut copied = 0;

    for (kind_dir, local_id) in &wanted {
        let index = indexes.entry(*kind_dir).or_insert_with(|| {
            let base = account.path.join(kind_dir);
            let mut index = media_index(&base);
            for (id, paths) in media_index(&base.join(&conv.hash_id)) {
                index.entry(id).or_default().extend(paths);
            }
            index
        });

        let Some(sources) = index.get(local_id) else {
            continue;
        };
        if copied == 0 {
            fs::create_dir_all(dest).map_err(|e| WcError::path_error("create", dest, e))?;
        }
        for source in sources {
            let Some(file_name) = source.file_name() else {
                continue;
            };
            let target = dest.join(file_name);
            fs::copy(source, &target).map_err(|e| WcError::path_error("copy", source, e))?;
            copied += 1;
        }
    }

    if copied > 0 {
        debug!(hash = %conv.hash_id, files = copied, "Copied media");
    }
    Ok(copied)
}

/// Files directly inside `dir`, grouped by the name segment before the first
/// `.`. A missing folder is an empty index.
fn media_index(dir: &Path) -> HashMap<String, Vec<PathBuf>> {
    let mut index: HashMap<String, Vec<PathBuf>> = HashMap::new();
    if !dir.is_dir() {
        return index;
    }
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(path = %dir.display(), error = %err, "Cannot list media folder");
            return index;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let id = name.split('.').next().unwrap_or_default();
        if !id.is_empty() {
            index.entry(id.to_string()).or_default().push(path);
        }
    }
    // Deterministic copy order.
    for paths in index.values_mut() {
        paths.sort();
    }
    index
}

/// Make a display tag safe to use as a single path component.
#[must_use]
pub fn sanitize_file_name(tag: &str) -> String {
    let cleaned: String = tag
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c.is_whitespace());
    if trimmed.is_empty() {
        "_".to_string()
    } else {
        trimmed.to_string()
    }
}

/// File stem for `conv`, disambiguated with a hash prefix when two
/// conversations share a display tag.
fn unique_name(used: &mut HashSet<String>, conv: &Conversation) -> String {
    let base = sanitize_file_name(conv.display_tag());
    let name = if used.contains(&base) {
        let short: String = conv.hash_id.chars().take(8).collect();
        format!("{base}_{short}")
    } else {
        base
    };
    used.insert(name.clone());
    name
}
