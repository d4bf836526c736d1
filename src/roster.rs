//! Contacts and group rosters.
//!
//! Chat tables are named after the MD5 of a user identifier, and the backup
//! keeps no reverse mapping. The roster hashes every known identifier up
//! front so conversations can be labelled with a plain map lookup.

use crate::error::{Result, WcError};
use crate::model::ContactEntry;
use crate::schema;
use crate::storage::{has_column, open_read_only, table_columns, text_lossy};
use md5::{Digest, Md5};
use rusqlite::types::ValueRef;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Lowercase hex MD5 of the UTF-8 bytes of `value`.
#[must_use]
pub fn md5_hex(value: &str) -> String {
    hex::encode(Md5::digest(value.as_bytes()))
}

/// Contacts of one account, keyed by `md5_hex(usrname)`.
#[derive(Debug, Clone, Default)]
pub struct Roster {
    entries: HashMap<String, ContactEntry>,
}

impl Roster {
    /// Look up a contact by hashed identifier.
    #[must_use]
    pub fn resolve(&self, hash_id: &str) -> Option<&ContactEntry> {
        self.entries.get(hash_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All contacts, sorted by user name.
    #[must_use]
    pub fn entries(&self) -> Vec<&ContactEntry> {
        let mut entries: Vec<&ContactEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.usrname.cmp(&b.usrname));
        entries
    }

    /// Add a contact, keyed by the hash of its user name.
    pub fn insert(&mut self, entry: ContactEntry) {
        self.entries.insert(md5_hex(&entry.usrname), entry);
    }
}

impl FromIterator<ContactEntry> for Roster {
    fn from_iter<I: IntoIterator<Item = ContactEntry>>(iter: I) -> Self {
        let mut roster = Self::default();
        for entry in iter {
            roster.insert(entry);
        }
        roster
    }
}

/// Load the `Friend` table of a contacts store.
///
/// A missing file yields an empty roster. A file without a usable `Friend`
/// table is reported as [`WcError::SchemaMismatch`].
///
/// # Errors
///
/// Returns an error if the store cannot be opened or queried.
pub fn load_roster(contact_db: &Path) -> Result<Roster> {
    if !contact_db.is_file() {
        debug!(path = %contact_db.display(), "No contacts store, using empty roster");
        return Ok(Roster::default());
    }

    let conn = open_read_only(contact_db)?;

    let columns = table_columns(&conn, schema::FRIEND_TABLE)?;
    if columns.is_empty() {
        return Err(WcError::schema_mismatch(
            contact_db,
            format!("missing table {}", schema::FRIEND_TABLE),
        ));
    }
    for required in [schema::COL_USR_NAME, schema::COL_NICK_NAME, schema::COL_ALIAS] {
        if !has_column(&columns, required) {
            return Err(WcError::schema_mismatch(
                contact_db,
                format!("{} has no column {required}", schema::FRIEND_TABLE),
            ));
        }
    }
    let markup_column = if has_column(&columns, schema::COL_CHATROOM_MARKUP) {
        schema::COL_CHATROOM_MARKUP
    } else {
        "NULL"
    };

    let sql = format!(
        "SELECT {usr}, {nick}, {alias}, {markup} FROM {table} WHERE {usr} IS NOT NULL",
        usr = schema::COL_USR_NAME,
        nick = schema::COL_NICK_NAME,
        alias = schema::COL_ALIAS,
        markup = markup_column,
        table = schema::FRIEND_TABLE,
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut roster = Roster::default();

    while let Some(row) = rows.next()? {
        // WCDB may store any of these as BLOB.
        let Some(usrname) = text_lossy(row.get_ref(0)?).filter(|u| !u.is_empty()) else {
            warn!(path = %contact_db.display(), "Skipping contact without a readable user name");
            continue;
        };
        let nickname = text_lossy(row.get_ref(1)?);
        let alias = text_lossy(row.get_ref(2)?);

        let members = if usrname.ends_with(schema::GROUP_SUFFIX) {
            match row.get_ref(3)? {
                ValueRef::Text(bytes) | ValueRef::Blob(bytes) => parse_member_markup(bytes),
                _ => Vec::new(),
            }
        } else {
            Vec::new()
        };

        roster.insert(ContactEntry {
            nickname: display_name(nickname, alias),
            usrname,
            members,
        });
    }

    info!(path = %contact_db.display(), contacts = roster.len(), "Loaded roster");
    Ok(roster)
}

/// Nickname, else alias, else empty.
fn display_name(nickname: Option<String>, alias: Option<String>) -> String {
    nickname
        .filter(|n| !n.is_empty())
        .or_else(|| alias.filter(|a| !a.is_empty()))
        .unwrap_or_default()
}

/// Extract member identifiers from group roster markup.
///
/// Returns the `userName` attribute of every `<Member>` element. Empty or
/// malformed markup yields an empty list.
#[must_use]
pub fn parse_member_markup(markup: &[u8]) -> Vec<String> {
    let text = String::from_utf8_lossy(markup);
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    if text.is_empty() {
        return Vec::new();
    }

    match roxmltree::Document::parse(text) {
        Ok(doc) => doc
            .descendants()
            .filter(|node| node.has_tag_name(schema::MEMBER_TAG))
            .filter_map(|node| node.attribute(schema::MEMBER_ATTR))
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect(),
        Err(err) => {
            debug!(error = %err, "Malformed roster markup, ignoring members");
            Vec::new()
        }
    }
}
