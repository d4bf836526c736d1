//! Per-conversation table registry for a single shard.

use crate::error::Result;
use crate::schema;
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::debug;

/// Maps hashed conversation identifiers to their `Chat_<hash>` table in one
/// shard. Built once from `sqlite_master`, then used as a plain lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatTableRegistry {
    tables: BTreeMap<String, String>,
}

impl ChatTableRegistry {
    /// Enumerate message tables in the shard behind `conn`.
    ///
    /// `ChatExt2_<hash>` side tables are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried (for example when the
    /// file is not an SQLite database or is still encrypted).
    pub fn build(conn: &Connection) -> Result<Self> {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' \
             AND substr(name, 1, length(?1)) = ?1 \
             AND substr(name, 1, length(?2)) != ?2",
        )?;
        let names = stmt
            .query_map(
                [schema::CHAT_TABLE_PREFIX, schema::CHAT_EXT_TABLE_PREFIX],
                |row| row.get::<_, String>(0),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let registry: Self = names.into_iter().collect();
        debug!(tables = registry.len(), "Enumerated chat tables");
        Ok(registry)
    }

    /// Table name for a hashed identifier, if this shard has one.
    #[must_use]
    pub fn get(&self, hash_id: &str) -> Option<&str> {
        self.tables.get(hash_id).map(String::as_str)
    }

    /// `(hash_id, table_name)` pairs sorted by hash.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tables.iter().map(|(h, t)| (h.as_str(), t.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl FromIterator<String> for ChatTableRegistry {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let tables = iter
            .into_iter()
            .filter_map(|name| {
                let hash = hash_from_table_name(&name)?.to_string();
                Some((hash, name))
            })
            .collect();
        Self { tables }
    }
}

/// Strip the `Chat_` prefix off a message table name.
#[must_use]
pub fn hash_from_table_name(name: &str) -> Option<&str> {
    if name.starts_with(schema::CHAT_EXT_TABLE_PREFIX) {
        return None;
    }
    name.strip_prefix(schema::CHAT_TABLE_PREFIX)
        .filter(|hash| !hash.is_empty())
}

/// Quote a table name for interpolation into SQL.
#[must_use]
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shard_with_tables(names: &[&str]) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        for name in names {
            conn.execute_batch(&format!(
                "CREATE TABLE {} (CreateTime INTEGER);",
                quote_identifier(name)
            ))
            .unwrap();
        }
        conn
    }

    #[test]
    fn registry_keeps_only_chat_tables() {
        let conn = shard_with_tables(&[
            "Chat_aaa111",
            "ChatExt2_aaa111",
            "Chat_bbb222",
            "Chat",
            "ChatXaaa",
            "Hello_ccc",
            "Chat_",
        ]);
        conn.execute_batch("CREATE INDEX Chat_idx ON Chat_aaa111(CreateTime);")
            .unwrap();

        let registry = ChatTableRegistry::build(&conn).unwrap();
        let pairs: Vec<(&str, &str)> = registry.iter().collect();
        assert_eq!(
            pairs,
            vec![("aaa111", "Chat_aaa111"), ("bbb222", "Chat_bbb222")]
        );
        assert_eq!(registry.get("bbb222"), Some("Chat_bbb222"));
        assert_eq!(registry.get("ccc"), None);
    }

    #[test]
    fn empty_shard_has_empty_registry() {
        let conn = Connection::open_in_memory().unwrap();
        let registry = ChatTableRegistry::build(&conn).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn hash_from_table_name_strips_prefix() {
        assert_eq!(hash_from_table_name("Chat_abc"), Some("abc"));
        assert_eq!(hash_from_table_name("ChatExt2_abc"), None);
        assert_eq!(hash_from_table_name("Chat_"), None);
        assert_eq!(hash_from_table_name("Session"), None);
    }

    #[test]
    fn quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("Chat_a"), "\"Chat_a\"");
        assert_eq!(quote_identifier("we\"ird"), "\"we\"\"ird\"");
    }
}
