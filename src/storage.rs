//! Scoped read-only access to backup SQLite stores.
//!
//! Every read opens its own connection and drops it when done; nothing in the
//! crate holds a connection across component calls.

use crate::error::{Result, WcError};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;

/// Open a backup store read-only.
///
/// # Errors
///
/// Returns an error if the file does not exist or cannot be opened.
pub fn open_read_only(path: &Path) -> Result<Connection> {
    if !path.is_file() {
        return Err(WcError::path_error(
            "open",
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "store not found"),
        ));
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    conn.execute_batch(
        "
        PRAGMA query_only = ON;
        PRAGMA temp_store = MEMORY;
        ",
    )?;

    Ok(conn)
}

/// Column names of `table`, empty when the table does not exist.
///
/// # Errors
///
/// Returns an error if the catalog cannot be queried.
pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1)")?;
    let columns = stmt
        .query_map([table], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(columns)
}

/// Case-insensitive column membership, matching SQLite's identifier rules.
#[must_use]
pub fn has_column(columns: &[String], name: &str) -> bool {
    columns.iter().any(|c| c.eq_ignore_ascii_case(name))
}

/// Read a cell as text whatever its storage class. Blobs are decoded as
/// lossy UTF-8; `NULL` is `None`.
#[must_use]
pub fn text_lossy(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(n) => Some(n.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Null => None,
    }
}

/// Read a cell as an integer whatever its storage class.
///
/// Reals are truncated toward zero and text is parsed after trimming.
/// Anything else, including `NULL`, is `None`.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn integer_lossy(value: ValueRef<'_>) -> Option<i64> {
    match value {
        ValueRef::Integer(n) => Some(n),
        ValueRef::Real(f) if f.is_finite() => Some(f.trunc() as i64),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            let text = std::str::from_utf8(bytes).ok()?.trim();
            text.parse::<i64>().ok().or_else(|| {
                text.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        ValueRef::Real(_) | ValueRef::Null => None,
    }
}
