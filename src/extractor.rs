//! Reading message rows out of `Chat_<hash>` tables.

use crate::decoder::{BinaryBodyMode, decode_body};
use crate::error::{Result, WcError};
use crate::model::{Direction, MessageKind, MessageRecord, Shard, TimeWindow};
use crate::schema;
use crate::storage::{has_column, integer_lossy, open_read_only, table_columns};
use crate::tables::quote_identifier;
use chrono::DateTime;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use tracing::debug;

/// How raw column values are turned into [`MessageRecord`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractOptions {
    /// `Des` value that marks a message as sent by the account owner.
    pub outgoing_flag: i64,
    pub binary_bodies: BinaryBodyMode,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            outgoing_flag: schema::DEFAULT_OUTGOING_FLAG,
            binary_bodies: BinaryBodyMode::default(),
        }
    }
}

const MESSAGE_COLUMNS: [&str; 5] = [
    schema::COL_CREATE_TIME,
    schema::COL_DES,
    schema::COL_TYPE,
    schema::COL_MESSAGE,
    schema::COL_MES_LOCAL_ID,
];

/// Fetch every message of `table` in `shard` that falls inside `window`.
///
/// Opens its own read-only handle and releases it before returning.
///
/// # Errors
///
/// Returns an error if the shard cannot be opened or the table cannot be
/// queried.
pub fn fetch_messages(
    shard: &Shard,
    table: &str,
    window: Option<TimeWindow>,
    options: ExtractOptions,
) -> Result<Vec<MessageRecord>> {
    let conn = open_read_only(shard.path())?;
    let messages = fetch_from(&conn, table, window, options, &shard.label())?;
    debug!(
        shard = %shard.label(),
        table,
        messages = messages.len(),
        "Fetched chat table"
    );
    Ok(messages)
}

/// Query `table` on an already open connection.
///
/// Rows come back in storage order; callers sort.
///
/// # Errors
///
/// Returns [`WcError::SchemaMismatch`] if a required column is missing, or a
/// database error if the query fails.
pub fn fetch_from(
    conn: &Connection,
    table: &str,
    window: Option<TimeWindow>,
    options: ExtractOptions,
    shard_label: &str,
) -> Result<Vec<MessageRecord>> {
    let columns = table_columns(conn, table)?;
    if let Some(missing) = MESSAGE_COLUMNS
        .iter()
        .find(|required| !has_column(&columns, required))
    {
        let reason = if columns.is_empty() {
            format!("table {table} not found")
        } else {
            format!("{table} has no column {missing}")
        };
        return Err(WcError::schema_mismatch(shard_label, reason));
    }

    let mut sql = format!(
        "SELECT {}, {}, {}, {}, {} FROM {}",
        schema::COL_CREATE_TIME,
        schema::COL_DES,
        schema::COL_TYPE,
        schema::COL_MESSAGE,
        schema::COL_MES_LOCAL_ID,
        quote_identifier(table),
    );
    if window.is_some() {
        sql.push_str(&format!(
            " WHERE {col} >= ?1 AND {col} <= ?2",
            col = schema::COL_CREATE_TIME
        ));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = match window {
        Some(w) => stmt.query(params![w.min_epoch, w.max_epoch])?,
        None => stmt.query([])?,
    };

    let mut messages = Vec::new();
    while let Some(row) = rows.next()? {
        // Coerced per cell: WCDB rows may carry REAL or TEXT here.
        let timestamp = integer_lossy(row.get_ref(0)?).unwrap_or(0);
        let des = integer_lossy(row.get_ref(1)?).unwrap_or(0);
        let msg_type = integer_lossy(row.get_ref(2)?).unwrap_or(0);
        let body = match row.get_ref(3)? {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
                decode_body(bytes, msg_type, options.binary_bodies)
            }
            ValueRef::Integer(n) => n.to_string(),
            ValueRef::Real(f) => f.to_string(),
            ValueRef::Null => String::new(),
        };
        let mes_local_id = integer_lossy(row.get_ref(4)?).unwrap_or(0);

        messages.push(MessageRecord {
            mes_local_id,
            timestamp,
            created_at: DateTime::from_timestamp(timestamp, 0).unwrap_or_default(),
            direction: Direction::from_flag(des, options.outgoing_flag),
            msg_type,
            kind: MessageKind::from_code(msg_type),
            body,
            shard: shard_label.to_string(),
        });
    }

    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ShardKind;
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;
    use tempfile::TempDir;

    const CHAT_SCHEMA: &str = "CREATE TABLE Chat_abc (
        CreateTime INTEGER,
        Des        INTEGER,
        Type       INTEGER,
        Message    TEXT,
        MesLocalID INTEGER PRIMARY KEY AUTOINCREMENT
    );";

    fn seeded() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(CHAT_SCHEMA).unwrap();
        let rows: [(i64, i64, i64, &str); 4] = [
            (100, 1, 1, "first"),
            (200, 0, 1, "second"),
            (300, 1, 3, "<img/>"),
            (400, 0, 1, "fourth\u{2}"),
        ];
        for (ts, des, tp, body) in rows {
            conn.execute(
                "INSERT INTO Chat_abc(CreateTime, Des, Type, Message) VALUES (?1, ?2, ?3, ?4)",
                params![ts, des, tp, body],
            )
            .unwrap();
        }
        conn
    }

    #[test]
    fn no_window_returns_all_rows() {
        let conn = seeded();
        let messages =
            fetch_from(&conn, "Chat_abc", None, ExtractOptions::default(), "message_1").unwrap();
        assert_eq!(messages.len(), 4);
        assert_eq!(messages[0].body, "first");
        assert_eq!(messages[0].direction, Direction::Outgoing);
        assert_eq!(messages[1].direction, Direction::Incoming);
        assert_eq!(messages[2].body, "[image]");
        assert_eq!(messages[2].kind, MessageKind::Image);
        assert_eq!(messages[3].body, "fourth");
        assert_eq!(messages[3].shard, "message_1");
        assert_eq!(messages[3].created_at.timestamp(), 400);
    }

    #[test]
    fn window_is_inclusive_on_both_ends() {
        let conn = seeded();
        let window = Some(TimeWindow::new(200, 300));
        let messages =
            fetch_from(&conn, "Chat_abc", window, ExtractOptions::default(), "MM").unwrap();
        let stamps: Vec<i64> = messages.iter().map(|m| m.timestamp).collect();
        assert_eq!(stamps, vec![200, 300]);
    }

    #[test]
    fn outgoing_flag_is_configurable() {
        let conn = seeded();
        let options = ExtractOptions {
            outgoing_flag: 0,
            ..ExtractOptions::default()
        };
        let messages = fetch_from(&conn, "Chat_abc", None, options, "MM").unwrap();
        assert_eq!(messages[0].direction, Direction::Incoming);
        assert_eq!(messages[1].direction, Direction::Outgoing);
    }

    #[test]
    fn compressed_blob_bodies_are_inflated() {
        let conn = seeded();
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all("压缩的消息".as_bytes()).unwrap();
        let blob = encoder.finish().unwrap();
        conn.execute(
            "INSERT INTO Chat_abc(CreateTime, Des, Type, Message) VALUES (500, 0, 1, ?1)",
            params![blob],
        )
        .unwrap();

        let window = Some(TimeWindow::new(500, 500));
        let messages =
            fetch_from(&conn, "Chat_abc", window, ExtractOptions::default(), "MM").unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body, "压缩的消息");
    }

    #[test]
    fn odd_typed_cells_are_coerced_not_fatal() {
        let conn = seeded();
        conn.execute(
            "INSERT INTO Chat_abc(CreateTime, Des, Type, Message) VALUES (450.75, 1, 1, 'real ts')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO Chat_abc(CreateTime, Des, Type, Message) VALUES ('later', 'x', '1', 'text ts')",
            [],
        )
        .unwrap();

        let messages =
            fetch_from(&conn, "Chat_abc", None, ExtractOptions::default(), "MM").unwrap();
        assert_eq!(messages.len(), 6);

        let real = messages.iter().find(|m| m.body == "real ts").unwrap();
        assert_eq!(real.timestamp, 450);
        assert_eq!(real.direction, Direction::Outgoing);

        let text = messages.iter().find(|m| m.body == "text ts").unwrap();
        assert_eq!(text.timestamp, 0);
        assert_eq!(text.direction, Direction::Incoming);
        assert_eq!(text.msg_type, 1);
    }

    #[test]
    fn missing_table_is_schema_mismatch() {
        let conn = seeded();
        let err = fetch_from(&conn, "Chat_zzz", None, ExtractOptions::default(), "MM")
            .unwrap_err();
        assert!(matches!(err, WcError::SchemaMismatch { .. }));
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Chat_abc (CreateTime INTEGER, Des INTEGER);")
            .unwrap();
        let err = fetch_from(&conn, "Chat_abc", None, ExtractOptions::default(), "MM")
            .unwrap_err();
        assert!(err.to_string().contains("Type"));
    }

    #[test]
    fn fetch_messages_opens_shard_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("message_1.sqlite");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(CHAT_SCHEMA).unwrap();
            conn.execute(
                "INSERT INTO Chat_abc(CreateTime, Des, Type, Message) VALUES (1, 1, 1, 'hi')",
                [],
            )
            .unwrap();
        }
        let shard = Shard::new(ShardKind::Numbered(1), &path);
        let messages =
            fetch_messages(&shard, "Chat_abc", None, ExtractOptions::default()).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].shard, "message_1");
        assert_eq!(messages[0].mes_local_id, 1);
    }
}
