//! Synthetic WeChat backups for integration tests.
//!
//! Lays out `AppDomain-com.tencent.xin/Documents/<uid>/DB/` under a temp
//! directory and fills the contacts and message stores with rusqlite.

#![allow(dead_code)]

use rusqlite::{Connection, params};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wcdump::md5_hex;

/// 2023-11-14T22:13:20Z.
pub const BASE_TS: i64 = 1_700_000_000;

pub const ALICE: &str = "wxid_alice";
pub const FAMILY: &str = "12345@chatroom";
pub const NEWS: &str = "gh_news";

pub struct SyntheticBackup {
    pub dir: TempDir,
    pub account_dir: PathBuf,
}

impl SyntheticBackup {
    /// Empty backup with one account and an empty `Friend` table.
    pub fn new(uid: &str) -> Self {
        let dir = TempDir::new().expect("temp dir");
        let account_dir = dir
            .path()
            .join("AppDomain-com.tencent.xin")
            .join("Documents")
            .join(uid);
        fs::create_dir_all(account_dir.join("DB")).expect("DB dir");

        let conn = Connection::open(account_dir.join("DB").join("WCDB_Contact.sqlite"))
            .expect("contact db");
        conn.execute_batch(
            "CREATE TABLE Friend(
                UsrName TEXT PRIMARY KEY,
                NickName TEXT,
                Alias TEXT,
                dbContactChatRoom BLOB
            );",
        )
        .expect("Friend table");

        Self { dir, account_dir }
    }

    /// The three-contact, two-shard backup: five messages per contact per
    /// shard, shards interleaved in time, even message indices outgoing.
    pub fn standard() -> Self {
        let backup = Self::new("acc0001");
        backup.add_contact(ALICE, "Alice", "ali", &[]);
        backup.add_contact(FAMILY, "Family", "", &[ALICE, "wxid_bob"]);
        backup.add_contact(NEWS, "Daily News", "", &[]);

        for (shard, slot) in [("message_1.sqlite", 0), ("message_2.sqlite", 1)] {
            for usrname in [ALICE, FAMILY, NEWS] {
                for i in 0..5_i64 {
                    let ts = BASE_TS + (i * 2 + slot) * 60;
                    let des = if i % 2 == 0 { 1 } else { 0 };
                    let body = format!("{usrname} {shard} #{i}");
                    backup.add_message(shard, usrname, ts, des, 1, body.as_bytes());
                }
            }
        }
        backup
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn db_dir(&self) -> PathBuf {
        self.account_dir.join("DB")
    }

    pub fn add_contact(&self, usrname: &str, nickname: &str, alias: &str, members: &[&str]) {
        let markup = if members.is_empty() {
            None
        } else {
            let inner: String = members
                .iter()
                .map(|m| format!("<Member userName=\"{m}\"/>"))
                .collect();
            Some(format!("<RoomData>{inner}</RoomData>").into_bytes())
        };
        let conn = Connection::open(self.db_dir().join("WCDB_Contact.sqlite")).expect("open");
        conn.execute(
            "INSERT INTO Friend VALUES (?1, ?2, ?3, ?4)",
            params![usrname, nickname, alias, markup],
        )
        .expect("insert contact");
    }

    /// Append one row to `Chat_<md5(usrname)>` in `shard_file`, creating the
    /// store and the table on first use.
    pub fn add_message(
        &self,
        shard_file: &str,
        usrname: &str,
        ts: i64,
        des: i64,
        msg_type: i64,
        body: &[u8],
    ) -> i64 {
        let hash = md5_hex(usrname);
        let conn = Connection::open(self.db_dir().join(shard_file)).expect("open shard");
        conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS Chat_{hash} (
                CreateTime INTEGER,
                Des INTEGER,
                Type INTEGER,
                Message TEXT,
                MesLocalID INTEGER PRIMARY KEY AUTOINCREMENT,
                Status INTEGER DEFAULT 0
            );
            CREATE TABLE IF NOT EXISTS ChatExt2_{hash} (ConBlob BLOB);
            INSERT INTO ChatExt2_{hash} VALUES (x'00ff');"
        ))
        .expect("chat table");
        conn.execute(
            &format!("INSERT INTO Chat_{hash}(CreateTime, Des, Type, Message) VALUES (?1, ?2, ?3, ?4)"),
            params![ts, des, msg_type, body],
        )
        .expect("insert message");
        conn.last_insert_rowid()
    }

    /// Drop a media file into `<account>/<folder>/<name>`.
    pub fn add_media(&self, folder: &str, name: &str, content: &[u8]) {
        let dir = self.account_dir.join(folder);
        fs::create_dir_all(&dir).expect("media dir");
        fs::write(dir.join(name), content).expect("media file");
    }
}
