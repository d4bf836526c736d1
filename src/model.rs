//! Data models for WeChat backup data.
//!
//! These structures represent the normalized form of conversations after
//! reading them out of the sharded SQLite stores.

use crate::schema;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One account found inside a backup (`Documents/<uid>/`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Account {
    pub uid: String,
    pub path: PathBuf,
}

impl Account {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let uid = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { uid, path }
    }

    /// Directory holding the account's SQLite stores.
    #[must_use]
    pub fn db_dir(&self) -> PathBuf {
        self.path.join(schema::DB_DIR)
    }

    #[must_use]
    pub fn contact_db(&self) -> PathBuf {
        self.db_dir().join(schema::CONTACT_DB)
    }
}

/// Position of a message store in the account's shard chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardKind {
    /// `MM.sqlite`, read before any numbered shard.
    Legacy,
    /// `message_<n>.sqlite`.
    Numbered(u32),
}

/// A single message store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shard {
    pub kind: ShardKind,
    pub path: PathBuf,
}

impl Shard {
    pub fn new(kind: ShardKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Short label such as `MM` or `message_3`.
    #[must_use]
    pub fn label(&self) -> String {
        match self.kind {
            ShardKind::Legacy => schema::LEGACY_SHARD_LABEL.to_string(),
            ShardKind::Numbered(n) => format!("{}{n}", schema::SHARD_PREFIX),
        }
    }
}

/// A contact row, keyed elsewhere by the MD5 of `usrname`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactEntry {
    pub usrname: String,
    pub nickname: String,
    pub members: Vec<String>,
}

/// Who sent a message, relative to the account owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Outgoing,
    Incoming,
}

impl Direction {
    /// Map the raw `Des` column against the configured outgoing flag.
    #[must_use]
    pub const fn from_flag(des: i64, outgoing_flag: i64) -> Self {
        if des == outgoing_flag {
            Self::Outgoing
        } else {
            Self::Incoming
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Outgoing => "out",
            Self::Incoming => "in",
        }
    }
}

/// Broad classification of a message type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Voice,
    Video,
    Emoji,
    App,
    System,
    Other,
}

impl MessageKind {
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            schema::TYPE_TEXT => Self::Text,
            schema::TYPE_IMAGE => Self::Image,
            schema::TYPE_VOICE => Self::Voice,
            schema::TYPE_VIDEO => Self::Video,
            schema::TYPE_EMOJI => Self::Emoji,
            schema::TYPE_APP => Self::App,
            schema::TYPE_SYSTEM => Self::System,
            _ => Self::Other,
        }
    }

    /// Kinds whose body is (possibly compressed) UTF-8 text.
    #[must_use]
    pub const fn is_textual(self) -> bool {
        matches!(self, Self::Text | Self::System)
    }

    /// Media sub-directory of the account holding files for this kind.
    #[must_use]
    pub const fn media_dir(self) -> Option<&'static str> {
        match self {
            Self::Image => Some(schema::MEDIA_IMAGE_DIR),
            Self::Voice => Some(schema::MEDIA_VOICE_DIR),
            Self::Video => Some(schema::MEDIA_VIDEO_DIR),
            _ => None,
        }
    }
}

/// One decoded chat event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub mes_local_id: i64,
    pub timestamp: i64,
    pub created_at: DateTime<Utc>,
    pub direction: Direction,
    pub msg_type: i64,
    pub kind: MessageKind,
    pub body: String,
    pub shard: String,
}

/// Kind of conversation, derived from the raw identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChatKind {
    Direct,
    Group,
    OfficialAccount,
}

impl ChatKind {
    /// Classify a raw user identifier by its naming convention.
    #[must_use]
    pub fn classify(usrname: &str) -> Self {
        if usrname.ends_with(schema::GROUP_SUFFIX) {
            Self::Group
        } else if schema::OFFICIAL_ACCOUNT_PREFIXES
            .iter()
            .any(|prefix| usrname.starts_with(prefix))
        {
            Self::OfficialAccount
        } else {
            Self::Direct
        }
    }
}

impl std::fmt::Display for ChatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Group => write!(f, "group"),
            Self::OfficialAccount => write!(f, "official-account"),
        }
    }
}

/// All messages sharing one hashed identifier within an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub account_uid: String,
    pub hash_id: String,
    pub usrname: String,
    pub nickname: String,
    pub chat_type: ChatKind,
    pub members: Vec<String>,
    pub messages: Vec<MessageRecord>,
    pub first_ts: i64,
    pub last_ts: i64,
    pub message_count: usize,
    pub outgoing_count: usize,
    pub incoming_count: usize,
}

impl Conversation {
    /// Human-friendly tag used for file names and listings.
    #[must_use]
    pub fn display_tag(&self) -> &str {
        if !self.nickname.is_empty() {
            &self.nickname
        } else if self.usrname != schema::UNKNOWN_USRNAME {
            &self.usrname
        } else {
            &self.hash_id
        }
    }
}

/// Inclusive epoch-second bounds applied to `CreateTime`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub min_epoch: i64,
    pub max_epoch: i64,
}

impl TimeWindow {
    #[must_use]
    pub const fn new(min_epoch: i64, max_epoch: i64) -> Self {
        Self {
            min_epoch,
            max_epoch,
        }
    }

    #[must_use]
    pub const fn contains(&self, ts: i64) -> bool {
        self.min_epoch <= ts && ts <= self.max_epoch
    }
}
