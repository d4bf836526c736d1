//! On-disk layout of an iOS WeChat backup.
//!
//! Everything the extractor assumes about file names, table names and column
//! names lives here. The layout is undocumented and changes between client
//! versions; when it does, table enumeration and queries fail loudly instead
//! of returning partial data.

/// Directory that holds one sub-directory per account.
pub const DOCUMENTS_DIR: &str = "Documents";

/// Per-account directory that holds all SQLite stores.
pub const DB_DIR: &str = "DB";

/// Contacts store. Its presence is what makes a directory an account.
pub const CONTACT_DB: &str = "WCDB_Contact.sqlite";

/// Legacy single-file message store, always first in the shard chain.
pub const LEGACY_SHARD: &str = "MM.sqlite";

/// Label recorded on messages read from the legacy store.
pub const LEGACY_SHARD_LABEL: &str = "MM";

/// Numbered shards are named `message_<n>.sqlite`.
pub const SHARD_PREFIX: &str = "message_";
pub const SHARD_EXTENSION: &str = "sqlite";

// ---------------------------------------------------------------------------
// Contacts store
// ---------------------------------------------------------------------------

pub const FRIEND_TABLE: &str = "Friend";
pub const COL_USR_NAME: &str = "UsrName";
pub const COL_NICK_NAME: &str = "NickName";
pub const COL_ALIAS: &str = "Alias";

/// Optional column with the group roster markup. Only some client versions
/// write it.
pub const COL_CHATROOM_MARKUP: &str = "dbContactChatRoom";

/// Element and attribute names inside the roster markup.
pub const MEMBER_TAG: &str = "Member";
pub const MEMBER_ATTR: &str = "userName";

// ---------------------------------------------------------------------------
// Message shards
// ---------------------------------------------------------------------------

/// Per-conversation tables are `Chat_<md5(UsrName)>`.
pub const CHAT_TABLE_PREFIX: &str = "Chat_";

/// Side tables share the hash suffix but carry no messages.
pub const CHAT_EXT_TABLE_PREFIX: &str = "ChatExt2_";

pub const COL_CREATE_TIME: &str = "CreateTime";
pub const COL_DES: &str = "Des";
pub const COL_TYPE: &str = "Type";
pub const COL_MESSAGE: &str = "Message";
pub const COL_MES_LOCAL_ID: &str = "MesLocalID";

/// `Des` value observed on messages sent by the account owner.
pub const DEFAULT_OUTGOING_FLAG: i64 = 1;

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub const GROUP_SUFFIX: &str = "@chatroom";
pub const OFFICIAL_ACCOUNT_PREFIXES: &[&str] = &["gh_", "app"];

/// Display identifier for hashes with no matching contact.
pub const UNKNOWN_USRNAME: &str = "<unknown>";

// ---------------------------------------------------------------------------
// Message type codes
// ---------------------------------------------------------------------------

pub const TYPE_TEXT: i64 = 1;
pub const TYPE_IMAGE: i64 = 3;
pub const TYPE_VOICE: i64 = 34;
pub const TYPE_VIDEO: i64 = 43;
pub const TYPE_EMOJI: i64 = 47;
pub const TYPE_APP: i64 = 49;
pub const TYPE_SYSTEM: i64 = 10000;

/// First byte of a zlib stream with default compression settings.
pub const ZLIB_HEADER_BYTE: u8 = 0x78;

/// Field separator artifact left inside decoded text bodies.
pub const FIELD_SEPARATOR: char = '\u{2}';

// ---------------------------------------------------------------------------
// Media folders, relative to the account directory
// ---------------------------------------------------------------------------

pub const MEDIA_IMAGE_DIR: &str = "Img";
pub const MEDIA_VOICE_DIR: &str = "Audio";
pub const MEDIA_VIDEO_DIR: &str = "Video";
