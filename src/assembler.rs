//! Conversation assembly.
//!
//! Walks an account's shard chain, extracts every chat table, merges the
//! pieces of each conversation across shards and labels them from the roster.

use crate::extractor::{ExtractOptions, fetch_messages};
use crate::locator::shard_chain;
use crate::model::{Account, ChatKind, Conversation, Direction, MessageRecord, TimeWindow};
use crate::roster::{Roster, load_roster};
use crate::schema;
use crate::storage::open_read_only;
use crate::tables::ChatTableRegistry;
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Options for a whole scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub extract: ExtractOptions,
    /// Assemble accounts on the rayon pool.
    pub parallel: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            extract: ExtractOptions::default(),
            parallel: true,
        }
    }
}

/// Build every conversation of one account that has at least one message in
/// `window`, sorted by hashed identifier.
///
/// Unreadable rosters, shards and tables are logged and skipped.
#[must_use]
pub fn build_conversations(
    account: &Account,
    window: Option<TimeWindow>,
    options: &ScanOptions,
) -> Vec<Conversation> {
    let roster = match load_roster(&account.contact_db()) {
        Ok(roster) => roster,
        Err(err) => {
            warn!(uid = %account.uid, error = %err, "Cannot read roster, names will be unknown");
            Roster::default()
        }
    };

    let shards = match shard_chain(account) {
        Ok(shards) => shards,
        Err(err) => {
            warn!(uid = %account.uid, error = %err, "Cannot list message stores");
            return Vec::new();
        }
    };

    let mut buckets: BTreeMap<String, Vec<MessageRecord>> = BTreeMap::new();
    for shard in &shards {
        // The enumeration handle is dropped before any table is read.
        let registry =
            match open_read_only(shard.path()).and_then(|conn| ChatTableRegistry::build(&conn)) {
            Ok(registry) => registry,
            Err(err) => {
                warn!(shard = %shard.path.display(), error = %err, "Skipping unreadable shard");
                continue;
            }
        };

        for (hash_id, table) in registry.iter() {
            match fetch_messages(shard, table, window, options.extract) {
                Ok(messages) if messages.is_empty() => {}
                Ok(messages) => buckets.entry(hash_id.to_string()).or_default().extend(messages),
                Err(err) => {
                    warn!(shard = %shard.label(), table, error = %err, "Skipping unreadable table");
                }
            }
        }
    }

    let conversations: Vec<Conversation> = buckets
        .into_iter()
        .filter_map(|(hash_id, messages)| assemble(&account.uid, hash_id, messages, &roster))
        .collect();

    info!(
        uid = %account.uid,
        shards = shards.len(),
        conversations = conversations.len(),
        "Assembled account"
    );
    conversations
}

/// Run [`build_conversations`] for every account and concatenate the results
/// in account order.
#[must_use]
pub fn assemble_all(
    accounts: &[Account],
    window: Option<TimeWindow>,
    options: &ScanOptions,
) -> Vec<Conversation> {
    let per_account: Vec<Vec<Conversation>> = if options.parallel {
        accounts
            .par_iter()
            .map(|account| build_conversations(account, window, options))
            .collect()
    } else {
        accounts
            .iter()
            .map(|account| build_conversations(account, window, options))
            .collect()
    };
    per_account.into_iter().flatten().collect()
}

/// Turn one merged bucket into a labelled conversation. Empty buckets yield
/// nothing.
fn assemble(
    account_uid: &str,
    hash_id: String,
    mut messages: Vec<MessageRecord>,
    roster: &Roster,
) -> Option<Conversation> {
    // Stable: equal timestamps keep chain order, then storage order.
    messages.sort_by_key(|m| m.timestamp);
    let first_ts = messages.first()?.timestamp;
    let last_ts = messages.last()?.timestamp;

    let (usrname, nickname, members) = match roster.resolve(&hash_id) {
        Some(entry) => (
            entry.usrname.clone(),
            entry.nickname.clone(),
            entry.members.clone(),
        ),
        None => {
            debug!(hash = %hash_id, "Conversation not in roster");
            (schema::UNKNOWN_USRNAME.to_string(), String::new(), Vec::new())
        }
    };

    let outgoing_count = messages
        .iter()
        .filter(|m| m.direction == Direction::Outgoing)
        .count();

    Some(Conversation {
        account_uid: account_uid.to_string(),
        chat_type: ChatKind::classify(&usrname),
        hash_id,
        usrname,
        nickname,
        members,
        first_ts,
        last_ts,
        message_count: messages.len(),
        outgoing_count,
        incoming_count: messages.len() - outgoing_count,
        messages,
    })
}
