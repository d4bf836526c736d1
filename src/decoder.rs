//! Message body decoding.
//!
//! Text bodies are stored either verbatim or as a zlib stream. Anything else
//! (images, voice notes, app cards) is treated as opaque bytes.

use crate::model::MessageKind;
use crate::schema::{FIELD_SEPARATOR, ZLIB_HEADER_BYTE};
use flate2::read::ZlibDecoder;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::io::Read;
use tracing::trace;

/// How to render bodies of non-text messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BinaryBodyMode {
    /// A short fixed marker such as `[image]`.
    #[default]
    Placeholder,
    /// Lowercase hex of the raw bytes.
    Hex,
}

impl std::str::FromStr for BinaryBodyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "placeholder" | "p" => Ok(Self::Placeholder),
            "hex" | "h" => Ok(Self::Hex),
            _ => Err(format!("Invalid binary body mode: {s}")),
        }
    }
}

/// Decode a raw `Message` column value of type `msg_type` into display text.
#[must_use]
pub fn decode_body(raw: &[u8], msg_type: i64, mode: BinaryBodyMode) -> String {
    let kind = MessageKind::from_code(msg_type);
    if kind.is_textual() {
        decode_text(raw)
    } else {
        match mode {
            BinaryBodyMode::Placeholder => placeholder(kind, msg_type),
            BinaryBodyMode::Hex => hex::encode(raw),
        }
    }
}

/// Inflate if needed, decode UTF-8 lossily, drop separator bytes.
#[must_use]
pub fn decode_text(raw: &[u8]) -> String {
    let bytes = maybe_inflate(raw);
    String::from_utf8_lossy(&bytes).replace(FIELD_SEPARATOR, "")
}

/// Inflate a zlib body. Returns the input unchanged when it does not carry
/// the zlib header or the stream is corrupt.
#[must_use]
pub fn maybe_inflate(raw: &[u8]) -> Cow<'_, [u8]> {
    if raw.first() != Some(&ZLIB_HEADER_BYTE) {
        return Cow::Borrowed(raw);
    }

    let mut out = Vec::with_capacity(raw.len() * 4);
    match ZlibDecoder::new(raw).read_to_end(&mut out) {
        Ok(_) => Cow::Owned(out),
        Err(err) => {
            trace!(error = %err, len = raw.len(), "Body is not a zlib stream, keeping raw bytes");
            Cow::Borrowed(raw)
        }
    }
}

fn placeholder(kind: MessageKind, msg_type: i64) -> String {
    match kind {
        MessageKind::Image => "[image]".to_string(),
        MessageKind::Voice => "[voice]".to_string(),
        MessageKind::Video => "[video]".to_string(),
        MessageKind::Emoji => "[emoji]".to_string(),
        MessageKind::App => "[app]".to_string(),
        MessageKind::Text | MessageKind::System | MessageKind::Other => {
            format!("[type {msg_type}]")
        }
    }
}
