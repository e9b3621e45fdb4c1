// Data model for Agora conversations
// Shared between the roster, the sync engine, and the wire DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of client-generated message ids. A message carries such an id only
/// between its optimistic append and the server ack; the id transitions to
/// the server-assigned one exactly once and never back.
pub const SPECULATIVE_ID_PREFIX: &str = "pending-";

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub kind: MessageKind,
    pub body: String,
    pub delivery_state: DeliveryState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Message {
    pub fn is_speculative(&self) -> bool {
        self.id.starts_with(SPECULATIVE_ID_PREFIX)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Voice,
    File,
    /// Synthetic, local-only kind for error and notice display. Never sent to
    /// or returned by the remote store.
    System,
}

impl MessageKind {
    /// Pick a media kind from the file extension. The exact table is not
    /// load-bearing; unknown extensions fall back to a generic file.
    pub fn from_file_name(name: &str) -> MessageKind {
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => MessageKind::Image,
            "mp4" | "mov" | "webm" | "mkv" | "avi" => MessageKind::Video,
            "mp3" | "wav" | "ogg" | "m4a" | "aac" | "flac" => MessageKind::Voice,
            _ => MessageKind::File,
        }
    }

    /// Human-readable tag carried in the bracket line of an encoded media body.
    pub fn label(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::Video => "video",
            MessageKind::Voice => "voice",
            MessageKind::File => "file",
            MessageKind::System => "system",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Optimistically appended, waiting for the server ack.
    Pending,
    /// Acknowledged by the server under its assigned id.
    Confirmed,
    /// Transient, local-only: a failed message is spliced out of the
    /// sequence, it never rests in this state.
    Failed,
}

/// One conversation partner as the roster sees it, not a full profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
    #[serde(default)]
    pub last_message_preview: Option<String>,
    #[serde(default)]
    pub last_message_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub unread_count: u32,
}

/// Minimal directory lookup result, enough to synthesize a roster entry for
/// a deep-linked user we have no conversation with yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub avatar_ref: Option<String>,
}

impl Profile {
    /// Zero-history contact for a partner the roster has never seen.
    pub fn into_contact(self) -> Contact {
        Contact {
            user_id: self.user_id,
            display_name: self.display_name,
            avatar_ref: self.avatar_ref,
            last_message_preview: None,
            last_message_at: None,
            unread_count: 0,
        }
    }
}

/// A server-confirmed message record as the remote store returns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmedMessage {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub kind: MessageKind,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConfirmedMessage {
    pub fn into_message(self) -> Message {
        Message {
            id: self.id,
            sender_id: self.sender_id,
            recipient_id: self.recipient_id,
            kind: self.kind,
            body: self.body,
            delivery_state: DeliveryState::Confirmed,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One page of history. The store serves pages newest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Ack for a send operation. The server assigns the durable id; for file
/// sends the resource URL is not part of the immediate ack.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendReceipt {
    pub confirmed_id: String,
}

/// A file picked for upload, as handed to the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub name: String,
    pub bytes: Vec<u8>,
}
