// Optimistic send paths for Agora
// A speculative entry goes into the sequence before the network call. The
// ack rewrites it in place; a failure splices it out and surfaces exactly
// one classified system notice. Nothing is ever retried silently.

use anyhow::Result;
use chrono::Utc;
use log::{debug, warn};
use uuid::Uuid;

use super::{ChatClient, DEFAULT_PAGE_SIZE};
use crate::codec;
use crate::error::SendErrorKind;
use crate::models::{DeliveryState, FileUpload, Message, MessageKind, SendReceipt};

/// Client-side upload cap; an oversized file never reaches the network.
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

const BLOCKED_EXTENSIONS: &[&str] = &["exe", "dll", "bat", "cmd", "msi", "scr", "sh"];

const SYSTEM_SENDER: &str = "system";

/// Checked before any network call. Err carries the user-facing reason.
fn validate_upload(file: &FileUpload) -> Result<(), String> {
    if file.bytes.is_empty() {
        return Err("this file is empty".to_string());
    }
    if file.bytes.len() > MAX_UPLOAD_BYTES {
        return Err(format!(
            "file is too large (limit is {} MB)",
            MAX_UPLOAD_BYTES / (1024 * 1024)
        ));
    }
    let extension = file
        .name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    if BLOCKED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(format!("files of type .{} are not supported", extension));
    }
    Ok(())
}

impl ChatClient {
    /// Optimistically append the text, clear the composer, then send. On ack
    /// the entry's id flips to the confirmed one in place; on failure the
    /// entry vanishes, the composer gets the text back, and one classified
    /// notice is appended.
    pub async fn send_text(&self, contact_id: &str, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Ok(());
        }

        let speculative_id = self.next_speculative_id();
        let now = Utc::now();
        self.conversation.lock().await.push(Message {
            id: speculative_id.clone(),
            sender_id: self.user_id.clone(),
            recipient_id: contact_id.to_string(),
            kind: MessageKind::Text,
            body: text.to_string(),
            delivery_state: DeliveryState::Pending,
            created_at: now,
            updated_at: now,
        });
        self.composer.lock().await.clear();
        self.record_outgoing(contact_id, text, now).await;

        match self.deliver_text(contact_id, text).await {
            Ok(receipt) => {
                let confirmed = self
                    .conversation
                    .lock()
                    .await
                    .confirm(&speculative_id, &receipt.confirmed_id, Utc::now());
                if confirmed {
                    debug!("Message {} confirmed as {}", speculative_id, receipt.confirmed_id);
                } else {
                    // a full replace already discarded the speculative entry
                    debug!("Nothing to reconcile for {}, entry already gone", speculative_id);
                }
                Ok(())
            }
            Err(e) => {
                warn!("Text send to {} failed: {:#}", contact_id, e);
                self.conversation.lock().await.remove(&speculative_id);
                *self.composer.lock().await = text.to_string();
                self.append_system_notice(contact_id, &SendErrorKind::classify(&e).to_string())
                    .await;
                Ok(())
            }
        }
    }

    async fn deliver_text(&self, contact_id: &str, text: &str) -> Result<SendReceipt> {
        self.ensure_session().await?;
        let receipt = self.store.send_text(contact_id, text).await?;
        self.session.on_call_succeeded().await;
        Ok(receipt)
    }

    /// Same optimistic shape as `send_text`, with two twists: the pending
    /// body is an uploading placeholder (the ack does not carry the resource
    /// URL), and a successful send schedules a delayed full history resync
    /// to pick up the authoritative entry from the archive.
    pub async fn send_file(&self, contact_id: &str, file: FileUpload) -> Result<()> {
        if let Err(reason) = validate_upload(&file) {
            warn!("Rejected upload {:?} client-side: {}", file.name, reason);
            self.append_system_notice(contact_id, &SendErrorKind::Validation(reason).to_string())
                .await;
            return Ok(());
        }

        let kind = MessageKind::from_file_name(&file.name);
        let label = kind.label();
        let speculative_id = self.next_speculative_id();
        let now = Utc::now();
        self.conversation.lock().await.push(Message {
            id: speculative_id.clone(),
            sender_id: self.user_id.clone(),
            recipient_id: contact_id.to_string(),
            kind,
            body: codec::encode_uploading(label, &file.name),
            delivery_state: DeliveryState::Pending,
            created_at: now,
            updated_at: now,
        });
        self.record_outgoing(contact_id, &format!("[{}] {}", label, file.name), now)
            .await;

        match self.deliver_file(contact_id, &file, kind, label).await {
            Ok(receipt) => {
                self.conversation
                    .lock()
                    .await
                    .confirm(&speculative_id, &receipt.confirmed_id, Utc::now());
                self.schedule_resync(contact_id);
                Ok(())
            }
            Err(e) => {
                warn!("File send to {} failed: {:#}", contact_id, e);
                self.conversation.lock().await.remove(&speculative_id);
                self.append_system_notice(contact_id, &SendErrorKind::classify(&e).to_string())
                    .await;
                Ok(())
            }
        }
    }

    async fn deliver_file(
        &self,
        contact_id: &str,
        file: &FileUpload,
        kind: MessageKind,
        label: &str,
    ) -> Result<SendReceipt> {
        self.ensure_session().await?;
        let receipt = self.store.send_file(contact_id, file, kind, label).await?;
        self.session.on_call_succeeded().await;
        Ok(receipt)
    }

    /// The archive needs a moment to have the uploaded resource URL; replace
    /// the sequence with the authoritative snapshot shortly after the ack.
    fn schedule_resync(&self, contact_id: &str) {
        let client = self.clone();
        let contact_id = contact_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(client.resync_delay).await;
            if let Err(e) = client.load_history(&contact_id, 1, DEFAULT_PAGE_SIZE).await {
                warn!("Post-upload resync for {} failed: {:#}", contact_id, e);
            }
        });
    }

    /// Local-only notice with a synthesized id. Never sent to the remote
    /// store and never reconciled; a later full replace discarding it is
    /// accepted, notices are ephemeral.
    pub async fn append_system_notice(&self, contact_id: &str, text: &str) {
        let now = Utc::now();
        self.conversation.lock().await.push(Message {
            id: format!("notice-{}", Uuid::new_v4()),
            sender_id: SYSTEM_SENDER.to_string(),
            recipient_id: contact_id.to_string(),
            kind: MessageKind::System,
            body: text.to_string(),
            delivery_state: DeliveryState::Confirmed,
            created_at: now,
            updated_at: now,
        });
    }
}
