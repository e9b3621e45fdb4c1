// Conversation history for Agora
// The message sequence is ordered by insertion, not by timestamp. A history
// load is the only operation that replaces it wholesale, guarded by a load
// generation so a slow stale response can never clobber a newer one.

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::sync::atomic::Ordering;

use super::{ChatClient, ClientEvent};
use crate::models::{ConfirmedMessage, DeliveryState, Message};

/// One conversation's local message sequence.
#[derive(Debug, Default)]
pub struct Conversation {
    contact_id: Option<String>,
    messages: Vec<Message>,
    load_generation: u64,
}

impl Conversation {
    pub fn contact_id(&self) -> Option<&str> {
        self.contact_id.as_deref()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub(crate) fn begin_load(&mut self) -> u64 {
        self.load_generation += 1;
        self.load_generation
    }

    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.load_generation == generation
    }

    /// Swap in a server snapshot. Pages arrive newest-first; display order
    /// is oldest-first, so the page is reversed once here and the order is
    /// preserved from then on.
    pub(crate) fn replace(&mut self, contact_id: &str, newest_first: Vec<ConfirmedMessage>) {
        let mut messages: Vec<Message> = newest_first
            .into_iter()
            .map(ConfirmedMessage::into_message)
            .collect();
        messages.reverse();
        self.messages = messages;
        self.contact_id = Some(contact_id.to_string());
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Rewrite a speculative entry to its confirmed identity, in place, the
    /// sequence position unchanged. Returns false when the entry is already
    /// gone (a full replace got there first), which callers treat as a
    /// harmless no-op.
    pub(crate) fn confirm(
        &mut self,
        speculative_id: &str,
        confirmed_id: &str,
        at: DateTime<Utc>,
    ) -> bool {
        match self.messages.iter_mut().find(|m| m.id == speculative_id) {
            Some(message) => {
                message.id = confirmed_id.to_string();
                message.delivery_state = DeliveryState::Confirmed;
                message.updated_at = at;
                true
            }
            None => false,
        }
    }

    /// Splice a message out of the sequence. Failed sends leave no trace.
    pub(crate) fn remove(&mut self, id: &str) -> bool {
        match self.messages.iter().position(|m| m.id == id) {
            Some(position) => {
                self.messages.remove(position);
                true
            }
            None => false,
        }
    }
}

impl ChatClient {
    /// Fetch one page of confirmed history and replace the local sequence
    /// with it. Whether the viewport gets re-scrolled is decided by where it
    /// was before the replace.
    pub async fn load_history(&self, contact_id: &str, page: u32, size: u32) -> Result<()> {
        let generation = self.conversation.lock().await.begin_load();

        self.ensure_session().await?;
        let fetched = self.store.fetch_history(contact_id, page, size).await?;
        self.session.on_call_succeeded().await;

        let was_at_bottom = self.viewport_at_bottom.load(Ordering::SeqCst);
        {
            let mut conversation = self.conversation.lock().await;
            if !conversation.is_current(generation) {
                debug!(
                    "Discarding stale history response for {} (generation {})",
                    contact_id, generation
                );
                return Ok(());
            }
            info!(
                "Replacing conversation with {} archived messages for {}",
                fetched.items.len(),
                contact_id
            );
            conversation.replace(contact_id, fetched.items);
        }

        let _ = self
            .event_tx
            .send(ClientEvent::HistoryReplaced {
                scroll_to_bottom: was_at_bottom,
            })
            .await;
        Ok(())
    }
}
