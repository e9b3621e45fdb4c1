// Chat client module for Agora
// This file is the entry point for conversation-facing functionality; the
// roster, history, and send paths live in their own submodules as impl
// blocks on ChatClient.

use anyhow::{anyhow, Result};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex as TokioMutex};
use uuid::Uuid;

pub mod history;
pub mod roster;
pub mod send;

pub use history::Conversation;
pub use roster::Roster;

use crate::models::{Contact, Message, SPECULATIVE_ID_PREFIX};
use crate::services::{DirectoryService, MessageStoreService};
use crate::session::LeaseManager;

/// How long after a successful upload the engine waits before pulling the
/// authoritative entry (with its resource URL) from the archive.
pub const DEFAULT_RESYNC_DELAY: Duration = Duration::from_secs(2);

/// History page size used by selection-triggered loads.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Signals the rendering layer reacts to. State itself is polled through the
/// snapshot accessors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The conversation sequence was wholesale replaced. Re-scroll to the
    /// bottom only if the viewport was there before the replace, so a user
    /// reading old history is not yanked down.
    HistoryReplaced { scroll_to_bottom: bool },
}

/// One user's view of the messaging subsystem: the roster, the active
/// conversation, the composer, and the injected session lease underneath
/// every remote call.
#[derive(Clone)]
pub struct ChatClient {
    user_id: String,
    directory: Arc<dyn DirectoryService>,
    store: Arc<dyn MessageStoreService>,
    session: LeaseManager,
    roster: Arc<TokioMutex<Roster>>,
    conversation: Arc<TokioMutex<Conversation>>,
    composer: Arc<TokioMutex<String>>,
    viewport_at_bottom: Arc<AtomicBool>,
    speculative_seq: Arc<AtomicU64>,
    event_tx: mpsc::Sender<ClientEvent>,
    resync_delay: Duration,
}

impl ChatClient {
    pub fn new(
        user_id: &str,
        directory: Arc<dyn DirectoryService>,
        store: Arc<dyn MessageStoreService>,
        session: LeaseManager,
    ) -> (Self, mpsc::Receiver<ClientEvent>) {
        let (event_tx, event_rx) = mpsc::channel(100);

        (
            ChatClient {
                user_id: user_id.to_string(),
                directory,
                store,
                session,
                roster: Arc::new(TokioMutex::new(Roster::default())),
                conversation: Arc::new(TokioMutex::new(Conversation::default())),
                composer: Arc::new(TokioMutex::new(String::new())),
                viewport_at_bottom: Arc::new(AtomicBool::new(true)),
                speculative_seq: Arc::new(AtomicU64::new(0)),
                event_tx,
                resync_delay: DEFAULT_RESYNC_DELAY,
            },
            event_rx,
        )
    }

    /// Shorten the post-upload resync delay; tests use this.
    pub fn with_resync_delay(mut self, delay: Duration) -> Self {
        self.resync_delay = delay;
        self
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session(&self) -> &LeaseManager {
        &self.session
    }

    // -- snapshot accessors for the rendering layer --

    pub async fn messages(&self) -> Vec<Message> {
        self.conversation.lock().await.messages().to_vec()
    }

    pub async fn contacts(&self) -> Vec<Contact> {
        self.roster.lock().await.contacts().to_vec()
    }

    pub async fn selected_contact(&self) -> Option<Contact> {
        self.roster.lock().await.selected().cloned()
    }

    pub async fn composer_text(&self) -> String {
        self.composer.lock().await.clone()
    }

    pub async fn set_composer(&self, text: &str) {
        *self.composer.lock().await = text.to_string();
    }

    /// The UI keeps this current as the user scrolls.
    pub fn set_viewport_at_bottom(&self, at_bottom: bool) {
        self.viewport_at_bottom.store(at_bottom, Ordering::SeqCst);
    }

    // -- shared plumbing --

    /// Every outbound call starts here and aborts if the lease cannot be
    /// made valid.
    pub(crate) async fn ensure_session(&self) -> Result<()> {
        if self.session.ensure_valid().await {
            Ok(())
        } else {
            Err(anyhow!("session expired or signed out"))
        }
    }

    /// Speculative ids must not collide even for sends racing each other, so
    /// a monotonic counter is folded in next to the random part.
    pub(crate) fn next_speculative_id(&self) -> String {
        let seq = self.speculative_seq.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}{}-{}", SPECULATIVE_ID_PREFIX, seq, Uuid::new_v4())
    }
}
