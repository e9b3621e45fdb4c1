#![allow(dead_code)]
// Shared test doubles for the Agora engine
// Scripted in-memory stand-ins for the directory, the message store, and the
// auth endpoint; each records its calls and pops pre-seeded outcomes.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex as TokioMutex;

use agora_chat::models::{
    ConfirmedMessage, Contact, FileUpload, MessageKind, Page, Profile, SendReceipt,
};
use agora_chat::services::{AuthEndpoint, DirectoryService, MessageStoreService};
use agora_chat::session::Lease;
use agora_chat::storage::CachedIdentity;

// -- fixture builders --

pub fn fresh_lease(token: &str) -> Lease {
    Lease {
        token: token.to_string(),
        token_kind: "bearer".to_string(),
        issued_at: Utc::now(),
        ttl_seconds: 3600,
    }
}

/// Issued two hours ago with a one hour TTL: hard-expired.
pub fn expired_lease(token: &str) -> Lease {
    Lease {
        token: token.to_string(),
        token_kind: "bearer".to_string(),
        issued_at: Utc::now() - ChronoDuration::hours(2),
        ttl_seconds: 3600,
    }
}

/// A day and an hour old with a week of TTL: due for a slide renewal.
pub fn aged_lease(token: &str) -> Lease {
    Lease {
        token: token.to_string(),
        token_kind: "bearer".to_string(),
        issued_at: Utc::now() - ChronoDuration::hours(25),
        ttl_seconds: 7 * 24 * 3600,
    }
}

pub fn identity(user_id: &str) -> CachedIdentity {
    CachedIdentity {
        user_id: user_id.to_string(),
        display_name: format!("{} (display)", user_id),
        avatar_ref: None,
    }
}

pub fn contact(user_id: &str, display_name: &str) -> Contact {
    Contact {
        user_id: user_id.to_string(),
        display_name: display_name.to_string(),
        avatar_ref: None,
        last_message_preview: None,
        last_message_at: None,
        unread_count: 0,
    }
}

pub fn confirmed_text(id: &str, sender: &str, recipient: &str, body: &str) -> ConfirmedMessage {
    let now = Utc::now();
    ConfirmedMessage {
        id: id.to_string(),
        sender_id: sender.to_string(),
        recipient_id: recipient.to_string(),
        kind: MessageKind::Text,
        body: body.to_string(),
        created_at: now,
        updated_at: now,
    }
}

pub fn confirmed_media(
    id: &str,
    sender: &str,
    recipient: &str,
    kind: MessageKind,
    body: &str,
) -> ConfirmedMessage {
    let mut message = confirmed_text(id, sender, recipient, body);
    message.kind = kind;
    message
}

// -- wired-up client harness --

pub struct Harness {
    pub client: agora_chat::ChatClient,
    pub events: tokio::sync::mpsc::Receiver<agora_chat::ClientEvent>,
    pub session_events: tokio::sync::mpsc::Receiver<agora_chat::SessionEvent>,
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<FakeStore>,
    pub auth: Arc<FakeAuth>,
    // keeps the session file alive for the test's duration
    pub dir: tempfile::TempDir,
}

/// A client for `u-me` with a fresh installed lease and the given roster
/// behind the directory fake.
pub async fn harness(contacts: Vec<Contact>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let auth = FakeAuth::new();
    let (session, session_events) = agora_chat::LeaseManager::new(
        auth.clone(),
        agora_chat::SessionStore::at(dir.path().join("session.json")),
    );
    session
        .install(fresh_lease("tok-test"), identity("u-me"))
        .await
        .unwrap();

    let directory = FakeDirectory::new(contacts);
    let store = FakeStore::new();
    let (client, events) =
        agora_chat::ChatClient::new("u-me", directory.clone(), store.clone(), session);

    Harness {
        client,
        events,
        session_events,
        directory,
        store,
        auth,
        dir,
    }
}

// -- auth endpoint double --

pub struct FakeAuth {
    pub renew_calls: AtomicUsize,
    /// Popped per renewal; `None` scripts a rejection. Empty means every
    /// renewal succeeds with a fresh `renewed-tok` lease.
    pub renew_outcomes: TokioMutex<VecDeque<Option<Lease>>>,
}

impl FakeAuth {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeAuth {
            renew_calls: AtomicUsize::new(0),
            renew_outcomes: TokioMutex::new(VecDeque::new()),
        })
    }

    pub async fn script_renewal(&self, outcome: Option<Lease>) {
        self.renew_outcomes.lock().await.push_back(outcome);
    }

    pub fn renew_count(&self) -> usize {
        self.renew_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AuthEndpoint for FakeAuth {
    async fn login(&self, username: &str, _password: &str) -> Result<(Lease, CachedIdentity)> {
        Ok((fresh_lease("login-tok"), identity(username)))
    }

    async fn register(
        &self,
        username: &str,
        _password: &str,
        _display_name: &str,
    ) -> Result<(Lease, CachedIdentity)> {
        Ok((fresh_lease("register-tok"), identity(username)))
    }

    async fn renew(&self, _token: &str) -> Result<Lease> {
        self.renew_calls.fetch_add(1, Ordering::SeqCst);
        match self.renew_outcomes.lock().await.pop_front() {
            Some(Some(lease)) => Ok(lease),
            Some(None) => Err(anyhow!("renewal rejected: invalid token")),
            None => Ok(fresh_lease("renewed-tok")),
        }
    }
}

// -- directory double --

pub struct FakeDirectory {
    pub contacts: TokioMutex<Vec<Contact>>,
    pub profiles: TokioMutex<HashMap<String, Profile>>,
    pub contact_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
}

impl FakeDirectory {
    pub fn new(contacts: Vec<Contact>) -> Arc<Self> {
        Arc::new(FakeDirectory {
            contacts: TokioMutex::new(contacts),
            profiles: TokioMutex::new(HashMap::new()),
            contact_calls: AtomicUsize::new(0),
            profile_calls: AtomicUsize::new(0),
        })
    }

    pub async fn add_profile(&self, profile: Profile) {
        self.profiles
            .lock()
            .await
            .insert(profile.user_id.clone(), profile);
    }
}

#[async_trait]
impl DirectoryService for FakeDirectory {
    async fn fetch_contacts(&self) -> Result<Vec<Contact>> {
        self.contact_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.contacts.lock().await.clone())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Profile> {
        self.profile_calls.fetch_add(1, Ordering::SeqCst);
        self.profiles
            .lock()
            .await
            .get(user_id)
            .cloned()
            .ok_or_else(|| anyhow!("profile not found for {}", user_id))
    }
}

// -- message store double --

/// One scripted history response: items are newest-first, the delay makes
/// slow responses reproducible for the generation races.
pub struct ScriptedPage {
    pub delay: Duration,
    pub items: Vec<ConfirmedMessage>,
}

impl ScriptedPage {
    pub fn immediate(items: Vec<ConfirmedMessage>) -> Self {
        ScriptedPage {
            delay: Duration::from_millis(0),
            items,
        }
    }

    pub fn delayed(delay: Duration, items: Vec<ConfirmedMessage>) -> Self {
        ScriptedPage { delay, items }
    }
}

pub struct FakeStore {
    pub history_pages: TokioMutex<VecDeque<ScriptedPage>>,
    /// Popped per text send; `Err` carries the remote error text. Empty
    /// means every send succeeds with an auto-assigned `srv-<n>` id.
    pub text_outcomes: TokioMutex<VecDeque<Result<String, String>>>,
    pub file_outcomes: TokioMutex<VecDeque<Result<String, String>>>,
    /// Applied to every text/file send, for racing a send against other work.
    pub send_delay: TokioMutex<Option<Duration>>,
    pub history_calls: AtomicUsize,
    pub text_calls: AtomicUsize,
    pub file_calls: AtomicUsize,
    auto_id: AtomicUsize,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(FakeStore {
            history_pages: TokioMutex::new(VecDeque::new()),
            text_outcomes: TokioMutex::new(VecDeque::new()),
            file_outcomes: TokioMutex::new(VecDeque::new()),
            send_delay: TokioMutex::new(None),
            history_calls: AtomicUsize::new(0),
            text_calls: AtomicUsize::new(0),
            file_calls: AtomicUsize::new(0),
            auto_id: AtomicUsize::new(0),
        })
    }

    pub async fn script_history(&self, page: ScriptedPage) {
        self.history_pages.lock().await.push_back(page);
    }

    pub async fn script_text(&self, outcome: Result<String, String>) {
        self.text_outcomes.lock().await.push_back(outcome);
    }

    pub async fn script_file(&self, outcome: Result<String, String>) {
        self.file_outcomes.lock().await.push_back(outcome);
    }

    pub fn history_count(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn text_count(&self) -> usize {
        self.text_calls.load(Ordering::SeqCst)
    }

    pub fn file_count(&self) -> usize {
        self.file_calls.load(Ordering::SeqCst)
    }

    fn next_auto_id(&self) -> String {
        format!("srv-{}", self.auto_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

#[async_trait]
impl MessageStoreService for FakeStore {
    async fn fetch_history(
        &self,
        _contact_id: &str,
        _page: u32,
        _size: u32,
    ) -> Result<Page<ConfirmedMessage>> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.history_pages.lock().await.pop_front();
        match scripted {
            Some(page) => {
                if !page.delay.is_zero() {
                    tokio::time::sleep(page.delay).await;
                }
                Ok(Page {
                    items: page.items,
                    has_more: false,
                })
            }
            None => Ok(Page {
                items: Vec::new(),
                has_more: false,
            }),
        }
    }

    async fn send_text(&self, _contact_id: &str, _text: &str) -> Result<SendReceipt> {
        self.text_calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.send_delay.lock().await;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match self.text_outcomes.lock().await.pop_front() {
            Some(Ok(confirmed_id)) => Ok(SendReceipt { confirmed_id }),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(SendReceipt {
                confirmed_id: self.next_auto_id(),
            }),
        }
    }

    async fn send_file(
        &self,
        _contact_id: &str,
        _file: &FileUpload,
        _kind: MessageKind,
        _label: &str,
    ) -> Result<SendReceipt> {
        self.file_calls.fetch_add(1, Ordering::SeqCst);
        match self.file_outcomes.lock().await.pop_front() {
            Some(Ok(confirmed_id)) => Ok(SendReceipt { confirmed_id }),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Ok(SendReceipt {
                confirmed_id: self.next_auto_id(),
            }),
        }
    }
}
