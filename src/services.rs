// External collaborator interfaces for Agora
// The HTTP transport, the directory, and the remote message store live
// behind these traits; the engine sees only the operations it needs, and
// tests substitute scripted doubles.

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{Contact, ConfirmedMessage, FileUpload, MessageKind, Page, Profile, SendReceipt};
use crate::session::Lease;
use crate::storage::CachedIdentity;

/// Contact directory lookups.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn fetch_contacts(&self) -> Result<Vec<Contact>>;
    async fn fetch_profile(&self, user_id: &str) -> Result<Profile>;
}

/// The remote message store.
#[async_trait]
pub trait MessageStoreService: Send + Sync {
    /// One page of confirmed messages for a conversation, newest first.
    async fn fetch_history(&self, contact_id: &str, page: u32, size: u32)
        -> Result<Page<ConfirmedMessage>>;

    async fn send_text(&self, contact_id: &str, text: &str) -> Result<SendReceipt>;

    /// Upload a file and create the message for it. The ack carries only the
    /// confirmed id; the resource URL shows up in the archive later.
    async fn send_file(
        &self,
        contact_id: &str,
        file: &FileUpload,
        kind: MessageKind,
        label: &str,
    ) -> Result<SendReceipt>;
}

/// Credential issuance and renewal.
#[async_trait]
pub trait AuthEndpoint: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<(Lease, CachedIdentity)>;
    async fn register(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<(Lease, CachedIdentity)>;
    async fn renew(&self, token: &str) -> Result<Lease>;
}
