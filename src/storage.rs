// Persisted session state for Agora
// The credential lease and a minimal cached identity survive a reload; all
// other client state (messages, roster) is in-memory only and refetched.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Utc};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Read;
use std::path::PathBuf;

use crate::session::Lease;

/// The slice of the signed-in user's profile that is kept locally so the UI
/// can render before the first directory fetch returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedIdentity {
    pub user_id: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_ref: Option<String>,
}

/// On-disk form of the session. The token is base64-encoded at rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    token: String,
    token_kind: String,
    issued_at: DateTime<Utc>,
    ttl_seconds: u64,
    identity: CachedIdentity,
}

impl StoredSession {
    pub fn new(lease: &Lease, identity: CachedIdentity) -> Self {
        StoredSession {
            token: BASE64.encode(&lease.token),
            token_kind: lease.token_kind.clone(),
            issued_at: lease.issued_at,
            ttl_seconds: lease.ttl_seconds,
            identity,
        }
    }

    pub fn lease(&self) -> Lease {
        Lease {
            token: String::from_utf8(BASE64.decode(&self.token).unwrap_or_default())
                .unwrap_or_default(),
            token_kind: self.token_kind.clone(),
            issued_at: self.issued_at,
            ttl_seconds: self.ttl_seconds,
        }
    }

    pub fn identity(&self) -> CachedIdentity {
        self.identity.clone()
    }
}

/// File-backed key-value store for the session record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Store under the platform config directory.
    pub fn open() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?
            .join("agora-chat");

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)?;
        }

        Ok(SessionStore {
            path: config_dir.join("session.json"),
        })
    }

    /// Store at an explicit path; used by tests to point at a temp dir.
    pub fn at(path: PathBuf) -> Self {
        SessionStore { path }
    }

    pub fn save(&self, lease: &Lease, identity: &CachedIdentity) -> Result<()> {
        let record = StoredSession::new(lease, identity.clone());
        let file = File::create(&self.path)?;
        serde_json::to_writer_pretty(file, &record)?;

        info!("Session saved for {}", identity.user_id);
        Ok(())
    }

    /// Replace the lease of an already-saved session, keeping the identity.
    /// A no-op when nothing is stored yet.
    pub fn update_lease(&self, lease: &Lease) -> Result<()> {
        if let Some(stored) = self.load()? {
            self.save(lease, &stored.identity())?;
        }
        Ok(())
    }

    pub fn load(&self) -> Result<Option<StoredSession>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&self.path)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let stored: StoredSession = serde_json::from_str(&contents)?;
        info!(
            "Loaded session for {} from {}",
            stored.identity.user_id,
            self.path.display()
        );

        Ok(Some(stored))
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}
