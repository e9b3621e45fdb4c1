// Session lease management for Agora
// Every remote call rides on a sliding-expiration credential. The manager
// renews the lease in place once it is old enough, and forces a sign-out the
// moment renewal stops working.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex as TokioMutex};

use crate::services::AuthEndpoint;
use crate::storage::{CachedIdentity, SessionStore};

/// Age a lease must reach before a successful call slides it forward.
pub const SLIDE_RENEWAL_THRESHOLD_SECS: i64 = 24 * 60 * 60;

/// The access credential plus its issuance metadata. `issued_at +
/// ttl_seconds` is the hard expiry.
#[derive(Debug, Clone, PartialEq)]
pub struct Lease {
    pub token: String,
    pub token_kind: String,
    pub issued_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl Lease {
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.ttl_seconds as i64)
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at()
    }

    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now - self.issued_at
    }

    /// Renewable once old enough, as long as it has not hard-expired.
    pub fn needs_slide_renewal_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now).num_seconds() >= SLIDE_RENEWAL_THRESHOLD_SECS && !self.is_expired_at(now)
    }
}

/// Session-level signals for whoever owns the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The lease is gone and could not be renewed; all pending work fails.
    LoggedOut,
}

/// Owns the process-wide lease. Dependents never cache the token beyond one
/// outbound call; they go through `ensure_valid`/`current_token` each time.
#[derive(Clone)]
pub struct LeaseManager {
    lease: Arc<TokioMutex<Option<Lease>>>,
    identity: Arc<TokioMutex<Option<CachedIdentity>>>,
    // Serializes renewals only; calls in flight keep the token they read.
    renewal_gate: Arc<TokioMutex<()>>,
    auth: Arc<dyn AuthEndpoint>,
    store: Arc<SessionStore>,
    event_tx: mpsc::Sender<SessionEvent>,
}

impl LeaseManager {
    /// Restores any persisted session from the store, so a lease survives a
    /// process reload.
    pub fn new(auth: Arc<dyn AuthEndpoint>, store: SessionStore) -> (Self, mpsc::Receiver<SessionEvent>) {
        let (event_tx, event_rx) = mpsc::channel(16);

        let restored = store.load().unwrap_or_else(|e| {
            warn!("Could not read persisted session: {}", e);
            None
        });
        let (lease, identity) = match restored {
            Some(stored) => (Some(stored.lease()), Some(stored.identity())),
            None => (None, None),
        };

        (
            LeaseManager {
                lease: Arc::new(TokioMutex::new(lease)),
                identity: Arc::new(TokioMutex::new(identity)),
                renewal_gate: Arc::new(TokioMutex::new(())),
                auth,
                store: Arc::new(store),
                event_tx,
            },
            event_rx,
        )
    }

    /// Install a freshly issued lease (login or registration) and persist it.
    pub async fn install(&self, lease: Lease, identity: CachedIdentity) -> Result<()> {
        self.store.save(&lease, &identity)?;
        *self.lease.lock().await = Some(lease);
        *self.identity.lock().await = Some(identity);
        Ok(())
    }

    /// Authenticate against the endpoint and install the issued lease.
    pub async fn sign_in(&self, username: &str, password: &str) -> Result<CachedIdentity> {
        let (lease, identity) = self.auth.login(username, password).await?;
        self.install(lease, identity.clone()).await?;
        info!("Signed in as {}", identity.user_id);
        Ok(identity)
    }

    pub async fn sign_up(
        &self,
        username: &str,
        password: &str,
        display_name: &str,
    ) -> Result<CachedIdentity> {
        let (lease, identity) = self.auth.register(username, password, display_name).await?;
        self.install(lease, identity.clone()).await?;
        info!("Registered account {}", identity.user_id);
        Ok(identity)
    }

    pub async fn has_lease(&self) -> bool {
        self.lease.lock().await.is_some()
    }

    /// True when no lease exists or the hard expiry has passed.
    pub async fn is_expired(&self) -> bool {
        match self.lease.lock().await.as_ref() {
            Some(lease) => lease.is_expired_at(Utc::now()),
            None => true,
        }
    }

    pub async fn needs_slide_renewal(&self) -> bool {
        match self.lease.lock().await.as_ref() {
            Some(lease) => lease.needs_slide_renewal_at(Utc::now()),
            None => false,
        }
    }

    pub async fn current_token(&self) -> Option<String> {
        self.lease.lock().await.as_ref().map(|l| l.token.clone())
    }

    pub async fn identity(&self) -> Option<CachedIdentity> {
        self.identity.lock().await.clone()
    }

    /// Gate for every outbound call. No lease means false; an expired lease
    /// gets one renewal attempt and the call proceeds only if it worked.
    pub async fn ensure_valid(&self) -> bool {
        let snapshot = self.lease.lock().await.clone();
        match snapshot {
            None => false,
            Some(lease) if lease.is_expired_at(Utc::now()) => {
                debug!("Lease expired at {}, attempting renewal", lease.expires_at());
                self.renew().await
            }
            Some(_) => true,
        }
    }

    /// Exchange the current token for a fresh lease. At most one renewal runs
    /// at a time; a failure is terminal for the current lease, it is cleared
    /// and LoggedOut is signalled, never retried automatically.
    pub async fn renew(&self) -> bool {
        let Some(token_before) = self.current_token().await else {
            return false;
        };

        let _gate = self.renewal_gate.lock().await;

        // Someone else may have renewed while we waited on the gate.
        let token = {
            let lease = self.lease.lock().await;
            match lease.as_ref() {
                None => return false,
                Some(l) if l.token != token_before => {
                    debug!("Lease already replaced by a concurrent renewal");
                    return !l.is_expired_at(Utc::now());
                }
                Some(l) => l.token.clone(),
            }
        };

        match self.auth.renew(&token).await {
            Ok(fresh) => {
                info!("Session lease renewed, valid until {}", fresh.expires_at());
                if let Err(e) = self.store.update_lease(&fresh) {
                    warn!("Failed to persist renewed lease: {}", e);
                }
                *self.lease.lock().await = Some(fresh);
                true
            }
            Err(e) => {
                error!("Session lease renewal failed, signing out: {:#}", e);
                self.clear().await;
                let _ = self.event_tx.send(SessionEvent::LoggedOut).await;
                false
            }
        }
    }

    /// Invoked after every successful remote call. Old-enough leases slide
    /// forward in the background; a failure there must not fail the call
    /// that triggered it.
    pub async fn on_call_succeeded(&self) {
        if self.needs_slide_renewal().await {
            let manager = self.clone();
            tokio::spawn(async move {
                if !manager.renew().await {
                    warn!("Background slide renewal failed");
                }
            });
        }
    }

    /// Wipe the lease and the cached identity, in memory and on disk.
    pub async fn clear(&self) {
        *self.lease.lock().await = None;
        *self.identity.lock().await = None;
        if let Err(e) = self.store.clear() {
            warn!("Failed to clear persisted session: {}", e);
        }
    }
}
