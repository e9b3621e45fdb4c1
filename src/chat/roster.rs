// Contact roster management for Agora
// Ordering rules: a deep-linked target sits first, everything else keeps the
// directory's order. Selecting never reorders.

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};

use super::{ChatClient, DEFAULT_PAGE_SIZE};
use crate::models::Contact;

/// The ordered contact list plus the active selection.
#[derive(Debug, Default)]
pub struct Roster {
    contacts: Vec<Contact>,
    selected: Option<String>,
    load_generation: u64,
}

impl Roster {
    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn selected(&self) -> Option<&Contact> {
        let user_id = self.selected.as_deref()?;
        self.contacts.iter().find(|c| c.user_id == user_id)
    }

    /// At most one contact per user id; the first occurrence wins.
    fn dedupe(contacts: Vec<Contact>) -> Vec<Contact> {
        let mut seen = std::collections::HashSet::new();
        contacts
            .into_iter()
            .filter(|c| seen.insert(c.user_id.clone()))
            .collect()
    }

    fn begin_load(&mut self) -> u64 {
        self.load_generation += 1;
        self.load_generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.load_generation == generation
    }

    fn commit(&mut self, contacts: Vec<Contact>, selected: Option<String>) {
        self.contacts = contacts;
        self.selected = selected;
    }

    /// Pure selection change. The active conversation is read by definition,
    /// so the unread badge is cleared; order is untouched.
    pub fn select(&mut self, user_id: &str) -> Option<Contact> {
        let contact = self.contacts.iter_mut().find(|c| c.user_id == user_id)?;
        contact.unread_count = 0;
        self.selected = Some(user_id.to_string());
        Some(contact.clone())
    }

    /// Refresh the preview fields after an outgoing message. Unknown user
    /// ids are ignored, the roster may simply not have that contact yet.
    pub fn record_outgoing(&mut self, user_id: &str, preview: &str, at: DateTime<Utc>) {
        match self.contacts.iter_mut().find(|c| c.user_id == user_id) {
            Some(contact) => {
                contact.last_message_preview = Some(preview.to_string());
                contact.last_message_at = Some(at);
            }
            None => debug!("Ignoring preview update for unknown contact {}", user_id),
        }
    }
}

impl ChatClient {
    /// Fetch the contact list and commit it, resolving a deep-linked target
    /// first: already present, it moves to the front; absent, a zero-history
    /// contact is synthesized from a profile lookup and prepended. Either
    /// way the target becomes the selection; with no deep link the first
    /// contact does. Concurrent loads are last-started-wins, a stale result
    /// is ignored, never cancelled.
    pub async fn load_roster(&self, deep_link: Option<&str>) -> Result<Vec<Contact>> {
        let generation = self.roster.lock().await.begin_load();

        self.ensure_session().await?;
        let fetched = self.directory.fetch_contacts().await?;
        self.session.on_call_succeeded().await;
        info!("Fetched {} contacts from directory", fetched.len());

        let mut contacts = Roster::dedupe(fetched);
        let mut selected = None;

        if let Some(target) = deep_link {
            if let Some(position) = contacts.iter().position(|c| c.user_id == target) {
                let contact = contacts.remove(position);
                contacts.insert(0, contact);
            } else {
                info!("Deep-linked contact {} not in roster, fetching profile", target);
                self.ensure_session().await?;
                let profile = self.directory.fetch_profile(target).await?;
                self.session.on_call_succeeded().await;
                contacts.insert(0, profile.into_contact());
            }
            selected = Some(target.to_string());
        } else if let Some(first) = contacts.first() {
            selected = Some(first.user_id.clone());
        }

        {
            let mut roster = self.roster.lock().await;
            if !roster.is_current(generation) {
                debug!("Discarding stale roster load (generation {})", generation);
                return Ok(roster.contacts().to_vec());
            }
            roster.commit(contacts.clone(), selected.clone());
        }

        // Make the selected conversation live.
        if let Some(user_id) = &selected {
            self.load_history(user_id, 1, DEFAULT_PAGE_SIZE).await?;
        }

        Ok(contacts)
    }

    /// Switch the active conversation. Loading that conversation's history
    /// is the visible side effect; the roster order never changes.
    pub async fn select_contact(&self, user_id: &str) -> Result<Contact> {
        let contact = self
            .roster
            .lock()
            .await
            .select(user_id)
            .ok_or_else(|| anyhow!("no contact {} in roster", user_id))?;

        self.load_history(user_id, 1, DEFAULT_PAGE_SIZE).await?;
        Ok(contact)
    }

    pub async fn record_outgoing(&self, user_id: &str, preview: &str, at: DateTime<Utc>) {
        self.roster.lock().await.record_outgoing(user_id, preview, at);
    }
}
