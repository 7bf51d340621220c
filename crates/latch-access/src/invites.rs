//! Pre-registration invites.
//!
//! An owner or user manager can authorize an email address before its holder
//! ever signs in, optionally with a prepared permission map. When that person
//! registers, [`crate::PermissionDirectory`] seeds their profile from the
//! entry and flips it to `registered`.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use latch_storage::{
    authorized_email, authorized_email_permission, authorized_email_status, AuthorizedEmail,
    Capability, InviteStatus, PermissionSet, RealtimeStore, StoreError, AUTHORIZED_EMAILS,
};

/// Manages the invite collection, keyed by escaped email.
pub struct AuthorizedEmails {
    store: Arc<dyn RealtimeStore>,
}

impl AuthorizedEmails {
    pub fn new(store: Arc<dyn RealtimeStore>) -> Self {
        Self { store }
    }

    /// Create or replace a pending entry for an email.
    ///
    /// Without an explicit permission map the invitee gets the same defaults
    /// a walk-in registration would.
    pub async fn add(
        &self,
        email: &str,
        permissions: Option<PermissionSet>,
    ) -> Result<AuthorizedEmail, StoreError> {
        let entry = AuthorizedEmail {
            email: email.to_string(),
            permissions: permissions.unwrap_or_else(PermissionSet::new_user),
            invited_at: Utc::now(),
            status: InviteStatus::Pending,
        };
        self.store
            .write(&authorized_email(email), serde_json::to_value(&entry)?)
            .await?;
        info!(email, "authorized email for registration");
        Ok(entry)
    }

    pub async fn remove(&self, email: &str) -> Result<(), StoreError> {
        self.store.delete(&authorized_email(email)).await
    }

    pub async fn lookup(&self, email: &str) -> Result<Option<AuthorizedEmail>, StoreError> {
        let Some(raw) = self.store.get(&authorized_email(email)).await? else {
            return Ok(None);
        };
        Ok(parse_entry(email, &raw))
    }

    pub async fn list(&self) -> Result<Vec<AuthorizedEmail>, StoreError> {
        let Some(Value::Object(entries)) = self.store.get(AUTHORIZED_EMAILS).await? else {
            return Ok(Vec::new());
        };
        Ok(entries
            .iter()
            .filter_map(|(key, raw)| parse_entry(key, raw))
            .collect())
    }

    /// Flip one capability on a pending entry. The write is a field-level
    /// leaf write, so other flags and concurrent edits are untouched.
    pub async fn set_capability(
        &self,
        email: &str,
        capability: Capability,
        enabled: bool,
    ) -> Result<(), StoreError> {
        self.store
            .write(
                &authorized_email_permission(email, capability),
                Value::Bool(enabled),
            )
            .await
    }

    /// Mark an entry consumed by a completed registration.
    pub async fn mark_registered(&self, email: &str) -> Result<(), StoreError> {
        self.store
            .write(
                &authorized_email_status(email),
                serde_json::to_value(InviteStatus::Registered)?,
            )
            .await
    }
}

fn parse_entry(key: &str, raw: &Value) -> Option<AuthorizedEmail> {
    match serde_json::from_value::<AuthorizedEmail>(raw.clone()) {
        Ok(entry) => Some(entry),
        Err(error) => {
            warn!(?error, key, "skipping malformed authorized-email entry");
            None
        }
    }
}
