//! The user profile directory: who each signed-in account is and what it
//! may do.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{info, warn};

use latch_storage::{
    user, user_permission, PermissionSet, PermissionUpdate, RealtimeStore, Role, StoreError,
    UserId, UserProfile, USERS,
};

use crate::{AccessError, AuthorizedEmails, Session};

/// Push snapshot of every stored profile; one frame per directory change.
pub type UserDirectoryStream = Pin<Box<dyn Stream<Item = Vec<UserProfile>> + Send>>;

/// Resolves external sign-ins to console identities and manages their
/// permission maps.
///
/// One email address, fixed by configuration, is the owner. The owner's
/// record is rebuilt from scratch on every resolution and never read back,
/// so nothing stored can lock the owner out.
pub struct PermissionDirectory {
    store: Arc<dyn RealtimeStore>,
    invites: AuthorizedEmails,
    owner_email: String,
}

impl PermissionDirectory {
    pub fn new(store: Arc<dyn RealtimeStore>, owner_email: impl Into<String>) -> Self {
        Self {
            invites: AuthorizedEmails::new(store.clone()),
            store,
            owner_email: owner_email.into(),
        }
    }

    /// Map one external sign-in to a console identity.
    ///
    /// Owner email: write a fresh owner record and return it. Known user:
    /// return the stored profile verbatim. Unknown user: create a profile
    /// with role `user`, seeded from a pending invite when one exists for
    /// the email, else with the default capabilities.
    ///
    /// Two racing first sign-ins of the same account both land in the create
    /// branch; the writes are identical apart from timing and the last one
    /// wins.
    pub async fn resolve_identity(
        &self,
        external_user_id: &UserId,
        email: &str,
        display_name: &str,
    ) -> Result<UserProfile, StoreError> {
        if email == self.owner_email {
            let profile = UserProfile {
                id: external_user_id.clone(),
                name: display_name.to_string(),
                email: email.to_string(),
                role: Role::Owner,
                permissions: PermissionSet::full(),
            };
            self.store
                .write(&user(external_user_id), serde_json::to_value(&profile)?)
                .await?;
            info!(user = %external_user_id, "resolved owner identity");
            return Ok(profile);
        }

        if let Some(raw) = self.store.get(&user(external_user_id)).await? {
            if let Some(profile) = parse_profile(external_user_id, &raw) {
                return Ok(profile);
            }
        }

        // First sign-in. A pending invite for this email supplies the
        // permission map; flipping its status is best-effort.
        let permissions = match self.invites.lookup(email).await? {
            Some(invite) => {
                if let Err(error) = self.invites.mark_registered(email).await {
                    warn!(?error, email, "failed to mark invite registered");
                }
                invite.permissions
            }
            None => PermissionSet::new_user(),
        };

        let profile = UserProfile {
            id: external_user_id.clone(),
            name: display_name.to_string(),
            email: email.to_string(),
            role: Role::User,
            permissions,
        };
        self.store
            .write(&user(external_user_id), serde_json::to_value(&profile)?)
            .await?;
        info!(user = %external_user_id, "created user profile");
        Ok(profile)
    }

    /// Merge a permission update into a user's stored map.
    ///
    /// Only the supplied capabilities are written, as leaf writes, so two
    /// admins editing different flags never clobber each other. The owner's
    /// map is immutable. When the update targets the identity cached in
    /// `session`, the in-session copy is updated too.
    pub async fn set_permissions(
        &self,
        target: &UserId,
        update: &PermissionUpdate,
        session: &Session,
    ) -> Result<(), AccessError> {
        if let Some(profile) = self.get_user(target).await? {
            if profile.is_owner() {
                return Err(AccessError::Forbidden(
                    "the owner's permissions cannot be changed".to_string(),
                ));
            }
        }

        for (capability, enabled) in update.entries() {
            self.store
                .write(&user_permission(target, capability), Value::Bool(enabled))
                .await
                .map_err(AccessError::from)?;
        }
        session.sync_permissions(target, update).await;
        info!(user = %target, "updated permissions");
        Ok(())
    }

    pub async fn get_user(&self, user_id: &UserId) -> Result<Option<UserProfile>, StoreError> {
        let Some(raw) = self.store.get(&user(user_id)).await? else {
            return Ok(None);
        };
        Ok(parse_profile(user_id, &raw))
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, StoreError> {
        let raw = self.store.get(USERS).await?;
        Ok(parse_directory(raw.as_ref()))
    }

    /// Watch the whole profile directory. Emits the full current list on
    /// subscription and after every change.
    pub async fn subscribe_users(&self) -> Result<UserDirectoryStream, StoreError> {
        let watch = self.store.subscribe(USERS).await?;
        Ok(Box::pin(
            watch.map(|event| parse_directory(event.value.as_ref())),
        ))
    }
}

pub(crate) fn parse_profile(user_id: &UserId, raw: &Value) -> Option<UserProfile> {
    match serde_json::from_value::<UserProfile>(raw.clone()) {
        Ok(mut profile) => {
            profile.id = user_id.clone();
            Some(profile)
        }
        Err(error) => {
            warn!(?error, user = %user_id, "skipping malformed user profile");
            None
        }
    }
}

fn parse_directory(raw: Option<&Value>) -> Vec<UserProfile> {
    let Some(Value::Object(entries)) = raw else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|(key, value)| parse_profile(&UserId::from(key.as_str()), value))
        .collect()
}
