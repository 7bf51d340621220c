//! Room access grants.
//!
//! A grant is the existence of a record under `room_access/<roomId>/<userId>`;
//! revoking deletes it. Both operations are idempotent and both announce an
//! effective change through the activity log and the controller notification
//! queue. The owner needs no grants and can never lose access.

use std::sync::Arc;

use tracing::{info, warn};

use latch_activity::ActivityLog;
use latch_notify::NotificationBridge;
use latch_storage::{
    room_grant, AccessGrant, AccessLevel, Capability, GrantStatus, RealtimeStore, RoomId,
    StoreError, UserId,
};

use crate::permissions::parse_profile;
use crate::{AccessError, Requirement, Session, CONSOLE_DEVICE_INFO};

/// Grants and revokes per-room access, gated on the `manageAccess`
/// capability.
pub struct AccessRegistry {
    store: Arc<dyn RealtimeStore>,
    activity: Arc<ActivityLog>,
    notify: Arc<NotificationBridge>,
}

impl AccessRegistry {
    pub fn new(
        store: Arc<dyn RealtimeStore>,
        activity: Arc<ActivityLog>,
        notify: Arc<NotificationBridge>,
    ) -> Self {
        Self {
            store,
            activity,
            notify,
        }
    }

    /// Grant a user access to a room.
    ///
    /// Granting an already-active grant is a no-op success and emits
    /// nothing. On an effective change the grant record is written first;
    /// the activity and notification emissions that follow are best-effort
    /// and never fail the grant.
    pub async fn grant(
        &self,
        user_id: &UserId,
        user_name: &str,
        room_id: &RoomId,
        room_name: &str,
        session: &Session,
    ) -> Result<(), AccessError> {
        let acting = session
            .authorize(Requirement::Capability(Capability::ManageAccess))
            .await?;

        if let Some(existing) = self.lookup_grant(room_id, user_id).await? {
            if existing.is_active() {
                return Ok(());
            }
        }

        let grant = AccessGrant {
            room_id: room_id.clone(),
            user_id: user_id.clone(),
            user_name: user_name.to_string(),
            granted_at: self.store.now_millis(),
            access_level: AccessLevel::Full,
            status: GrantStatus::Active,
        };
        self.store
            .write(
                &room_grant(room_id, user_id),
                serde_json::to_value(&grant).map_err(StoreError::from)?,
            )
            .await
            .map_err(AccessError::from)?;
        info!(actor = %acting.id, user = %user_id, room = %room_id, "granted room access");

        self.emit(user_id, user_name, &format!("access granted: {room_name}"))
            .await;
        Ok(())
    }

    /// Revoke a user's access to a room.
    ///
    /// The owner's access is never revocable. Revoking a grant that does not
    /// exist is a no-op success and emits nothing.
    pub async fn revoke(
        &self,
        user_id: &UserId,
        user_name: &str,
        room_id: &RoomId,
        room_name: &str,
        session: &Session,
    ) -> Result<(), AccessError> {
        let acting = session
            .authorize(Requirement::Capability(Capability::ManageAccess))
            .await?;

        if self.is_owner(user_id).await? {
            return Err(AccessError::Forbidden(
                "the owner's access cannot be revoked".to_string(),
            ));
        }

        if self.lookup_grant(room_id, user_id).await?.is_none() {
            return Ok(());
        }

        self.store
            .delete(&room_grant(room_id, user_id))
            .await
            .map_err(AccessError::from)?;
        info!(actor = %acting.id, user = %user_id, room = %room_id, "revoked room access");

        self.emit(user_id, user_name, &format!("access revoked: {room_name}"))
            .await;
        Ok(())
    }

    /// Whether a user may enter a room right now.
    ///
    /// The owner always may; everyone else needs an active grant record.
    pub async fn has_access(&self, user_id: &UserId, room_id: &RoomId) -> Result<bool, StoreError> {
        if self.is_owner(user_id).await? {
            return Ok(true);
        }
        Ok(self
            .lookup_grant(room_id, user_id)
            .await?
            .is_some_and(|grant| grant.is_active()))
    }

    async fn lookup_grant(
        &self,
        room_id: &RoomId,
        user_id: &UserId,
    ) -> Result<Option<AccessGrant>, StoreError> {
        let Some(raw) = self.store.get(&room_grant(room_id, user_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_value::<AccessGrant>(raw) {
            Ok(grant) => Ok(Some(grant)),
            Err(error) => {
                warn!(?error, room = %room_id, user = %user_id, "skipping malformed grant record");
                Ok(None)
            }
        }
    }

    async fn is_owner(&self, user_id: &UserId) -> Result<bool, StoreError> {
        let Some(raw) = self.store.get(&latch_storage::user(user_id)).await? else {
            return Ok(false);
        };
        Ok(parse_profile(user_id, &raw).is_some_and(|profile| profile.is_owner()))
    }

    async fn emit(&self, user_id: &UserId, user_name: &str, action: &str) {
        if let Err(error) = self
            .activity
            .record(user_id, user_name, action, CONSOLE_DEVICE_INFO)
            .await
        {
            warn!(?error, user = %user_id, action, "failed to record access activity");
        }
        if let Err(error) = self.notify.notify(user_id, user_name, action).await {
            warn!(?error, user = %user_id, action, "failed to notify controller");
        }
    }
}
