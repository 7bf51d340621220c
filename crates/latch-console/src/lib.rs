//! The assembled door-lock console.
//!
//! [`Console`] wires the services together over one shared store and exposes
//! the operations the web frontend calls, each behind the authorization gate
//! the action demands. The one ungated entry point is
//! [`Console::door_authenticate`], which the physical door units call.

use std::sync::Arc;

use tracing::warn;

use latch_access::{
    AccessError, AccessRegistry, AuthorizedEmails, PermissionDirectory, Requirement, Session,
    SessionManager, UserDirectoryStream, CONSOLE_DEVICE_INFO,
};
use latch_activity::{ActivityFeed, ActivityLog, ActivityRecord};
use latch_config::{ConsoleConfig, RoomEntry};
use latch_door::{ClaimedIdentity, DoorAuthService, DoorVerdict};
use latch_notify::{NotificationBridge, NotificationRecord};
use latch_storage::{
    AuthorizedEmail, Capability, DoorId, PermissionSet, PermissionUpdate, RealtimeStore, Role,
    RoomId, SessionId, UserId, UserProfile,
};

/// Number of records the admin activity feed shows.
pub const FEED_LIMIT: usize = 50;

/// One console installation: shared store, configuration, and every service
/// the frontend and the door units talk to.
pub struct Console {
    config: ConsoleConfig,
    sessions: SessionManager,
    directory: Arc<PermissionDirectory>,
    invites: AuthorizedEmails,
    registry: AccessRegistry,
    activity: Arc<ActivityLog>,
    notify: Arc<NotificationBridge>,
    doors: DoorAuthService,
}

impl Console {
    pub fn new(store: Arc<dyn RealtimeStore>, config: ConsoleConfig) -> Self {
        let directory = Arc::new(PermissionDirectory::new(
            store.clone(),
            config.owner_email.clone(),
        ));
        let activity = Arc::new(ActivityLog::new(store.clone()));
        let notify = Arc::new(NotificationBridge::new(store.clone()));
        let credentials = config
            .door_credentials
            .iter()
            .map(|(code, entry)| {
                (
                    code.clone(),
                    ClaimedIdentity {
                        user_id: UserId::from(entry.user_id.as_str()),
                        user_name: entry.user_name.clone(),
                    },
                )
            })
            .collect();
        Self {
            sessions: SessionManager::new(directory.clone()),
            invites: AuthorizedEmails::new(store.clone()),
            registry: AccessRegistry::new(store.clone(), activity.clone(), notify.clone()),
            doors: DoorAuthService::new(store, activity.clone(), notify.clone(), credentials),
            directory,
            activity,
            notify,
            config,
        }
    }

    /// The session object for an id, creating it unauthenticated if new.
    pub fn session(&self, session_id: &SessionId) -> Session {
        self.sessions.session(session_id)
    }

    /// The managed room catalog.
    pub fn rooms(&self) -> &[RoomEntry] {
        &self.config.rooms
    }

    // --- session lifecycle ---

    /// Sign an externally authenticated user into a session.
    pub async fn sign_in(
        &self,
        session_id: &SessionId,
        external_user_id: &UserId,
        email: &str,
        display_name: &str,
    ) -> Result<UserProfile, AccessError> {
        let profile = self
            .sessions
            .start(session_id, external_user_id, email, display_name)
            .await?;
        self.emit(&profile.id, &profile.name, "signed in").await;
        Ok(profile)
    }

    /// First sign-in of a brand-new account. Identical to [`Console::sign_in`]
    /// apart from the recorded action; the profile creation itself (invite
    /// seeding included) happens during identity resolution either way.
    pub async fn register(
        &self,
        session_id: &SessionId,
        external_user_id: &UserId,
        email: &str,
        display_name: &str,
    ) -> Result<UserProfile, AccessError> {
        let profile = self
            .sessions
            .start(session_id, external_user_id, email, display_name)
            .await?;
        self.emit(&profile.id, &profile.name, "registered").await;
        Ok(profile)
    }

    /// End a session. Recording the sign-out is best-effort.
    pub async fn sign_out(&self, session_id: &SessionId) -> Option<UserProfile> {
        let profile = self.sessions.end(session_id).await?;
        if let Err(error) = self
            .activity
            .record(&profile.id, &profile.name, "signed out", CONSOLE_DEVICE_INFO)
            .await
        {
            warn!(?error, user = %profile.id, "failed to record sign-out");
        }
        Some(profile)
    }

    // --- room access (manageAccess) ---

    pub async fn grant_room_access(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        user_name: &str,
        room_id: &RoomId,
    ) -> Result<(), AccessError> {
        let session = self.session(session_id);
        self.registry
            .grant(user_id, user_name, room_id, &self.room_name(room_id), &session)
            .await
    }

    pub async fn revoke_room_access(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        user_name: &str,
        room_id: &RoomId,
    ) -> Result<(), AccessError> {
        let session = self.session(session_id);
        self.registry
            .revoke(user_id, user_name, room_id, &self.room_name(room_id), &session)
            .await
    }

    /// Whether a user may enter a room. Any authenticated session may ask.
    pub async fn has_room_access(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        room_id: &RoomId,
    ) -> Result<bool, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Role(Role::User))
            .await?;
        Ok(self.registry.has_access(user_id, room_id).await?)
    }

    // --- user administration (manageUsers / admin) ---

    pub async fn set_user_permissions(
        &self,
        session_id: &SessionId,
        target: &UserId,
        update: &PermissionUpdate,
    ) -> Result<(), AccessError> {
        let session = self.session(session_id);
        session
            .authorize(Requirement::Capability(Capability::ManageUsers))
            .await?;
        self.directory.set_permissions(target, update, &session).await
    }

    pub async fn users(&self, session_id: &SessionId) -> Result<Vec<UserProfile>, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Role(Role::Admin))
            .await?;
        Ok(self.directory.list_users().await?)
    }

    pub async fn watch_users(
        &self,
        session_id: &SessionId,
    ) -> Result<UserDirectoryStream, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Role(Role::Admin))
            .await?;
        Ok(self.directory.subscribe_users().await?)
    }

    // --- pre-registration invites (manageUsers) ---

    pub async fn authorize_email(
        &self,
        session_id: &SessionId,
        email: &str,
        permissions: Option<PermissionSet>,
    ) -> Result<AuthorizedEmail, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ManageUsers))
            .await?;
        Ok(self.invites.add(email, permissions).await?)
    }

    pub async fn revoke_email(
        &self,
        session_id: &SessionId,
        email: &str,
    ) -> Result<(), AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ManageUsers))
            .await?;
        Ok(self.invites.remove(email).await?)
    }

    pub async fn authorized_emails(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<AuthorizedEmail>, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ManageUsers))
            .await?;
        Ok(self.invites.list().await?)
    }

    pub async fn set_email_capability(
        &self,
        session_id: &SessionId,
        email: &str,
        capability: Capability,
        enabled: bool,
    ) -> Result<(), AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ManageUsers))
            .await?;
        Ok(self.invites.set_capability(email, capability, enabled).await?)
    }

    // --- activity (viewLogs) ---

    /// The admin dashboard feed: every user's recent activity, flattened.
    pub async fn activity_feed(&self, session_id: &SessionId) -> Result<ActivityFeed, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ViewLogs))
            .await?;
        Ok(self.activity.subscribe_all(FEED_LIMIT).await?)
    }

    pub async fn user_activity(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        limit: usize,
    ) -> Result<Vec<ActivityRecord>, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ViewLogs))
            .await?;
        Ok(self.activity.recent(user_id, limit).await?)
    }

    pub async fn watch_user_activity(
        &self,
        session_id: &SessionId,
        user_id: &UserId,
        limit: usize,
    ) -> Result<ActivityFeed, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ViewLogs))
            .await?;
        Ok(self.activity.subscribe(user_id, limit).await?)
    }

    // --- controller queue (manageDoors) ---

    pub async fn notifications(
        &self,
        session_id: &SessionId,
        limit: usize,
    ) -> Result<Vec<NotificationRecord>, AccessError> {
        self.session(session_id)
            .authorize(Requirement::Capability(Capability::ManageDoors))
            .await?;
        Ok(self.notify.recent(limit).await?)
    }

    // --- hardware path (ungated) ---

    /// Entry-code authentication from a door unit. No session, no gate; the
    /// verdict object is the whole answer.
    pub async fn door_authenticate(
        &self,
        door_id: &DoorId,
        door_name: &str,
        presented_credential: &str,
        claimed: Option<ClaimedIdentity>,
    ) -> DoorVerdict {
        self.doors
            .authenticate(door_id, door_name, presented_credential, claimed)
            .await
    }

    fn room_name(&self, room_id: &RoomId) -> String {
        self.config
            .room_name(room_id.as_str())
            .unwrap_or(room_id.as_str())
            .to_string()
    }

    async fn emit(&self, user_id: &UserId, user_name: &str, action: &str) {
        if let Err(error) = self
            .activity
            .record(user_id, user_name, action, CONSOLE_DEVICE_INFO)
            .await
        {
            warn!(?error, user = %user_id, action, "failed to record session activity");
        }
        if let Err(error) = self.notify.notify(user_id, user_name, action).await {
            warn!(?error, user = %user_id, action, "failed to notify controller");
        }
    }
}

#[cfg(test)]
mod tests;
