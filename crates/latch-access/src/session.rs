//! Session state and the authorization gate.
//!
//! Sign-in is a three-step machine: `Unauthenticated → Authenticating →
//! Authenticated`. While the identity is resolving, gated calls answer
//! `NotReady` so callers wait instead of reading it as a denial. Sign-out
//! (or a failed resolution) drops back to `Unauthenticated`.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::RwLock;
use tracing::{info, warn};

use latch_storage::{Capability, PermissionUpdate, Role, SessionId, UserId, UserProfile};

use crate::{AccessError, PermissionDirectory};

/// What an operation demands of the calling session.
#[derive(Clone, Copy, Debug)]
pub enum Requirement {
    /// Only the owner passes.
    Owner,
    /// At least this role (owner ≥ admin ≥ user).
    Role(Role),
    /// This capability flag. The owner passes without holding it.
    Capability(Capability),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SessionState {
    #[default]
    Unauthenticated,
    Authenticating,
    Authenticated(UserProfile),
}

/// One signed-in console session.
///
/// The cached identity only changes through a fresh sign-in or through the
/// permission-sync side effect of
/// [`PermissionDirectory::set_permissions`].
#[derive(Clone)]
pub struct Session {
    id: SessionId,
    state: Arc<RwLock<SessionState>>,
}

impl Session {
    pub(crate) fn new(id: SessionId) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(SessionState::Unauthenticated)),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub async fn state(&self) -> SessionState {
        self.state.read().await.clone()
    }

    /// The cached identity, if authenticated.
    pub async fn identity(&self) -> Option<UserProfile> {
        match &*self.state.read().await {
            SessionState::Authenticated(profile) => Some(profile.clone()),
            _ => None,
        }
    }

    /// All-or-nothing authorization gate.
    ///
    /// Returns the session identity when the requirement is met, so callers
    /// gate and pick up the acting profile in one step.
    pub async fn authorize(&self, requirement: Requirement) -> Result<UserProfile, AccessError> {
        let state = self.state.read().await;
        let profile = match &*state {
            SessionState::Unauthenticated => return Err(AccessError::Unauthenticated),
            SessionState::Authenticating => return Err(AccessError::NotReady),
            SessionState::Authenticated(profile) => profile,
        };

        if profile.is_owner() {
            return Ok(profile.clone());
        }
        let allowed = match requirement {
            Requirement::Owner => false,
            Requirement::Role(min_role) => profile.role.includes(&min_role),
            Requirement::Capability(capability) => profile.permissions.allows(capability),
        };
        if allowed {
            Ok(profile.clone())
        } else {
            Err(denial(requirement))
        }
    }

    pub(crate) async fn begin_authentication(&self) {
        *self.state.write().await = SessionState::Authenticating;
    }

    pub(crate) async fn complete(&self, profile: UserProfile) {
        *self.state.write().await = SessionState::Authenticated(profile);
    }

    /// Back to `Unauthenticated`, returning the identity that was signed in.
    pub(crate) async fn reset(&self) -> Option<UserProfile> {
        let mut state = self.state.write().await;
        match std::mem::take(&mut *state) {
            SessionState::Authenticated(profile) => Some(profile),
            _ => None,
        }
    }

    /// Apply a permission update to the cached identity if it is the target.
    pub(crate) async fn sync_permissions(&self, target: &UserId, update: &PermissionUpdate) {
        let mut state = self.state.write().await;
        if let SessionState::Authenticated(profile) = &mut *state {
            if &profile.id == target {
                update.apply_to(&mut profile.permissions);
            }
        }
    }
}

fn denial(requirement: Requirement) -> AccessError {
    let needed = match requirement {
        Requirement::Owner => "the owner role".to_string(),
        Requirement::Role(role) => format!("at least the {} role", role.as_str()),
        Requirement::Capability(capability) => format!("the {capability} capability"),
    };
    AccessError::Forbidden(format!("requires {needed}"))
}

/// Tracks every live session and drives the sign-in state machine.
pub struct SessionManager {
    directory: Arc<PermissionDirectory>,
    sessions: DashMap<SessionId, Session>,
}

impl SessionManager {
    pub fn new(directory: Arc<PermissionDirectory>) -> Self {
        Self {
            directory,
            sessions: DashMap::new(),
        }
    }

    /// Get or create the session object for an id.
    pub fn session(&self, session_id: &SessionId) -> Session {
        self.sessions
            .entry(session_id.clone())
            .or_insert_with(|| Session::new(session_id.clone()))
            .clone()
    }

    /// Drive one external sign-in event through the state machine.
    ///
    /// The identity resolves exactly once per start; while it is in flight
    /// the session answers `NotReady`. A failed resolution reverts to
    /// `Unauthenticated` and surfaces the error.
    pub async fn start(
        &self,
        session_id: &SessionId,
        external_user_id: &UserId,
        email: &str,
        display_name: &str,
    ) -> Result<UserProfile, AccessError> {
        let session = self.session(session_id);
        session.begin_authentication().await;

        match self
            .directory
            .resolve_identity(external_user_id, email, display_name)
            .await
        {
            Ok(profile) => {
                session.complete(profile.clone()).await;
                info!(session = %session_id, user = %external_user_id, "session authenticated");
                Ok(profile)
            }
            Err(error) => {
                session.reset().await;
                warn!(?error, session = %session_id, "sign-in failed to resolve identity");
                Err(error.into())
            }
        }
    }

    /// End a session, returning the identity that was signed in.
    pub async fn end(&self, session_id: &SessionId) -> Option<UserProfile> {
        let session = self.sessions.get(session_id).map(|entry| entry.clone());
        match session {
            Some(session) => {
                let profile = session.reset().await;
                if profile.is_some() {
                    info!(session = %session_id, "session ended");
                }
                profile
            }
            None => None,
        }
    }
}
