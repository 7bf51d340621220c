//! End-to-end console scenarios over the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;

use latch_access::AccessError;
use latch_storage::{
    Capability, DoorId, PermissionSet, PermissionUpdate, Role, RoomId, SessionId, UserId,
};
use latch_store_memory::MemoryStore;

use super::*;

const OWNER_EMAIL: &str = "a@gmail.com";

fn console() -> (Console, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (Console::new(store.clone(), ConsoleConfig::default()), store)
}

async fn sign_in_owner(console: &Console) -> (SessionId, UserProfile) {
    let session_id = SessionId::from("owner-session");
    let profile = console
        .sign_in(&session_id, &UserId::from("owner-uid"), OWNER_EMAIL, "Chủ sở hữu")
        .await
        .unwrap();
    (session_id, profile)
}

async fn sign_in_bob(console: &Console) -> (SessionId, UserProfile) {
    let session_id = SessionId::from("bob-session");
    let profile = console
        .register(&session_id, &UserId::from("u-bob"), "bob@x.com", "Bob")
        .await
        .unwrap();
    (session_id, profile)
}

#[tokio::test]
async fn test_owner_email_signs_in_as_owner() {
    let (console, _store) = console();

    let (_, profile) = sign_in_owner(&console).await;

    assert_eq!(profile.role, Role::Owner);
    assert_eq!(profile.effective_capabilities(), PermissionSet::full());
}

#[tokio::test]
async fn test_new_user_registers_with_defaults() {
    let (console, _store) = console();

    let (_, profile) = sign_in_bob(&console).await;

    assert_eq!(profile.role, Role::User);
    assert_eq!(profile.permissions, PermissionSet::new_user());
}

#[tokio::test]
async fn test_sign_in_records_activity_and_notification() {
    let (console, store) = console();

    sign_in_bob(&console).await;

    let activities = store
        .query_tail("recent_activities/u-bob", "timestamp", 10)
        .await
        .unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].1["action"], "registered");

    let notifications = store
        .query_tail("esp32_notifications", "timestamp", 10)
        .await
        .unwrap();
    assert_eq!(notifications.len(), 1);
    assert_eq!(notifications[0].1["userName"], "Bob");
}

#[tokio::test]
async fn test_sign_out_ends_session_and_records() {
    let (console, store) = console();
    let (session_id, _) = sign_in_bob(&console).await;

    let profile = console.sign_out(&session_id).await.expect("was signed in");
    assert_eq!(profile.email, "bob@x.com");

    let result = console
        .users(&session_id)
        .await;
    assert!(matches!(result, Err(AccessError::Unauthenticated)));

    let activities = store
        .query_tail("recent_activities/u-bob", "timestamp", 10)
        .await
        .unwrap();
    let actions: Vec<&str> = activities
        .iter()
        .map(|(_, v)| v["action"].as_str().unwrap())
        .collect();
    assert_eq!(actions, vec!["registered", "signed out"]);
}

#[tokio::test]
async fn test_owner_grants_and_revokes_room_access() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;
    let (bob_session, bob) = sign_in_bob(&console).await;
    let room = RoomId::from("room1");

    console
        .grant_room_access(&owner_session, &bob.id, &bob.name, &room)
        .await
        .unwrap();
    assert!(console
        .has_room_access(&bob_session, &bob.id, &room)
        .await
        .unwrap());

    console
        .revoke_room_access(&owner_session, &bob.id, &bob.name, &room)
        .await
        .unwrap();
    assert!(!console
        .has_room_access(&bob_session, &bob.id, &room)
        .await
        .unwrap());
}

#[tokio::test]
async fn test_grant_uses_room_catalog_name() {
    let (console, store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;
    let (_, bob) = sign_in_bob(&console).await;

    console
        .grant_room_access(&owner_session, &bob.id, &bob.name, &RoomId::from("room3"))
        .await
        .unwrap();

    let activities = store
        .query_tail("recent_activities/u-bob", "timestamp", 10)
        .await
        .unwrap();
    let latest = &activities.last().unwrap().1;
    assert_eq!(latest["action"], "access granted: Phòng giám đốc");
}

#[tokio::test]
async fn test_plain_user_cannot_grant() {
    let (console, _store) = console();
    let (bob_session, bob) = sign_in_bob(&console).await;

    let result = console
        .grant_room_access(&bob_session, &bob.id, &bob.name, &RoomId::from("room1"))
        .await;
    assert!(matches!(result, Err(AccessError::Forbidden(_))));
}

#[tokio::test]
async fn test_owner_has_access_without_grants() {
    let (console, _store) = console();
    let (owner_session, owner) = sign_in_owner(&console).await;

    assert!(console
        .has_room_access(&owner_session, &owner.id, &RoomId::from("room4"))
        .await
        .unwrap());
}

#[tokio::test]
async fn test_permission_change_takes_effect_in_session() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;
    let (bob_session, bob) = sign_in_bob(&console).await;

    // Bob cannot see the controller queue yet
    let denied = console.notifications(&bob_session, 10).await;
    assert!(matches!(denied, Err(AccessError::Forbidden(_))));

    console
        .set_user_permissions(
            &owner_session,
            &bob.id,
            &PermissionUpdate::single(Capability::ManageDoors, true),
        )
        .await
        .unwrap();

    // The stored map changed; a fresh sign-in of the same account sees it
    let session_id = SessionId::from("bob-second");
    let profile = console
        .sign_in(&session_id, &bob.id, "bob@x.com", "Bob")
        .await
        .unwrap();
    assert!(profile.can(Capability::ManageDoors));
    console.notifications(&session_id, 10).await.unwrap();
}

#[tokio::test]
async fn test_self_permission_change_syncs_live_session() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;

    // Promote Bob to user manager first
    let (bob_session, bob) = sign_in_bob(&console).await;
    console
        .set_user_permissions(
            &owner_session,
            &bob.id,
            &PermissionUpdate::single(Capability::ManageUsers, true),
        )
        .await
        .unwrap();
    let bob_session_2 = SessionId::from("bob-manager");
    console
        .sign_in(&bob_session_2, &bob.id, "bob@x.com", "Bob")
        .await
        .unwrap();

    // Bob grants himself manageDoors; his live session picks it up without
    // a fresh sign-in
    console
        .set_user_permissions(
            &bob_session_2,
            &bob.id,
            &PermissionUpdate::single(Capability::ManageDoors, true),
        )
        .await
        .unwrap();
    console.notifications(&bob_session_2, 10).await.unwrap();

    // the original session object was not the acting one and is untouched
    let stale = console.notifications(&bob_session, 10).await;
    assert!(matches!(stale, Err(AccessError::Forbidden(_))));
}

#[tokio::test]
async fn test_owner_permissions_cannot_be_changed() {
    let (console, _store) = console();
    let (owner_session, owner) = sign_in_owner(&console).await;

    let result = console
        .set_user_permissions(
            &owner_session,
            &owner.id,
            &PermissionUpdate::single(Capability::ViewLogs, false),
        )
        .await;
    assert!(matches!(result, Err(AccessError::Forbidden(_))));
}

#[tokio::test]
async fn test_invited_email_seeds_registration() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;

    let mut permissions = PermissionSet::new_user();
    permissions.set(Capability::ManageAccess, true);
    console
        .authorize_email(&owner_session, "carol@x.com", Some(permissions))
        .await
        .unwrap();

    let carol_session = SessionId::from("carol-session");
    let carol = console
        .register(&carol_session, &UserId::from("u-carol"), "carol@x.com", "Carol")
        .await
        .unwrap();

    assert!(carol.can(Capability::ManageAccess));

    // and the invite shows as consumed
    let invites = console.authorized_emails(&owner_session).await.unwrap();
    let entry = invites
        .iter()
        .find(|invite| invite.email == "carol@x.com")
        .expect("invite entry");
    assert!(!entry.is_pending());
}

#[tokio::test]
async fn test_invite_management_requires_manage_users() {
    let (console, _store) = console();
    let (bob_session, _) = sign_in_bob(&console).await;

    let result = console
        .authorize_email(&bob_session, "dave@x.com", None)
        .await;
    assert!(matches!(result, Err(AccessError::Forbidden(_))));
}

#[tokio::test]
async fn test_user_listing_requires_admin_role() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;
    let (bob_session, _) = sign_in_bob(&console).await;

    let users = console.users(&owner_session).await.unwrap();
    assert_eq!(users.len(), 2);

    let result = console.users(&bob_session).await;
    assert!(matches!(result, Err(AccessError::Forbidden(_))));
}

#[tokio::test]
async fn test_activity_feed_flattens_all_users() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;
    sign_in_bob(&console).await;

    let mut feed = console.activity_feed(&owner_session).await.unwrap();
    let frame = tokio::time::timeout(Duration::from_millis(100), feed.next())
        .await
        .expect("timeout")
        .expect("feed ended");

    // one sign-in record each, newest first
    assert_eq!(frame.len(), 2);
    assert_eq!(frame[0].user_name, "Bob");
    assert_eq!(frame[1].user_name, "Chủ sở hữu");
}

#[tokio::test]
async fn test_user_activity_visible_with_view_logs() {
    let (console, _store) = console();
    let (bob_session, bob) = sign_in_bob(&console).await;

    // viewLogs is a default capability, so Bob can read his own history
    let records = console
        .user_activity(&bob_session, &bob.id, 10)
        .await
        .unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].action, "registered");

    let mut feed = console
        .watch_user_activity(&bob_session, &bob.id, 10)
        .await
        .unwrap();
    let frame = tokio::time::timeout(Duration::from_millis(100), feed.next())
        .await
        .expect("timeout")
        .expect("feed ended");
    assert_eq!(frame.len(), 1);
}

#[tokio::test]
async fn test_door_unlock_with_configured_code() {
    let (console, store) = console();
    let door = DoorId::from("door1");

    let verdict = console
        .door_authenticate(&door, "Main Door", "123456", None)
        .await;

    assert!(verdict.success);
    assert_eq!(verdict.user_id, UserId::from("1"));
    assert_eq!(verdict.user_name, "Chủ sở hữu");

    let events = store
        .query_tail("door_access_logs/door1", "timestamp", 10)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1["success"], serde_json::json!(true));

    let activities = store
        .query_tail("recent_activities/1", "timestamp", 10)
        .await
        .unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0].1["action"], "unlocked Main Door");
}

#[tokio::test]
async fn test_door_rejects_unknown_code_silently() {
    let (console, store) = console();
    let door = DoorId::from("door1");

    let verdict = console
        .door_authenticate(&door, "Main Door", "000000", None)
        .await;

    assert!(!verdict.success);

    let events = store
        .query_tail("door_access_logs/door1", "timestamp", 10)
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].1["success"], serde_json::json!(false));

    // audit only: nothing broadcast
    assert!(store.get("recent_activities").await.unwrap().is_none());
    assert!(store.get("esp32_notifications").await.unwrap().is_none());
}

#[tokio::test]
async fn test_rooms_catalog() {
    let (console, _store) = console();
    let rooms = console.rooms();
    assert_eq!(rooms.len(), 4);
    assert_eq!(rooms[0].id, "room1");
    assert_eq!(rooms[0].name, "Phòng họp chính");
}

#[tokio::test]
async fn test_unauthenticated_session_is_rejected_everywhere() {
    let (console, _store) = console();
    let session_id = SessionId::from("nobody");
    let uid = UserId::from("u1");

    assert!(matches!(
        console
            .grant_room_access(&session_id, &uid, "Bob", &RoomId::from("room1"))
            .await,
        Err(AccessError::Unauthenticated)
    ));
    assert!(matches!(
        console.activity_feed(&session_id).await,
        Err(AccessError::Unauthenticated)
    ));
    assert!(matches!(
        console.notifications(&session_id, 10).await,
        Err(AccessError::Unauthenticated)
    ));
}

#[tokio::test]
async fn test_watch_users_sees_new_registrations() {
    let (console, _store) = console();
    let (owner_session, _) = sign_in_owner(&console).await;

    let mut stream = console.watch_users(&owner_session).await.unwrap();
    let frame = tokio::time::timeout(Duration::from_millis(100), stream.next())
        .await
        .expect("timeout")
        .expect("stream ended");
    assert_eq!(frame.len(), 1);

    sign_in_bob(&console).await;

    // the registration write lands before the sign-in activity ones, so the
    // first new frame already carries Bob
    let frame = tokio::time::timeout(Duration::from_millis(100), stream.next())
        .await
        .expect("timeout")
        .expect("stream ended");
    assert_eq!(frame.len(), 2);
}
