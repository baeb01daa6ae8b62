//! Invite acceptance and landing page tests.

use chrono::Utc;
use tally_storage::*;

use super::common::*;
use crate::identity::RequestContext;
use crate::{ErrorKind, MembershipError};

#[tokio::test]
async fn test_accept_invite_creates_membership() {
    let env = create_test_env().await;
    let (owner_id, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 3).await;

    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::ReadOnly).await;
    let (dev_id, dev) = create_test_user(&env, "dev@example.com").await;

    let accepted = env.service.accept_invite(&dev, &token).await.unwrap();
    assert_eq!(accepted.organization_slug, "acme");
    assert_eq!(accepted.organization_name, "acme Inc");
    assert_eq!(accepted.role, MemberRole::ReadOnly);
    assert!(!accepted.already_member);

    let member = env.store.get_member(&org.id, &dev_id).await.unwrap();
    assert!(member.is_active());
    assert_eq!(member.role, MemberRole::ReadOnly);
    assert_eq!(member.invited_by, Some(owner_id));

    // The pending reservation became an active seat.
    let counts = env.store.seat_counts(&org.id, Utc::now()).await.unwrap();
    assert_eq!(counts.active_members, 1);
    assert_eq!(counts.pending_invites, 0);

    let info = env.service.get_invite_info(&token).await.unwrap();
    assert_eq!(info.status, InviteStatus::Accepted);
}

#[tokio::test]
async fn test_accept_invite_twice_fails() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    create_test_org(&env, &owner, "acme", 3).await;

    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::Collaborator).await;
    let (_, dev) = create_test_user(&env, "dev@example.com").await;
    env.service.accept_invite(&dev, &token).await.unwrap();

    let err = env.service.accept_invite(&dev, &token).await.unwrap_err();
    assert!(matches!(
        err,
        MembershipError::InviteNotPending(InviteStatus::Accepted)
    ));
    assert_eq!(
        err.to_string(),
        "This invite is no longer valid (status: accepted)"
    );
}

#[tokio::test]
async fn test_accept_email_match_is_case_insensitive() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    create_test_org(&env, &owner, "acme", 3).await;

    let token = invite(&env, &owner, "acme", "User@Example.com", MemberRole::Collaborator).await;
    let (_, user) = create_test_user(&env, "user@example.com").await;

    env.service.accept_invite(&user, &token).await.unwrap();
}

#[tokio::test]
async fn test_accept_with_wrong_email_is_unauthorized() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 3).await;

    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::Collaborator).await;
    let (intruder_id, intruder) = create_test_user(&env, "intruder@example.com").await;

    let err = env.service.accept_invite(&intruder, &token).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(err.to_string().contains("dev@example.com"), "{err}");

    assert!(matches!(
        env.store.get_member(&org.id, &intruder_id).await,
        Err(StoreError::NotFound)
    ));
    let info = env.service.get_invite_info(&token).await.unwrap();
    assert_eq!(info.status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_accept_requires_session_and_valid_token() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    create_test_org(&env, &owner, "acme", 3).await;
    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::Collaborator).await;
    let (_, dev) = create_test_user(&env, "dev@example.com").await;

    let err = env
        .service
        .accept_invite(&RequestContext::anonymous(), &token)
        .await
        .unwrap_err();
    assert!(matches!(err, MembershipError::Unauthenticated));

    let upper = token.to_uppercase();
    let too_long = format!("{}0", token);
    for bad in ["", "abc", upper.as_str(), too_long.as_str()] {
        let err = env.service.accept_invite(&dev, bad).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput, "{bad}");
    }

    let unknown = crate::token::generate_invite_token();
    let err = env.service.accept_invite(&dev, &unknown).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.to_string(), "Invite not found");
}

#[tokio::test]
async fn test_expired_invite_is_marked_on_read() {
    let env = create_test_env().await;
    let (owner_id, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 3).await;

    let (invite, token) = insert_invite(
        &env,
        &org,
        &owner_id,
        "late@example.com",
        Utc::now() - chrono::Duration::minutes(1),
    )
    .await;
    let (late_id, late) = create_test_user(&env, "late@example.com").await;

    let err = env.service.accept_invite(&late, &token).await.unwrap_err();
    assert!(matches!(err, MembershipError::InviteExpired));

    let stored = env.store.get_invite(&org.id, &invite.id).await.unwrap();
    assert_eq!(stored.status, InviteStatus::Expired);
    assert!(env.store.get_member(&org.id, &late_id).await.is_err());

    let info = env.service.get_invite_info(&token).await.unwrap();
    assert_eq!(info.status, InviteStatus::Expired);

    // Once marked, the stored status is what gets reported.
    let err = env.service.accept_invite(&late, &token).await.unwrap_err();
    assert!(matches!(
        err,
        MembershipError::InviteNotPending(InviteStatus::Expired)
    ));
}

#[tokio::test]
async fn test_get_invite_info_expires_lazily() {
    let env = create_test_env().await;
    let (owner_id, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 3).await;
    let (invite, token) = insert_invite(
        &env,
        &org,
        &owner_id,
        "late@example.com",
        Utc::now() - chrono::Duration::seconds(5),
    )
    .await;

    let info = env.service.get_invite_info(&token).await.unwrap();
    assert_eq!(info.status, InviteStatus::Expired);
    assert_eq!(info.email, "late@example.com");
    assert_eq!(info.organization_slug, "acme");
    assert_eq!(info.inviter_name, "owner@example.com");

    let stored = env.store.get_invite(&org.id, &invite.id).await.unwrap();
    assert_eq!(stored.status, InviteStatus::Expired);
}

#[tokio::test]
async fn test_get_invite_info_needs_no_session() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    create_test_org(&env, &owner, "acme", 3).await;
    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::ReadOnly).await;

    let info = env.service.get_invite_info(&token).await.unwrap();
    assert_eq!(info.organization_name, "acme Inc");
    assert_eq!(info.role, MemberRole::ReadOnly);
    assert_eq!(info.status, InviteStatus::Pending);

    let err = env
        .service
        .get_invite_info(&crate::token::generate_invite_token())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_removed_member_is_reactivated_by_new_invite() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 1).await;

    let (dev_id, dev) =
        add_member(&env, &owner, "acme", "dev@example.com", MemberRole::Collaborator).await;
    env.service
        .remove_member(&owner, "acme", &dev_id.0.to_string())
        .await
        .unwrap();
    assert_eq!(reserved(&env, &org).await, 0);

    let token = invite(&env, &owner, "acme", "dev@example.com", MemberRole::ReadOnly).await;
    let accepted = env.service.accept_invite(&dev, &token).await.unwrap();
    assert!(!accepted.already_member);
    assert_eq!(accepted.role, MemberRole::ReadOnly);

    let member = env.store.get_member(&org.id, &dev_id).await.unwrap();
    assert!(member.is_active());
    assert_eq!(member.role, MemberRole::ReadOnly);
    assert_eq!(reserved(&env, &org).await, 1);
}

#[tokio::test]
async fn test_accept_as_active_member_consumes_invite_only() {
    let env = create_test_env().await;
    let (owner_id, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 3).await;
    let (dev_id, dev) =
        add_member(&env, &owner, "acme", "dev@example.com", MemberRole::Collaborator).await;

    // The service refuses this invite; write it directly.
    let (invite, token) = insert_invite(
        &env,
        &org,
        &owner_id,
        "dev@example.com",
        Utc::now() + chrono::Duration::hours(1),
    )
    .await;

    let accepted = env.service.accept_invite(&dev, &token).await.unwrap();
    assert!(accepted.already_member);
    assert_eq!(accepted.role, MemberRole::Collaborator);

    let stored = env.store.get_invite(&org.id, &invite.id).await.unwrap();
    assert_eq!(stored.status, InviteStatus::Accepted);
    assert_eq!(stored.accepted_by, Some(dev_id));
    assert_eq!(reserved(&env, &org).await, 1);
}

#[tokio::test]
async fn test_accept_rechecks_seats() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 2).await;

    let token_a = invite(&env, &owner, "acme", "a@example.com", MemberRole::Collaborator).await;
    invite(&env, &owner, "acme", "b@example.com", MemberRole::Collaborator).await;

    // Plan downgraded after the invites went out.
    env.store.set_seat_limit(&org.id, Some(1)).await.unwrap();

    let (a_id, a) = create_test_user(&env, "a@example.com").await;
    let err = env.service.accept_invite(&a, &token_a).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SeatLimitExceeded);
    assert!(err.to_string().contains("2/1 seats"), "{err}");

    assert!(env.store.get_member(&org.id, &a_id).await.is_err());
    let info = env.service.get_invite_info(&token_a).await.unwrap();
    assert_eq!(info.status, InviteStatus::Pending);
}

#[tokio::test]
async fn test_accept_into_last_seat() {
    let env = create_test_env().await;
    let (_, owner) = create_test_user(&env, "owner@example.com").await;
    let org = create_test_org(&env, &owner, "acme", 1).await;

    // The invite holds the only seat; accepting it must not count it twice.
    let token = invite(&env, &owner, "acme", "a@example.com", MemberRole::Collaborator).await;
    let (_, a) = create_test_user(&env, "a@example.com").await;
    env.service.accept_invite(&a, &token).await.unwrap();

    assert_eq!(reserved(&env, &org).await, 1);
}
