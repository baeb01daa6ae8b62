//! Common test helpers for membership service tests.
//!
//! This module provides shared test infrastructure including:
//! - Service creation over in-memory or file-backed SQLite
//! - User (profile + session) and organization creation helpers
//! - A recording mailer and a fixed identity resolver

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tally_storage::*;
use tally_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::email::{EmailError, InviteEmail, InviteMailer};
use crate::identity::{Identity, IdentityResolver, RequestContext};
use crate::rate_limit::{InviteRateLimiter, MemoryRateLimiter};
use crate::service::{CreateOrganization, MembershipService};
use crate::token::{generate_invite_token, hash_token};
use crate::MembershipConfig;

/// Mailer that records every invite, optionally failing each send.
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<InviteEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<InviteEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl InviteMailer for RecordingMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), EmailError> {
        if self.fail {
            return Err(EmailError::SendFailed("connection refused".into()));
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

/// Resolves every request to the same identity (or none).
pub struct FixedIdentity(pub Option<Identity>);

#[async_trait]
impl IdentityResolver for FixedIdentity {
    async fn resolve(&self, _ctx: &RequestContext) -> Result<Option<Identity>, StoreError> {
        Ok(self.0.clone())
    }
}

pub struct TestEnv {
    pub service: MembershipService,
    pub store: Arc<SqliteStore>,
    pub mailer: Arc<RecordingMailer>,
}

/// Test helper: service over in-memory SQLite with the real session resolver.
pub async fn create_test_env() -> TestEnv {
    create_test_env_with(
        MembershipConfig::development(),
        Arc::new(MemoryRateLimiter::new(100, Duration::from_secs(3600))),
        Arc::new(RecordingMailer::default()),
    )
    .await
}

pub async fn create_test_env_with(
    config: MembershipConfig,
    rate_limiter: Arc<dyn InviteRateLimiter>,
    mailer: Arc<RecordingMailer>,
) -> TestEnv {
    let store = SqliteStore::open_in_memory().await.unwrap();
    build_env(store, config, rate_limiter, mailer)
}

/// Test helper: service over a SQLite file at `path`, opened with the production pool.
pub async fn create_file_backed_env(path: &Path) -> TestEnv {
    let url = format!("sqlite://{}?mode=rwc", path.display());
    let store = SqliteStore::open(&url).await.unwrap();
    build_env(
        store,
        MembershipConfig::development(),
        Arc::new(MemoryRateLimiter::new(100, Duration::from_secs(3600))),
        Arc::new(RecordingMailer::default()),
    )
}

fn build_env(
    store: SqliteStore,
    config: MembershipConfig,
    rate_limiter: Arc<dyn InviteRateLimiter>,
    mailer: Arc<RecordingMailer>,
) -> TestEnv {
    let store = Arc::new(store);
    let dyn_store: Arc<dyn Store> = store.clone();
    let service = MembershipService::new(
        dyn_store.clone(),
        Arc::new(crate::identity::SessionIdentityResolver::new(dyn_store)),
        rate_limiter,
        mailer.clone(),
        config,
    );
    TestEnv {
        service,
        store,
        mailer,
    }
}

/// Test helper: create a profile with a live session; returns the request context for it.
pub async fn create_test_user(env: &TestEnv, email: &str) -> (UserId, RequestContext) {
    let user_id = UserId(Uuid::new_v4());
    env.store
        .create_profile(&CreateProfileParams {
            user_id: user_id.clone(),
            email: email.to_string(),
            full_name: None,
            avatar_url: None,
        })
        .await
        .unwrap();

    let session_token = generate_invite_token();
    env.store
        .create_session(&CreateSessionParams {
            user_id: user_id.clone(),
            token_hash: hash_token(&session_token),
            expires_at: Utc::now() + chrono::Duration::hours(1),
        })
        .await
        .unwrap();

    (user_id, RequestContext::with_session(session_token))
}

/// Test helper: create an organization owned by the caller.
pub async fn create_test_org(
    env: &TestEnv,
    owner: &RequestContext,
    slug: &str,
    seat_limit: i32,
) -> Organization {
    env.service
        .create_organization(
            owner,
            CreateOrganization {
                slug: slug.to_string(),
                name: format!("{} Inc", slug),
                plan: Plan::Pro,
                seat_limit: Some(seat_limit),
            },
        )
        .await
        .unwrap()
}

/// Test helper: invite through the service and return the plaintext token.
pub async fn invite(
    env: &TestEnv,
    owner: &RequestContext,
    slug: &str,
    email: &str,
    role: MemberRole,
) -> String {
    let created = env
        .service
        .invite_member(owner, slug, email, role)
        .await
        .unwrap();
    token_from_link(&created.invite_link)
}

pub fn token_from_link(link: &str) -> String {
    link.rsplit('/').next().unwrap().to_string()
}

/// Test helper: invite, then accept as a freshly created user. Returns the member's id
/// and context.
pub async fn add_member(
    env: &TestEnv,
    owner: &RequestContext,
    slug: &str,
    email: &str,
    role: MemberRole,
) -> (UserId, RequestContext) {
    let token = invite(env, owner, slug, email, role).await;
    let (user_id, ctx) = create_test_user(env, email).await;
    env.service.accept_invite(&ctx, &token).await.unwrap();
    (user_id, ctx)
}

/// Reserved seats as the store sees them.
pub async fn reserved(env: &TestEnv, org: &Organization) -> i64 {
    let counts = env.store.seat_counts(&org.id, Utc::now()).await.unwrap();
    counts.active_members + counts.pending_invites
}

/// Test helper: write an invite straight to the store, bypassing the service checks.
/// Returns the plaintext token.
pub async fn insert_invite(
    env: &TestEnv,
    org: &Organization,
    invited_by: &UserId,
    email: &str,
    expires_at: chrono::DateTime<Utc>,
) -> (Invite, String) {
    let token = generate_invite_token();
    let invite = env
        .store
        .create_invite(
            &org.id,
            &CreateInviteParams {
                email: email.to_string(),
                role: MemberRole::Collaborator,
                token_hash: hash_token(&token),
                invited_by: invited_by.clone(),
                expires_at,
            },
        )
        .await
        .unwrap();
    (invite, token)
}
