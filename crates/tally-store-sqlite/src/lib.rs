//! SQLite backend for the tally [`Store`].
//!
//! Timestamps are stored as unix seconds. The seat invariant is enforced by triggers in
//! `migrations/`, so a write that would oversell seats fails inside the same statement
//! with [`StoreError::SeatLimit`] carrying the trigger's message.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tally_storage::{
    AcceptInviteParams, BillingStatus, CreateInviteParams, CreateOrganizationParams,
    CreateProfileParams, CreateSessionParams, Invite, InviteId, InviteStatus, MemberRole,
    MemberStatus, MemberWithProfile, MembershipTransition, Organization, OrganizationId,
    OrganizationMember, Plan, Profile, SeatCounts, Session, Store, StoreError, UserId,
};
use uuid::Uuid;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn open_in_memory() -> Result<Self, StoreError> {
        Self::open("sqlite::memory:").await
    }

    pub async fn open(url: &str) -> Result<Self, StoreError> {
        // In-memory databases are per-connection: keep exactly one, and never recycle it.
        let in_memory = url.contains(":memory:");
        let mut connect = SqliteConnectOptions::from_str(url)
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT);
        if !in_memory {
            // Readers never block the writer; writers wait their turn on the busy timeout.
            connect = connect.journal_mode(SqliteJournalMode::Wal);
        }

        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }
        let pool = options
            .connect_with(connect)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

// ─────────────────────────────────────── Row mapping ───────────────────────────────────────

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

/// Classify write failures: seat-guard aborts keep their message, unique violations
/// become `AlreadyExists`.
fn write_error(e: sqlx::Error) -> StoreError {
    if let Some(db) = e.as_database_error() {
        let message = db.message();
        if message.starts_with("Seat limit") {
            return StoreError::SeatLimit(message.to_string());
        }
        if message.starts_with("Invite is no longer pending") {
            return StoreError::Conflict;
        }
        if db.is_unique_violation() {
            return StoreError::AlreadyExists;
        }
    }
    StoreError::Backend(e.to_string())
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::try_parse(s).map_err(|e| StoreError::Backend(e.to_string()))
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("invalid timestamp: {}", secs)))
}

fn seat_limit(n: i64) -> Result<i32, StoreError> {
    i32::try_from(n).map_err(|_| StoreError::Backend(format!("seat_limit out of range: {}", n)))
}

fn parse_enum<T: std::str::FromStr>(s: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| StoreError::Backend(e.to_string()))
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    user_id: String,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
    created_at: i64,
}

impl TryFrom<ProfileRow> for Profile {
    type Error = StoreError;

    fn try_from(row: ProfileRow) -> Result<Self, Self::Error> {
        Ok(Profile {
            user_id: UserId(parse_uuid(&row.user_id)?),
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
            created_at: timestamp(row.created_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: String,
    slug: String,
    name: String,
    plan: String,
    seat_limit: Option<i64>,
    billing_status: String,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<OrganizationRow> for Organization {
    type Error = StoreError;

    fn try_from(row: OrganizationRow) -> Result<Self, Self::Error> {
        Ok(Organization {
            id: OrganizationId(parse_uuid(&row.id)?),
            slug: row.slug,
            name: row.name,
            plan: parse_enum::<Plan>(&row.plan)?,
            seat_limit: row.seat_limit.map(seat_limit).transpose()?,
            billing_status: parse_enum::<BillingStatus>(&row.billing_status)?,
            created_at: timestamp(row.created_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberRow {
    organization_id: String,
    user_id: String,
    role: String,
    status: String,
    invited_by: Option<String>,
    joined_at: i64,
    updated_at: i64,
}

impl TryFrom<MemberRow> for OrganizationMember {
    type Error = StoreError;

    fn try_from(row: MemberRow) -> Result<Self, Self::Error> {
        Ok(OrganizationMember {
            organization_id: OrganizationId(parse_uuid(&row.organization_id)?),
            user_id: UserId(parse_uuid(&row.user_id)?),
            role: parse_enum::<MemberRole>(&row.role)?,
            status: parse_enum::<MemberStatus>(&row.status)?,
            invited_by: row
                .invited_by
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(UserId),
            joined_at: timestamp(row.joined_at)?,
            updated_at: timestamp(row.updated_at)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct MemberProfileRow {
    user_id: String,
    role: String,
    joined_at: i64,
    email: String,
    full_name: Option<String>,
    avatar_url: Option<String>,
}

impl TryFrom<MemberProfileRow> for MemberWithProfile {
    type Error = StoreError;

    fn try_from(row: MemberProfileRow) -> Result<Self, Self::Error> {
        Ok(MemberWithProfile {
            user_id: UserId(parse_uuid(&row.user_id)?),
            role: parse_enum::<MemberRole>(&row.role)?,
            joined_at: timestamp(row.joined_at)?,
            email: row.email,
            full_name: row.full_name,
            avatar_url: row.avatar_url,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InviteRow {
    id: String,
    organization_id: String,
    email: String,
    role: String,
    token_hash: String,
    status: String,
    invited_by: String,
    expires_at: i64,
    created_at: i64,
    accepted_at: Option<i64>,
    accepted_by: Option<String>,
}

impl TryFrom<InviteRow> for Invite {
    type Error = StoreError;

    fn try_from(row: InviteRow) -> Result<Self, Self::Error> {
        Ok(Invite {
            id: InviteId(parse_uuid(&row.id)?),
            organization_id: OrganizationId(parse_uuid(&row.organization_id)?),
            email: row.email,
            role: parse_enum::<MemberRole>(&row.role)?,
            token_hash: row.token_hash,
            status: parse_enum::<InviteStatus>(&row.status)?,
            invited_by: UserId(parse_uuid(&row.invited_by)?),
            expires_at: timestamp(row.expires_at)?,
            created_at: timestamp(row.created_at)?,
            accepted_at: row.accepted_at.map(timestamp).transpose()?,
            accepted_by: row
                .accepted_by
                .as_deref()
                .map(parse_uuid)
                .transpose()?
                .map(UserId),
        })
    }
}

const ORGANIZATION_COLUMNS: &str =
    "id, slug, name, plan, seat_limit, billing_status, created_at, updated_at";

const MEMBER_COLUMNS: &str =
    "organization_id, user_id, role, status, invited_by, joined_at, updated_at";

const INVITE_COLUMNS: &str = "id, organization_id, email, role, token_hash, status, invited_by, \
     expires_at, created_at, accepted_at, accepted_by";

#[async_trait::async_trait]
impl Store for SqliteStore {
    // ───────────────────────────── Profiles ─────────────────────────────

    async fn create_profile(&self, params: &CreateProfileParams) -> Result<Profile, StoreError> {
        let now = Utc::now().timestamp();
        sqlx::query(
            "INSERT INTO profiles(user_id, email, full_name, avatar_url, created_at)
             VALUES(?, ?, ?, ?, ?)",
        )
        .bind(params.user_id.0.to_string())
        .bind(&params.email)
        .bind(&params.full_name)
        .bind(&params.avatar_url)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.get_profile(&params.user_id).await
    }

    async fn get_profile(&self, user_id: &UserId) -> Result<Profile, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, email, full_name, avatar_url, created_at
               FROM profiles WHERE user_id = ?",
        )
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_profile_by_email(&self, email: &str) -> Result<Profile, StoreError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            "SELECT user_id, email, full_name, avatar_url, created_at
               FROM profiles WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    // ───────────────────────────── Sessions ─────────────────────────────

    async fn create_session(&self, params: &CreateSessionParams) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO sessions(token_hash, user_id, expires_at, created_at) VALUES(?, ?, ?, ?)",
        )
        .bind(&params.token_hash)
        .bind(params.user_id.0.to_string())
        .bind(params.expires_at.timestamp())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn get_session(&self, token_hash: &str) -> Result<Session, StoreError> {
        let row = sqlx::query_as::<_, (String, String, i64, i64)>(
            "SELECT token_hash, user_id, expires_at, created_at FROM sessions WHERE token_hash = ?",
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((token_hash, user_id, expires_at, created_at)) => Ok(Session {
                user_id: UserId(parse_uuid(&user_id)?),
                token_hash,
                expires_at: timestamp(expires_at)?,
                created_at: timestamp(created_at)?,
            }),
        }
    }

    // ─────────────────────────── Organizations ──────────────────────────

    async fn create_organization(
        &self,
        params: &CreateOrganizationParams,
    ) -> Result<Organization, StoreError> {
        let org_id = Uuid::new_v4();
        let now = Utc::now().timestamp();

        let mut tx = self.pool.begin().await.map_err(backend)?;

        sqlx::query(
            "INSERT INTO organizations(id, slug, name, plan, seat_limit, billing_status,
                                       created_at, updated_at)
             VALUES(?, ?, ?, ?, ?, 'active', ?, ?)",
        )
        .bind(org_id.to_string())
        .bind(&params.slug)
        .bind(&params.name)
        .bind(params.plan.as_str())
        .bind(params.seat_limit.map(i64::from))
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        sqlx::query(
            "INSERT INTO organization_members(organization_id, user_id, role, status,
                                              invited_by, joined_at, updated_at)
             VALUES(?, ?, 'owner', 'active', NULL, ?, ?)",
        )
        .bind(org_id.to_string())
        .bind(params.owner_user_id.0.to_string())
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        tx.commit().await.map_err(backend)?;

        self.get_organization(&OrganizationId(org_id)).await
    }

    async fn get_organization(&self, org_id: &OrganizationId) -> Result<Organization, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE id = ?",
            ORGANIZATION_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_organization_by_slug(&self, slug: &str) -> Result<Organization, StoreError> {
        let row = sqlx::query_as::<_, OrganizationRow>(&format!(
            "SELECT {} FROM organizations WHERE slug = ?",
            ORGANIZATION_COLUMNS
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn set_seat_limit(
        &self,
        org_id: &OrganizationId,
        seat_limit: Option<i32>,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE organizations SET seat_limit = ?, updated_at = ? WHERE id = ?")
                .bind(seat_limit.map(i64::from))
                .bind(Utc::now().timestamp())
                .bind(org_id.0.to_string())
                .execute(&self.pool)
                .await
                .map_err(backend)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ──────────────────────── Organization Members ──────────────────────

    async fn get_member(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<OrganizationMember, StoreError> {
        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM organization_members WHERE organization_id = ? AND user_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .bind(user_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_active_members(
        &self,
        org_id: &OrganizationId,
        limit: i64,
    ) -> Result<Vec<MemberWithProfile>, StoreError> {
        let rows = sqlx::query_as::<_, MemberProfileRow>(
            "SELECT m.user_id, m.role, m.joined_at, p.email, p.full_name, p.avatar_url
               FROM organization_members m
               JOIN profiles p ON p.user_id = m.user_id
              WHERE m.organization_id = ? AND m.status = 'active'
              ORDER BY m.joined_at ASC, m.rowid ASC
              LIMIT ?",
        )
        .bind(org_id.0.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(MemberWithProfile::try_from).collect()
    }

    async fn seat_counts(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<SeatCounts, StoreError> {
        let (active_members, pending_invites, owners) = sqlx::query_as::<_, (i64, i64, i64)>(
            "SELECT
                (SELECT COUNT(*) FROM organization_members
                  WHERE organization_id = ?1 AND status = 'active' AND role <> 'owner'),
                (SELECT COUNT(*) FROM invites
                  WHERE organization_id = ?1 AND status = 'pending' AND expires_at > ?2),
                (SELECT COUNT(*) FROM organization_members
                  WHERE organization_id = ?1 AND status = 'active' AND role = 'owner')",
        )
        .bind(org_id.0.to_string())
        .bind(now.timestamp())
        .fetch_one(&self.pool)
        .await
        .map_err(backend)?;

        Ok(SeatCounts {
            active_members,
            pending_invites,
            owners,
        })
    }

    async fn update_member_role(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
        role: MemberRole,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE organization_members SET role = ?, updated_at = ?
              WHERE organization_id = ? AND user_id = ? AND status = 'active' AND role <> 'owner'",
        )
        .bind(role.as_str())
        .bind(Utc::now().timestamp())
        .bind(org_id.0.to_string())
        .bind(user_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn deactivate_member(
        &self,
        org_id: &OrganizationId,
        user_id: &UserId,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE organization_members SET status = 'inactive', updated_at = ?
              WHERE organization_id = ? AND user_id = ? AND status = 'active' AND role <> 'owner'",
        )
        .bind(Utc::now().timestamp())
        .bind(org_id.0.to_string())
        .bind(user_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    // ──────────────────────── Organization Invites ──────────────────────

    async fn create_invite(
        &self,
        org_id: &OrganizationId,
        params: &CreateInviteParams,
    ) -> Result<Invite, StoreError> {
        let invite_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO invites(id, organization_id, email, role, token_hash, status,
                                 invited_by, expires_at, created_at)
             VALUES(?, ?, ?, ?, ?, 'pending', ?, ?, ?)",
        )
        .bind(invite_id.to_string())
        .bind(org_id.0.to_string())
        .bind(&params.email)
        .bind(params.role.as_str())
        .bind(&params.token_hash)
        .bind(params.invited_by.0.to_string())
        .bind(params.expires_at.timestamp())
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        self.get_invite(org_id, &InviteId(invite_id)).await
    }

    async fn get_invite(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE organization_id = ? AND id = ?",
            INVITE_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .bind(invite_id.0.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn get_invite_by_token_hash(&self, token_hash: &str) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites WHERE token_hash = ?",
            INVITE_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn find_pending_invite(
        &self,
        org_id: &OrganizationId,
        email: &str,
    ) -> Result<Invite, StoreError> {
        let row = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites
              WHERE organization_id = ? AND email = lower(?) AND status = 'pending'",
            INVITE_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(backend)?;

        row.ok_or(StoreError::NotFound)?.try_into()
    }

    async fn list_pending_invites(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<Invite>, StoreError> {
        let rows = sqlx::query_as::<_, InviteRow>(&format!(
            "SELECT {} FROM invites
              WHERE organization_id = ? AND status = 'pending' AND expires_at > ?
              ORDER BY created_at DESC, rowid DESC
              LIMIT ?",
            INVITE_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .bind(now.timestamp())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(backend)?;

        rows.into_iter().map(Invite::try_from).collect()
    }

    async fn mark_invite_expired(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE invites SET status = 'expired'
              WHERE organization_id = ? AND id = ? AND status = 'pending'",
        )
        .bind(org_id.0.to_string())
        .bind(invite_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;
        Ok(())
    }

    async fn expire_stale_invites(
        &self,
        org_id: &OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'expired'
              WHERE organization_id = ? AND status = 'pending' AND expires_at <= ?",
        )
        .bind(org_id.0.to_string())
        .bind(now.timestamp())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() > 0 {
            tracing::debug!(
                org_id = %org_id.0,
                expired = result.rows_affected(),
                "Expired stale invites"
            );
        }
        Ok(result.rows_affected())
    }

    async fn revoke_invite(
        &self,
        org_id: &OrganizationId,
        invite_id: &InviteId,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'revoked'
              WHERE organization_id = ? AND id = ? AND status = 'pending'",
        )
        .bind(org_id.0.to_string())
        .bind(invite_id.0.to_string())
        .execute(&self.pool)
        .await
        .map_err(write_error)?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        // Distinguish "already terminal" from "no such invite in this organization".
        self.get_invite(org_id, invite_id).await?;
        Ok(false)
    }

    async fn accept_invite(
        &self,
        org_id: &OrganizationId,
        params: &AcceptInviteParams,
    ) -> Result<OrganizationMember, StoreError> {
        let now = params.accepted_at.timestamp();
        let mut tx = self.pool.begin().await.map_err(backend)?;

        // Consume first so the invite's own reservation is released before the
        // membership is activated; the status guard makes consumption single-use.
        let consumed = sqlx::query(
            "UPDATE invites SET status = 'accepted', accepted_at = ?, accepted_by = ?
              WHERE organization_id = ? AND id = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(params.user_id.0.to_string())
        .bind(org_id.0.to_string())
        .bind(params.invite_id.0.to_string())
        .execute(&mut *tx)
        .await
        .map_err(write_error)?;

        if consumed.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        match params.transition {
            MembershipTransition::Insert => {
                sqlx::query(
                    "INSERT INTO organization_members(organization_id, user_id, role, status,
                                                      invited_by, joined_at, updated_at)
                     VALUES(?, ?, ?, 'active', ?, ?, ?)",
                )
                .bind(org_id.0.to_string())
                .bind(params.user_id.0.to_string())
                .bind(params.role.as_str())
                .bind(params.invited_by.0.to_string())
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;
            }
            MembershipTransition::Reactivate => {
                let result = sqlx::query(
                    "UPDATE organization_members
                        SET status = 'active', role = ?, invited_by = ?, updated_at = ?
                      WHERE organization_id = ? AND user_id = ? AND status = 'inactive'",
                )
                .bind(params.role.as_str())
                .bind(params.invited_by.0.to_string())
                .bind(now)
                .bind(org_id.0.to_string())
                .bind(params.user_id.0.to_string())
                .execute(&mut *tx)
                .await
                .map_err(write_error)?;

                if result.rows_affected() == 0 {
                    return Err(StoreError::Conflict);
                }
            }
            MembershipTransition::AlreadyActive => {}
        }

        let row = sqlx::query_as::<_, MemberRow>(&format!(
            "SELECT {} FROM organization_members WHERE organization_id = ? AND user_id = ?",
            MEMBER_COLUMNS
        ))
        .bind(org_id.0.to_string())
        .bind(params.user_id.0.to_string())
        .fetch_optional(&mut *tx)
        .await
        .map_err(backend)?;

        let member: OrganizationMember = row.ok_or(StoreError::NotFound)?.try_into()?;
        if !member.is_active() {
            return Err(StoreError::Conflict);
        }

        tx.commit().await.map_err(backend)?;
        Ok(member)
    }
}
