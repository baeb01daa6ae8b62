use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tally_members::token::{generate_invite_token, hash_token};
use tally_members::validation::{is_valid_email, is_valid_org_slug, normalize_email};
use tally_members::SeatUsage;
use tally_storage::*;
use tally_store_sqlite::SqliteStore;

// ────────────────────────────────────── CLI Types ──────────────────────────────────────

#[derive(Parser)]
#[command(name = "tally-admin")]
#[command(about = "Tally administration: organizations, seats and invites")]
struct Cli {
    /// Database URL (sqlite://path/to/db.db)
    #[arg(long, global = true, env = "DATABASE_URL")]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// User management commands
    User {
        #[command(subcommand)]
        user_cmd: UserCommand,
    },
    /// Organization management commands
    Org {
        #[command(subcommand)]
        org_cmd: OrgCommand,
    },
    /// Invite maintenance commands
    Invites {
        #[command(subcommand)]
        invites_cmd: InvitesCommand,
    },
}

#[derive(Subcommand)]
enum UserCommand {
    /// Create a user profile
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: Option<String>,
    },
    /// Issue a session token for a user (for bootstrapping and scripts)
    Session {
        #[arg(long)]
        email: String,
        /// Session lifetime in hours
        #[arg(long, default_value = "24")]
        expires_hours: i64,
        /// Output only the token
        #[arg(long)]
        plain: bool,
    },
}

#[derive(Subcommand)]
enum OrgCommand {
    /// Create an organization owned by an existing user
    Create {
        #[arg(long)]
        slug: String,
        #[arg(long)]
        name: String,
        /// Email of the owning user
        #[arg(long)]
        owner_email: String,
        /// free, pro or enterprise
        #[arg(long, default_value = "free")]
        plan: String,
        /// Defaults to the plan's seat limit
        #[arg(long)]
        seat_limit: Option<i32>,
    },
    /// Set or clear an organization's seat limit
    Seats {
        slug: String,
        /// New seat limit
        #[arg(long, conflicts_with = "clear")]
        limit: Option<i32>,
        #[arg(long)]
        clear: bool,
    },
    /// Show members, pending invites and seat usage
    Show { slug: String },
}

#[derive(Subcommand)]
enum InvitesCommand {
    /// Mark every pending invite past its expiry as expired
    Prune { slug: String },
    /// List pending invites
    List { slug: String },
}

type CmdResult = Result<(), Box<dyn std::error::Error>>;

// ────────────────────────────────────── CLI Commands ──────────────────────────────────────

async fn cmd_user_create(store: &SqliteStore, email: &str, name: Option<String>) -> CmdResult {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(format!("Invalid email address: {}", email).into());
    }

    let profile = store
        .create_profile(&CreateProfileParams {
            user_id: UserId(Uuid::new_v4()),
            email,
            full_name: name,
            avatar_url: None,
        })
        .await?;
    info!(user_id = %profile.user_id.0, "Profile created");

    println!("✓ User created\n");
    println!("ID:    {}", profile.user_id.0);
    println!("Email: {}", profile.email);
    Ok(())
}

async fn cmd_user_session(
    store: &SqliteStore,
    email: &str,
    expires_hours: i64,
    plain: bool,
) -> CmdResult {
    let profile = store.get_profile_by_email(&normalize_email(email)).await?;

    let token = generate_invite_token();
    let expires_at = Utc::now() + chrono::Duration::hours(expires_hours);
    store
        .create_session(&CreateSessionParams {
            user_id: profile.user_id.clone(),
            token_hash: hash_token(&token),
            expires_at,
        })
        .await?;
    info!(user_id = %profile.user_id.0, "Session issued");

    if plain {
        println!("{}", token);
    } else {
        println!("✓ Session created for {}\n", profile.email);
        println!("Token:   {}", token);
        println!("Expires: {}", expires_at);
    }
    Ok(())
}

async fn cmd_org_create(
    store: &SqliteStore,
    slug: &str,
    name: &str,
    owner_email: &str,
    plan: &str,
    seat_limit: Option<i32>,
) -> CmdResult {
    if !is_valid_org_slug(slug) {
        return Err(format!(
            "Invalid slug '{}': use 3-50 letters, digits or underscores",
            slug
        )
        .into());
    }
    let plan: Plan = plan.parse()?;
    let seat_limit = seat_limit.unwrap_or(plan.default_seat_limit());
    if seat_limit < 1 {
        return Err("Seat limit must be at least 1".into());
    }
    let owner = store
        .get_profile_by_email(&normalize_email(owner_email))
        .await?;

    let org = store
        .create_organization(&CreateOrganizationParams {
            slug: slug.to_string(),
            name: name.trim().to_string(),
            plan,
            seat_limit: Some(seat_limit),
            owner_user_id: owner.user_id.clone(),
        })
        .await?;
    info!(org_id = %org.id.0, owner = %owner.user_id.0, "Organization created");

    println!("✓ Organization created\n");
    println!("Slug:  {}", org.slug);
    println!("Owner: {}", owner.email);
    println!("Plan:  {} ({} seats)", org.plan.as_str(), seat_limit);
    Ok(())
}

async fn cmd_org_seats(
    store: &SqliteStore,
    slug: &str,
    limit: Option<i32>,
    clear: bool,
) -> CmdResult {
    let seat_limit = match (limit, clear) {
        (Some(n), _) if n < 1 => return Err("Seat limit must be at least 1".into()),
        (Some(n), _) => Some(n),
        (None, true) => None,
        (None, false) => return Err("Pass --limit <N> or --clear".into()),
    };

    let org = store.get_organization_by_slug(slug).await?;
    store.set_seat_limit(&org.id, seat_limit).await?;
    info!(org_id = %org.id.0, seat_limit = ?seat_limit, "Seat limit updated");

    let counts = store.seat_counts(&org.id, Utc::now()).await?;
    match SeatUsage::new(counts, seat_limit) {
        Ok(usage) => {
            println!("✓ Seat limit for {} set to {}", org.slug, usage.seat_limit);
            if !usage.has_capacity() {
                println!(
                    "  Warning: {} already reserved; new invites will be refused",
                    usage.describe()
                );
            }
        }
        Err(_) => println!("✓ Seat limit for {} cleared", org.slug),
    }
    Ok(())
}

async fn cmd_org_show(store: &SqliteStore, slug: &str) -> CmdResult {
    let org = store.get_organization_by_slug(slug).await?;
    let now = Utc::now();
    let counts = store.seat_counts(&org.id, now).await?;
    let members = store.list_active_members(&org.id, i64::MAX).await?;
    let invites = store.list_pending_invites(&org.id, now, i64::MAX).await?;

    println!("{} ({})", org.name, org.slug);
    println!(
        "Plan: {}  Billing: {}",
        org.plan.as_str(),
        org.billing_status.as_str()
    );
    match SeatUsage::new(counts, org.seat_limit) {
        Ok(usage) => println!(
            "Seats: {} ({} available)",
            usage.describe(),
            usage.available()
        ),
        Err(_) => println!("Seats: no limit configured"),
    }

    println!("\nMembers ({}):", members.len());
    for m in &members {
        println!("  {:<12} {}", m.role.as_str(), m.email);
    }

    if invites.is_empty() {
        println!("\nNo pending invites.");
    } else {
        println!("\nPending invites ({}):", invites.len());
        for invite in &invites {
            println!(
                "  {:<12} {}  expires {}",
                invite.role.as_str(),
                invite.email,
                invite.expires_at
            );
        }
    }
    Ok(())
}

async fn cmd_invites_prune(store: &SqliteStore, slug: &str) -> CmdResult {
    let org = store.get_organization_by_slug(slug).await?;
    let expired = store.expire_stale_invites(&org.id, Utc::now()).await?;
    info!(org_id = %org.id.0, expired, "Stale invites expired");

    println!("✓ {} invite(s) marked expired", expired);
    Ok(())
}

async fn cmd_invites_list(store: &SqliteStore, slug: &str) -> CmdResult {
    let org = store.get_organization_by_slug(slug).await?;
    let invites = store
        .list_pending_invites(&org.id, Utc::now(), i64::MAX)
        .await?;

    if invites.is_empty() {
        println!("No pending invites found.");
    } else {
        println!("Pending invites:\n");
        for invite in invites {
            println!("ID:      {}", invite.id.0);
            println!("Email:   {}", invite.email);
            println!("Role:    {}", invite.role.as_str());
            println!("Expires: {}", invite.expires_at);
            println!();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> CmdResult {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let db_url = cli
        .database_url
        .unwrap_or_else(|| "sqlite://tally.db?mode=rwc".to_string());
    let store = SqliteStore::open(&db_url).await?;

    match cli.command {
        Command::User { user_cmd } => match user_cmd {
            UserCommand::Create { email, name } => {
                cmd_user_create(&store, &email, name).await?;
            }
            UserCommand::Session {
                email,
                expires_hours,
                plain,
            } => {
                cmd_user_session(&store, &email, expires_hours, plain).await?;
            }
        },
        Command::Org { org_cmd } => match org_cmd {
            OrgCommand::Create {
                slug,
                name,
                owner_email,
                plan,
                seat_limit,
            } => {
                cmd_org_create(&store, &slug, &name, &owner_email, &plan, seat_limit).await?;
            }
            OrgCommand::Seats { slug, limit, clear } => {
                cmd_org_seats(&store, &slug, limit, clear).await?;
            }
            OrgCommand::Show { slug } => {
                cmd_org_show(&store, &slug).await?;
            }
        },
        Command::Invites { invites_cmd } => match invites_cmd {
            InvitesCommand::Prune { slug } => {
                cmd_invites_prune(&store, &slug).await?;
            }
            InvitesCommand::List { slug } => {
                cmd_invites_list(&store, &slug).await?;
            }
        },
    }

    Ok(())
}
