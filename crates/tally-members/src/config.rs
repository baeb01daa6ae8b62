//! Membership service configuration.
//!
//! Supports configuration via environment variables:
//!
//! ```bash
//! # Invite links
//! TALLY_APP_URL=https://app.tally.dev     # required outside development
//! TALLY_ENV=production                    # "development" allows the localhost fallback
//!
//! # Invites
//! TALLY_INVITE_TTL_HOURS=48
//! TALLY_INVITE_RATE_LIMIT=10
//! TALLY_INVITE_RATE_WINDOW_SECS=3600
//!
//! # Membership view page sizes
//! TALLY_MEMBERS_PAGE_SIZE=100
//! TALLY_INVITES_PAGE_SIZE=50
//!
//! # Provider: Resend
//! TALLY_EMAIL_PROVIDER=resend
//! RESEND_API_KEY=re_...
//!
//! # Provider: SMTP
//! TALLY_EMAIL_PROVIDER=smtp
//! SMTP_HOST=smtp.gmail.com
//! SMTP_PORT=587
//! SMTP_USERNAME=user@example.com
//! SMTP_PASSWORD=app_password
//! SMTP_USE_TLS=true
//!
//! # Sender config
//! TALLY_EMAIL_FROM=invites@tally.dev
//! TALLY_EMAIL_FROM_NAME="Tally"
//! ```

use std::env;
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEV_APP_URL: &str = "http://localhost:3000";

/// Membership service configuration
#[derive(Debug, Clone)]
pub struct MembershipConfig {
    /// Base URL invite links are built on, without trailing slash
    pub app_url: String,
    pub invite_ttl: chrono::Duration,
    pub invite_rate_limit: u32,
    pub invite_rate_window: Duration,
    pub members_page_size: i64,
    pub invites_page_size: i64,
    pub email: Option<EmailConfig>,
}

/// Email configuration for invite delivery
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub provider: EmailProviderConfig,
    pub from_address: String,
    pub from_name: Option<String>,
}

/// Email provider configuration
#[derive(Debug, Clone)]
pub enum EmailProviderConfig {
    Resend {
        #[allow(dead_code)] // Used when email-resend feature is enabled
        api_key: String,
    },
    Smtp {
        host: String,
        port: u16,
        username: Option<String>,
        password: Option<String>,
        use_tls: bool,
    },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("TALLY_APP_URL must be set outside development")]
    MissingAppUrl,

    #[error("Invalid app URL: {0}. Expected an http(s) URL with a host")]
    InvalidAppUrl(String),

    #[error("Invalid value for {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },

    #[error("Invalid email provider: {0}. Expected 'resend' or 'smtp'")]
    InvalidProvider(String),

    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid port number: {0}")]
    InvalidPort(String),

    #[error("Missing from address: TALLY_EMAIL_FROM is required when email is configured")]
    MissingFromAddress,

    #[error("SMTP provider requires SMTP_HOST")]
    SmtpMissingHost,
}

/// Parse the invite link base. Only http(s) with a host; no query or fragment, since
/// `/invite/{token}` is appended to it.
fn parse_app_url(raw: &str) -> Result<String, ConfigError> {
    let invalid = || ConfigError::InvalidAppUrl(raw.to_string());
    let url = Url::parse(raw).map_err(|_| invalid())?;

    if url.scheme() != "https" && url.scheme() != "http" {
        return Err(invalid());
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid());
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid());
    }

    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_var<T: std::str::FromStr>(
    name: &'static str,
    default: T,
    valid: impl Fn(&T) -> bool,
) -> Result<T, ConfigError> {
    match env::var(name) {
        Err(_) => Ok(default),
        Ok(value) => match value.trim().parse::<T>() {
            Ok(v) if valid(&v) => Ok(v),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}

impl MembershipConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let development = env::var("TALLY_ENV")
            .map(|v| v.eq_ignore_ascii_case("development"))
            .unwrap_or(false);

        let app_url = match env::var("TALLY_APP_URL") {
            Ok(url) if !url.trim().is_empty() => parse_app_url(url.trim())?,
            _ if development => DEV_APP_URL.to_string(),
            _ => return Err(ConfigError::MissingAppUrl),
        };

        let ttl_hours = parse_var("TALLY_INVITE_TTL_HOURS", 48i64, |h| *h > 0)?;
        let invite_rate_limit = parse_var("TALLY_INVITE_RATE_LIMIT", 10u32, |n| *n > 0)?;
        let window_secs = parse_var("TALLY_INVITE_RATE_WINDOW_SECS", 3600u64, |n| *n > 0)?;
        let members_page_size = parse_var("TALLY_MEMBERS_PAGE_SIZE", 100i64, |n| *n > 0)?;
        let invites_page_size = parse_var("TALLY_INVITES_PAGE_SIZE", 50i64, |n| *n > 0)?;

        Ok(Self {
            app_url,
            invite_ttl: chrono::Duration::hours(ttl_hours),
            invite_rate_limit,
            invite_rate_window: Duration::from_secs(window_secs),
            members_page_size,
            invites_page_size,
            email: EmailConfig::from_env()?,
        })
    }

    /// Development defaults: localhost links, no email provider.
    pub fn development() -> Self {
        Self {
            app_url: DEV_APP_URL.to_string(),
            invite_ttl: chrono::Duration::hours(48),
            invite_rate_limit: 10,
            invite_rate_window: Duration::from_secs(3600),
            members_page_size: 100,
            invites_page_size: 50,
            email: None,
        }
    }

    /// `{app_url}/invite/{token}`
    pub fn invite_link(&self, token: &str) -> String {
        format!("{}/invite/{}", self.app_url, token)
    }
}

impl EmailConfig {
    fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(provider_type) = env::var("TALLY_EMAIL_PROVIDER")
            .ok()
            .filter(|v| !v.is_empty())
        else {
            return Ok(None);
        };

        let provider = match provider_type.to_lowercase().as_str() {
            "resend" => {
                let api_key = env::var("RESEND_API_KEY")
                    .map_err(|_| ConfigError::MissingEnvVar("RESEND_API_KEY".to_string()))?;
                EmailProviderConfig::Resend { api_key }
            }
            "smtp" => {
                let host = env::var("SMTP_HOST").map_err(|_| ConfigError::SmtpMissingHost)?;
                let port = match env::var("SMTP_PORT") {
                    Err(_) => 587,
                    Ok(p) => p.parse::<u16>().map_err(|_| ConfigError::InvalidPort(p))?,
                };
                let username = env::var("SMTP_USERNAME").ok();
                let password = env::var("SMTP_PASSWORD").ok();
                let use_tls = env::var("SMTP_USE_TLS")
                    .map(|v| v.to_lowercase() == "true" || v == "1")
                    .unwrap_or(true); // TLS by default

                EmailProviderConfig::Smtp {
                    host,
                    port,
                    username,
                    password,
                    use_tls,
                }
            }
            other => return Err(ConfigError::InvalidProvider(other.to_string())),
        };

        let from_address =
            env::var("TALLY_EMAIL_FROM").map_err(|_| ConfigError::MissingFromAddress)?;
        let from_name = env::var("TALLY_EMAIL_FROM_NAME").ok();

        Ok(Some(Self {
            provider,
            from_address,
            from_name,
        }))
    }
}
