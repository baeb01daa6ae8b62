//! Invite email delivery.
//!
//! Delivery is best-effort: the invite row and link are the source of truth, so a
//! failed send is logged by the caller and never rolls the invite back.

#[cfg(feature = "email-resend")]
mod resend;
#[cfg(feature = "email-smtp")]
mod smtp;
mod templates;

pub use templates::InviteEmailContent;

use async_trait::async_trait;
use tally_storage::MemberRole;
use thiserror::Error;

use crate::config::{EmailConfig, EmailProviderConfig};

/// Email sending error
#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Failed to send email: {0}")]
    SendFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),
}

/// Everything the invite template needs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InviteEmail {
    pub to: String,
    pub inviter_name: String,
    pub org_name: String,
    pub role: MemberRole,
    pub invite_link: String,
}

#[async_trait]
pub trait InviteMailer: Send + Sync {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), EmailError>;
}

/// Logs invites instead of sending them. Used when no provider is configured.
pub struct LogMailer;

#[async_trait]
impl InviteMailer for LogMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), EmailError> {
        tracing::info!(
            to = %email.to,
            org = %email.org_name,
            role = email.role.as_str(),
            "No email provider configured; invite link must be shared manually"
        );
        Ok(())
    }
}

fn format_from(from_address: &str, from_name: Option<&str>) -> String {
    match from_name {
        Some(name) => format!("{} <{}>", name, from_address),
        None => from_address.to_string(),
    }
}

/// Create a mailer from configuration; `None` yields the [`LogMailer`].
pub fn create_mailer(config: Option<&EmailConfig>) -> Result<Box<dyn InviteMailer>, EmailError> {
    let Some(config) = config else {
        return Ok(Box::new(LogMailer));
    };
    let from = format_from(&config.from_address, config.from_name.as_deref());

    match &config.provider {
        #[cfg(feature = "email-resend")]
        EmailProviderConfig::Resend { api_key } => {
            Ok(Box::new(resend::ResendMailer::new(api_key.clone(), from)))
        }
        #[cfg(not(feature = "email-resend"))]
        EmailProviderConfig::Resend { .. } => {
            let _ = from;
            Err(EmailError::ProviderNotAvailable(
                "Resend support not compiled in. Enable the 'email-resend' feature.".to_string(),
            ))
        }
        #[cfg(feature = "email-smtp")]
        EmailProviderConfig::Smtp {
            host,
            port,
            username,
            password,
            use_tls,
        } => {
            let mailer = smtp::SmtpMailer::new(
                host.clone(),
                *port,
                username.clone(),
                password.clone(),
                *use_tls,
                from,
            )?;
            Ok(Box::new(mailer))
        }
        #[cfg(not(feature = "email-smtp"))]
        EmailProviderConfig::Smtp { .. } => {
            let _ = from;
            Err(EmailError::ProviderNotAvailable(
                "SMTP support not compiled in. Enable the 'email-smtp' feature.".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from() {
        assert_eq!(
            format_from("invites@example.com", Some("Tally")),
            "Tally <invites@example.com>"
        );
        assert_eq!(format_from("invites@example.com", None), "invites@example.com");
    }

    #[tokio::test]
    async fn test_no_config_uses_log_mailer() {
        let mailer = create_mailer(None).unwrap();
        let email = InviteEmail {
            to: "a@x.com".into(),
            inviter_name: "Owner".into(),
            org_name: "Acme".into(),
            role: MemberRole::Collaborator,
            invite_link: "http://localhost:3000/invite/abc".into(),
        };
        assert!(mailer.send_invite(&email).await.is_ok());
    }

    #[cfg(not(feature = "email-smtp"))]
    #[test]
    fn test_smtp_not_compiled_in() {
        let config = EmailConfig {
            provider: EmailProviderConfig::Smtp {
                host: "localhost".into(),
                port: 25,
                username: None,
                password: None,
                use_tls: false,
            },
            from_address: "invites@example.com".into(),
            from_name: None,
        };
        assert!(matches!(
            create_mailer(Some(&config)),
            Err(EmailError::ProviderNotAvailable(_))
        ));
    }
}
