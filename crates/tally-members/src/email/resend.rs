//! Resend mailer.

use super::{EmailError, InviteEmail, InviteEmailContent, InviteMailer};
use async_trait::async_trait;
use resend_rs::{types::CreateEmailBaseOptions, Resend};

pub struct ResendMailer {
    client: Resend,
    from: String,
}

impl ResendMailer {
    pub fn new(api_key: String, from: String) -> Self {
        Self {
            client: Resend::new(&api_key),
            from,
        }
    }
}

#[async_trait]
impl InviteMailer for ResendMailer {
    async fn send_invite(&self, email: &InviteEmail) -> Result<(), EmailError> {
        let content = InviteEmailContent::new(email);

        let message =
            CreateEmailBaseOptions::new(&self.from, vec![email.to.clone()], content.subject)
                .with_text(&content.text)
                .with_html(&content.html);

        self.client
            .emails
            .send(message)
            .await
            .map_err(|e| EmailError::SendFailed(e.to_string()))?;

        Ok(())
    }
}
