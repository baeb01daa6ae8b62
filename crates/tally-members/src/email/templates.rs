//! Email templates for organization invites.

use super::InviteEmail;

/// Rendered invite email.
pub struct InviteEmailContent {
    pub subject: String,
    pub text: String,
    pub html: String,
}

fn role_label(email: &InviteEmail) -> &'static str {
    match email.role {
        tally_storage::MemberRole::Owner => "owner",
        tally_storage::MemberRole::Collaborator => "collaborator",
        tally_storage::MemberRole::ReadOnly => "read-only member",
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

impl InviteEmailContent {
    pub fn new(email: &InviteEmail) -> Self {
        Self {
            subject: format!(
                "{} invited you to join {} on Tally",
                email.inviter_name, email.org_name
            ),
            text: Self::text_template(email),
            html: Self::html_template(email),
        }
    }

    fn text_template(email: &InviteEmail) -> String {
        format!(
            r#"{} has invited you to join {} as a {}.

Accept the invite:
{}

This invite can only be used once, by this email address.

If you weren't expecting this invite, you can ignore this email.

--
Tally"#,
            email.inviter_name,
            email.org_name,
            role_label(email),
            email.invite_link
        )
    }

    fn html_template(email: &InviteEmail) -> String {
        format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <style>
        body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; margin: 0; padding: 0; background: #f5f5f5; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 40px 20px; }}
        .card {{ background: white; border-radius: 8px; padding: 40px; box-shadow: 0 2px 4px rgba(0,0,0,0.1); }}
        h1 {{ color: #1a1a1a; margin-top: 0; font-size: 24px; }}
        .button {{ display: inline-block; padding: 12px 24px; background: #2563eb; color: white; text-decoration: none; border-radius: 6px; font-weight: 600; }}
        .expires {{ color: #666; font-size: 14px; }}
        .footer {{ margin-top: 32px; padding-top: 20px; border-top: 1px solid #eee; color: #888; font-size: 12px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="card">
            <h1>Join {org} on Tally</h1>
            <p>{inviter} has invited you to join <strong>{org}</strong> as a {role}.</p>
            <p><a class="button" href="{link}">Accept invite</a></p>
            <p class="expires">This invite can only be used once, by this email address.</p>
            <div class="footer">
                <p>If you weren't expecting this invite, you can ignore this email.</p>
            </div>
        </div>
    </div>
</body>
</html>"#,
            org = escape_html(&email.org_name),
            inviter = escape_html(&email.inviter_name),
            role = role_label(email),
            link = escape_html(&email.invite_link),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_storage::MemberRole;

    fn email() -> InviteEmail {
        InviteEmail {
            to: "a@x.com".into(),
            inviter_name: "Dana".into(),
            org_name: "Acme".into(),
            role: MemberRole::ReadOnly,
            invite_link: format!("https://app.example.com/invite/{}", "ab".repeat(32)),
        }
    }

    #[test]
    fn test_content_contains_link() {
        let e = email();
        let content = InviteEmailContent::new(&e);
        assert!(content.text.contains(&e.invite_link));
        assert!(content.html.contains(&e.invite_link));
    }

    #[test]
    fn test_subject() {
        let content = InviteEmailContent::new(&email());
        assert_eq!(content.subject, "Dana invited you to join Acme on Tally");
    }

    #[test]
    fn test_role_is_described() {
        let content = InviteEmailContent::new(&email());
        assert!(content.text.contains("read-only member"));
    }

    #[test]
    fn test_html_escapes_org_name() {
        let mut e = email();
        e.org_name = "<script>".into();
        let content = InviteEmailContent::new(&e);
        assert!(!content.html.contains("<script>"));
        assert!(content.html.contains("&lt;script&gt;"));
    }
}
