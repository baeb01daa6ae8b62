//! Input format checks. Pure functions, run before any store access.

use uuid::Uuid;

use crate::MembershipError;

const MAX_EMAIL_LEN: usize = 254;

/// Organization slug: 3 to 50 ASCII letters, digits or underscores.
pub fn is_valid_org_slug(slug: &str) -> bool {
    (3..=50).contains(&slug.len())
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Trim and lowercase an email address.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Simplified RFC 5322 check on an already normalized address.
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LEN {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let local_ok = local
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "!#$%&'*+/=?^_`{|}~.-".contains(c));
    if !local_ok || local.starts_with('.') || local.ends_with('.') || local.contains("..") {
        return false;
    }

    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Hyphenated UUID (versions 1 through 5), any case.
pub fn is_valid_uuid(s: &str) -> bool {
    if s.len() != 36 {
        return false;
    }
    match Uuid::try_parse(s) {
        Ok(uuid) => (1..=5).contains(&uuid.get_version_num()),
        Err(_) => false,
    }
}

/// Exactly 64 lowercase hex characters.
pub fn is_valid_invite_token(token: &str) -> bool {
    token.len() == 64
        && token
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
}

pub(crate) fn require_org_slug(slug: &str) -> Result<(), MembershipError> {
    if is_valid_org_slug(slug) {
        Ok(())
    } else {
        Err(MembershipError::invalid("Invalid organization identifier"))
    }
}

/// Normalize then validate; returns the normalized address.
pub(crate) fn require_email(email: &str) -> Result<String, MembershipError> {
    let email = normalize_email(email);
    if is_valid_email(&email) {
        Ok(email)
    } else {
        Err(MembershipError::invalid("Invalid email address"))
    }
}

pub(crate) fn require_uuid(s: &str, what: &str) -> Result<Uuid, MembershipError> {
    if !is_valid_uuid(s) {
        return Err(MembershipError::invalid(format!("Invalid {}", what)));
    }
    Uuid::try_parse(s).map_err(|_| MembershipError::invalid(format!("Invalid {}", what)))
}

pub(crate) fn require_invite_token(token: &str) -> Result<(), MembershipError> {
    if is_valid_invite_token(token) {
        Ok(())
    } else {
        Err(MembershipError::invalid("Invalid invite link"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_slug() {
        assert!(is_valid_org_slug("acme"));
        assert!(is_valid_org_slug("Acme_Corp_2024"));
        assert!(is_valid_org_slug(&"a".repeat(50)));

        assert!(!is_valid_org_slug("ab"));
        assert!(!is_valid_org_slug(&"a".repeat(51)));
        assert!(!is_valid_org_slug("acme-corp"));
        assert!(!is_valid_org_slug("../etc"));
        assert!(!is_valid_org_slug("acme corp"));
        assert!(!is_valid_org_slug("acmé_corp"));
    }

    #[test]
    fn test_email() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("user"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("user@@example.com"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email("user@exa_mple.com"));
        assert!(!is_valid_email(".user@example.com"));
        assert!(!is_valid_email("user@-example.com"));
    }

    #[test]
    fn test_email_length_limit() {
        let local = "a".repeat(64);
        let domain = format!("{}.com", "b".repeat(63));
        let ok = format!("{}@{}.{}.{}", local, domain, "c".repeat(50), "d".repeat(50));
        assert!(ok.len() <= MAX_EMAIL_LEN);
        assert!(is_valid_email(&ok));

        let too_long = format!("{}@{}.{}", local, "e".repeat(63), "f".repeat(63)) + &".g".repeat(40);
        assert!(too_long.len() > MAX_EMAIL_LEN);
        assert!(!is_valid_email(&too_long));
    }

    #[test]
    fn test_require_email_normalizes() {
        assert_eq!(
            require_email("  User@Example.COM ").unwrap(),
            "user@example.com"
        );
        assert!(require_email("not an email").is_err());
    }

    #[test]
    fn test_uuid() {
        assert!(is_valid_uuid("67e55044-10b1-426f-9247-bb680e5fe0c8"));
        assert!(is_valid_uuid("67E55044-10B1-426F-9247-BB680E5FE0C8"));

        assert!(!is_valid_uuid("67e5504410b1426f9247bb680e5fe0c8"));
        assert!(!is_valid_uuid("not-a-uuid"));
        assert!(!is_valid_uuid("00000000-0000-0000-0000-000000000000"));
        // v7
        assert!(!is_valid_uuid("01890a5d-ac96-774b-bcce-b302099a8057"));
    }

    #[test]
    fn test_invite_token() {
        let token = "0123456789abcdef".repeat(4);
        assert!(is_valid_invite_token(&token));

        assert!(!is_valid_invite_token(&token[..63]));
        assert!(!is_valid_invite_token(&format!("{}0", token)));
        assert!(!is_valid_invite_token(&token.to_uppercase()));
        assert!(!is_valid_invite_token(&"g".repeat(64)));
        assert!(!is_valid_invite_token(""));
    }
}
