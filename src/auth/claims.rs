/// JWT Claims structure
///
/// Both the access and the refresh token carry the full identity of the user
/// (email, name, staff number, role, id) plus the standard RFC 7519 claims.

use serde::{Deserialize, Serialize};

use crate::directory::{Role, User};

/// Distinguishes access tokens from refresh tokens
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (the user's `user_id`)
    pub sub: String,
    pub email: String,
    pub name: String,
    pub staff_no: String,
    pub user_type: Role,
    pub kind: TokenKind,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    pub iss: String,
}

impl Claims {
    /// Create claims for `user` that expire `expiry_seconds` from now
    pub fn new(user: &User, kind: TokenKind, expiry_seconds: i64, issuer: String) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user.user_id.clone(),
            email: user.email.clone(),
            name: user.name.clone(),
            staff_no: user.staff_no.clone(),
            user_type: user.user_type,
            kind,
            exp: now + expiry_seconds,
            iat: now,
            iss: issuer,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.sub
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::test_user;

    #[test]
    fn test_claims_creation() {
        let user = test_user("S-100", "test@example.com", Role::User);
        let claims = Claims::new(&user, TokenKind::Access, 3600, "test".to_string());

        assert_eq!(claims.sub, user.user_id);
        assert_eq!(claims.user_id(), user.user_id);
        assert_eq!(claims.email, "test@example.com");
        assert_eq!(claims.staff_no, "S-100");
        assert_eq!(claims.user_type, Role::User);
        assert_eq!(claims.iss, "test");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_negative_expiry_lands_in_the_past() {
        let user = test_user("S-101", "late@example.com", Role::Admin);
        let claims = Claims::new(&user, TokenKind::Refresh, -10, "test".to_string());
        assert!(claims.exp < chrono::Utc::now().timestamp());
    }

    #[test]
    fn test_role_serializes_uppercase() {
        let user = test_user("S-102", "admin@example.com", Role::Admin);
        let claims = Claims::new(&user, TokenKind::Access, 60, "test".to_string());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["user_type"], "ADMIN");
        assert_eq!(json["kind"], "access");
    }
}
