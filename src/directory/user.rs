use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "ADMIN",
            Role::User => "USER",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ADMIN" => Ok(Role::Admin),
            "USER" => Ok(Role::User),
            _ => Err(ValidationError::InvalidFormat(
                "user_type (expected ADMIN or USER)".to_string(),
            )),
        }
    }
}

/// A stored user. The password hash is never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    /// `id` in string form, kept as its own field for lookups
    pub user_id: String,
    pub name: String,
    pub staff_no: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub user_type: Role,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Row shape of the `users` table
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub staff_no: String,
    pub email: String,
    pub password_hash: String,
    pub user_type: String,
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<UserRecord> for User {
    type Error = ValidationError;

    fn try_from(row: UserRecord) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            staff_no: row.staff_no,
            email: row.email,
            password_hash: row.password_hash,
            user_type: row.user_type.parse()?,
            token: row.token,
            refresh_token: row.refresh_token,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
pub(crate) fn test_user(staff_no: &str, email: &str, role: Role) -> User {
    let id = Uuid::new_v4();
    let now = Utc::now();
    User {
        id,
        user_id: id.to_string(),
        name: format!("User {}", staff_no),
        staff_no: staff_no.to_string(),
        email: email.to_string(),
        password_hash: "$2b$04$invalidinvalidinvalidinvalidinvalidinvalidinvalidinv".to_string(),
        user_type: role,
        token: None,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    }
}
