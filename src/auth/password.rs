/// Password Hashing and Verification
///
/// bcrypt with a configurable work factor. Hashing is CPU-bound, so it runs on
/// the blocking pool instead of an actix worker.

use bcrypt::{hash, verify};

use crate::error::{AppError, AuthError, ValidationError};

pub const MIN_HASH_COST: u32 = 4;
pub const MAX_HASH_COST: u32 = 31;

const MIN_PASSWORD_LENGTH: usize = 6;
// bcrypt ignores input past 72 bytes
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password using bcrypt
///
/// # Errors
/// Returns a validation error for unusable passwords and an internal error if
/// bcrypt fails. Never panics.
pub async fn hash_password(password: &str, cost: u32) -> Result<String, AppError> {
    validate_password(password)?;

    let password = password.to_owned();
    tokio::task::spawn_blocking(move || hash(password, cost))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
        .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its stored hash
///
/// Any mismatch, including an unparseable stored hash, is reported as the
/// same generic credential error.
pub async fn verify_password(password: &str, password_hash: &str) -> Result<(), AuthError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();

    let matches = tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| {
            tracing::error!("Password verification task failed: {}", e);
            AuthError::InvalidCredentials
        })?
        .unwrap_or_else(|e| {
            tracing::warn!("Stored password hash could not be verified: {}", e);
            false
        });

    if matches {
        Ok(())
    } else {
        Err(AuthError::InvalidCredentials)
    }
}

/// Required, at least 6 characters, at most 72 bytes
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password".to_string()));
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort(
            "password".to_string(),
            MIN_PASSWORD_LENGTH,
        ));
    }

    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong(
            "password".to_string(),
            MAX_PASSWORD_BYTES,
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = MIN_HASH_COST;

    #[tokio::test]
    async fn test_hash_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password, COST).await.expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_same_password_gets_different_salts() {
        let first = hash_password("secret-pass", COST).await.unwrap();
        let second = hash_password("secret-pass", COST).await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_verify_password() {
        let password = "ValidPassword123";
        let hash = hash_password(password, COST).await.unwrap();

        assert!(verify_password(password, &hash).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_wrong_password() {
        let hash = hash_password("ValidPassword123", COST).await.unwrap();

        let err = verify_password("WrongPassword123", &hash).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
        assert_eq!(err.to_string(), "staff number or password is incorrect");
    }

    #[tokio::test]
    async fn test_malformed_hash_is_a_generic_failure() {
        let err = verify_password("anything", "not-a-bcrypt-hash").await.unwrap_err();
        assert_eq!(err, AuthError::InvalidCredentials);
    }

    #[tokio::test]
    async fn test_too_short_password() {
        assert!(hash_password("abc", COST).await.is_err());
    }

    #[test]
    fn test_password_limits() {
        assert!(validate_password("").is_err());
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
        assert!(validate_password(&"a".repeat(72)).is_ok());
        assert!(validate_password(&"a".repeat(73)).is_err());
    }
}
