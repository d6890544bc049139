/// JWT Token Generation and Validation
///
/// Issues the access/refresh pair for a user, stores the pair on the user
/// record, and validates presented access tokens.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::Serialize;

use crate::auth::claims::{Claims, TokenKind};
use crate::configuration::JwtSettings;
use crate::directory::{User, UserDirectory};
use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

fn sign(claims: &Claims, config: &JwtSettings) -> Result<String, AppError> {
    encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Generate a new access and refresh token for a user
///
/// # Errors
/// Returns error if token signing fails
pub fn generate_tokens(user: &User, config: &JwtSettings) -> Result<TokenPair, AppError> {
    let access = Claims::new(
        user,
        TokenKind::Access,
        config.access_token_expiry,
        config.issuer.clone(),
    );
    let refresh = Claims::new(
        user,
        TokenKind::Refresh,
        config.refresh_token_expiry,
        config.issuer.clone(),
    );

    let pair = TokenPair {
        access_token: sign(&access, config)?,
        refresh_token: sign(&refresh, config)?,
    };
    tracing::debug!(user_id = %user.user_id, "token pair signed");
    Ok(pair)
}

/// Store a freshly issued pair on the user record, refreshing `updated_at`
///
/// # Errors
/// Returns the storage error; the caller must not hand out tokens that were
/// not persisted.
pub async fn persist_tokens(
    directory: &dyn UserDirectory,
    tokens: &TokenPair,
    user_id: &str,
) -> Result<(), AppError> {
    directory
        .update_tokens(
            user_id,
            &tokens.access_token,
            &tokens.refresh_token,
            chrono::Utc::now(),
        )
        .await
        .map_err(|e| {
            tracing::error!(user_id = %user_id, error = %e, "Failed to persist tokens");
            e
        })
}

/// Validate a token's signature, expiry and issuer
pub fn validate_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&config.issuer]);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::warn!("JWT validation error: {}", e);
        match e.kind() {
            ErrorKind::ExpiredSignature => AppError::Auth(AuthError::TokenExpired),
            _ => AppError::Auth(AuthError::TokenInvalid),
        }
    })
}

/// Validate a bearer credential; refresh tokens are not accepted here
pub fn validate_access_token(token: &str, config: &JwtSettings) -> Result<Claims, AppError> {
    let claims = validate_token(token, config)?;
    if claims.kind != TokenKind::Access {
        tracing::warn!(user_id = %claims.sub, "refresh token presented as access token");
        return Err(AppError::Auth(AuthError::TokenInvalid));
    }
    Ok(claims)
}
