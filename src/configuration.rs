use crate::auth::{MAX_HASH_COST, MIN_HASH_COST};
use crate::error::ConfigError;

const DEFAULT_PORT: u16 = 8000;

#[derive(serde::Deserialize, Clone, Debug)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
    /// bcrypt work factor
    pub password_hash_cost: u32,
    /// Mount the edit and admin listing endpoints
    pub expose_management_routes: bool,
}

impl ApplicationSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(serde::Deserialize, Clone, Debug)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    /// Full connection string; wins over the individual fields when set
    pub url: Option<String>,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        if let Some(url) = &self.url {
            return url.clone();
        }
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }

    /// Server address with the database path removed
    pub fn connection_string_without_db(&self) -> String {
        if let Some(url) = &self.url {
            let authority = url.find("://").map(|i| i + 3).unwrap_or(0);
            return match url[authority..].find('/') {
                Some(i) => url[..authority + i].to_string(),
                None => url.clone(),
            };
        }
        format!(
            "postgres://{}:{}@{}:{}",
            self.username, self.password, self.host, self.port
        )
    }
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone, Debug)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (86400 = 24 hours)
    pub refresh_token_expiry: i64,  // seconds (604800 = 7 days)
    pub issuer: String,
}

/// Load settings: defaults, then an optional `configuration.{yaml,toml,json}`
/// file, then `APP__SECTION__KEY` variables, then `PORT`, `SECRET_KEY` and
/// `DATABASE_URL`.
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let mut builder = config::Config::builder()
        .set_default("application.host", "0.0.0.0")
        .and_then(|b| b.set_default("application.port", DEFAULT_PORT as i64))
        .and_then(|b| b.set_default("application.password_hash_cost", 14_i64))
        .and_then(|b| b.set_default("application.expose_management_routes", false))
        .and_then(|b| b.set_default("database.username", "postgres"))
        .and_then(|b| b.set_default("database.password", "password"))
        .and_then(|b| b.set_default("database.host", "localhost"))
        .and_then(|b| b.set_default("database.port", 5432_i64))
        .and_then(|b| b.set_default("database.database_name", "staffauth"))
        .and_then(|b| b.set_default("jwt.issuer", "staffauth"))
        .and_then(|b| b.set_default("jwt.access_token_expiry", 24 * 60 * 60_i64))
        .and_then(|b| b.set_default("jwt.refresh_token_expiry", 7 * 24 * 60 * 60_i64))
        .map_err(|e| ConfigError::InvalidValue(e.to_string()))?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("__")
                .separator("__"),
        );

    let overrides = [
        ("application.port", "PORT"),
        ("jwt.secret", "SECRET_KEY"),
        ("database.url", "DATABASE_URL"),
    ];
    for (key, var) in overrides {
        if let Ok(value) = std::env::var(var) {
            if value.is_empty() {
                continue;
            }
            builder = builder
                .set_override(key, value)
                .map_err(|e| ConfigError::InvalidValue(format!("{}: {}", var, e)))?;
        }
    }

    let settings = builder
        .build()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?
        .try_deserialize::<Settings>()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.jwt.secret.trim().is_empty() {
        return Err(ConfigError::MissingRequired("jwt.secret (SECRET_KEY)".to_string()));
    }
    if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&settings.application.password_hash_cost) {
        return Err(ConfigError::InvalidValue(format!(
            "application.password_hash_cost must be between {} and {}",
            MIN_HASH_COST, MAX_HASH_COST
        )));
    }
    if settings.jwt.access_token_expiry <= 0 || settings.jwt.refresh_token_expiry <= 0 {
        return Err(ConfigError::InvalidValue(
            "jwt token expiries must be positive".to_string(),
        ));
    }
    Ok(())
}
