/// User Service
///
/// The five user operations, independent of the HTTP framework. Every method
/// takes explicit inputs (request body, caller claims) and returns a
/// `Result<_, AppError>`; the route layer only translates to and from HTTP.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::auth::{
    generate_tokens, hash_password, persist_tokens, require_role, require_self_or_role,
    validate_password, verify_password, Claims,
};
use crate::configuration::JwtSettings;
use crate::deadline::Deadline;
use crate::directory::{PageRequest, Role, User, UserDirectory, UserPage};
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext};
use crate::validators::{
    is_valid_email, is_valid_name, is_valid_role, is_valid_staff_number, required,
};

pub const SIGNUP_TIMEOUT: Duration = Duration::from_secs(10);
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(100);

// verified against when the staff number is unknown, so both failures cost one bcrypt run
const DUMMY_PASSWORD: &str = "staffauth-unknown-staff-number";

/// Signup request body
#[derive(Deserialize)]
pub struct SignupRequest {
    pub name: Option<String>,
    pub staff_no: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "role")]
    pub user_type: Option<String>,
}

/// Login request body
#[derive(Deserialize)]
pub struct LoginRequest {
    pub staff_no: Option<String>,
    pub password: Option<String>,
}

/// Edit request body; only the name is editable
#[derive(Deserialize)]
pub struct EditUserRequest {
    pub name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub inserted_id: Uuid,
    pub user: User,
}

#[derive(Clone)]
pub struct UserService {
    directory: Arc<dyn UserDirectory>,
    jwt: JwtSettings,
    hash_cost: u32,
    dummy_hash: Arc<OnceCell<String>>,
}

impl UserService {
    pub fn new(directory: Arc<dyn UserDirectory>, jwt: JwtSettings, hash_cost: u32) -> Self {
        Self {
            directory,
            jwt,
            hash_cost,
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    /// Spend one verification at the configured cost on a throwaway hash.
    /// The hash is built on first use; the outcome is ignored.
    async fn verify_against_dummy(&self, password: &str) {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| hash_password(DUMMY_PASSWORD, self.hash_cost))
            .await;

        match hash {
            Ok(hash) => {
                let _ = verify_password(password, hash).await;
            }
            Err(e) => tracing::error!(error = %e, "Failed to build dummy password hash"),
        }
    }

    /// Register a user and return the stored record with its first tokens
    ///
    /// # Errors
    /// - Validation: missing or malformed field
    /// - Duplicate: email or staff number already present
    /// - Storage or timeout while checking or inserting
    pub async fn signup(&self, request: SignupRequest) -> Result<SignupResponse, AppError> {
        let context = ErrorContext::new("user_signup");
        let deadline = Deadline::after(SIGNUP_TIMEOUT);

        self.signup_within(request, &deadline, &context)
            .await
            .map_err(|e| context.trace(e))
    }

    async fn signup_within(
        &self,
        request: SignupRequest,
        deadline: &Deadline,
        context: &ErrorContext,
    ) -> Result<SignupResponse, AppError> {
        let name = is_valid_name(required(request.name.as_deref(), "name")?)?;
        let email = is_valid_email(required(request.email.as_deref(), "email")?)?;
        let staff_no = is_valid_staff_number(required(request.staff_no.as_deref(), "staff_no")?)?;
        let password = required(request.password.as_deref(), "password")?;
        validate_password(password)?;
        let user_type = is_valid_role(required(request.user_type.as_deref(), "user_type")?)?;

        // check-then-insert is not atomic; the store's unique indexes catch the race
        if deadline.run(self.directory.email_exists(&email)).await? > 0 {
            return Err(DatabaseError::UniqueConstraintViolation(
                "this email already exists".to_string(),
            )
            .into());
        }
        if deadline.run(self.directory.staff_number_exists(&staff_no)).await? > 0 {
            return Err(DatabaseError::UniqueConstraintViolation(
                "this staff number already exists".to_string(),
            )
            .into());
        }

        let password_hash = hash_password(password, self.hash_cost).await?;

        let id = Uuid::new_v4();
        let now = Utc::now();
        let mut user = User {
            id,
            user_id: id.to_string(),
            name,
            staff_no,
            email,
            password_hash,
            user_type,
            token: None,
            refresh_token: None,
            created_at: now,
            updated_at: now,
        };

        let tokens = generate_tokens(&user, &self.jwt)?;
        user.token = Some(tokens.access_token);
        user.refresh_token = Some(tokens.refresh_token);

        let inserted_id = deadline.run(self.directory.insert(&user)).await?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %user.user_id,
            staff_no = %user.staff_no,
            role = %user.user_type,
            "User signed up"
        );

        Ok(SignupResponse { inserted_id, user })
    }

    /// Authenticate by staff number and password, rotate the stored tokens and
    /// return the refreshed record
    ///
    /// An unknown staff number and a wrong password produce the same
    /// `InvalidCredentials` error.
    pub async fn login(&self, request: LoginRequest) -> Result<User, AppError> {
        let context = ErrorContext::new("user_login");
        let deadline = Deadline::after(REQUEST_TIMEOUT);

        self.login_within(request, &deadline, &context)
            .await
            .map_err(|e| context.trace(e))
    }

    async fn login_within(
        &self,
        request: LoginRequest,
        deadline: &Deadline,
        context: &ErrorContext,
    ) -> Result<User, AppError> {
        let staff_no = required(request.staff_no.as_deref(), "staff_no")?.trim();
        let password = required(request.password.as_deref(), "password")?;

        let user = match deadline.run(self.directory.find_by_staff_number(staff_no)).await {
            Ok(user) => user,
            Err(e) if e.is_not_found() => {
                self.verify_against_dummy(password).await;
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        verify_password(password, &user.password_hash).await?;

        let tokens = generate_tokens(&user, &self.jwt)?;
        deadline
            .run(persist_tokens(self.directory.as_ref(), &tokens, &user.user_id))
            .await?;

        let refreshed = deadline.run(self.directory.find_by_id(&user.user_id)).await?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %refreshed.user_id,
            "User logged in"
        );

        Ok(refreshed)
    }

    /// Fetch one user; callers may read themselves, admins may read anyone
    pub async fn get_user(&self, caller: &Claims, user_id: &str) -> Result<User, AppError> {
        let context = ErrorContext::new("get_user").with_user_id(caller.user_id());
        let deadline = Deadline::after(REQUEST_TIMEOUT);

        if let Err(e) = require_self_or_role(caller, user_id, Role::Admin) {
            return Err(context.trace(e.into()));
        }

        deadline
            .run(self.directory.find_by_id(user_id))
            .await
            .map_err(|e| context.trace(e))
    }

    /// Rename a user addressed by internal id
    ///
    /// A missing or malformed id names no user and yields not-found. Callers
    /// may edit themselves; admins may edit anyone.
    pub async fn edit_user(
        &self,
        caller: &Claims,
        id: Option<&str>,
        request: EditUserRequest,
    ) -> Result<(), AppError> {
        let context = ErrorContext::new("edit_user").with_user_id(caller.user_id());
        let deadline = Deadline::after(REQUEST_TIMEOUT);

        self.edit_user_within(caller, id, request, &deadline, &context)
            .await
            .map_err(|e| context.trace(e))
    }

    async fn edit_user_within(
        &self,
        caller: &Claims,
        id: Option<&str>,
        request: EditUserRequest,
        deadline: &Deadline,
        context: &ErrorContext,
    ) -> Result<(), AppError> {
        let id = id
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| Uuid::parse_str(raw).ok())
            .ok_or_else(|| AppError::not_found("user id"))?;

        require_self_or_role(caller, &id.to_string(), Role::Admin)?;

        let name = is_valid_name(required(request.name.as_deref(), "name")?)?;
        deadline.run(self.directory.update_name(id, &name)).await?;

        tracing::info!(
            request_id = %context.request_id,
            target = %id,
            "User details updated"
        );
        Ok(())
    }

    /// Admin-only paginated listing
    pub async fn list_users(
        &self,
        caller: &Claims,
        request: PageRequest,
    ) -> Result<UserPage, AppError> {
        let context = ErrorContext::new("list_users").with_user_id(caller.user_id());
        let deadline = Deadline::after(REQUEST_TIMEOUT);

        if let Err(e) = require_role(caller, Role::Admin) {
            return Err(context.trace(e.into()));
        }

        deadline
            .run(self.directory.list_page(&request))
            .await
            .map_err(|e| context.trace(e))
    }
}
