/// Authentication module
///
/// Password hashing, JWT issuance/validation and role guards.

mod claims;
mod guard;
mod jwt;
mod password;

pub use claims::Claims;
pub use claims::TokenKind;
pub use guard::require_role;
pub use guard::require_self_or_role;
pub use jwt::generate_tokens;
pub use jwt::persist_tokens;
pub use jwt::validate_access_token;
pub use jwt::validate_token;
pub use jwt::TokenPair;
pub use password::hash_password;
pub use password::validate_password;
pub use password::verify_password;
pub use password::MAX_HASH_COST;
pub use password::MIN_HASH_COST;
