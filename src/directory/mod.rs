/// User Directory
///
/// Storage-agnostic access to the user collection. The service layer only
/// sees `dyn UserDirectory`; PostgreSQL backs production and the in-process
/// store backs tests and local runs.

mod memory;
mod postgres;
mod user;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;

pub use memory::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;
#[cfg(test)]
pub(crate) use user::test_user;
pub use user::{Role, User};

const DEFAULT_PAGE_SIZE: i64 = 10;
const DEFAULT_PAGE: i64 = 1;

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Number of users whose email contains `pattern`, ignoring case
    async fn email_exists(&self, pattern: &str) -> Result<i64, AppError>;

    /// Number of users whose staff number contains `pattern`, ignoring case
    async fn staff_number_exists(&self, pattern: &str) -> Result<i64, AppError>;

    async fn insert(&self, user: &User) -> Result<Uuid, AppError>;

    async fn find_by_staff_number(&self, staff_no: &str) -> Result<User, AppError>;

    async fn find_by_id(&self, user_id: &str) -> Result<User, AppError>;

    /// Leaves `updated_at` untouched
    async fn update_name(&self, id: Uuid, name: &str) -> Result<(), AppError>;

    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError>;

    /// Total count plus one page, in insertion order
    async fn list_page(&self, request: &PageRequest) -> Result<UserPage, AppError>;
}

/// Pagination parameters for the admin listing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub page_size: i64,
    pub start_index: Option<i64>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            start_index: None,
        }
    }
}

impl PageRequest {
    /// Parse raw query values. Absent, unparseable or non-positive page and
    /// page size fall back to 1 and 10; a start index is only honoured when
    /// it parses to a non-negative number.
    pub fn from_params(
        record_per_page: Option<&str>,
        page: Option<&str>,
        start_index: Option<&str>,
    ) -> Self {
        fn positive(raw: Option<&str>) -> Option<i64> {
            raw.and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 1)
        }

        Self {
            page: positive(page).unwrap_or(DEFAULT_PAGE),
            page_size: positive(record_per_page).unwrap_or(DEFAULT_PAGE_SIZE),
            start_index: start_index
                .and_then(|v| v.trim().parse::<i64>().ok())
                .filter(|v| *v >= 0),
        }
    }

    /// Zero-based offset of the first record on the page
    pub fn offset(&self) -> i64 {
        self.start_index
            .unwrap_or_else(|| (self.page - 1).saturating_mul(self.page_size))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPage {
    pub total_count: i64,
    pub user_items: Vec<User>,
}

impl UserPage {
    pub fn empty() -> Self {
        Self {
            total_count: 0,
            user_items: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_params_are_missing() {
        let req = PageRequest::from_params(None, None, None);
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.offset(), 0);
    }

    #[test]
    fn invalid_params_fall_back_to_defaults() {
        let req = PageRequest::from_params(Some("abc"), Some("0"), Some("-4"));
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 10);
        assert_eq!(req.start_index, None);
    }

    #[test]
    fn offset_is_computed_from_page() {
        let req = PageRequest::from_params(Some("5"), Some("3"), None);
        assert_eq!(req.offset(), 10);
    }

    #[test]
    fn start_index_overrides_page() {
        let req = PageRequest::from_params(Some("5"), Some("3"), Some("2"));
        assert_eq!(req.offset(), 2);
    }

    #[test]
    fn empty_page_serializes_as_zero_results() {
        let json = serde_json::to_value(UserPage::empty()).unwrap();
        assert_eq!(json["total_count"], 0);
        assert_eq!(json["user_items"].as_array().map(Vec::len), Some(0));
    }
}
