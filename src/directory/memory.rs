use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PageRequest, User, UserDirectory, UserPage};
use crate::error::{AppError, DatabaseError};

/// Process-local user store. Records are kept in insertion order, and the
/// email and staff number unique indexes of the SQL schema are enforced on
/// insert.
#[derive(Default)]
pub struct InMemoryUserDirectory {
    users: RwLock<Vec<User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn email_exists(&self, pattern: &str) -> Result<i64, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| contains_ignore_case(&u.email, pattern))
            .count() as i64)
    }

    async fn staff_number_exists(&self, pattern: &str) -> Result<i64, AppError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| contains_ignore_case(&u.staff_no, pattern))
            .count() as i64)
    }

    async fn insert(&self, user: &User) -> Result<Uuid, AppError> {
        let mut users = self.users.write().await;

        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "this email already exists".to_string(),
            )
            .into());
        }
        if users
            .iter()
            .any(|u| u.staff_no.eq_ignore_ascii_case(&user.staff_no))
        {
            return Err(DatabaseError::UniqueConstraintViolation(
                "this staff number already exists".to_string(),
            )
            .into());
        }
        if users.iter().any(|u| u.id == user.id) {
            return Err(DatabaseError::UniqueConstraintViolation(
                "this user already exists".to_string(),
            )
            .into());
        }

        users.push(user.clone());
        Ok(user.id)
    }

    async fn find_by_staff_number(&self, staff_no: &str) -> Result<User, AppError> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.staff_no == staff_no)
            .cloned()
            .ok_or_else(|| AppError::not_found("user"))
    }

    async fn find_by_id(&self, user_id: &str) -> Result<User, AppError> {
        let users = self.users.read().await;
        users
            .iter()
            .find(|u| u.user_id == user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("user"))
    }

    async fn update_name(&self, id: Uuid, name: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| AppError::not_found("user"))?;
        user.name = name.to_string();
        Ok(())
    }

    async fn update_tokens(
        &self,
        user_id: &str,
        token: &str,
        refresh_token: &str,
        updated_at: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let user = users
            .iter_mut()
            .find(|u| u.user_id == user_id)
            .ok_or_else(|| AppError::not_found("user"))?;
        user.token = Some(token.to_string());
        user.refresh_token = Some(refresh_token.to_string());
        user.updated_at = updated_at;
        Ok(())
    }

    async fn list_page(&self, request: &PageRequest) -> Result<UserPage, AppError> {
        let users = self.users.read().await;
        if users.is_empty() {
            return Ok(UserPage::empty());
        }

        let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
        let limit = usize::try_from(request.page_size).unwrap_or(0);

        Ok(UserPage {
            total_count: users.len() as i64,
            user_items: users.iter().skip(offset).take(limit).cloned().collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::{test_user, Role};

    async fn seeded(n: usize) -> InMemoryUserDirectory {
        let directory = InMemoryUserDirectory::new();
        for i in 0..n {
            let user = test_user(&format!("S-{:03}", i), &format!("u{}@example.com", i), Role::User);
            directory.insert(&user).await.unwrap();
        }
        directory
    }

    #[tokio::test]
    async fn existence_checks_are_case_insensitive_substrings() {
        let directory = InMemoryUserDirectory::new();
        let user = test_user("STAFF-42", "Jane.Doe@Example.com", Role::User);
        directory.insert(&user).await.unwrap();

        assert_eq!(directory.email_exists("jane.doe@example.com").await.unwrap(), 1);
        assert_eq!(directory.email_exists("doe@example").await.unwrap(), 1);
        assert_eq!(directory.email_exists("john@example.com").await.unwrap(), 0);
        assert_eq!(directory.staff_number_exists("staff-42").await.unwrap(), 1);
        assert_eq!(directory.staff_number_exists("STAFF-43").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn insert_rejects_duplicates() {
        let directory = InMemoryUserDirectory::new();
        directory
            .insert(&test_user("S-1", "a@example.com", Role::User))
            .await
            .unwrap();

        let same_email = test_user("S-2", "A@example.com", Role::User);
        let err = directory.insert(&same_email).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Database(DatabaseError::UniqueConstraintViolation(_))
        ));

        let same_staff = test_user("s-1", "b@example.com", Role::User);
        assert!(directory.insert(&same_staff).await.is_err());
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn lookups_fail_with_not_found() {
        let directory = InMemoryUserDirectory::new();
        assert!(directory.find_by_id("missing").await.unwrap_err().is_not_found());
        assert!(directory
            .find_by_staff_number("missing")
            .await
            .unwrap_err()
            .is_not_found());
        assert!(directory
            .update_name(Uuid::new_v4(), "x")
            .await
            .unwrap_err()
            .is_not_found());
    }

    #[tokio::test]
    async fn update_name_keeps_updated_at() {
        let directory = InMemoryUserDirectory::new();
        let user = test_user("S-1", "a@example.com", Role::User);
        directory.insert(&user).await.unwrap();

        directory.update_name(user.id, "Renamed").await.unwrap();
        let stored = directory.find_by_id(&user.user_id).await.unwrap();
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.updated_at, user.updated_at);
    }

    #[tokio::test]
    async fn empty_collection_lists_zero_results() {
        let directory = InMemoryUserDirectory::new();
        let page = directory.list_page(&PageRequest::default()).await.unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.user_items.is_empty());
    }

    #[tokio::test]
    async fn page_sizes_follow_the_remaining_count() {
        let n = 23_i64;
        let p = 10_i64;
        let directory = seeded(n as usize).await;

        for k in 1..=4_i64 {
            let request = PageRequest {
                page: k,
                page_size: p,
                start_index: None,
            };
            let page = directory.list_page(&request).await.unwrap();
            let expected = p.min((n - (k - 1) * p).max(0));
            assert_eq!(page.total_count, n);
            assert_eq!(page.user_items.len() as i64, expected, "page {}", k);
        }
    }

    #[tokio::test]
    async fn pages_preserve_insertion_order() {
        let directory = seeded(5).await;
        let request = PageRequest {
            page: 2,
            page_size: 2,
            start_index: None,
        };
        let page = directory.list_page(&request).await.unwrap();
        let staff: Vec<_> = page.user_items.iter().map(|u| u.staff_no.as_str()).collect();
        assert_eq!(staff, vec!["S-002", "S-003"]);
    }

    #[tokio::test]
    async fn start_index_override_is_honoured() {
        let directory = seeded(5).await;
        let request = PageRequest {
            page: 1,
            page_size: 2,
            start_index: Some(4),
        };
        let page = directory.list_page(&request).await.unwrap();
        assert_eq!(page.user_items.len(), 1);
        assert_eq!(page.user_items[0].staff_no, "S-004");
    }
}
