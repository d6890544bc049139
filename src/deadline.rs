use std::future::Future;
use std::time::Duration;

use tokio::time::{timeout_at, Instant};

use crate::error::{AppError, DatabaseError};

/// Wall-clock budget shared by every storage call of one request.
///
/// A call still running at the deadline is dropped and fails with
/// `DatabaseError::Timeout`.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub async fn run<F, T>(&self, operation: F) -> Result<T, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match timeout_at(self.at, operation).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!("storage operation exceeded its deadline");
                Err(DatabaseError::Timeout.into())
            }
        }
    }
}
