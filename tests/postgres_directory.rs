//! `PgUserDirectory` against a real PostgreSQL server.
//!
//! Each test creates a throwaway database from the `database` settings and
//! runs the migrations into it. When no server answers, the test logs why and
//! returns early.

use std::time::Duration;

use chrono::Utc;
use sqlx::{Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;

use staffauth::configuration::get_configuration;
use staffauth::directory::{PageRequest, PgUserDirectory, Role, User, UserDirectory};
use staffauth::error::{AppError, DatabaseError, ErrorHandler};

async fn spawn_directory() -> Option<PgUserDirectory> {
    let configuration = get_configuration().expect("Failed to read configuration.");
    let server = configuration.database.connection_string_without_db();

    let connect = PgConnection::connect(&server);
    let mut connection = match tokio::time::timeout(Duration::from_secs(3), connect).await {
        Ok(Ok(connection)) => connection,
        Ok(Err(e)) => {
            eprintln!("skipping: PostgreSQL unavailable at {}: {}", server, e);
            return None;
        }
        Err(_) => {
            eprintln!("skipping: PostgreSQL at {} did not answer", server);
            return None;
        }
    };

    let database_name = Uuid::new_v4().to_string();
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, database_name))
        .await
        .expect("Failed to create database.");

    let pool = PgPool::connect(&format!("{}/{}", server, database_name))
        .await
        .expect("Failed to connect to Postgres.");
    let directory = PgUserDirectory::new(pool);
    directory
        .migrate()
        .await
        .expect("Failed to migrate the database.");

    Some(directory)
}

fn new_user(staff_no: &str, email: &str) -> User {
    let id = Uuid::new_v4();
    let now = Utc::now();
    User {
        id,
        user_id: id.to_string(),
        name: format!("User {}", staff_no),
        staff_no: staff_no.to_string(),
        email: email.to_string(),
        password_hash: "$2b$04$abcdefghijklmnopqrstuuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0".to_string(),
        user_type: Role::User,
        token: None,
        refresh_token: None,
        created_at: now,
        updated_at: now,
    }
}

#[tokio::test]
async fn existence_counts_match_input_literally() {
    let Some(directory) = spawn_directory().await else { return };

    directory
        .insert(&new_user("ST(1)", "a.b+c@example.com"))
        .await
        .unwrap();

    assert_eq!(directory.email_exists("A.B+C@example.com").await.unwrap(), 1);
    assert_eq!(directory.email_exists("b+c@").await.unwrap(), 1);
    // '.' and '+' must not act as regex operators
    assert_eq!(directory.email_exists("aXb+c").await.unwrap(), 0);
    assert_eq!(directory.email_exists("a.bbc").await.unwrap(), 0);

    assert_eq!(directory.staff_number_exists("st(1)").await.unwrap(), 1);
    assert_eq!(directory.staff_number_exists(".*").await.unwrap(), 0);
    assert_eq!(directory.staff_number_exists("ST(2)").await.unwrap(), 0);
}

#[tokio::test]
async fn duplicate_insert_maps_to_duplicate_entry() {
    let Some(directory) = spawn_directory().await else { return };

    directory
        .insert(&new_user("ST-1", "jane@example.com"))
        .await
        .unwrap();

    let same_email = directory
        .insert(&new_user("ST-2", "JANE@example.com"))
        .await
        .unwrap_err();
    match &same_email {
        AppError::Database(DatabaseError::UniqueConstraintViolation(msg)) => {
            assert_eq!(msg, "this email already exists")
        }
        other => panic!("expected a duplicate error, got {:?}", other),
    }
    let (status, body) = ErrorHandler::error_response(&same_email, "req");
    assert_eq!(status.as_u16(), 400);
    assert_eq!(body.code, "DUPLICATE_ENTRY");

    let same_staff = directory
        .insert(&new_user("st-1", "other@example.com"))
        .await
        .unwrap_err();
    match same_staff {
        AppError::Database(DatabaseError::UniqueConstraintViolation(msg)) => {
            assert_eq!(msg, "this staff number already exists")
        }
        other => panic!("expected a duplicate error, got {:?}", other),
    }
}

#[tokio::test]
async fn pages_follow_the_remaining_count() {
    let Some(directory) = spawn_directory().await else { return };

    let empty = directory.list_page(&PageRequest::default()).await.unwrap();
    assert_eq!(empty.total_count, 0);
    assert!(empty.user_items.is_empty());

    let n = 7_i64;
    for i in 0..n {
        let mut user = new_user(&format!("S-{:02}", i), &format!("u{}@example.com", i));
        // distinct, increasing creation times
        user.created_at = Utc::now() + chrono::Duration::milliseconds(i);
        directory.insert(&user).await.unwrap();
    }

    let p = 3_i64;
    for k in 1..=4_i64 {
        let request = PageRequest {
            page: k,
            page_size: p,
            start_index: None,
        };
        let page = directory.list_page(&request).await.unwrap();
        assert_eq!(page.total_count, n);
        assert_eq!(
            page.user_items.len() as i64,
            p.min((n - (k - 1) * p).max(0)),
            "page {}",
            k
        );
    }

    let second = directory
        .list_page(&PageRequest {
            page: 2,
            page_size: 3,
            start_index: None,
        })
        .await
        .unwrap();
    let staff: Vec<_> = second.user_items.iter().map(|u| u.staff_no.as_str()).collect();
    assert_eq!(staff, vec!["S-03", "S-04", "S-05"]);
}

#[tokio::test]
async fn updates_report_missing_rows() {
    let Some(directory) = spawn_directory().await else { return };

    let user = new_user("ST-1", "jane@example.com");
    directory.insert(&user).await.unwrap();

    directory.update_name(user.id, "Jane Renamed").await.unwrap();
    let stamp = Utc::now();
    directory
        .update_tokens(&user.user_id, "access", "refresh", stamp)
        .await
        .unwrap();

    let stored = directory.find_by_staff_number("ST-1").await.unwrap();
    assert_eq!(stored.name, "Jane Renamed");
    assert_eq!(stored.token.as_deref(), Some("access"));
    assert_eq!(stored.refresh_token.as_deref(), Some("refresh"));
    assert!(stored.updated_at > user.updated_at);

    assert!(directory
        .update_name(Uuid::new_v4(), "Nobody")
        .await
        .unwrap_err()
        .is_not_found());
    assert!(directory
        .update_tokens("missing", "a", "r", stamp)
        .await
        .unwrap_err()
        .is_not_found());
    assert!(directory.find_by_id("missing").await.unwrap_err().is_not_found());
}
