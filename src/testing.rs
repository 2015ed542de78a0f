//! Fixtures for tests: throwaway databases, table resets and stock users.

use std::sync::atomic::{AtomicUsize, Ordering};

use sqlx::SqliteConnection;

use crate::db::{self, DbPool};
use crate::error::{Error, Result};
use crate::models::{AccountType, NewUser, User};

/// Password given to users made by [`make_user`].
pub const TEST_PASSWORD: &str = "testPassword";

/// Cheapest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

const TABLES: &[&str] = &[
    "AccountTypes",
    "Users",
    "Sessions",
    "PackageBases",
    "PackageKeywords",
    "RequestTypes",
    "PackageRequests",
];

static MEMORY_DB_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Open a private in-memory database with the schema applied. Connections of
/// the returned pool share the same database.
pub async fn memory_pool() -> Result<DbPool> {
    let seq = MEMORY_DB_SEQ.fetch_add(1, Ordering::Relaxed);
    let url = format!(
        "sqlite:file:aurweb-test-{}-{}?mode=memory&cache=shared",
        std::process::id(),
        seq
    );
    db::connect(&url).await
}

/// Delete every row of each table in `tables`, in the order given.
///
/// Only the storage engine's own cascades apply. Nothing is cached between
/// loads, so records fetched afterwards are fresh reads.
///
/// ```ignore
/// setup_test_db(&mut conn, &["PackageRequests", "PackageBases", "Users"]).await?;
/// ```
pub async fn setup_test_db(conn: &mut SqliteConnection, tables: &[&str]) -> Result<()> {
    for table in tables {
        if !TABLES.contains(table) {
            return Err(Error::UnknownTable(table.to_string()));
        }
        sqlx::query(&format!("DELETE FROM {}", table))
            .execute(&mut *conn)
            .await?;
    }

    Ok(())
}

pub async fn make_user(conn: &mut SqliteConnection, username: &str) -> Result<User> {
    let email = format!("{}@example.org", username);
    let new = NewUser {
        username,
        email: &email,
        real_name: "Test User",
        passwd: TEST_PASSWORD,
        account_type: AccountType::User,
    };
    User::create(conn, &new, TEST_BCRYPT_COST).await
}
