use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::PackageRequest;
use crate::error::Result;

pub const DELETION_ID: i64 = 1;
pub const ORPHAN_ID: i64 = 2;
pub const MERGE_ID: i64 = 3;

/// Describe the seeded `RequestTypes` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestType {
    pub id: i64,
    /// One of `deletion`, `orphan` or `merge`
    pub name: String,
}

impl RequestType {
    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<RequestType>> {
        let request_type = sqlx::query_as::<_, RequestType>(
            "SELECT ID AS id, Name AS name FROM RequestTypes WHERE ID = ?",
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(request_type)
    }

    pub async fn find_by_name(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<RequestType>> {
        let request_type = sqlx::query_as::<_, RequestType>(
            "SELECT ID AS id, Name AS name FROM RequestTypes WHERE Name = ?",
        )
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(request_type)
    }

    /// Capitalized name for display.
    pub fn name_display(&self) -> String {
        let mut chars = self.name.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    pub async fn package_requests(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<PackageRequest>> {
        PackageRequest::of_type(conn, self.id).await
    }
}
