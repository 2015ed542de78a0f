use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::PackageBase;
use crate::error::{IntegrityError, Result};

/// Describe the `PackageKeywords` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageKeyword {
    /// Reference to [`PackageBase`] id property
    pub package_base_id: i64,
    pub keyword: String,
}

impl PackageKeyword {
    /// Bind `keyword` to `package_base`. Fails without touching storage when
    /// no base is given.
    pub fn new(
        package_base: Option<&PackageBase>,
        keyword: impl Into<String>,
    ) -> std::result::Result<Self, IntegrityError> {
        let package_base =
            package_base.ok_or_else(|| IntegrityError::missing("PackageKeywords", "PackageBaseID"))?;

        Ok(Self {
            package_base_id: package_base.id,
            keyword: keyword.into(),
        })
    }

    pub async fn insert(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("INSERT INTO PackageKeywords (PackageBaseID, Keyword) VALUES (?, ?)")
            .bind(self.package_base_id)
            .bind(&self.keyword)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn delete(&self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("DELETE FROM PackageKeywords WHERE PackageBaseID = ? AND Keyword = ?")
            .bind(self.package_base_id)
            .bind(&self.keyword)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn for_package_base(
        conn: &mut SqliteConnection,
        package_base_id: i64,
    ) -> Result<Vec<PackageKeyword>> {
        let keywords = sqlx::query_as::<_, PackageKeyword>(
            "SELECT PackageBaseID AS package_base_id, Keyword AS keyword \
             FROM PackageKeywords WHERE PackageBaseID = ? ORDER BY Keyword",
        )
        .bind(package_base_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(keywords)
    }
}
