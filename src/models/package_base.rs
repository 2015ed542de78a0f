use log::{debug, info};
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::{PackageKeyword, PackageRequest, User};
use crate::db;
use crate::error::{IntegrityError, Result};

const COLUMNS: &str = "ID AS id, Name AS name, OutOfDateTS AS out_of_date_ts, \
    FlaggerComment AS flagger_comment, SubmittedTS AS submitted_ts, ModifiedTS AS modified_ts, \
    FlaggerUID AS flagger_uid, SubmitterUID AS submitter_uid, MaintainerUID AS maintainer_uid, \
    PackagerUID AS packager_uid";

/// The four user associations a package base carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseRole {
    Maintainer,
    Submitter,
    Flagger,
    Packager,
}

impl BaseRole {
    fn column(self) -> &'static str {
        match self {
            BaseRole::Maintainer => "MaintainerUID",
            BaseRole::Submitter => "SubmitterUID",
            BaseRole::Flagger => "FlaggerUID",
            BaseRole::Packager => "PackagerUID",
        }
    }
}

/// Describe the `PackageBases` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageBase {
    pub id: i64,
    pub name: String,
    /// Set while the base is flagged out-of-date
    pub out_of_date_ts: Option<i64>,
    pub flagger_comment: String,
    pub submitted_ts: i64,
    pub modified_ts: i64,
    pub flagger_uid: Option<i64>,
    pub submitter_uid: Option<i64>,
    pub maintainer_uid: Option<i64>,
    pub packager_uid: Option<i64>,
}

/// Fields accepted when submitting a new package base.
#[derive(Debug, Clone, Default)]
pub struct NewPackageBase {
    pub name: Option<String>,
    pub maintainer_uid: Option<i64>,
    pub submitter_uid: Option<i64>,
    pub flagger_uid: Option<i64>,
    pub packager_uid: Option<i64>,
}

impl NewPackageBase {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn maintainer(mut self, user: &User) -> Self {
        self.maintainer_uid = Some(user.id);
        self
    }

    pub fn submitter(mut self, user: &User) -> Self {
        self.submitter_uid = Some(user.id);
        self
    }

    pub fn flagger(mut self, user: &User) -> Self {
        self.flagger_uid = Some(user.id);
        self
    }

    pub fn packager(mut self, user: &User) -> Self {
        self.packager_uid = Some(user.id);
        self
    }

    pub fn validate(&self) -> std::result::Result<&str, IntegrityError> {
        self.name
            .as_deref()
            .ok_or_else(|| IntegrityError::missing("PackageBases", "Name"))
    }
}

impl PackageBase {
    pub async fn create(conn: &mut SqliteConnection, new: NewPackageBase) -> Result<PackageBase> {
        let name = new.validate()?.to_owned();
        let now = db::now();
        let id = sqlx::query(
            "INSERT INTO PackageBases \
             (Name, SubmittedTS, ModifiedTS, FlaggerUID, SubmitterUID, MaintainerUID, PackagerUID) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&name)
        .bind(now)
        .bind(now)
        .bind(new.flagger_uid)
        .bind(new.submitter_uid)
        .bind(new.maintainer_uid)
        .bind(new.packager_uid)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        info!("Created package base {} ({})", name, id);

        Ok(PackageBase {
            id,
            name,
            out_of_date_ts: None,
            flagger_comment: String::new(),
            submitted_ts: now,
            modified_ts: now,
            flagger_uid: new.flagger_uid,
            submitter_uid: new.submitter_uid,
            maintainer_uid: new.maintainer_uid,
            packager_uid: new.packager_uid,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<PackageBase>> {
        let sql = format!("SELECT {} FROM PackageBases WHERE ID = ?", COLUMNS);
        let base = sqlx::query_as::<_, PackageBase>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(base)
    }

    pub async fn find_by_name(
        conn: &mut SqliteConnection,
        name: &str,
    ) -> Result<Option<PackageBase>> {
        let sql = format!("SELECT {} FROM PackageBases WHERE Name = ?", COLUMNS);
        let base = sqlx::query_as::<_, PackageBase>(&sql)
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(base)
    }

    /// Most recently modified bases, newest first.
    pub async fn recent_updates(
        conn: &mut SqliteConnection,
        limit: i64,
    ) -> Result<Vec<PackageBase>> {
        let sql = format!(
            "SELECT {} FROM PackageBases ORDER BY ModifiedTS DESC, ID DESC LIMIT ?",
            COLUMNS
        );
        let bases = sqlx::query_as::<_, PackageBase>(&sql)
            .bind(limit)
            .fetch_all(&mut *conn)
            .await?;
        Ok(bases)
    }

    pub(crate) async fn by_role(
        conn: &mut SqliteConnection,
        role: BaseRole,
        uid: i64,
    ) -> Result<Vec<PackageBase>> {
        let sql = format!(
            "SELECT {} FROM PackageBases WHERE {} = ? ORDER BY ID",
            COLUMNS,
            role.column()
        );
        let bases = sqlx::query_as::<_, PackageBase>(&sql)
            .bind(uid)
            .fetch_all(&mut *conn)
            .await?;
        Ok(bases)
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM PackageBases")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub async fn count_orphans(conn: &mut SqliteConnection) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM PackageBases WHERE MaintainerUID IS NULL")
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }

    pub fn is_flagged(&self) -> bool {
        self.out_of_date_ts.is_some()
    }

    pub async fn flag_out_of_date(
        &mut self,
        conn: &mut SqliteConnection,
        flagger: &User,
        comment: &str,
    ) -> Result<()> {
        let now = db::now();
        sqlx::query(
            "UPDATE PackageBases SET OutOfDateTS = ?, FlaggerUID = ?, FlaggerComment = ?, \
             ModifiedTS = ? WHERE ID = ?",
        )
        .bind(now)
        .bind(flagger.id)
        .bind(comment)
        .bind(now)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;
        debug!("{} flagged {} out-of-date", flagger.username, self.name);

        self.out_of_date_ts = Some(now);
        self.flagger_uid = Some(flagger.id);
        self.flagger_comment = comment.to_owned();
        self.modified_ts = now;
        Ok(())
    }

    pub async fn unflag(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let now = db::now();
        sqlx::query(
            "UPDATE PackageBases SET OutOfDateTS = NULL, FlaggerUID = NULL, FlaggerComment = '', \
             ModifiedTS = ? WHERE ID = ?",
        )
        .bind(now)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;

        self.out_of_date_ts = None;
        self.flagger_uid = None;
        self.flagger_comment.clear();
        self.modified_ts = now;
        Ok(())
    }

    /// Pass `None` to orphan the base.
    pub async fn set_maintainer(
        &mut self,
        conn: &mut SqliteConnection,
        maintainer: Option<&User>,
    ) -> Result<()> {
        let now = db::now();
        let uid = maintainer.map(|u| u.id);
        sqlx::query("UPDATE PackageBases SET MaintainerUID = ?, ModifiedTS = ? WHERE ID = ?")
            .bind(uid)
            .bind(now)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;

        self.maintainer_uid = uid;
        self.modified_ts = now;
        Ok(())
    }

    /// Remove the base along with its keywords. Requests against it keep their
    /// `PackageBaseName` snapshot and lose the reference.
    ///
    /// Run inside a transaction so a failure part-way leaves nothing behind.
    pub async fn delete(self, conn: &mut SqliteConnection) -> Result<()> {
        sqlx::query("DELETE FROM PackageKeywords WHERE PackageBaseID = ?")
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("UPDATE PackageRequests SET PackageBaseID = NULL WHERE PackageBaseID = ?")
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM PackageBases WHERE ID = ?")
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        info!("Deleted package base {} ({})", self.name, self.id);
        Ok(())
    }

    pub async fn keywords(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageKeyword>> {
        PackageKeyword::for_package_base(conn, self.id).await
    }

    pub async fn requests(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageRequest>> {
        PackageRequest::for_package_base(conn, self.id).await
    }
}
