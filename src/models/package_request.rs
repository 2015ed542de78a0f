//! Package requests: a user's ask to delete, orphan or merge a package base.
//!
//! A request is created [`RequestStatus::Pending`] and is closed in place by
//! stamping the status, the closer and the closing time together. The data
//! layer enforces only presence of the required fields; which status a closer
//! may pick, and whether a closed request may be re-opened, is decided by the
//! caller.

use std::convert::TryFrom;
use std::fmt;

use log::info;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::{PackageBase, RequestType, User};
use crate::db;
use crate::error::{IntegrityError, Result, UnknownStatus};

const COLUMNS: &str = "ID AS id, ReqTypeID AS req_type_id, PackageBaseID AS package_base_id, \
    PackageBaseName AS package_base_name, MergeBaseName AS merge_base_name, UsersID AS users_id, \
    Comments AS comments, ClosureComment AS closure_comment, RequestTS AS request_ts, \
    ClosedTS AS closed_ts, ClosedUID AS closed_uid, Status AS status";

/// Status codes stored in `PackageRequests.Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum RequestStatus {
    Pending = 0,
    Closed = 1,
    Accepted = 2,
    Rejected = 3,
}

impl RequestStatus {
    pub const fn code(self) -> i64 {
        self as i64
    }

    pub const fn label(self) -> &'static str {
        match self {
            RequestStatus::Pending => "Pending",
            RequestStatus::Closed => "Closed",
            RequestStatus::Accepted => "Accepted",
            RequestStatus::Rejected => "Rejected",
        }
    }
}

impl TryFrom<i64> for RequestStatus {
    type Error = UnknownStatus;

    fn try_from(code: i64) -> std::result::Result<Self, Self::Error> {
        match code {
            0 => Ok(RequestStatus::Pending),
            1 => Ok(RequestStatus::Closed),
            2 => Ok(RequestStatus::Accepted),
            3 => Ok(RequestStatus::Rejected),
            _ => Err(UnknownStatus(code)),
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Describe the `PackageRequests` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageRequest {
    pub id: i64,
    /// Reference to [`RequestType`] id property
    pub req_type_id: i64,
    /// Cleared when the base is deleted; `package_base_name` survives.
    pub package_base_id: Option<i64>,
    pub package_base_name: String,
    /// Target of a merge request
    pub merge_base_name: Option<String>,
    /// The requester, reference to [`User`] id property
    pub users_id: i64,
    pub comments: String,
    pub closure_comment: String,
    pub request_ts: i64,
    pub closed_ts: Option<i64>,
    pub closed_uid: Option<i64>,
    /// Raw status code, see [`RequestStatus`]
    pub status: i64,
}

/// Fields accepted when filing a request. Every field is optional here so a
/// missing one is reported by [`NewPackageRequest::validate`] by name.
#[derive(Debug, Clone, Default)]
pub struct NewPackageRequest {
    pub req_type_id: Option<i64>,
    pub users_id: Option<i64>,
    pub package_base_id: Option<i64>,
    pub package_base_name: Option<String>,
    pub merge_base_name: Option<String>,
    pub comments: Option<String>,
    pub closure_comment: Option<String>,
    pub status: Option<i64>,
    pub closed_uid: Option<i64>,
    pub closed_ts: Option<i64>,
}

struct RequiredFields<'a> {
    req_type_id: i64,
    users_id: i64,
    package_base_id: i64,
    package_base_name: &'a str,
    comments: &'a str,
    closure_comment: &'a str,
}

fn require<T>(value: Option<T>, column: &'static str) -> std::result::Result<T, IntegrityError> {
    value.ok_or_else(|| IntegrityError::missing("PackageRequests", column))
}

impl NewPackageRequest {
    pub fn request_type(mut self, request_type: &RequestType) -> Self {
        self.req_type_id = Some(request_type.id);
        self
    }

    pub fn user(mut self, user: &User) -> Self {
        self.users_id = Some(user.id);
        self
    }

    /// Only the reference; the name snapshot is set with `package_base_name`.
    pub fn package_base(mut self, package_base: &PackageBase) -> Self {
        self.package_base_id = Some(package_base.id);
        self
    }

    pub fn package_base_name(mut self, name: impl Into<String>) -> Self {
        self.package_base_name = Some(name.into());
        self
    }

    pub fn merge_base_name(mut self, name: impl Into<String>) -> Self {
        self.merge_base_name = Some(name.into());
        self
    }

    pub fn comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }

    pub fn closure_comment(mut self, comment: impl Into<String>) -> Self {
        self.closure_comment = Some(comment.into());
        self
    }

    pub fn status(mut self, status: RequestStatus) -> Self {
        self.status = Some(status.code());
        self
    }

    pub fn closer(mut self, closer: &User) -> Self {
        self.closed_uid = Some(closer.id);
        self
    }

    pub fn closed_ts(mut self, ts: i64) -> Self {
        self.closed_ts = Some(ts);
        self
    }

    /// Check each required field in turn and report the first one missing.
    pub fn validate(&self) -> std::result::Result<(), IntegrityError> {
        self.required().map(|_| ())
    }

    fn required(&self) -> std::result::Result<RequiredFields<'_>, IntegrityError> {
        Ok(RequiredFields {
            req_type_id: require(self.req_type_id, "ReqTypeID")?,
            users_id: require(self.users_id, "UsersID")?,
            package_base_id: require(self.package_base_id, "PackageBaseID")?,
            package_base_name: require(self.package_base_name.as_deref(), "PackageBaseName")?,
            comments: require(self.comments.as_deref(), "Comments")?,
            closure_comment: require(self.closure_comment.as_deref(), "ClosureComment")?,
        })
    }
}

impl PackageRequest {
    pub async fn create(
        conn: &mut SqliteConnection,
        new: NewPackageRequest,
    ) -> Result<PackageRequest> {
        let fields = new.required()?;
        let status = new.status.unwrap_or(RequestStatus::Pending.code());
        let request_ts = db::now();
        let id = sqlx::query(
            "INSERT INTO PackageRequests \
             (ReqTypeID, PackageBaseID, PackageBaseName, MergeBaseName, UsersID, Comments, \
              ClosureComment, RequestTS, ClosedTS, ClosedUID, Status) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(fields.req_type_id)
        .bind(fields.package_base_id)
        .bind(fields.package_base_name)
        .bind(new.merge_base_name.as_deref())
        .bind(fields.users_id)
        .bind(fields.comments)
        .bind(fields.closure_comment)
        .bind(request_ts)
        .bind(new.closed_ts)
        .bind(new.closed_uid)
        .bind(status)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        info!(
            "Filed request {} against {} by user {}",
            id, fields.package_base_name, fields.users_id
        );

        Ok(PackageRequest {
            id,
            req_type_id: fields.req_type_id,
            package_base_id: Some(fields.package_base_id),
            package_base_name: fields.package_base_name.to_owned(),
            merge_base_name: new.merge_base_name.clone(),
            users_id: fields.users_id,
            comments: fields.comments.to_owned(),
            closure_comment: fields.closure_comment.to_owned(),
            request_ts,
            closed_ts: new.closed_ts,
            closed_uid: new.closed_uid,
            status,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<PackageRequest>> {
        let sql = format!("SELECT {} FROM PackageRequests WHERE ID = ?", COLUMNS);
        let request = sqlx::query_as::<_, PackageRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(request)
    }

    /// Open requests, newest first.
    pub async fn pending(conn: &mut SqliteConnection) -> Result<Vec<PackageRequest>> {
        let sql = format!(
            "SELECT {} FROM PackageRequests WHERE Status = ? ORDER BY RequestTS DESC, ID DESC",
            COLUMNS
        );
        let requests = sqlx::query_as::<_, PackageRequest>(&sql)
            .bind(RequestStatus::Pending.code())
            .fetch_all(&mut *conn)
            .await?;
        Ok(requests)
    }

    pub async fn count_pending(conn: &mut SqliteConnection) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM PackageRequests WHERE Status = ?")
            .bind(RequestStatus::Pending.code())
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    async fn select_by(
        conn: &mut SqliteConnection,
        column: &str,
        id: i64,
    ) -> Result<Vec<PackageRequest>> {
        let sql = format!(
            "SELECT {} FROM PackageRequests WHERE {} = ? ORDER BY ID",
            COLUMNS, column
        );
        let requests = sqlx::query_as::<_, PackageRequest>(&sql)
            .bind(id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(requests)
    }

    pub(crate) async fn submitted_by(
        conn: &mut SqliteConnection,
        users_id: i64,
    ) -> Result<Vec<PackageRequest>> {
        Self::select_by(conn, "UsersID", users_id).await
    }

    pub(crate) async fn closed_by(
        conn: &mut SqliteConnection,
        closed_uid: i64,
    ) -> Result<Vec<PackageRequest>> {
        Self::select_by(conn, "ClosedUID", closed_uid).await
    }

    pub(crate) async fn for_package_base(
        conn: &mut SqliteConnection,
        package_base_id: i64,
    ) -> Result<Vec<PackageRequest>> {
        Self::select_by(conn, "PackageBaseID", package_base_id).await
    }

    pub(crate) async fn of_type(
        conn: &mut SqliteConnection,
        req_type_id: i64,
    ) -> Result<Vec<PackageRequest>> {
        Self::select_by(conn, "ReqTypeID", req_type_id).await
    }

    pub fn status(&self) -> std::result::Result<RequestStatus, UnknownStatus> {
        RequestStatus::try_from(self.status)
    }

    /// Label of the current status code. An unrecognized code has no label.
    pub fn status_display(&self) -> std::result::Result<&'static str, UnknownStatus> {
        Ok(self.status()?.label())
    }

    /// Store a raw status code without touching the closing fields.
    pub async fn set_status(&mut self, conn: &mut SqliteConnection, code: i64) -> Result<()> {
        sqlx::query("UPDATE PackageRequests SET Status = ? WHERE ID = ?")
            .bind(code)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        self.status = code;
        Ok(())
    }

    /// Close the request as `closer`, stamping the closing time.
    pub async fn close(
        &mut self,
        conn: &mut SqliteConnection,
        status: RequestStatus,
        closer: &User,
        closure_comment: &str,
    ) -> Result<()> {
        let closed_ts = db::now();
        sqlx::query(
            "UPDATE PackageRequests SET Status = ?, ClosedUID = ?, ClosedTS = ?, \
             ClosureComment = ? WHERE ID = ?",
        )
        .bind(status.code())
        .bind(closer.id)
        .bind(closed_ts)
        .bind(closure_comment)
        .bind(self.id)
        .execute(&mut *conn)
        .await?;
        info!(
            "Request {} for {} closed as {} by {}",
            self.id, self.package_base_name, status, closer.username
        );

        self.status = status.code();
        self.closed_uid = Some(closer.id);
        self.closed_ts = Some(closed_ts);
        self.closure_comment = closure_comment.to_owned();
        Ok(())
    }
}
