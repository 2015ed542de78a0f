use log::info;
use serde::Serialize;
use sqlx::{FromRow, SqliteConnection};

use super::{BaseRole, PackageBase, PackageRequest};
use crate::db;
use crate::error::Result;

const COLUMNS: &str = "ID AS id, AccountTypeID AS account_type_id, Suspended AS suspended, \
    Username AS username, Email AS email, RealName AS real_name, Passwd AS passwd, \
    LangPreference AS lang_preference, RegistrationTS AS registration_ts, LastLogin AS last_login";

/// Seeded rows of the `AccountTypes` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountType {
    User = 1,
    TrustedUser = 2,
    Developer = 3,
    TrustedUserAndDeveloper = 4,
}

impl AccountType {
    pub fn id(self) -> i64 {
        self as i64
    }

    pub fn from_id(id: i64) -> Option<Self> {
        match id {
            1 => Some(AccountType::User),
            2 => Some(AccountType::TrustedUser),
            3 => Some(AccountType::Developer),
            4 => Some(AccountType::TrustedUserAndDeveloper),
            _ => None,
        }
    }
}

/// Describe the `Users` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    pub account_type_id: i64,
    pub suspended: bool,
    pub username: String,
    pub email: String,
    pub real_name: String,
    /// bcrypt hash of the password
    #[serde(skip)]
    pub passwd: String,
    pub lang_preference: String,
    /// Unix epoch timestamp
    pub registration_ts: i64,
    pub last_login: Option<i64>,
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub real_name: &'a str,
    /// Plaintext, hashed on insert.
    pub passwd: &'a str,
    pub account_type: AccountType,
}

impl User {
    pub async fn create(conn: &mut SqliteConnection, new: &NewUser<'_>, cost: u32) -> Result<User> {
        let passwd = bcrypt::hash(new.passwd, cost)?;
        let registration_ts = db::now();
        let id = sqlx::query(
            "INSERT INTO Users (AccountTypeID, Username, Email, RealName, Passwd, RegistrationTS) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new.account_type.id())
        .bind(new.username)
        .bind(new.email)
        .bind(new.real_name)
        .bind(&passwd)
        .bind(registration_ts)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();
        info!("Created user {} ({})", new.username, id);

        Ok(User {
            id,
            account_type_id: new.account_type.id(),
            suspended: false,
            username: new.username.to_owned(),
            email: new.email.to_owned(),
            real_name: new.real_name.to_owned(),
            passwd,
            lang_preference: "en".to_owned(),
            registration_ts,
            last_login: None,
        })
    }

    pub async fn find(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM Users WHERE ID = ?", COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }

    pub async fn find_by_username(
        conn: &mut SqliteConnection,
        username: &str,
    ) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM Users WHERE Username = ?", COLUMNS);
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(user)
    }

    pub async fn count(conn: &mut SqliteConnection) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM Users")
            .fetch_one(&mut *conn)
            .await?;
        Ok(count)
    }

    pub fn account_type(&self) -> Option<AccountType> {
        AccountType::from_id(self.account_type_id)
    }

    pub fn verify_password(&self, password: &str) -> Result<bool> {
        if self.passwd.is_empty() {
            return Ok(false);
        }
        Ok(bcrypt::verify(password, &self.passwd)?)
    }

    pub async fn set_lang_preference(
        &mut self,
        conn: &mut SqliteConnection,
        lang: &str,
    ) -> Result<()> {
        sqlx::query("UPDATE Users SET LangPreference = ? WHERE ID = ?")
            .bind(lang)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        self.lang_preference = lang.to_owned();
        Ok(())
    }

    pub async fn set_suspended(
        &mut self,
        conn: &mut SqliteConnection,
        suspended: bool,
    ) -> Result<()> {
        sqlx::query("UPDATE Users SET Suspended = ? WHERE ID = ?")
            .bind(suspended)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        self.suspended = suspended;
        Ok(())
    }

    pub(crate) async fn touch_last_login(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let ts = db::now();
        sqlx::query("UPDATE Users SET LastLogin = ? WHERE ID = ?")
            .bind(ts)
            .bind(self.id)
            .execute(&mut *conn)
            .await?;
        self.last_login = Some(ts);
        Ok(())
    }

    pub async fn maintained_bases(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageBase>> {
        PackageBase::by_role(conn, BaseRole::Maintainer, self.id).await
    }

    pub async fn submitted_bases(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageBase>> {
        PackageBase::by_role(conn, BaseRole::Submitter, self.id).await
    }

    pub async fn flagged_bases(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageBase>> {
        PackageBase::by_role(conn, BaseRole::Flagger, self.id).await
    }

    /// Bases this user is the packager of.
    pub async fn package_bases(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageBase>> {
        PackageBase::by_role(conn, BaseRole::Packager, self.id).await
    }

    pub async fn package_requests(
        &self,
        conn: &mut SqliteConnection,
    ) -> Result<Vec<PackageRequest>> {
        PackageRequest::submitted_by(conn, self.id).await
    }

    pub async fn closed_requests(&self, conn: &mut SqliteConnection) -> Result<Vec<PackageRequest>> {
        PackageRequest::closed_by(conn, self.id).await
    }
}
