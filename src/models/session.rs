use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::{FromRow, SqliteConnection};

use crate::db;
use crate::error::Result;

pub const SESSION_ID_LEN: usize = 32;

/// Describe the `Sessions` table
#[derive(FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub users_id: i64,
    /// Opaque identifier handed to the browser
    pub session_id: String,
    pub last_update_ts: i64,
}

fn generate_session_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_ID_LEN)
        .map(char::from)
        .collect()
}

impl Session {
    pub async fn create(conn: &mut SqliteConnection, users_id: i64) -> Result<Session> {
        let session = Session {
            users_id,
            session_id: generate_session_id(),
            last_update_ts: db::now(),
        };
        sqlx::query("INSERT INTO Sessions (UsersID, SessionID, LastUpdateTS) VALUES (?, ?, ?)")
            .bind(session.users_id)
            .bind(&session.session_id)
            .bind(session.last_update_ts)
            .execute(&mut *conn)
            .await?;
        Ok(session)
    }

    pub async fn find(conn: &mut SqliteConnection, session_id: &str) -> Result<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            "SELECT UsersID AS users_id, SessionID AS session_id, LastUpdateTS AS last_update_ts \
             FROM Sessions WHERE SessionID = ?",
        )
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(session)
    }

    pub fn is_expired(&self, timeout: i64, now: i64) -> bool {
        self.last_update_ts + timeout < now
    }

    pub async fn touch(&mut self, conn: &mut SqliteConnection) -> Result<()> {
        let now = db::now();
        sqlx::query("UPDATE Sessions SET LastUpdateTS = ? WHERE SessionID = ?")
            .bind(now)
            .bind(&self.session_id)
            .execute(&mut *conn)
            .await?;
        self.last_update_ts = now;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM Sessions WHERE SessionID = ?")
            .bind(session_id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_shape() {
        let sid = generate_session_id();
        assert_eq!(sid.len(), SESSION_ID_LEN);
        assert!(sid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(sid, generate_session_id());
    }

    #[test]
    fn test_session_expiry() {
        let session = Session {
            users_id: 1,
            session_id: "abc".to_owned(),
            last_update_ts: 1000,
        };
        assert!(!session.is_expired(7200, 8200));
        assert!(session.is_expired(7200, 8201));
    }
}
