use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, map_fk, map_unique};
use crate::models::UserRow;
use crate::{Database, DbError, now_timestamp};

const USER_COLUMNS: &str = "id, username, password, first_name, last_name, is_staff, date_joined, token_version";

pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub is_staff: bool,
}

impl Database {
    /// Returns `DbError::Duplicate` when the username is taken.
    pub fn create_user(&self, user: &NewUser<'_>) -> Result<UserRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, password, first_name, last_name, is_staff, date_joined)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    user.username,
                    user.password_hash,
                    user.first_name,
                    user.last_name,
                    user.is_staff,
                    now_timestamp(),
                ],
            )
            .map_err(map_unique)?;

            let id = conn.last_insert_rowid();
            query_user(conn, "id = ?1", &id)?.ok_or_else(|| anyhow::anyhow!("user {} vanished after insert", id))
        })
    }

    /// Creates the account or promotes an existing one to staff, resetting its password.
    pub fn ensure_staff_user(&self, username: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let id = conn.query_row(
                "INSERT INTO users (username, password, is_staff, date_joined)
                 VALUES (?1, ?2, 1, ?3)
                 ON CONFLICT(username) DO UPDATE SET password = excluded.password, is_staff = 1
                 RETURNING id",
                rusqlite::params![username, password_hash, now_timestamp()],
                |row| row.get(0),
            )?;
            Ok(id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", &username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", &id))
    }

    /// Invalidates every token issued so far. Returns the new version.
    pub fn revoke_tokens(&self, id: i64) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE users SET token_version = token_version + 1 WHERE id = ?1 RETURNING token_version",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Deletes the user and their likes. Fails with `DbError::Protected` while
    /// they still own themes or messages.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let owned: i64 = conn.query_row(
                "SELECT (SELECT COUNT(*) FROM themes WHERE user_id = ?1)
                      + (SELECT COUNT(*) FROM messages WHERE user_id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            if owned > 0 {
                return Err(DbError::Protected.into());
            }

            let deleted = conn
                .execute("DELETE FROM users WHERE id = ?1", [id])
                .map_err(|e| map_fk(e, DbError::Protected))?;
            Ok(deleted > 0)
        })
    }
}

fn query_user(conn: &Connection, predicate: &str, value: &dyn rusqlite::ToSql) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, predicate);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([value], user_from_row).optional()
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        is_staff: row.get(5)?,
        date_joined: row.get(6)?,
        token_version: row.get(7)?,
    })
}
