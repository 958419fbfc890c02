use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, map_fk};
use crate::models::RelationRow;
use crate::{Database, DbError};

const RELATION_COLUMNS: &str = "id, user_id, message_id, liked";

impl Database {
    /// Always inserts a new row; a user may hold several relations to one message.
    pub fn insert_like(&self, user_id: i64, message_id: i64, like: bool) -> Result<RelationRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO message_relations (user_id, message_id, liked) VALUES (?1, ?2, ?3)",
                rusqlite::params![user_id, message_id, like],
            )
            .map_err(|e| map_fk(e, DbError::MissingReference))?;
            Ok(RelationRow {
                id: conn.last_insert_rowid(),
                user_id,
                message_id,
                like,
            })
        })
    }

    pub fn get_like(&self, id: i64) -> Result<Option<RelationRow>> {
        self.with_conn(|conn| query_like(conn, id))
    }

    pub fn update_like(&self, id: i64, like: bool) -> Result<Option<RelationRow>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE message_relations SET liked = ?2 WHERE id = ?1",
                rusqlite::params![id, like],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_like(conn, id)
        })
    }

    pub fn likes_for_message(&self, message_id: i64) -> Result<Vec<RelationRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM message_relations WHERE message_id = ?1 ORDER BY id",
                RELATION_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([message_id], relation_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_like(conn: &Connection, id: i64) -> Result<Option<RelationRow>> {
    let sql = format!("SELECT {} FROM message_relations WHERE id = ?1", RELATION_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], relation_from_row).optional()
}

fn relation_from_row(row: &Row<'_>) -> rusqlite::Result<RelationRow> {
    Ok(RelationRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        message_id: row.get(2)?,
        like: row.get(3)?,
    })
}
