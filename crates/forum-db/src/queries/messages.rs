use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{Conditions, ListOrder, OptionalExt, id_list, map_fk};
use crate::models::{MessageChanges, MessageFilter, MessageRow};
use crate::{Database, DbError, now_timestamp};

// likes_count is folded into every read so list views need no second query.
const MESSAGE_COLUMNS: &str = "id, user_id, theme_id, content, created_at, updated_at,
    (SELECT COUNT(*) FROM message_relations r WHERE r.message_id = messages.id AND r.liked = 1)";

impl Database {
    pub fn count_messages(&self, filter: &MessageFilter) -> Result<usize> {
        self.with_conn(|conn| {
            let conditions = message_conditions(filter);
            let sql = format!("SELECT COUNT(*) FROM messages{}", conditions.sql());
            let count: i64 =
                conn.query_row(&sql, rusqlite::params_from_iter(&conditions.values), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn list_messages(
        &self,
        filter: &MessageFilter,
        order: ListOrder,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut conditions = message_conditions(filter);
            let sql = format!(
                "SELECT {} FROM messages{} ORDER BY {} LIMIT ? OFFSET ?",
                MESSAGE_COLUMNS,
                conditions.sql(),
                order.sql()
            );
            conditions.values.push(i64::from(limit).into());
            conditions.values.push(i64::from(offset).into());

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(&conditions.values), message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| query_message(conn, id))
    }

    /// Batch-fetch the messages of a set of themes, oldest first.
    pub fn messages_for_themes(&self, theme_ids: &[i64]) -> Result<Vec<MessageRow>> {
        if theme_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM messages WHERE theme_id IN (SELECT value FROM json_each(?1)) ORDER BY created_at, id",
                MESSAGE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id_list(theme_ids)], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `(theme_id, message_id)` pairs for a set of themes, oldest message first.
    pub fn message_refs_for_themes(&self, theme_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if theme_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT theme_id, id FROM messages WHERE theme_id IN (SELECT value FROM json_each(?1)) ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([id_list(theme_ids)], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Plain insert, closed themes included.
    pub fn insert_message(&self, user_id: i64, theme_id: i64, content: &str) -> Result<MessageRow> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            conn.execute(
                "INSERT INTO messages (user_id, theme_id, content, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![user_id, theme_id, content, now],
            )
            .map_err(|e| map_fk(e, DbError::MissingReference))?;
            Ok(MessageRow {
                id: conn.last_insert_rowid(),
                user_id,
                theme_id,
                content: content.to_string(),
                created_at: now.clone(),
                updated_at: now,
                likes_count: 0,
            })
        })
    }

    /// Inserts only while the theme exists and is open, in one statement, so a
    /// concurrent close cannot slip in between check and insert. `None` when
    /// nothing was written.
    pub fn insert_message_into_open_theme(
        &self,
        user_id: i64,
        theme_id: i64,
        content: &str,
    ) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let now = now_timestamp();
            let inserted = conn
                .execute(
                    "INSERT INTO messages (user_id, theme_id, content, created_at, updated_at)
                     SELECT ?1, id, ?3, ?4, ?4 FROM themes WHERE id = ?2 AND status = 1",
                    rusqlite::params![user_id, theme_id, content, now],
                )
                .map_err(|e| map_fk(e, DbError::MissingReference))?;
            if inserted == 0 {
                return Ok(None);
            }
            Ok(Some(MessageRow {
                id: conn.last_insert_rowid(),
                user_id,
                theme_id,
                content: content.to_string(),
                created_at: now.clone(),
                updated_at: now,
                likes_count: 0,
            }))
        })
    }

    /// Applies the changes and bumps `updated_at`.
    pub fn update_message(&self, id: i64, changes: &MessageChanges) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE messages
                     SET theme_id = COALESCE(?2, theme_id),
                         content = COALESCE(?3, content),
                         updated_at = ?4
                     WHERE id = ?1",
                    rusqlite::params![id, changes.theme_id, changes.content, now_timestamp()],
                )
                .map_err(|e| map_fk(e, DbError::MissingReference))?;
            if updated == 0 {
                return Ok(None);
            }
            query_message(conn, id)
        })
    }

    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM messages WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn message_conditions(filter: &MessageFilter) -> Conditions {
    let mut conditions = Conditions::default();
    if let Some(theme_id) = filter.theme_id {
        conditions.push("theme_id = ?", theme_id);
    }
    if let Some(user_id) = filter.user_id {
        conditions.push("user_id = ?", user_id);
    }
    conditions
}

fn query_message(conn: &Connection, id: i64) -> Result<Option<MessageRow>> {
    let sql = format!("SELECT {} FROM messages WHERE id = ?1", MESSAGE_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], message_from_row).optional()
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        theme_id: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        likes_count: row.get(6)?,
    })
}
