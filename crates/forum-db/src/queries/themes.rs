use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{Conditions, ListOrder, OptionalExt, id_list, map_fk};
use crate::models::{ThemeChanges, ThemeFilter, ThemeRow};
use crate::{Database, DbError, now_timestamp};

const THEME_COLUMNS: &str = "id, category_id, name, status, user_id, created_at";

impl Database {
    pub fn count_themes(&self, filter: &ThemeFilter) -> Result<usize> {
        self.with_conn(|conn| {
            let conditions = theme_conditions(filter);
            let sql = format!("SELECT COUNT(*) FROM themes{}", conditions.sql());
            let count: i64 =
                conn.query_row(&sql, rusqlite::params_from_iter(&conditions.values), |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn list_themes(
        &self,
        filter: &ThemeFilter,
        order: ListOrder,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<ThemeRow>> {
        self.with_conn(|conn| {
            let mut conditions = theme_conditions(filter);
            let sql = format!(
                "SELECT {} FROM themes{} ORDER BY {} LIMIT ? OFFSET ?",
                THEME_COLUMNS,
                conditions.sql(),
                order.sql()
            );
            conditions.values.push(i64::from(limit).into());
            conditions.values.push(i64::from(offset).into());

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params_from_iter(&conditions.values), theme_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_theme(&self, id: i64) -> Result<Option<ThemeRow>> {
        self.with_conn(|conn| query_theme(conn, id))
    }

    /// Batch-fetch the themes of a set of categories, oldest first.
    pub fn themes_for_categories(&self, category_ids: &[i64]) -> Result<Vec<ThemeRow>> {
        if category_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM themes WHERE category_id IN (SELECT value FROM json_each(?1)) ORDER BY created_at, id",
                THEME_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id_list(category_ids)], theme_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// `(category_id, theme_id)` pairs for a set of categories, oldest theme first.
    pub fn theme_refs_for_categories(&self, category_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if category_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT category_id, id FROM themes WHERE category_id IN (SELECT value FROM json_each(?1)) ORDER BY created_at, id",
            )?;
            let rows = stmt
                .query_map([id_list(category_ids)], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fails with `DbError::MissingReference` if the category or user does not exist.
    pub fn insert_theme(&self, category_id: i64, name: &str, status: bool, user_id: i64) -> Result<ThemeRow> {
        self.with_conn(|conn| {
            let created_at = now_timestamp();
            conn.execute(
                "INSERT INTO themes (category_id, name, status, user_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![category_id, name, status, user_id, created_at],
            )
            .map_err(|e| map_fk(e, DbError::MissingReference))?;
            Ok(ThemeRow {
                id: conn.last_insert_rowid(),
                category_id,
                name: name.to_string(),
                status,
                user_id,
                created_at,
            })
        })
    }

    /// `created_at` and the owner are never touched.
    pub fn update_theme(&self, id: i64, changes: &ThemeChanges) -> Result<Option<ThemeRow>> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE themes
                     SET category_id = COALESCE(?2, category_id),
                         name = COALESCE(?3, name),
                         status = COALESCE(?4, status)
                     WHERE id = ?1",
                    rusqlite::params![id, changes.category_id, changes.name, changes.status],
                )
                .map_err(|e| map_fk(e, DbError::MissingReference))?;
            if updated == 0 {
                return Ok(None);
            }
            query_theme(conn, id)
        })
    }

    pub fn delete_theme(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM themes WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn theme_conditions(filter: &ThemeFilter) -> Conditions {
    let mut conditions = Conditions::default();
    if let Some(category_id) = filter.category_id {
        conditions.push("category_id = ?", category_id);
    }
    if let Some(user_id) = filter.user_id {
        conditions.push("user_id = ?", user_id);
    }
    if let Some(status) = filter.status {
        conditions.push("status = ?", status);
    }
    conditions
}

fn query_theme(conn: &Connection, id: i64) -> Result<Option<ThemeRow>> {
    let sql = format!("SELECT {} FROM themes WHERE id = ?1", THEME_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], theme_from_row).optional()
}

fn theme_from_row(row: &Row<'_>) -> rusqlite::Result<ThemeRow> {
    Ok(ThemeRow {
        id: row.get(0)?,
        category_id: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        user_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
