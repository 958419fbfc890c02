use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, id_list, map_fk};
use crate::models::{CategoryChanges, CategoryRow};
use crate::{Database, DbError};

const CATEGORY_COLUMNS: &str = "id, chapter_id, name, description";

impl Database {
    pub fn list_categories(&self, chapter_id: Option<i64>) -> Result<Vec<CategoryRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE (?1 IS NULL OR chapter_id = ?1) ORDER BY id",
                CATEGORY_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([chapter_id], category_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: i64) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| query_category(conn, id))
    }

    pub fn count_categories(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    /// Batch-fetch categories by their own ids.
    pub fn categories_by_ids(&self, ids: &[i64]) -> Result<Vec<CategoryRow>> {
        self.categories_where("id", ids)
    }

    /// Batch-fetch the categories belonging to a set of chapters.
    pub fn categories_for_chapters(&self, chapter_ids: &[i64]) -> Result<Vec<CategoryRow>> {
        self.categories_where("chapter_id", chapter_ids)
    }

    /// `(chapter_id, category_id)` pairs for a set of chapters, in id order.
    pub fn category_refs_for_chapters(&self, chapter_ids: &[i64]) -> Result<Vec<(i64, i64)>> {
        if chapter_ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT chapter_id, id FROM categories WHERE chapter_id IN (SELECT value FROM json_each(?1)) ORDER BY id",
            )?;
            let rows = stmt
                .query_map([id_list(chapter_ids)], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Fails with `DbError::MissingReference` if the chapter does not exist.
    pub fn insert_category(&self, chapter_id: i64, name: &str, description: &str) -> Result<CategoryRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO categories (chapter_id, name, description) VALUES (?1, ?2, ?3)",
                (chapter_id, name, description),
            )
            .map_err(|e| map_fk(e, DbError::MissingReference))?;
            Ok(CategoryRow {
                id: conn.last_insert_rowid(),
                chapter_id,
                name: name.to_string(),
                description: description.to_string(),
            })
        })
    }

    pub fn update_category(&self, id: i64, changes: &CategoryChanges) -> Result<Option<CategoryRow>> {
        self.with_conn(|conn| {
            let updated = conn
                .execute(
                    "UPDATE categories
                     SET chapter_id = COALESCE(?2, chapter_id),
                         name = COALESCE(?3, name),
                         description = COALESCE(?4, description)
                     WHERE id = ?1",
                    rusqlite::params![id, changes.chapter_id, changes.name, changes.description],
                )
                .map_err(|e| map_fk(e, DbError::MissingReference))?;
            if updated == 0 {
                return Ok(None);
            }
            query_category(conn, id)
        })
    }

    pub fn delete_category(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM categories WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }

    fn categories_where(&self, column: &'static str, ids: &[i64]) -> Result<Vec<CategoryRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM categories WHERE {} IN (SELECT value FROM json_each(?1)) ORDER BY id",
                CATEGORY_COLUMNS,
                column
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id_list(ids)], category_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_category(conn: &Connection, id: i64) -> Result<Option<CategoryRow>> {
    let sql = format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], category_from_row).optional()
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<CategoryRow> {
    Ok(CategoryRow {
        id: row.get(0)?,
        chapter_id: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
    })
}
