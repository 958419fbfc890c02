use anyhow::Result;
use rusqlite::{Connection, Row};

use super::{OptionalExt, id_list};
use crate::Database;
use crate::models::{ChapterChanges, ChapterRow};

const CHAPTER_COLUMNS: &str = "id, name, description";

impl Database {
    pub fn list_chapters(&self) -> Result<Vec<ChapterRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM chapters ORDER BY id", CHAPTER_COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], chapter_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_chapter(&self, id: i64) -> Result<Option<ChapterRow>> {
        self.with_conn(|conn| query_chapter(conn, id))
    }

    /// Batch-fetch chapters for a set of ids.
    pub fn chapters_by_ids(&self, ids: &[i64]) -> Result<Vec<ChapterRow>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM chapters WHERE id IN (SELECT value FROM json_each(?1)) ORDER BY id",
                CHAPTER_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([id_list(ids)], chapter_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn count_chapters(&self) -> Result<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM chapters", [], |row| row.get(0))?;
            Ok(count as usize)
        })
    }

    pub fn insert_chapter(&self, name: &str, description: &str) -> Result<ChapterRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO chapters (name, description) VALUES (?1, ?2)",
                (name, description),
            )?;
            Ok(ChapterRow {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                description: description.to_string(),
            })
        })
    }

    /// Returns `None` when no chapter has this id.
    pub fn update_chapter(&self, id: i64, changes: &ChapterChanges) -> Result<Option<ChapterRow>> {
        self.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE chapters
                 SET name = COALESCE(?2, name), description = COALESCE(?3, description)
                 WHERE id = ?1",
                rusqlite::params![id, changes.name, changes.description],
            )?;
            if updated == 0 {
                return Ok(None);
            }
            query_chapter(conn, id)
        })
    }

    /// Cascades to the chapter's categories, themes, messages and likes.
    pub fn delete_chapter(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM chapters WHERE id = ?1", [id])?;
            Ok(deleted > 0)
        })
    }
}

fn query_chapter(conn: &Connection, id: i64) -> Result<Option<ChapterRow>> {
    let sql = format!("SELECT {} FROM chapters WHERE id = ?1", CHAPTER_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    stmt.query_row([id], chapter_from_row).optional()
}

fn chapter_from_row(row: &Row<'_>) -> rusqlite::Result<ChapterRow> {
    Ok(ChapterRow {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
    })
}
