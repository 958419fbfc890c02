mod categories;
mod chapters;
mod likes;
mod messages;
mod themes;
mod users;

pub use users::NewUser;

use anyhow::Result;
use rusqlite::types::Value;

use crate::DbError;

/// Sort order for paginated lists. Every variant has an `id` tiebreak so rows
/// created within the same microsecond still page deterministically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListOrder {
    #[default]
    CreatedAsc,
    CreatedDesc,
    UpdatedAsc,
    UpdatedDesc,
    IdAsc,
    IdDesc,
}

impl ListOrder {
    /// Parses an `ordering` query value such as `created_at` or `-id`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "created_at" => Some(Self::CreatedAsc),
            "-created_at" => Some(Self::CreatedDesc),
            "updated_at" => Some(Self::UpdatedAsc),
            "-updated_at" => Some(Self::UpdatedDesc),
            "id" => Some(Self::IdAsc),
            "-id" => Some(Self::IdDesc),
            _ => None,
        }
    }

    pub fn uses_updated_at(self) -> bool {
        matches!(self, Self::UpdatedAsc | Self::UpdatedDesc)
    }

    fn sql(self) -> &'static str {
        match self {
            Self::CreatedAsc => "created_at ASC, id ASC",
            Self::CreatedDesc => "created_at DESC, id DESC",
            Self::UpdatedAsc => "updated_at ASC, id ASC",
            Self::UpdatedDesc => "updated_at DESC, id DESC",
            Self::IdAsc => "id ASC",
            Self::IdDesc => "id DESC",
        }
    }
}

/// AND-joined WHERE clause with positional `?` parameters.
#[derive(Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    values: Vec<Value>,
}

impl Conditions {
    fn push(&mut self, clause: &'static str, value: impl Into<Value>) {
        self.clauses.push(clause);
        self.values.push(value.into());
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

/// JSON array text for `IN (SELECT value FROM json_each(?1))`. A batch binds
/// one parameter however many ids it holds, so it never hits SQLite's
/// variable limit.
fn id_list(ids: &[i64]) -> String {
    let items: Vec<String> = ids.iter().map(i64::to_string).collect();
    format!("[{}]", items.join(","))
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation => {
            Some(e.extended_code)
        }
        _ => None,
    }
}

/// Maps a failed foreign key check to `on_fk`, anything else passes through.
/// A missing parent reports `FOREIGNKEY`; an `ON DELETE RESTRICT` hit reports
/// `TRIGGER`.
fn map_fk(err: rusqlite::Error, on_fk: DbError) -> anyhow::Error {
    match constraint_code(&err) {
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY | rusqlite::ffi::SQLITE_CONSTRAINT_TRIGGER) => on_fk.into(),
        _ => err.into(),
    }
}

fn map_unique(err: rusqlite::Error) -> anyhow::Error {
    match constraint_code(&err) {
        Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE) => DbError::Duplicate.into(),
        _ => err.into(),
    }
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
