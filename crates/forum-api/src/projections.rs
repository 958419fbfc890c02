//! Builds the nested read views out of flat rows. Child references are
//! fetched in batches per level, never per row.

use std::collections::HashMap;

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use tracing::warn;

use forum_db::Database;
use forum_db::models::{CategoryRow, ChapterRow, MessageRow, RelationRow, ThemeRow, UserRow};
use forum_types::models::{
    CategoryDetail, CategoryRecord, CategorySummary, ChapterDetail, ChapterSummary, Like, MessageRecord,
    MessageView, ThemeDetail, ThemeRecord, ThemeSummary, User,
};

// -- Chapters --

pub fn chapter_summaries(db: &Database, rows: Vec<ChapterRow>) -> Result<Vec<ChapterSummary>> {
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut categories = group_refs(db.category_refs_for_chapters(&ids)?);

    Ok(rows
        .into_iter()
        .map(|row| ChapterSummary {
            categories: categories.remove(&row.id).unwrap_or_default(),
            id: row.id,
            name: row.name,
            description: row.description,
        })
        .collect())
}

pub fn chapter_summary(db: &Database, row: ChapterRow) -> Result<ChapterSummary> {
    chapter_summaries(db, vec![row])?
        .pop()
        .ok_or_else(|| anyhow!("chapter summary missing"))
}

pub fn chapter_detail(db: &Database, row: ChapterRow) -> Result<ChapterDetail> {
    let categories = category_summaries(db, db.categories_for_chapters(&[row.id])?)?;
    Ok(ChapterDetail {
        id: row.id,
        name: row.name,
        description: row.description,
        categories,
    })
}

// -- Categories --

pub fn category_summaries(db: &Database, rows: Vec<CategoryRow>) -> Result<Vec<CategorySummary>> {
    let chapter_ids = distinct(rows.iter().map(|r| r.chapter_id));
    let chapters: HashMap<i64, ChapterSummary> = chapter_summaries(db, db.chapters_by_ids(&chapter_ids)?)?
        .into_iter()
        .map(|c| (c.id, c))
        .collect();

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut themes = group_refs(db.theme_refs_for_categories(&ids)?);

    rows.into_iter()
        .map(|row| {
            let chapter = chapters
                .get(&row.chapter_id)
                .cloned()
                .ok_or_else(|| anyhow!("category {} points at missing chapter {}", row.id, row.chapter_id))?;
            Ok(CategorySummary {
                themes: themes.remove(&row.id).unwrap_or_default(),
                id: row.id,
                chapter,
                name: row.name,
                description: row.description,
            })
        })
        .collect()
}

pub fn category_summary(db: &Database, row: CategoryRow) -> Result<CategorySummary> {
    category_summaries(db, vec![row])?
        .pop()
        .ok_or_else(|| anyhow!("category summary missing"))
}

pub fn category_detail(db: &Database, row: CategoryRow) -> Result<CategoryDetail> {
    let themes = theme_summaries(db, db.themes_for_categories(&[row.id])?)?;
    let summary = category_summary(db, row)?;

    Ok(CategoryDetail {
        id: summary.id,
        chapter: summary.chapter,
        name: summary.name,
        description: summary.description,
        themes,
    })
}

pub fn category_record(row: CategoryRow) -> CategoryRecord {
    CategoryRecord {
        id: row.id,
        chapter: row.chapter_id,
        name: row.name,
        description: row.description,
    }
}

// -- Themes --

pub fn theme_summaries(db: &Database, rows: Vec<ThemeRow>) -> Result<Vec<ThemeSummary>> {
    let category_ids = distinct(rows.iter().map(|r| r.category_id));
    let categories: HashMap<i64, CategorySummary> =
        category_summaries(db, db.categories_by_ids(&category_ids)?)?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let mut messages = group_refs(db.message_refs_for_themes(&ids)?);

    rows.into_iter()
        .map(|row| {
            let category = categories
                .get(&row.category_id)
                .cloned()
                .ok_or_else(|| anyhow!("theme {} points at missing category {}", row.id, row.category_id))?;
            Ok(ThemeSummary {
                messages: messages.remove(&row.id).unwrap_or_default(),
                created_at: parse_timestamp(&row.created_at, "theme", row.id),
                id: row.id,
                category,
                name: row.name,
                status: row.status,
                user: row.user_id,
            })
        })
        .collect()
}

pub fn theme_summary(db: &Database, row: ThemeRow) -> Result<ThemeSummary> {
    theme_summaries(db, vec![row])?
        .pop()
        .ok_or_else(|| anyhow!("theme summary missing"))
}

pub fn theme_detail(db: &Database, row: ThemeRow) -> Result<ThemeDetail> {
    let messages: Vec<MessageView> = db
        .messages_for_themes(&[row.id])?
        .into_iter()
        .map(message_view)
        .collect();
    let summary = theme_summary(db, row)?;

    Ok(ThemeDetail {
        id: summary.id,
        category: summary.category,
        name: summary.name,
        status: summary.status,
        user: summary.user,
        messages_count: messages.len(),
        messages,
        created_at: summary.created_at,
    })
}

pub fn theme_record(row: ThemeRow) -> ThemeRecord {
    ThemeRecord {
        id: row.id,
        category: row.category_id,
        name: row.name,
        status: row.status,
        user: row.user_id,
    }
}

// -- Messages --

pub fn message_view(row: MessageRow) -> MessageView {
    MessageView {
        created_at: parse_timestamp(&row.created_at, "message", row.id),
        updated_at: parse_timestamp(&row.updated_at, "message", row.id),
        id: row.id,
        user: row.user_id,
        theme: row.theme_id,
        content: row.content,
        likes_count: row.likes_count,
    }
}

pub fn message_record(row: MessageRow) -> MessageRecord {
    MessageRecord {
        created_at: parse_timestamp(&row.created_at, "message", row.id),
        updated_at: parse_timestamp(&row.updated_at, "message", row.id),
        id: row.id,
        user: row.user_id,
        theme: row.theme_id,
        content: row.content,
    }
}

// -- Likes & users --

pub fn like_view(row: RelationRow) -> Like {
    Like {
        id: row.id,
        user: row.user_id,
        message: row.message_id,
        like: row.like,
    }
}

pub fn user_view(row: &UserRow) -> User {
    User {
        id: row.id,
        username: row.username.clone(),
        first_name: row.first_name.clone(),
        last_name: row.last_name.clone(),
        is_staff: row.is_staff,
    }
}

/// Groups `(parent, child)` pairs by parent, keeping the query's child order.
fn group_refs(pairs: Vec<(i64, i64)>) -> HashMap<i64, Vec<i64>> {
    let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
    for (parent, child) in pairs {
        grouped.entry(parent).or_default().push(child);
    }
    grouped
}

fn distinct(ids: impl Iterator<Item = i64>) -> Vec<i64> {
    let mut ids: Vec<i64> = ids.collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

fn parse_timestamp(raw: &str, entity: &str, id: i64) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>().unwrap_or_else(|e| {
        warn!("Corrupt timestamp '{}' on {} {}: {}", raw, entity, id, e);
        DateTime::default()
    })
}
