//! Local store: a durable section → {title → HTML} mapping in SQLite.
//!
//! Each section is written in its own transaction after its full page set
//! has been collected, so a crash mid-download preserves every previously
//! committed section. Offline mode loads the whole store eagerly into an
//! ordered map; nothing is read lazily.

use indexmap::IndexMap;
use sqlx::{Row, SqlitePool};

use crate::error::Result;

/// In-memory copy of the store, in stored insertion order.
pub type Notebook = IndexMap<String, IndexMap<String, String>>;

pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notes (
            section TEXT NOT NULL,
            title   TEXT NOT NULL,
            html    TEXT NOT NULL,
            PRIMARY KEY (section, title)
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Replace one section's content with a freshly fetched page set.
///
/// Delete-then-insert inside a single transaction: the section either keeps
/// its old rows or gets the complete new set, never a mix.
pub async fn write_section(
    pool: &SqlitePool,
    section: &str,
    notes: &IndexMap<String, String>,
) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM notes WHERE section = ?")
        .bind(section)
        .execute(&mut *tx)
        .await?;

    for (title, html) in notes {
        sqlx::query("INSERT INTO notes (section, title, html) VALUES (?, ?, ?)")
            .bind(section)
            .bind(title)
            .bind(html)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

/// Load every cached note into memory. Row order follows rowid, so sections
/// and titles come back in the order they were written.
pub async fn load_all(pool: &SqlitePool) -> Result<Notebook> {
    let rows = sqlx::query("SELECT section, title, html FROM notes ORDER BY rowid")
        .fetch_all(pool)
        .await?;

    let mut notebook = Notebook::new();
    for row in &rows {
        let section: String = row.get("section");
        let title: String = row.get("title");
        let html: String = row.get("html");
        notebook.entry(section).or_default().insert(title, html);
    }

    Ok(notebook)
}
