//! SQLite storage for the chunk index.
//!
//! Opens (or creates) the index database with the sqlite-vec extension loaded
//! and the `chunks` + `chunks_vec` tables initialized. The `chunks` table
//! holds text and provenance; `chunks_vec` (a vec0 virtual table) holds the
//! embedding for each chunk id.

use anyhow::{Context, Result};
use rusqlite::Connection;
use sqlite_vec::sqlite3_vec_init;
use std::path::Path;
use std::sync::Once;

use crate::embedding::EMBEDDING_DIM;

static SQLITE_VEC_INIT: Once = Once::new();

/// Register the sqlite-vec extension globally. Safe to call multiple times.
pub fn load_sqlite_vec() {
    SQLITE_VEC_INIT.call_once(|| unsafe {
        rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute(
            sqlite3_vec_init as *const (),
        )));
    });
}

/// Chunk storage. `seq` preserves build order so offset sampling is stable.
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    seq INTEGER NOT NULL,
    text TEXT NOT NULL,
    source_path TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_chunks_seq ON chunks(seq);
"#;

/// vec0 virtual table must be created separately (sqlite-vec syntax).
fn vec_table_sql() -> String {
    format!(
        "CREATE VIRTUAL TABLE IF NOT EXISTS chunks_vec USING vec0(\n\
             id TEXT PRIMARY KEY,\n\
             embedding FLOAT[{EMBEDDING_DIM}]\n\
         );"
    )
}

/// Initialize the index schema. Idempotent (uses IF NOT EXISTS).
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute_batch(&vec_table_sql())?;
    Ok(())
}

/// Open (or create) the index database at the given path, with the vec
/// extension loaded and schema initialized.
pub fn open_index_database(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    load_sqlite_vec();

    let conn = Connection::open(path)
        .with_context(|| format!("failed to open database at {}", path.display()))?;

    // WAL so the monitoring surface can read while the agent writes
    conn.pragma_update(None, "journal_mode", "WAL")?;

    init_schema(&conn).context("failed to initialize index schema")?;

    tracing::info!(path = %path.display(), "index database ready");
    Ok(conn)
}

/// Open an in-memory index database. Used by tests and fixtures.
pub fn open_memory_database() -> Result<Connection> {
    load_sqlite_vec();
    let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
    init_schema(&conn).context("failed to initialize index schema")?;
    Ok(conn)
}
