//! The persisted chunk index: sqlite-vec storage plus an embedding provider.
//!
//! Writes are transactional — a reader sees either the previous complete
//! index or the new one, never a partial rebuild. The build policy is
//! staleness-by-count: a build whose chunk count matches the stored count is
//! skipped as up to date. This deliberately misses content edits that
//! preserve chunk count; it is documented behavior carried over from the
//! original indexer, not a bug.

use std::sync::Arc;

use anyhow::{Context, Result};
use rand::Rng;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::embedding::EmbeddingProvider;
use crate::kb::corpus::Chunk;

/// Chunks embedded per batch during a rebuild.
const EMBED_BATCH: usize = 64;

/// Outcome of a staleness-checked build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Index count already matched the incoming chunk count.
    SkippedUpToDate,
    /// Index was cleared and rebuilt with this many chunks.
    Rebuilt(usize),
}

pub struct VectorIndex {
    conn: Connection,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl VectorIndex {
    pub fn new(conn: Connection, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { conn, embedder }
    }

    /// Staleness-by-count build: skip when the stored chunk count equals the
    /// incoming count, otherwise clear and rebuild.
    pub fn upsert_or_skip(&mut self, chunks: &[Chunk]) -> Result<BuildOutcome> {
        if self.count()? == chunks.len() {
            info!("index appears up to date, skipping build");
            return Ok(BuildOutcome::SkippedUpToDate);
        }

        self.rebuild(chunks)?;
        Ok(BuildOutcome::Rebuilt(chunks.len()))
    }

    /// Replace the entire index contents in one transaction.
    pub fn rebuild(&mut self, chunks: &[Chunk]) -> Result<()> {
        // Embed before opening the transaction so the write lock is short.
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            vectors.extend(
                self.embedder
                    .embed_batch(&texts)
                    .context("failed to embed chunk batch")?,
            );
        }

        // A wrong-length vector would fail deep inside sqlite-vec with an
        // opaque error; catch it here against the declared table width.
        let dims = self.embedder.dimensions();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
            anyhow::bail!(
                "embedder produced a {}-dimension vector, index expects {dims}",
                bad.len()
            );
        }

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM chunks_vec", [])?;

        for (seq, (chunk, vector)) in chunks.iter().zip(vectors.iter()).enumerate() {
            tx.execute(
                "INSERT INTO chunks (id, seq, text, source_path) VALUES (?1, ?2, ?3, ?4)",
                params![chunk.id, seq as i64, chunk.text, chunk.source_path],
            )?;
            tx.execute(
                "INSERT INTO chunks_vec (id, embedding) VALUES (?1, ?2)",
                params![chunk.id, embedding_to_bytes(vector)],
            )?;
        }

        tx.commit()?;
        info!(chunks = chunks.len(), "index rebuilt");
        Ok(())
    }

    /// K-nearest-neighbor search. Returns at most `k` chunk texts, most
    /// similar first; an empty index yields an empty vec, never an error.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<String>> {
        if self.count()? == 0 {
            warn!("index is empty, nothing to search");
            return Ok(vec![]);
        }

        let query_vec = self.embedder.embed(text).context("failed to embed query")?;

        let mut stmt = self.conn.prepare(
            "SELECT id FROM chunks_vec WHERE embedding MATCH ?1 ORDER BY distance LIMIT ?2",
        )?;
        let ids: Vec<String> = stmt
            .query_map(params![embedding_to_bytes(&query_vec), k as i64], |row| {
                row.get(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(ids.len());
        for id in &ids {
            let chunk_text: String = self.conn.query_row(
                "SELECT text FROM chunks WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            results.push(chunk_text);
        }
        Ok(results)
    }

    pub fn count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Draw one chunk uniformly at random. `None` when the index is empty.
    pub fn sample_random(&self) -> Result<Option<String>> {
        let count = self.count()?;
        if count == 0 {
            warn!("index is empty, no chunk to sample");
            return Ok(None);
        }

        let offset = rand::thread_rng().gen_range(0..count);
        let text = self
            .conn
            .query_row(
                "SELECT text FROM chunks ORDER BY seq LIMIT 1 OFFSET ?1",
                params![offset as i64],
                |row| row.get(0),
            )
            .optional()?;
        Ok(text)
    }
}

/// Convert an f32 embedding slice to raw bytes for sqlite-vec.
pub fn embedding_to_bytes(embedding: &[f32]) -> &[u8] {
    unsafe {
        std::slice::from_raw_parts(
            embedding.as_ptr() as *const u8,
            embedding.len() * std::mem::size_of::<f32>(),
        )
    }
}
