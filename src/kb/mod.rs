//! The knowledge base engine: corpus chunking plus the vector index.
//!
//! [`KnowledgeBase`] is the only owner of the corpus reader and the index.
//! Queries go through `spawn_blocking` so the agent task suspends cleanly
//! while sqlite and the embedder work.

pub mod corpus;
pub mod index;

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::ScribeConfig;
use crate::embedding::EmbeddingProvider;
use index::{BuildOutcome, VectorIndex};

#[derive(Clone)]
pub struct KnowledgeBase {
    index: Arc<Mutex<VectorIndex>>,
    corpus_dir: PathBuf,
    chunk_size: usize,
    overlap: usize,
}

impl KnowledgeBase {
    /// Open the index database and wire up the embedding provider.
    pub fn open(config: &ScribeConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let conn = crate::db::open_index_database(config.resolved_index_db_path())?;
        Ok(Self {
            index: Arc::new(Mutex::new(VectorIndex::new(conn, embedder))),
            corpus_dir: config.corpus_dir(),
            chunk_size: config.agent.chunk_size,
            overlap: config.agent.chunk_overlap,
        })
    }

    /// Build for tests and tools that already hold a connection.
    pub fn from_parts(
        index: VectorIndex,
        corpus_dir: PathBuf,
        chunk_size: usize,
        overlap: usize,
    ) -> Self {
        Self {
            index: Arc::new(Mutex::new(index)),
            corpus_dir,
            chunk_size,
            overlap,
        }
    }

    /// Load the corpus, chunk it, and run the staleness-checked index build.
    /// No-ops with a warning when the corpus yields zero documents.
    pub fn build_index(&self) -> Result<BuildOutcome> {
        let documents = corpus::load_documents(&self.corpus_dir);
        if documents.is_empty() {
            warn!(dir = %self.corpus_dir.display(), "no documents in corpus, index not updated");
            return Ok(BuildOutcome::SkippedUpToDate);
        }

        let chunks = corpus::chunk_documents(&documents, self.chunk_size, self.overlap)?;
        let outcome = self.lock_index()?.upsert_or_skip(&chunks)?;
        if let BuildOutcome::Rebuilt(count) = outcome {
            info!(chunks = count, "knowledge base index built");
        }
        Ok(outcome)
    }

    /// Top-`k` chunks relevant to `query`. Empty vec on an empty index.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<String>> {
        let index = Arc::clone(&self.index);
        let query = query.to_string();
        tokio::task::spawn_blocking(move || {
            let guard = index
                .lock()
                .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
            guard.query(&query, k)
        })
        .await
        .context("search task failed")?
    }

    /// One uniformly random chunk, or `None` when the index is empty.
    pub async fn random_chunk(&self) -> Result<Option<String>> {
        let index = Arc::clone(&self.index);
        tokio::task::spawn_blocking(move || {
            let guard = index
                .lock()
                .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))?;
            guard.sample_random()
        })
        .await
        .context("sample task failed")?
    }

    /// Number of chunks currently indexed.
    pub fn count(&self) -> Result<usize> {
        self.lock_index()?.count()
    }

    /// Blocking variants for CLI use, where no task suspension is needed.
    pub fn search_blocking(&self, query: &str, k: usize) -> Result<Vec<String>> {
        self.lock_index()?.query(query, k)
    }

    fn lock_index(&self) -> Result<std::sync::MutexGuard<'_, VectorIndex>> {
        self.index
            .lock()
            .map_err(|e| anyhow::anyhow!("index lock poisoned: {e}"))
    }
}
