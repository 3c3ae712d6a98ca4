#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;

use scribe::config::ScribeConfig;
use scribe::embedding::{EmbeddingProvider, EMBEDDING_DIM};
use scribe::kb::index::VectorIndex;
use scribe::kb::KnowledgeBase;
use scribe::llm::TextGenerator;

/// Deterministic embedder for tests: the text hashes to a couple of spike
/// positions, so identical texts embed identically and distinct texts land
/// apart. No model files needed.
pub struct FakeEmbedder;

impl EmbeddingProvider for FakeEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut hash: u64 = 0xcbf29ce484222325;
        for b in text.bytes() {
            hash ^= b as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }

        let mut v = vec![0.0f32; EMBEDDING_DIM];
        v[(hash % EMBEDDING_DIM as u64) as usize] = 1.0;
        v[((hash >> 16) % EMBEDDING_DIM as u64) as usize] += 0.5;

        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v {
            *x /= norm;
        }
        Ok(v)
    }
}

/// Scripted [`TextGenerator`]: pops canned responses in order. `Err` entries
/// simulate a failed generation call; an exhausted script is also an error.
pub struct ScriptedGenerator {
    responses: Mutex<VecDeque<Result<String, String>>>,
}

impl ScriptedGenerator {
    pub fn new(responses: &[&str]) -> Self {
        Self {
            responses: Mutex::new(responses.iter().map(|r| Ok(r.to_string())).collect()),
        }
    }

    pub fn from_results(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
        }
    }

    /// A generator whose every call fails.
    pub fn always_failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
        }
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String> {
        let next = self
            .responses
            .lock()
            .expect("script lock")
            .pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(msg)) => anyhow::bail!("scripted failure: {msg}"),
            None => anyhow::bail!("generation script exhausted"),
        }
    }
}

/// Write corpus fixture files into `dir`.
pub fn write_corpus(dir: &Path, files: &[(&str, &str)]) {
    std::fs::create_dir_all(dir).unwrap();
    for (name, content) in files {
        std::fs::write(dir.join(name), content).unwrap();
    }
}

/// Knowledge base over an in-memory index and the fake embedder.
pub fn test_kb(corpus_dir: PathBuf) -> KnowledgeBase {
    let conn = scribe::db::open_memory_database().unwrap();
    let index = VectorIndex::new(conn, Arc::new(FakeEmbedder));
    KnowledgeBase::from_parts(index, corpus_dir, 512, 50)
}

/// Config pointing every storage path into `base` (a temp dir).
pub fn test_config(base: &Path) -> ScribeConfig {
    let mut config = ScribeConfig::default();
    config.storage.corpus_dir = base.join("corpus").to_string_lossy().into_owned();
    config.storage.index_db_path = base.join("index.db").to_string_lossy().into_owned();
    config.storage.notes_dir = base.join("notes").to_string_lossy().into_owned();
    config.storage.life_log_dir = base.join("life_log").to_string_lossy().into_owned();
    config.agent.sleep_secs = 1;
    config
}
