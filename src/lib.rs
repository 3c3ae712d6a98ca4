//! Autonomous journaling agent with a local knowledge base.
//!
//! Scribe runs a single-task life cycle that repeatedly formulates a research
//! question, retrieves supporting chunks from a local text corpus, and writes
//! a reflective journal note — feeding the follow-up questions it generates
//! back into its own queue. Each tick cycles Planning → Researching →
//! Writing → Sleeping until the agent is halted.
//!
//! # Architecture
//!
//! - **Knowledge base**: corpus documents are split into overlapping chunks
//!   and indexed in SQLite with [sqlite-vec](https://github.com/asg017/sqlite-vec)
//!   for similarity search
//! - **Embeddings**: local ONNX Runtime with all-MiniLM-L6-v2 (384 dimensions)
//! - **Text generation**: Ollama chat API behind the [`llm::TextGenerator`]
//!   trait
//! - **Monitoring**: read-only HTTP surface (axum) exposing agent status and
//!   the journal notes
//!
//! # Modules
//!
//! - [`config`] — Configuration loading from TOML files and environment variables
//! - [`db`] — SQLite chunk-index database initialization
//! - [`embedding`] — Text-to-vector embedding pipeline via ONNX Runtime
//! - [`kb`] — Corpus chunking and the vector index
//! - [`llm`] — Text-generation capability and journal prompt operations
//! - [`agent`] — The life-cycle scheduler, agent memory, and life event log
//! - [`server`] — HTTP monitoring surface

pub mod agent;
pub mod config;
pub mod db;
pub mod embedding;
pub mod kb;
pub mod llm;
pub mod server;
