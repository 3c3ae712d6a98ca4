//! The agent life-cycle scheduler.
//!
//! One tokio task per agent runs an infinite tick loop: Planning →
//! Researching → Writing → Sleeping. The agent exclusively owns its memory —
//! the append-only note history and the FIFO open-question queue. Every
//! significant transition is recorded in the session's life event log, and
//! the loop suspends only at generation calls, knowledge base queries, and
//! the inter-tick sleep, each guarded by the cancellation token.

pub mod life_log;

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::json;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::ScribeConfig;
use crate::kb::KnowledgeBase;
use crate::llm::{HistoryEntry, LlmClient, SparksResult, TextGenerator};
use life_log::{LifeEventLogger, LifeEventType};

/// Question used when the first tick finds an empty knowledge base.
pub const DEFAULT_QUESTION: &str = "What is the nature of consciousness?";

/// Research notes when the knowledge base returns nothing.
const NO_RESULTS_NOTES: &str = "No relevant information found in the knowledge base.";

/// How many recent notes condition the planning prompt.
const HISTORY_WINDOW: usize = 3;

/// Life-cycle phase, as exposed to the monitoring surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentStatus {
    Born,
    Planning,
    Researching,
    Writing,
    Sleeping,
    Halted,
}

impl AgentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Born => "Born",
            Self::Planning => "Planning",
            Self::Researching => "Researching",
            Self::Writing => "Writing",
            Self::Sleeping => "Sleeping",
            Self::Halted => "Halted",
        }
    }
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-tick failures of the writing phase. All of these abandon the current
/// tick and leave the life cycle running.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("text generation failed: {0}")]
    Generation(#[source] anyhow::Error),
    #[error("malformed generation result: {0}")]
    MalformedGeneration(String),
    #[error("incomplete generation result: {0}")]
    IncompleteGeneration(String),
}

/// One completed journal entry, kept in memory for future planning.
/// Append-only; never mutated after creation.
#[derive(Debug, Clone)]
pub struct NoteRecord {
    pub spark: String,
    pub findings: String,
    pub thoughts: String,
    pub new_sparks: Vec<String>,
}

/// Read-only view of the agent shared with the monitoring surface.
#[derive(Clone)]
pub struct AgentHandle {
    pub name: String,
    pub notes_dir: PathBuf,
    status: Arc<Mutex<AgentStatus>>,
}

impl AgentHandle {
    pub fn status(&self) -> AgentStatus {
        match self.status.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

pub struct AgentLifeCycle {
    name: String,
    session_id: String,
    status: Arc<Mutex<AgentStatus>>,
    kb: KnowledgeBase,
    llm: LlmClient,
    life_log: LifeEventLogger,
    notes_dir: PathBuf,
    research_chunks: usize,
    sleep: Duration,
    note_history: Vec<NoteRecord>,
    open_questions: VecDeque<String>,
}

impl AgentLifeCycle {
    pub fn new(
        config: &ScribeConfig,
        kb: KnowledgeBase,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        let session_id = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        let life_log = LifeEventLogger::new(&config.life_log_dir(), &session_id)?;

        let notes_dir = config.notes_dir();
        std::fs::create_dir_all(&notes_dir)
            .with_context(|| format!("failed to create notes dir {}", notes_dir.display()))?;

        Ok(Self {
            name: config.agent.name.clone(),
            session_id,
            status: Arc::new(Mutex::new(AgentStatus::Born)),
            kb,
            llm: LlmClient::new(generator, &config.agent.name),
            life_log,
            notes_dir,
            research_chunks: config.agent.research_chunks,
            sleep: Duration::from_secs(config.agent.sleep_secs),
            note_history: Vec::new(),
            open_questions: VecDeque::new(),
        })
    }

    /// Handle for the monitoring surface.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            name: self.name.clone(),
            notes_dir: self.notes_dir.clone(),
            status: Arc::clone(&self.status),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn note_history(&self) -> &[NoteRecord] {
        &self.note_history
    }

    pub fn open_questions(&self) -> &VecDeque<String> {
        &self.open_questions
    }

    /// Run the life cycle until the token is cancelled. Cancellation at any
    /// suspension point halts the agent; side effects of completed phases
    /// persist, but a cancelled tick never writes a note.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<()> {
        info!(name = %self.name, session = %self.session_id, "agent life cycle started");

        let mut tick_id: u64 = 0;
        while !cancel.is_cancelled() {
            tick_id += 1;

            tokio::select! {
                _ = cancel.cancelled() => break,
                result = self.tick(tick_id) => {
                    if let Err(err) = result {
                        warn!(tick = tick_id, %err, "tick abandoned");
                    }
                }
            }

            self.set_status(AgentStatus::Sleeping);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.sleep) => {}
            }
        }

        self.set_status(AgentStatus::Halted);
        info!(name = %self.name, "agent halted");
        Ok(())
    }

    /// One full Planning → Researching → Writing pass.
    ///
    /// An `Err` means the tick was abandoned before the writing phase could
    /// record its own failure; memory and the notes directory are untouched.
    pub async fn tick(&mut self, tick_id: u64) -> Result<()> {
        info!(tick = tick_id, "life cycle tick");
        self.life_log
            .log(LifeEventType::TickStart, json!({"tick_id": tick_id}));

        let question = self.plan().await?;
        let research_notes = self.research(&question).await?;
        self.write_entry(question, research_notes).await;

        self.life_log
            .log(LifeEventType::TickComplete, json!({"tick_id": tick_id}));
        Ok(())
    }

    /// Choose the next research question: FIFO queue first, then a stimulus
    /// chunk on the very first tick, then a question conditioned on recent
    /// note history.
    async fn plan(&mut self) -> Result<String> {
        self.set_status(AgentStatus::Planning);
        self.life_log.log(
            LifeEventType::PlanStart,
            json!({"open_questions": self.open_questions.len()}),
        );

        let question = if let Some(question) = self.open_questions.pop_front() {
            info!(%question, "taking next question from the open queue");
            question
        } else if self.note_history.is_empty() {
            info!("first tick, sampling a stimulus from the knowledge base");
            match self.kb.random_chunk().await? {
                Some(stimulus) => self.llm.question_from_stimulus(&stimulus).await?,
                None => {
                    warn!("knowledge base is empty, using the default question");
                    DEFAULT_QUESTION.to_string()
                }
            }
        } else {
            let recent: Vec<HistoryEntry> = self
                .note_history
                .iter()
                .rev()
                .take(HISTORY_WINDOW)
                .rev()
                .map(|note| HistoryEntry {
                    spark: note.spark.clone(),
                    thoughts: note.thoughts.clone(),
                })
                .collect();
            self.llm.question_from_history(&recent).await?
        };

        self.life_log
            .log(LifeEventType::PlanComplete, json!({"question": question}));
        Ok(question)
    }

    /// Query the knowledge base for material relevant to the question.
    async fn research(&mut self, question: &str) -> Result<String> {
        self.set_status(AgentStatus::Researching);
        info!(%question, "researching");
        self.life_log
            .log(LifeEventType::ResearchStart, json!({"question": question}));

        let results = self.kb.search(question, self.research_chunks).await?;
        self.life_log.log(
            LifeEventType::ResearchComplete,
            json!({"question": question, "chunks_found": results.len()}),
        );

        if results.is_empty() {
            Ok(NO_RESULTS_NOTES.to_string())
        } else {
            Ok(results.join("\n\n---\n\n"))
        }
    }

    /// Generate the journal entry, persist it, and update agent memory.
    ///
    /// Validation failures abandon the tick: a `WRITE_FAILED` event is logged
    /// and neither memory nor the notes directory changes.
    async fn write_entry(&mut self, question: String, research_notes: String) {
        self.set_status(AgentStatus::Writing);
        self.life_log
            .log(LifeEventType::WriteStart, json!({"question": question}));

        let (findings, thoughts, sparks) =
            match self.compose_entry(&question, &research_notes).await {
                Ok(parts) => parts,
                Err(err) => {
                    error!(%err, "writer failed, abandoning tick");
                    self.life_log.log(
                        LifeEventType::WriteFailed,
                        json!({"reason": err.to_string()}),
                    );
                    return;
                }
            };

        let note_path = match self.write_note_file(&question, &findings, &thoughts, &sparks) {
            Ok(path) => path,
            Err(err) => {
                error!(%err, "failed to persist note, abandoning tick");
                self.life_log.log(
                    LifeEventType::WriteFailed,
                    json!({"reason": err.to_string()}),
                );
                return;
            }
        };

        let new_questions = sparks.questions.len();
        self.open_questions.extend(sparks.questions.iter().cloned());
        info!(count = new_questions, "writer generated new questions");

        self.note_history.push(NoteRecord {
            spark: question,
            findings,
            thoughts,
            new_sparks: sparks.questions,
        });

        info!(path = %note_path.display(), "note saved");
        self.life_log.log(
            LifeEventType::WriteComplete,
            json!({
                "note_path": note_path.to_string_lossy(),
                "new_questions_generated": new_questions,
            }),
        );
    }

    /// The three sequential generation calls, validated.
    async fn compose_entry(
        &self,
        question: &str,
        research_notes: &str,
    ) -> Result<(String, String, SparksResult), AgentError> {
        let findings = self
            .llm
            .findings(question, research_notes)
            .await
            .map_err(AgentError::Generation)?;
        let thoughts = self
            .llm
            .thoughts(question, &findings)
            .await
            .map_err(AgentError::Generation)?;
        let sparks = self
            .llm
            .new_sparks(question, &thoughts)
            .await
            .map_err(AgentError::Generation)?;

        if sparks.raw_text.is_empty() {
            return Err(AgentError::MalformedGeneration(
                "sparks response had no content".into(),
            ));
        }
        if findings.is_empty() || thoughts.is_empty() {
            return Err(AgentError::IncompleteGeneration(
                "empty findings or thoughts".into(),
            ));
        }

        Ok((findings, thoughts, sparks))
    }

    /// Assemble the human-readable note and write it once.
    fn write_note_file(
        &self,
        question: &str,
        findings: &str,
        thoughts: &str,
        sparks: &SparksResult,
    ) -> Result<PathBuf> {
        let timestamp = chrono::Local::now();
        let note_path = self
            .notes_dir
            .join(format!("note_{}.md", timestamp.format("%Y%m%d_%H%M%S")));

        let content = format!(
            "# Journal Entry: {}\n\n\
             **Initial Spark:** {question}\n\n\
             ## Findings\n{findings}\n\n\
             ## My Thoughts\n{thoughts}\n\n\
             ## New Sparks\n{}",
            timestamp.format("%Y-%m-%d %H:%M:%S"),
            sparks.raw_text,
        );

        std::fs::write(&note_path, content)
            .with_context(|| format!("failed to write note {}", note_path.display()))?;
        Ok(note_path)
    }

    fn set_status(&self, status: AgentStatus) {
        let mut guard = match self.status.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = status;
    }
}
