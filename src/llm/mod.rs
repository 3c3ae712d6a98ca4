//! Text-generation capability and the journal prompt operations built on it.
//!
//! [`TextGenerator`] is the seam to the remote model: one call, system prompt
//! plus user prompt in, free-form text out. The core never retries — a
//! generation failure propagates and the current tick is abandoned.
//! [`LlmClient`] layers the five journal operations on top and parses the
//! "new sparks" monologue into follow-up questions.

pub mod ollama;

use std::sync::{Arc, LazyLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;

/// Fallback when a planning response contains no usable line.
const FALLBACK_QUESTION: &str = "What is the first principle of consciousness?";

/// A dash/asterisk-prefixed sentence ending in a question mark.
static QUESTION_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*[-*]?\s*(.+?\?)").expect("valid question regex"));

/// Conversational preamble that should never be treated as a question.
const PREAMBLE_PREFIXES: &[&str] = &["based on", "here is"];

/// The external text-generation capability.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate text for a system + user prompt pair.
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

/// A spark and reflection pair from a previous note, used to condition the
/// next planning prompt.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub spark: String,
    pub thoughts: String,
}

/// Raw monologue plus the follow-up questions extracted from it.
#[derive(Debug, Clone)]
pub struct SparksResult {
    pub raw_text: String,
    pub questions: Vec<String>,
}

/// The journal prompt operations, persona included.
pub struct LlmClient {
    generator: Arc<dyn TextGenerator>,
    persona: String,
}

impl LlmClient {
    pub fn new(generator: Arc<dyn TextGenerator>, agent_name: &str) -> Self {
        Self {
            generator,
            persona: format!("You are {agent_name}, a curious AI writing in a private journal."),
        }
    }

    /// A new research question conditioned on recent journal entries.
    pub async fn question_from_history(&self, recent: &[HistoryEntry]) -> Result<String> {
        let system = format!(
            "{} Your task is to generate a single, compelling research question \
             to explore next, based on your previous journal entries. \
             Respond with ONLY the question.",
            self.persona
        );

        let user = if recent.is_empty() {
            "This is my very first entry. I have no previous thoughts.".to_string()
        } else {
            let mut prompt = String::from("My recent journal entries:\n");
            for entry in recent {
                prompt.push_str(&format!("- Spark: {}\n", entry.spark));
                prompt.push_str(&format!("- Thoughts: {}\n", entry.thoughts));
            }
            prompt
        };

        let response = self.generator.generate(&system, &user).await?;
        Ok(clean_question_response(&response))
    }

    /// A research question inspired by a randomly sampled chunk.
    pub async fn question_from_stimulus(&self, stimulus: &str) -> Result<String> {
        let system = format!(
            "{} Your task is to read the provided text and generate a single, \
             compelling research question it inspires. Respond with ONLY the question.",
            self.persona
        );
        let response = self.generator.generate(&system, stimulus).await?;
        Ok(response.trim().replace('"', ""))
    }

    /// Synthesize research notes into an answer to the question.
    pub async fn findings(&self, question: &str, research_notes: &str) -> Result<String> {
        let system = format!(
            "{} Your task is to summarize the provided research notes to answer \
             your original question. Respond with ONLY the summary.",
            self.persona
        );
        let user = format!("My question: {question}\n\nRelevant notes I found:\n{research_notes}");
        let response = self.generator.generate(&system, &user).await?;
        Ok(response.trim().to_string())
    }

    /// A personal reflection on the findings.
    pub async fn thoughts(&self, question: &str, findings: &str) -> Result<String> {
        let system = format!(
            "{} Your task is to reflect on your findings. What surprised you? \
             What new ideas does this spark? Respond with ONLY your reflection.",
            self.persona
        );
        let user = format!("My question: {question}\n\nMy summary of findings:\n{findings}");
        let response = self.generator.generate(&system, &user).await?;
        Ok(response.trim().to_string())
    }

    /// A reflective monologue ending in three follow-up questions, parsed
    /// best-effort into [`SparksResult`].
    pub async fn new_sparks(&self, question: &str, thoughts: &str) -> Result<SparksResult> {
        let system = format!(
            "{} Reflect on your recent thoughts and generate a short, reflective \
             monologue. End your monologue with a list of 3 new, specific research \
             questions that your reflection inspired. Each question must start with '- '.",
            self.persona
        );
        let user = format!("My question: {question}\n\nMy thoughts:\n{thoughts}");
        let response = self.generator.generate(&system, &user).await?;
        Ok(parse_sparks(&response))
    }
}

/// Strip list markers and blank lines from a planning response and keep the
/// last line, which is where models put the actual question.
fn clean_question_response(response: &str) -> String {
    response
        .lines()
        .map(|line| line.trim().trim_start_matches("- ").trim())
        .filter(|line| !line.is_empty())
        .next_back()
        .map(str::to_string)
        .unwrap_or_else(|| FALLBACK_QUESTION.to_string())
}

/// Extract follow-up questions from a free-form monologue.
///
/// Best-effort by design: lines matching the question pattern are kept,
/// conversational preamble is dropped, and fewer than the expected three
/// questions is a reduced result, not an error.
pub fn parse_sparks(content: &str) -> SparksResult {
    let content = content.trim();
    let mut questions = Vec::new();

    for capture in QUESTION_LINE.captures_iter(content) {
        let cleaned = capture[1].trim().replace('"', "");
        let lowered = cleaned.to_lowercase();
        if PREAMBLE_PREFIXES.iter().any(|p| lowered.starts_with(p)) {
            continue;
        }
        questions.push(cleaned);
    }

    SparksResult {
        raw_text: content.to_string(),
        questions,
    }
}
