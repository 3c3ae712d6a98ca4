mod helpers;

use std::sync::Arc;
use std::time::Duration;

use helpers::{test_config, test_kb, write_corpus, ScriptedGenerator};
use scribe::agent::{AgentLifeCycle, AgentStatus, DEFAULT_QUESTION};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const SPARKS_MONOLOGUE: &str = "Tonight my mind kept wandering.\n\
    - What is memory made of?\n\
    - Why do rivers bend?\n\
    - Can silence be loud?";

fn agent_with_script(
    tmp: &TempDir,
    corpus_files: &[(&str, &str)],
    script: &[&str],
) -> AgentLifeCycle {
    let config = test_config(tmp.path());
    let corpus_dir = config.corpus_dir();
    write_corpus(&corpus_dir, corpus_files);

    let kb = test_kb(corpus_dir);
    kb.build_index().unwrap();

    AgentLifeCycle::new(&config, kb, Arc::new(ScriptedGenerator::new(script))).unwrap()
}

fn note_files(tmp: &TempDir) -> Vec<String> {
    scribe::server::list_note_files(&tmp.path().join("notes"))
}

fn life_log_events(tmp: &TempDir) -> Vec<String> {
    let dir = tmp.path().join("life_log");
    let entry = std::fs::read_dir(dir).unwrap().next().unwrap().unwrap();
    let contents = std::fs::read_to_string(entry.path()).unwrap();
    contents
        .lines()
        .map(|line| {
            let event: serde_json::Value = serde_json::from_str(line).unwrap();
            event["event_type"].as_str().unwrap().to_string()
        })
        .collect()
}

#[tokio::test]
async fn successful_tick_writes_note_and_updates_memory() {
    let tmp = TempDir::new().unwrap();
    // Empty knowledge base: planning falls back to the default question and
    // spends no generation call on it.
    let mut agent = agent_with_script(
        &tmp,
        &[],
        &["These are my findings.", "These are my thoughts.", SPARKS_MONOLOGUE],
    );

    agent.tick(1).await.unwrap();

    // The life log is the session's, named after its id.
    let log_name = format!("life_log_{}.jsonl", agent.session_id());
    assert!(tmp.path().join("life_log").join(&log_name).is_file());

    assert_eq!(agent.note_history().len(), 1);
    let record = &agent.note_history()[0];
    assert_eq!(record.spark, DEFAULT_QUESTION);
    assert_eq!(record.findings, "These are my findings.");
    assert_eq!(record.thoughts, "These are my thoughts.");
    assert_eq!(
        record.new_sparks,
        vec![
            "What is memory made of?",
            "Why do rivers bend?",
            "Can silence be loud?"
        ]
    );

    // Parsed questions land on the queue tail in order.
    let queue: Vec<&String> = agent.open_questions().iter().collect();
    assert_eq!(queue.len(), 3);
    assert_eq!(queue[0], "What is memory made of?");

    // Exactly one note file, with the labeled sections.
    let notes = note_files(&tmp);
    assert_eq!(notes.len(), 1);
    assert!(notes[0].starts_with("note_") && notes[0].ends_with(".md"));
    let content =
        std::fs::read_to_string(tmp.path().join("notes").join(&notes[0])).unwrap();
    assert!(content.contains("# Journal Entry:"));
    assert!(content.contains(&format!("**Initial Spark:** {DEFAULT_QUESTION}")));
    assert!(content.contains("## Findings\nThese are my findings."));
    assert!(content.contains("## My Thoughts\nThese are my thoughts."));
    assert!(content.contains("## New Sparks\nTonight my mind kept wandering."));

    let events = life_log_events(&tmp);
    assert_eq!(
        events,
        vec![
            "TICK_START",
            "PLAN_START",
            "PLAN_COMPLETE",
            "RESEARCH_START",
            "RESEARCH_COMPLETE",
            "WRITE_START",
            "WRITE_COMPLETE",
            "TICK_COMPLETE",
        ]
    );
}

#[tokio::test]
async fn incomplete_generation_abandons_tick_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    // Empty findings fails validation after all three calls complete.
    let mut agent = agent_with_script(
        &tmp,
        &[],
        &["", "some thoughts", "a monologue\n- A question?"],
    );

    agent.tick(1).await.unwrap();

    assert!(agent.note_history().is_empty());
    assert!(agent.open_questions().is_empty());
    assert!(note_files(&tmp).is_empty());

    let events = life_log_events(&tmp);
    assert!(events.contains(&"WRITE_FAILED".to_string()));
    assert!(!events.contains(&"WRITE_COMPLETE".to_string()));
}

#[tokio::test]
async fn whitespace_only_sparks_abandons_tick_without_side_effects() {
    let tmp = TempDir::new().unwrap();
    // Findings and thoughts succeed, but the sparks monologue comes back
    // blank, which fails validation after all three calls complete.
    let mut agent = agent_with_script(
        &tmp,
        &[],
        &["solid findings", "solid thoughts", "   \n  "],
    );

    agent.tick(1).await.unwrap();

    assert!(agent.note_history().is_empty());
    assert!(agent.open_questions().is_empty());
    assert!(note_files(&tmp).is_empty());

    let events = life_log_events(&tmp);
    assert!(events.contains(&"WRITE_FAILED".to_string()));
    assert!(!events.contains(&"WRITE_COMPLETE".to_string()));
}

#[tokio::test]
async fn generation_failure_abandons_tick_and_loop_survives() {
    let tmp = TempDir::new().unwrap();
    let mut agent = agent_with_script(&tmp, &[], &[]);

    // Script is exhausted, so the first writer call fails.
    agent.tick(1).await.unwrap();

    assert!(agent.note_history().is_empty());
    assert!(note_files(&tmp).is_empty());
    assert!(life_log_events(&tmp).contains(&"WRITE_FAILED".to_string()));
}

#[tokio::test]
async fn planning_pops_oldest_open_question_first() {
    let tmp = TempDir::new().unwrap();
    let mut agent = agent_with_script(
        &tmp,
        &[],
        &[
            // tick 1: writer only (planning uses the default question)
            "findings one",
            "thoughts one",
            "A monologue.\n- First follow-up?\n- Second follow-up?",
            // tick 2: planning pops from the queue, writer runs again
            "findings two",
            "thoughts two",
            "Another monologue.\n- Third follow-up?",
        ],
    );

    agent.tick(1).await.unwrap();
    assert_eq!(agent.open_questions().len(), 2);

    agent.tick(2).await.unwrap();

    // The oldest queued question became tick 2's spark.
    assert_eq!(agent.note_history().len(), 2);
    assert_eq!(agent.note_history()[1].spark, "First follow-up?");

    // Remaining queue: the unconsumed question, then tick 2's new one.
    let queue: Vec<&String> = agent.open_questions().iter().collect();
    assert_eq!(queue, vec!["Second follow-up?", "Third follow-up?"]);
}

#[tokio::test]
async fn first_tick_with_indexed_corpus_plans_from_stimulus() {
    let tmp = TempDir::new().unwrap();
    let mut agent = agent_with_script(
        &tmp,
        &[("sea.txt", "The tide returns twice a day, carrying the shore away.")],
        &[
            "What does the tide take with it?",
            "findings",
            "thoughts",
            SPARKS_MONOLOGUE,
        ],
    );

    agent.tick(1).await.unwrap();

    // No notes and no queued questions existed, so planning sampled a
    // stimulus chunk and asked for a question inspired by it.
    assert_eq!(agent.note_history().len(), 1);
    assert_eq!(agent.note_history()[0].spark, "What does the tide take with it?");
}

#[tokio::test]
async fn cancellation_halts_the_life_cycle() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(tmp.path());
    std::fs::create_dir_all(config.corpus_dir()).unwrap();

    let kb = test_kb(config.corpus_dir());
    let agent =
        AgentLifeCycle::new(&config, kb, Arc::new(ScriptedGenerator::always_failing()))
            .unwrap();
    let handle = agent.handle();
    assert_eq!(handle.status(), AgentStatus::Born);

    let cancel = CancellationToken::new();
    let task = tokio::spawn(agent.run(cancel.clone()));

    tokio::time::sleep(Duration::from_millis(100)).await;
    cancel.cancel();

    task.await.unwrap().unwrap();
    assert_eq!(handle.status(), AgentStatus::Halted);
    assert!(note_files(&tmp).is_empty());
}
