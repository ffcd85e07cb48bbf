//! End-to-end session flows against a scripted provider and real storage

mod common;

use common::MockProvider;
use confide::config::SessionConfig;
use confide::session::{SessionController, SessionState};
use std::sync::Arc;

fn controller_with(provider: MockProvider) -> (SessionController, tempfile::TempDir) {
    let (kv, keys, dir) = common::create_temp_storage();
    let controller = SessionController::new(
        Arc::new(provider),
        kv,
        &keys,
        SessionConfig::default(),
    );
    (controller, dir)
}

#[tokio::test]
async fn test_streamed_reply_persists_exact_concatenation() {
    let (mut controller, _dir) = controller_with(MockProvider::new());

    let mut fragments = Vec::new();
    controller
        .send_message("long week", |fragment| fragments.push(fragment.to_string()))
        .await
        .unwrap();

    // Fragments arrived in order
    assert_eq!(fragments, vec!["Hel", "lo ", "there"]);

    // The persisted assistant turn holds the exact concatenation
    let id = controller.conversation().unwrap().id.clone();
    let stored = controller.conversations().get(&id).unwrap();
    let assistant_turn = stored.messages.last().unwrap();
    assert_eq!(assistant_turn.content, "Hello there");

    // No snapshot with partial content exists: there is exactly one
    // stored conversation and its reply is complete
    let all = controller.conversations().list();
    assert_eq!(all.len(), 1);
    assert!(all[0]
        .messages
        .iter()
        .all(|t| t.content != "Hel" && t.content != "Hello "));
}

#[tokio::test]
async fn test_interrupted_stream_persists_no_snapshot() {
    let mut provider = MockProvider::new();
    provider.fail_stream_after_first = true;
    let (mut controller, _dir) = controller_with(provider);

    let result = controller.send_message("hello", |_| {}).await;
    assert!(result.is_err());

    // Nothing was persisted at all
    assert!(controller.conversations().list().is_empty());
}

#[tokio::test]
async fn test_done_produces_artifact_and_updates_memory() {
    let (mut controller, _dir) = controller_with(MockProvider::new());

    controller
        .send_message("the night shifts are wearing me down", |_| {})
        .await
        .unwrap();

    let end_screen = controller.done().await.unwrap();
    assert_eq!(end_screen.themes, vec!["rest", "expectations"]);
    assert_eq!(controller.state(), SessionState::Closed);

    // Artifact persisted with the conversation
    let id = controller.conversation().unwrap().id.clone();
    let stored = controller.conversations().get(&id).unwrap();
    assert!(stored.end_screen.is_some());
    assert_eq!(stored.end_screen.unwrap(), end_screen);

    // Extraction delta merged into working memory
    let memory = controller.memory().read();
    assert_eq!(memory.facts, vec!["works night shifts"]);
    assert_eq!(memory.preferences, vec!["recharges alone"]);
    assert_eq!(memory.topics, vec!["burnout"]);
}

#[tokio::test]
async fn test_extraction_failure_does_not_block_done() {
    let mut provider = MockProvider::new();
    provider.extraction = Ok("sorry, no structured data here".to_string());
    let (mut controller, _dir) = controller_with(provider);

    controller.send_message("hello", |_| {}).await.unwrap();

    // Done still completes with a valid artifact
    let end_screen = controller.done().await.unwrap();
    assert!(!end_screen.validation.is_empty());
    assert_eq!(controller.state(), SessionState::Closed);

    // Memory store left unchanged
    assert!(controller.memory().read().is_empty());
}

#[tokio::test]
async fn test_synthesis_failure_keeps_conversation_active() {
    let mut provider = MockProvider::new();
    provider.synthesis = Err("model endpoint unreachable".to_string());
    let (mut controller, _dir) = controller_with(provider);

    controller.send_message("hello", |_| {}).await.unwrap();

    let result = controller.done().await;
    let message = result.unwrap_err().to_string();
    assert!(message.contains("Session synthesis failed"));

    // Conversation stays active with no artifact, in memory and on disk
    assert_eq!(controller.state(), SessionState::Active);
    let id = controller.conversation().unwrap().id.clone();
    let stored = controller.conversations().get(&id).unwrap();
    assert!(stored.end_screen.is_none());

    // And the session can still continue
    controller.send_message("still here", |_| {}).await.unwrap();
}

#[tokio::test]
async fn test_done_on_empty_conversation_is_rejected() {
    let (mut controller, _dir) = controller_with(MockProvider::new());

    let result = controller.done().await;
    assert!(result.unwrap_err().to_string().contains("no messages"));
    assert_eq!(controller.state(), SessionState::Idle);
    assert!(controller.conversations().list().is_empty());
}

#[tokio::test]
async fn test_memory_accumulates_across_conversations() {
    let (kv, keys, _dir) = common::create_temp_storage();

    // First conversation merges its delta
    let mut first = SessionController::new(
        Arc::new(MockProvider::new()),
        Arc::clone(&kv),
        &keys,
        SessionConfig::default(),
    );
    first.send_message("hello", |_| {}).await.unwrap();
    first.done().await.unwrap();

    // Second controller over the same backend proposes an overlapping delta
    let mut provider = MockProvider::new();
    provider.extraction = Ok(
        r#"{"facts":["works night shifts","has a younger brother"],"preferences":[],"topics":["burnout"]}"#
            .to_string(),
    );
    let mut second = SessionController::new(
        Arc::new(provider),
        kv,
        &keys,
        SessionConfig::default(),
    );
    second.send_message("hello again", |_| {}).await.unwrap();
    second.done().await.unwrap();

    // Union, not duplication
    let memory = second.memory().read();
    assert_eq!(
        memory.facts,
        vec!["works night shifts", "has a younger brother"]
    );
    assert_eq!(memory.topics, vec!["burnout"]);
}

#[tokio::test]
async fn test_resumed_closed_conversation_rejects_turns() {
    let (kv, keys, _dir) = common::create_temp_storage();

    let mut controller = SessionController::new(
        Arc::new(MockProvider::new()),
        Arc::clone(&kv),
        &keys,
        SessionConfig::default(),
    );
    controller.send_message("hello", |_| {}).await.unwrap();
    let id = controller.conversation().unwrap().id.clone();
    controller.done().await.unwrap();

    // Fresh controller resumes the closed conversation
    let mut resumed = SessionController::new(
        Arc::new(MockProvider::new()),
        kv,
        &keys,
        SessionConfig::default(),
    );
    resumed.resume(&id).unwrap();
    assert_eq!(resumed.state(), SessionState::Closed);

    let result = resumed.send_message("one more", |_| {}).await;
    assert!(result.is_err());
}
