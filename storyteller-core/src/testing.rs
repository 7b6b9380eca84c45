//! Testing utilities for the storyteller engine.
//!
//! This module provides tools for integration testing:
//! - `MockBackend` for deterministic turns without a generation server
//! - `TestHarness` for scripted game scenarios
//! - Assertion helpers for verifying game state

use crate::backend::{BackendError, GenerationBackend, ImageKind};
use crate::session::{Session, SessionConfig, TurnOutcome};
use crate::world::{GameState, ImageRef};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted generation result: a payload or a failure message.
#[derive(Debug, Clone)]
enum Scripted {
    Respond(String),
    Fail(String),
}

#[derive(Debug, Default)]
struct MockState {
    text: VecDeque<Scripted>,
    scene: VecDeque<Scripted>,
    portrait: VecDeque<Scripted>,
    text_prompts: Vec<String>,
    image_requests: Vec<(ImageKind, String)>,
}

/// A generation backend that returns scripted responses.
///
/// Clones share the same queues, so a harness can keep a handle while
/// the session owns the boxed backend. Text calls with nothing queued
/// return a default narrative; image calls with nothing queued fail
/// (and are therefore dropped by the resolver).
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a text response.
    pub fn queue_text(&self, response: impl Into<String>) {
        self.lock().text.push_back(Scripted::Respond(response.into()));
    }

    /// Queue a text generation failure.
    pub fn fail_next_text(&self, message: impl Into<String>) {
        self.lock().text.push_back(Scripted::Fail(message.into()));
    }

    /// Queue a successful scene image resolution.
    pub fn queue_scene_image(&self, reference: impl Into<String>) {
        self.lock().scene.push_back(Scripted::Respond(reference.into()));
    }

    /// Queue a scene image failure.
    pub fn fail_next_scene_image(&self, message: impl Into<String>) {
        self.lock().scene.push_back(Scripted::Fail(message.into()));
    }

    /// Queue a successful portrait resolution.
    pub fn queue_portrait_image(&self, reference: impl Into<String>) {
        self.lock().portrait.push_back(Scripted::Respond(reference.into()));
    }

    /// Queue a portrait failure.
    pub fn fail_next_portrait_image(&self, message: impl Into<String>) {
        self.lock().portrait.push_back(Scripted::Fail(message.into()));
    }

    /// Every text prompt this backend has received, in order.
    pub fn text_prompts(&self) -> Vec<String> {
        self.lock().text_prompts.clone()
    }

    /// Every image request this backend has received, in order.
    pub fn image_requests(&self) -> Vec<(ImageKind, String)> {
        self.lock().image_requests.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().expect("mock backend lock poisoned")
    }
}

#[async_trait]
impl GenerationBackend for MockBackend {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        let mut state = self.lock();
        state.text_prompts.push(prompt.to_string());

        match state.text.pop_front() {
            Some(Scripted::Respond(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(BackendError::Backend(message)),
            None => Ok("The story continues.".to_string()),
        }
    }

    async fn generate_image(
        &self,
        prompt: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, BackendError> {
        let mut state = self.lock();
        state.image_requests.push((kind, prompt.to_string()));

        let queue = match kind {
            ImageKind::Scene => &mut state.scene,
            ImageKind::Portrait => &mut state.portrait,
        };
        match queue.pop_front() {
            Some(Scripted::Respond(reference)) => Ok(ImageRef(reference)),
            Some(Scripted::Fail(message)) => Err(BackendError::Backend(message)),
            None => Err(BackendError::MissingImage),
        }
    }
}

/// Test harness for running scripted game scenarios.
pub struct TestHarness {
    /// The session under test.
    pub session: Session,
    /// Handle to the session's mock backend.
    pub backend: MockBackend,
}

impl TestHarness {
    /// Harness with a default character and no onboarding portrait.
    pub async fn new() -> Self {
        let config = SessionConfig::new("Test Hero")
            .with_backstory("an adventurer of no fixed address")
            .with_world_concept("A test world")
            .without_portrait();
        Self::with_config(config).await
    }

    /// Harness with a custom session configuration.
    pub async fn with_config(config: SessionConfig) -> Self {
        let backend = MockBackend::new();
        let session = Session::new(config, Box::new(backend.clone())).await;
        Self { session, backend }
    }

    /// Queue a narrative response for the next turn.
    pub fn expect_narrative(&mut self, text: impl Into<String>) -> &mut Self {
        self.backend.queue_text(text);
        self
    }

    /// Queue a text generation failure for the next turn.
    pub fn expect_text_failure(&mut self, message: impl Into<String>) -> &mut Self {
        self.backend.fail_next_text(message);
        self
    }

    /// Queue a scene image for the next `img-prompt` resolution.
    pub fn expect_scene_image(&mut self, reference: impl Into<String>) -> &mut Self {
        self.backend.queue_scene_image(reference);
        self
    }

    /// Queue a portrait for the next `char-img-prompt` resolution.
    pub fn expect_portrait_image(&mut self, reference: impl Into<String>) -> &mut Self {
        self.backend.queue_portrait_image(reference);
        self
    }

    /// Send player input and get the outcome.
    pub async fn input(&mut self, text: &str) -> TurnOutcome {
        self.session.player_action(text).await
    }

    /// The current game state.
    pub fn state(&self) -> &GameState {
        self.session.state()
    }

    /// Number of story log entries.
    pub fn story_len(&self) -> usize {
        self.session.story_len()
    }

    /// The character's current status line.
    pub fn status(&self) -> &str {
        &self.state().character.status
    }

    /// Number of inventory items.
    pub fn inventory_len(&self) -> usize {
        self.state().character.inventory.len()
    }

    /// Number of known NPCs.
    pub fn npc_count(&self) -> usize {
        self.state().world.npcs.len()
    }

    /// Lore text for a topic, if present.
    pub fn lore(&self, topic: &str) -> Option<&str> {
        self.state().world.lore.get(topic).map(String::as_str)
    }

    /// Text of the most recent story entry.
    pub fn last_entry_text(&self) -> Option<&str> {
        self.session.last_entry().map(|entry| entry.text.as_str())
    }
}

// ============================================================================
// Assertion Helpers
// ============================================================================

/// Assert the loading gate is released.
#[track_caller]
pub fn assert_idle(harness: &TestHarness) {
    assert!(
        !harness.session.is_loading(),
        "Expected the loading gate to be released"
    );
}

/// Assert the character status line.
#[track_caller]
pub fn assert_status(harness: &TestHarness, expected: &str) {
    assert_eq!(
        harness.status(),
        expected,
        "Expected status {expected:?}, got {:?}",
        harness.status()
    );
}

/// Assert the story log length.
#[track_caller]
pub fn assert_story_len(harness: &TestHarness, expected: usize) {
    assert_eq!(
        harness.story_len(),
        expected,
        "Expected {expected} story entries, got {}",
        harness.story_len()
    );
}

/// Assert a lore topic holds the expected text.
#[track_caller]
pub fn assert_lore(harness: &TestHarness, topic: &str, expected: &str) {
    assert_eq!(
        harness.lore(topic),
        Some(expected),
        "Expected lore[{topic:?}] == {expected:?}, got {:?}",
        harness.lore(topic)
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_backend_scripted_text() {
        let backend = MockBackend::new();
        backend.queue_text("First.");
        backend.queue_text("Second.");

        assert_eq!(backend.generate_text("p1").await.unwrap(), "First.");
        assert_eq!(backend.generate_text("p2").await.unwrap(), "Second.");
        // Exhausted queues return a default narrative.
        assert_eq!(
            backend.generate_text("p3").await.unwrap(),
            "The story continues."
        );
        assert_eq!(backend.text_prompts(), vec!["p1", "p2", "p3"]);
    }

    #[tokio::test]
    async fn test_mock_backend_image_queues_by_kind() {
        let backend = MockBackend::new();
        backend.queue_scene_image("img://scene");

        let scene = backend.generate_image("a shard", ImageKind::Scene).await;
        assert_eq!(scene.unwrap().as_str(), "img://scene");

        // Portraits draw from their own queue.
        let portrait = backend.generate_image("a face", ImageKind::Portrait).await;
        assert!(portrait.is_err());
    }

    #[tokio::test]
    async fn test_harness_basic_flow() {
        let mut harness = TestHarness::new().await;
        harness.expect_narrative("You stand in a dusty tavern.");

        let outcome = harness.input("I look around").await;

        assert!(matches!(outcome, TurnOutcome::Completed(_)));
        assert_eq!(
            harness.last_entry_text(),
            Some("You stand in a dusty tavern.")
        );
        assert_story_len(&harness, 2);
        assert_idle(&harness);
    }
}
