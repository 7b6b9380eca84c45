//! Session - the primary public API for storyteller gameplay.
//!
//! Wraps the narrator and game state into a single interface:
//! onboarding, the single-turn loading gate, and the render observer.

use crate::backend::{GenerationBackend, ImageKind};
use crate::narrator::{Narrator, NarratorConfig, NarratorError, TurnReport};
use crate::world::{Character, EntryKind, GameState, StoryEntry};
use tracing::{debug, warn};

const SEED_LORE_TOPIC: &str = "Core Concept";

/// Callback invoked after state mutations, for rendering.
pub type Observer = Box<dyn FnMut(&GameState) + Send>;

/// Configuration for creating a new session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Player character name.
    pub character_name: String,

    /// Player character backstory.
    pub backstory: String,

    /// Seed lore describing the world, stored under "Core Concept".
    pub world_concept: String,

    /// Whether onboarding requests an initial character portrait.
    pub generate_portrait: bool,

    /// Narrator tuning.
    pub narrator: NarratorConfig,
}

impl SessionConfig {
    pub fn new(character_name: impl Into<String>) -> Self {
        Self {
            character_name: character_name.into(),
            backstory: String::new(),
            world_concept: String::new(),
            generate_portrait: true,
            narrator: NarratorConfig::default(),
        }
    }

    pub fn with_backstory(mut self, backstory: impl Into<String>) -> Self {
        self.backstory = backstory.into();
        self
    }

    pub fn with_world_concept(mut self, concept: impl Into<String>) -> Self {
        self.world_concept = concept.into();
        self
    }

    /// Skip the onboarding portrait call.
    pub fn without_portrait(mut self) -> Self {
        self.generate_portrait = false;
        self
    }

    pub fn with_narrator(mut self, narrator: NarratorConfig) -> Self {
        self.narrator = narrator;
        self
    }
}

/// Why a player action was ignored without running a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The action was empty or whitespace.
    EmptyInput,
    /// A turn is already in flight.
    TurnInFlight,
}

/// Outcome of submitting a player action.
#[derive(Debug)]
pub enum TurnOutcome {
    /// The action was ignored; no state changed.
    Rejected(RejectReason),

    /// The turn ran to completion (images may still have been
    /// dropped along the way).
    Completed(TurnReport),

    /// Text generation failed: one error narrative entry was appended
    /// and the gate released.
    Failed(NarratorError),
}

/// A storyteller game session.
///
/// Owns the game state and enforces the single-turn gate: while a turn
/// is in flight, further player actions are ignored, and the gate is
/// released on every exit path.
pub struct Session {
    narrator: Narrator,
    state: GameState,
    observer: Option<Observer>,
}

impl Session {
    /// Create a session and run onboarding: create the character, seed
    /// the world lore, and (unless disabled) request an initial
    /// portrait. A failed portrait call is tolerated.
    pub async fn new(config: SessionConfig, backend: Box<dyn GenerationBackend>) -> Self {
        let narrator = Narrator::new(backend).with_config(config.narrator.clone());
        let character = Character::new(&config.character_name, &config.backstory);
        let mut state = GameState::new(character);

        if !config.world_concept.trim().is_empty() {
            state
                .world
                .lore
                .insert(SEED_LORE_TOPIC.to_string(), config.world_concept.clone());
        }

        let mut session = Self {
            narrator,
            state,
            observer: None,
        };

        if config.generate_portrait {
            let prompt = format!(
                "cinematic portrait of {}, {}",
                session.state.character.name, session.state.character.backstory
            );
            session.state.character.portrait = session
                .narrator
                .resolve_image(&prompt, ImageKind::Portrait)
                .await;
        }

        session
    }

    /// Register the render callback. It fires after each batch of
    /// state mutations: the player entry, and the directive/narrative
    /// updates at the end of a turn.
    pub fn set_observer(&mut self, observer: impl FnMut(&GameState) + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Submit a player action and run one full turn.
    ///
    /// Returns [`TurnOutcome::Rejected`] with no state change when the
    /// input is empty/whitespace or a turn is already in flight.
    pub async fn player_action(&mut self, input: &str) -> TurnOutcome {
        let action = input.trim();
        if action.is_empty() {
            debug!("ignoring empty player action");
            return TurnOutcome::Rejected(RejectReason::EmptyInput);
        }
        if self.state.is_loading {
            debug!("ignoring player action while a turn is in flight");
            return TurnOutcome::Rejected(RejectReason::TurnInFlight);
        }

        self.state.is_loading = true;
        self.state.add_entry(EntryKind::Player, action, None);
        self.notify();

        match self.narrator.process_turn(action, &mut self.state).await {
            Ok(report) => {
                self.state.add_entry(
                    EntryKind::Narrative,
                    report.narrative.clone(),
                    report.scene_image.clone(),
                );
                self.state.is_loading = false;
                self.notify();
                TurnOutcome::Completed(report)
            }
            Err(error) => {
                warn!(%error, "turn aborted");
                self.state.add_entry(
                    EntryKind::Narrative,
                    format!("An error interrupted the story: {error}"),
                    None,
                );
                self.state.is_loading = false;
                self.notify();
                TurnOutcome::Failed(error)
            }
        }
    }

    fn notify(&mut self) {
        if let Some(observer) = &mut self.observer {
            observer(&self.state);
        }
    }

    // ========================================================================
    // State queries
    // ========================================================================

    /// The current game state.
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable game state access.
    ///
    /// Use with caution - direct modifications bypass the directive
    /// pipeline.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Whether a turn is currently in flight.
    pub fn is_loading(&self) -> bool {
        self.state.is_loading
    }

    /// The player character's name.
    pub fn character_name(&self) -> &str {
        &self.state.character.name
    }

    /// Number of entries in the story log.
    pub fn story_len(&self) -> usize {
        self.state.story_log.len()
    }

    /// The most recent story entry, if any.
    pub fn last_entry(&self) -> Option<&StoryEntry> {
        self.state.last_entry()
    }
}
