//! The narrator: turn coordination and async directive resolution.
//!
//! One player turn runs as a single sequential pipeline: build the
//! prompt from the rolling context window, request narrative text,
//! extract and apply the embedded directives in source order, then
//! resolve any image directives. Only the text call can fail the turn;
//! a failed image call degrades to a turn without that image.

use crate::backend::{GenerationBackend, ImageKind};
use crate::directives::apply_directive;
use crate::tags::{extract_directives, TagKind};
use crate::world::{EntryKind, GameState, ImageRef, CONTEXT_WINDOW};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that abort a turn.
#[derive(Debug, Error)]
pub enum NarratorError {
    #[error("Text generation failed: {0}")]
    TextGeneration(#[from] genclient::Error),
}

/// Tuning for prompt assembly.
#[derive(Debug, Clone)]
pub struct NarratorConfig {
    /// How many trailing story entries feed each prompt.
    pub history_window: usize,

    /// Replacement for the built-in base instruction template.
    pub custom_base_prompt: Option<String>,
}

impl Default for NarratorConfig {
    fn default() -> Self {
        Self {
            history_window: CONTEXT_WINDOW,
            custom_base_prompt: None,
        }
    }
}

/// What a completed turn produced.
#[derive(Debug, Clone)]
pub struct TurnReport {
    /// Narrative text with all directive markup removed.
    pub narrative: String,

    /// Scene image for this turn's narrative entry, if one resolved.
    pub scene_image: Option<ImageRef>,

    /// Whether this turn updated the character portrait.
    pub portrait_updated: bool,

    /// Kinds of the synchronous directives applied, in source order.
    pub applied: Vec<TagKind>,
}

/// Drives the generation backend for one turn at a time.
pub struct Narrator {
    backend: Box<dyn GenerationBackend>,
    config: NarratorConfig,
}

impl Narrator {
    pub fn new(backend: Box<dyn GenerationBackend>) -> Self {
        Self {
            backend,
            config: NarratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: NarratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one turn against `state`.
    ///
    /// The caller has already appended this turn's player entry (it is
    /// excluded from the history section so the action appears once in
    /// the prompt) and appends the returned narrative afterwards.
    pub async fn process_turn(
        &self,
        action: &str,
        state: &mut GameState,
    ) -> Result<TurnReport, NarratorError> {
        let prompt = self.build_prompt(action, state);
        let raw = self.backend.generate_text(&prompt).await?;
        debug!(chars = raw.len(), "received raw narrative");

        let extraction = extract_directives(&raw);
        debug!(directives = extraction.directives.len(), "extracted directives");

        // Only the first occurrence of each image tag is honored.
        let mut scene_prompt = None;
        let mut portrait_prompt = None;
        let mut applied = Vec::new();

        for directive in &extraction.directives {
            match directive.kind {
                TagKind::ImgPrompt => {
                    if scene_prompt.is_none() {
                        scene_prompt = Some(directive.content.clone());
                    }
                }
                TagKind::CharImgPrompt => {
                    if portrait_prompt.is_none() {
                        portrait_prompt = Some(directive.content.clone());
                    }
                }
                _ => {
                    if apply_directive(directive, state) {
                        applied.push(directive.kind);
                    }
                }
            }
        }

        let scene_image = match scene_prompt {
            Some(prompt) => self.resolve_image(&prompt, ImageKind::Scene).await,
            None => None,
        };

        let mut portrait_updated = false;
        if let Some(prompt) = portrait_prompt {
            if let Some(portrait) = self.resolve_image(&prompt, ImageKind::Portrait).await {
                state.character.portrait = Some(portrait);
                portrait_updated = true;
            }
        }

        Ok(TurnReport {
            narrative: extraction.narrative,
            scene_image,
            portrait_updated,
            applied,
        })
    }

    /// Resolve one image directive. Any failure drops the image; the
    /// turn must never abort here.
    pub(crate) async fn resolve_image(&self, prompt: &str, kind: ImageKind) -> Option<ImageRef> {
        match self.backend.generate_image(prompt, kind).await {
            Ok(image) => Some(image),
            Err(error) => {
                warn!(kind = kind.as_str(), %error, "image generation failed; continuing without it");
                None
            }
        }
    }

    fn build_prompt(&self, action: &str, state: &GameState) -> String {
        let mut prompt = String::new();

        match &self.config.custom_base_prompt {
            Some(base) => prompt.push_str(base),
            None => prompt.push_str(include_str!("prompts/narrator_base.txt")),
        }

        prompt.push_str("\nCHARACTER:\n");
        let character = &state.character;
        prompt.push_str(&format!("Name: {}\n", character.name));
        prompt.push_str(&format!("Status: {}\n", character.status));
        if !character.backstory.is_empty() {
            prompt.push_str(&format!("Backstory: {}\n", character.backstory));
        }
        if !character.inventory.is_empty() {
            let names: Vec<_> = character
                .inventory
                .iter()
                .map(|item| item.name.as_str())
                .collect();
            prompt.push_str(&format!("Inventory: {}\n", names.join(", ")));
        }

        if !state.world.lore.is_empty() {
            prompt.push_str("\nWORLD:\n");
            let mut topics: Vec<_> = state.world.lore.iter().collect();
            topics.sort_by_key(|(topic, _)| topic.as_str());
            for (topic, text) in topics {
                prompt.push_str(&format!("{topic}: {text}\n"));
            }
        }

        if !state.world.npcs.is_empty() {
            prompt.push_str("\nKNOWN CHARACTERS:\n");
            for npc in &state.world.npcs {
                prompt.push_str(&format!("{}: {}\n", npc.name, npc.description));
            }
        }

        prompt.push_str("\nCURRENT SITUATION:\nHistory:\n");
        // The last entry is this turn's player action; history covers
        // everything before it.
        let prior = &state.story_log[..state.story_log.len().saturating_sub(1)];
        let start = prior.len().saturating_sub(self.config.history_window);
        for entry in &prior[start..] {
            let speaker = match entry.kind {
                EntryKind::Player => "Player",
                EntryKind::Narrative => "Story",
            };
            prompt.push_str(&format!("{speaker}: {}\n", entry.text));
        }

        prompt.push_str(&format!("\nPlayer: {action}\nStory:"));
        prompt
    }
}
