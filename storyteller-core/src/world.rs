//! Game state types for the storyteller engine.
//!
//! Contains the session aggregate mutated by directive application:
//! the player character, the world (lore and NPCs), and the story log.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Number of trailing story entries fed back into each prompt.
pub const CONTEXT_WINDOW: usize = 6;

/// Opaque handle to a generated image (a data URL or whatever the
/// backend hands out).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef(pub String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An inventory item. Immutable once created; duplicates are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub description: String,
}

/// The player character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub backstory: String,

    /// One-line condition of the character. Last write wins.
    pub status: String,

    /// Items gained over the session, in acquisition order.
    pub inventory: Vec<Item>,

    /// Generated portrait, once one has been resolved.
    pub portrait: Option<ImageRef>,
}

impl Character {
    pub fn new(name: impl Into<String>, backstory: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            backstory: backstory.into(),
            status: "Ready".to_string(),
            inventory: Vec::new(),
            portrait: None,
        }
    }
}

/// A non-player character introduced by a `create-npc` directive.
///
/// Only `id` is required. Any extra descriptive fields in the payload
/// are carried through opaquely.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Npc {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// World knowledge accumulated over the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorldState {
    /// Lore text by topic key. Keys are unique; rewriting a topic
    /// overwrites it.
    pub lore: HashMap<String, String>,

    /// Known NPCs, in the order they were introduced.
    pub npcs: Vec<Npc>,
}

/// Who produced a story entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryKind {
    Player,
    Narrative,
}

/// One entry in the story log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoryEntry {
    pub kind: EntryKind,
    pub text: String,
    pub image: Option<ImageRef>,
}

/// The complete session state.
///
/// Mutated only by directive application and the turn coordinator;
/// read by rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub character: Character,
    pub world: WorldState,

    /// Append-only sequence of player actions and narrative beats.
    pub story_log: Vec<StoryEntry>,

    /// True while a turn is in flight; gates new player actions.
    pub is_loading: bool,
}

impl GameState {
    pub fn new(character: Character) -> Self {
        Self {
            character,
            world: WorldState::default(),
            story_log: Vec::new(),
            is_loading: false,
        }
    }

    /// Append a story entry. Entries that are empty after trimming are
    /// suppressed.
    pub fn add_entry(&mut self, kind: EntryKind, text: impl Into<String>, image: Option<ImageRef>) {
        let text = text.into();
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return;
        }
        self.story_log.push(StoryEntry {
            kind,
            text: trimmed.to_string(),
            image,
        });
    }

    /// The most recent `count` entries, oldest first (the rolling
    /// context window).
    pub fn recent_entries(&self, count: usize) -> &[StoryEntry] {
        let start = self.story_log.len().saturating_sub(count);
        &self.story_log[start..]
    }

    /// The most recently appended entry, if any.
    pub fn last_entry(&self) -> Option<&StoryEntry> {
        self.story_log.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_character_defaults() {
        let character = Character::new("Kael", "a drifter");
        assert_eq!(character.status, "Ready");
        assert!(character.inventory.is_empty());
        assert!(character.portrait.is_none());
    }

    #[test]
    fn test_empty_entries_suppressed() {
        let mut state = GameState::new(Character::new("Kael", ""));
        state.add_entry(EntryKind::Narrative, "   \n  ", None);
        assert!(state.story_log.is_empty());

        state.add_entry(EntryKind::Narrative, "  The rain stops.  ", None);
        assert_eq!(state.story_log.len(), 1);
        assert_eq!(state.story_log[0].text, "The rain stops.");
    }

    #[test]
    fn test_recent_entries_window() {
        let mut state = GameState::new(Character::new("Kael", ""));
        for i in 0..10 {
            state.add_entry(EntryKind::Player, format!("action {i}"), None);
        }

        let recent = state.recent_entries(CONTEXT_WINDOW);
        assert_eq!(recent.len(), 6);
        assert_eq!(recent[0].text, "action 4");
        assert_eq!(recent[5].text, "action 9");
    }

    #[test]
    fn test_recent_entries_short_log() {
        let mut state = GameState::new(Character::new("Kael", ""));
        state.add_entry(EntryKind::Player, "hello", None);
        assert_eq!(state.recent_entries(CONTEXT_WINDOW).len(), 1);
    }

    #[test]
    fn test_npc_extra_fields_roundtrip() {
        let npc: Npc = serde_json::from_str(
            r#"{"id":"npc1","name":"Finn","description":"A guard","faction":"Watch"}"#,
        )
        .unwrap();
        assert_eq!(npc.id, "npc1");
        assert_eq!(npc.extra["faction"], "Watch");

        let back = serde_json::to_value(&npc).unwrap();
        assert_eq!(back["faction"], "Watch");
    }
}
