//! Synchronous directive application.
//!
//! Each directive maps to one mutation of [`GameState`]. Application
//! never fails: malformed content degrades to a no-op or a partial
//! update, and the turn carries on.

use crate::tags::{Directive, TagKind};
use crate::world::{GameState, Item, Npc};
use tracing::debug;

/// Apply one synchronous directive to the game state.
///
/// Returns true when the state changed. The image directives
/// (`img-prompt`, `char-img-prompt`) are asynchronous and resolved by
/// the narrator; passing one here is a no-op.
pub fn apply_directive(directive: &Directive, state: &mut GameState) -> bool {
    match directive.kind {
        TagKind::UpdateStatus => {
            state.character.status = directive.content.clone();
            true
        }
        TagKind::AddItem => {
            let (name, description) = split_pipe(&directive.content);
            state.character.inventory.push(Item {
                name: name.to_string(),
                description: description.unwrap_or("").to_string(),
            });
            true
        }
        TagKind::CreateNpc => match parse_npc(&directive.content) {
            Some(npc) => {
                state.world.npcs.push(npc);
                true
            }
            None => {
                debug!(content = %directive.content, "dropping malformed create-npc payload");
                false
            }
        },
        TagKind::UpdateLore => {
            let (topic, text) = split_pipe(&directive.content);
            match text {
                Some(text) => {
                    state.world.lore.insert(topic.to_string(), text.to_string());
                    true
                }
                None => {
                    // Lore needs both a topic and a value.
                    debug!(content = %directive.content, "dropping update-lore without a value");
                    false
                }
            }
        }
        TagKind::ImgPrompt | TagKind::CharImgPrompt => false,
    }
}

/// Split on the first `|`, trimming both halves.
fn split_pipe(content: &str) -> (&str, Option<&str>) {
    match content.split_once('|') {
        Some((left, right)) => (left.trim(), Some(right.trim())),
        None => (content.trim(), None),
    }
}

/// Parse a `create-npc` payload. Anything that is not a JSON object
/// with a non-empty string `id` yields `None`.
fn parse_npc(content: &str) -> Option<Npc> {
    let npc: Npc = serde_json::from_str(content.trim()).ok()?;
    if npc.id.is_empty() {
        return None;
    }
    Some(npc)
}
