//! Narrative game engine driving a local text/image generation backend.
//!
//! This crate provides:
//! - Directive tag extraction from generated narrative text
//! - Deterministic state mutation from embedded directives
//! - A turn coordinator with asynchronous image resolution
//! - A session API with a single-turn loading gate and render observer
//!
//! # Quick Start
//!
//! ```ignore
//! use storyteller_core::{Session, SessionConfig, TurnOutcome};
//!
//! #[tokio::main]
//! async fn main() {
//!     let backend = Box::new(genclient::GenClient::new());
//!     let config = SessionConfig::new("Kael")
//!         .with_backstory("a drifter with a debt to pay")
//!         .with_world_concept("A rain-soaked city run by corporations");
//!
//!     let mut session = Session::new(config, backend).await;
//!
//!     if let TurnOutcome::Completed(report) = session.player_action("I search the alley").await {
//!         println!("{}", report.narrative);
//!     }
//! }
//! ```

pub mod backend;
pub mod directives;
pub mod narrator;
pub mod session;
pub mod tags;
pub mod testing;
pub mod world;

// Primary public API
pub use backend::{BackendError, GenerationBackend, ImageKind};
pub use directives::apply_directive;
pub use narrator::{Narrator, NarratorConfig, NarratorError, TurnReport};
pub use session::{RejectReason, Session, SessionConfig, TurnOutcome};
pub use tags::{extract_directives, Directive, Extraction, TagKind};
pub use testing::{MockBackend, TestHarness};
pub use world::{
    Character, EntryKind, GameState, ImageRef, Item, Npc, StoryEntry, WorldState, CONTEXT_WINDOW,
};
