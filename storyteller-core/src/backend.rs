//! The generation backend capability.
//!
//! The engine never talks to a transport directly: one injected
//! [`GenerationBackend`] supplies both text and image generation,
//! whatever sits behind it. Production wires in
//! [`genclient::GenClient`]; tests wire in
//! [`MockBackend`](crate::testing::MockBackend).

use crate::world::ImageRef;
use async_trait::async_trait;

pub use genclient::{Error as BackendError, ImageKind};

/// A text and image generation capability.
///
/// Both calls may fail or return malformed content; how a failure is
/// handled (abort the turn vs. drop the image) is the caller's
/// business, not the backend's.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate narrative text for a prompt.
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError>;

    /// Generate an image and return an opaque reference to it.
    async fn generate_image(&self, prompt: &str, kind: ImageKind)
        -> Result<ImageRef, BackendError>;
}

#[async_trait]
impl GenerationBackend for genclient::GenClient {
    async fn generate_text(&self, prompt: &str) -> Result<String, BackendError> {
        genclient::GenClient::generate_text(self, prompt).await
    }

    async fn generate_image(
        &self,
        prompt: &str,
        kind: ImageKind,
    ) -> Result<ImageRef, BackendError> {
        genclient::GenClient::generate_image(self, prompt, kind)
            .await
            .map(ImageRef)
    }
}
