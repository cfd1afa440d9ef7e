//! Capability traits for the external ML steps.
//!
//! Model handles are heavyweight, so implementations are constructed once at
//! startup and shared read-only behind `Arc<dyn ..>`. Tests substitute
//! scripted implementations.

use async_trait::async_trait;

/// Failure of the translation step. Always treated as transient.
#[derive(Debug, thiserror::Error)]
#[error("Translation failed: {0}")]
pub struct TranslationError(pub String);

/// Failure of the image-generation step. Always treated as transient.
#[derive(Debug, thiserror::Error)]
#[error("Image generation failed: {0}")]
pub struct GenerationError(pub String);

/// Translates a user prompt into the language the image model expects.
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(&self, text: &str) -> Result<String, TranslationError>;
}

/// Generates encoded image bytes from a (translated) prompt.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>, GenerationError>;
}

/// Image encodings accepted from the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// MIME type used as the blob content type.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// File extension used in the storage key.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }
}

/// Identify the encoding of generator output from its header bytes.
///
/// Empty output and unsupported formats are generation failures: nothing is
/// stored for them.
pub fn sniff_image(bytes: &[u8]) -> Result<ImageKind, GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError("generator returned no bytes".into()));
    }
    match image::guess_format(bytes) {
        Ok(image::ImageFormat::Png) => Ok(ImageKind::Png),
        Ok(image::ImageFormat::Jpeg) => Ok(ImageKind::Jpeg),
        Ok(image::ImageFormat::WebP) => Ok(ImageKind::Webp),
        Ok(other) => Err(GenerationError(format!(
            "unsupported image format {other:?}"
        ))),
        Err(e) => Err(GenerationError(format!("unrecognised image data: {e}"))),
    }
}

/// Fall back to the source prompt when translation yields nothing usable.
pub fn translated_or_original(translated: String, original: &str) -> String {
    let trimmed = translated.trim();
    if trimmed.is_empty() {
        original.to_string()
    } else {
        trimmed.to_string()
    }
}
