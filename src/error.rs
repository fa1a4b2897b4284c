//! Error types for each integration boundary.
//!
//! None of these reach end users: every public entry point converts them
//! into a default or fallback value and logs the cause.

use thiserror::Error;

/// A string that is not a well-formed `rgb(r, g, b)` color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("expected `rgb(r, g, b)`, got {0:?}")]
    Syntax(String),

    #[error("color channel {0:?} is not an integer in 0..=255")]
    Channel(String),
}

/// Failures inside the color extraction service.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Image URL is required")]
    MissingImageUrl,

    #[error("failed to fetch image: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("image request returned HTTP {0}")]
    Status(u16),

    #[error("image exceeds the {limit} byte limit")]
    TooLarge { limit: usize },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("nothing to sample: image or canvas has no pixels")]
    EmptyCanvas,
}

/// Failures talking to the extraction service from the client side.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("extraction request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("extraction service returned HTTP {0}")]
    Status(u16),

    #[error("extraction service returned an invalid color: {0}")]
    InvalidColor(#[from] ColorParseError),
}

/// Failures fetching the CMS site settings record.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("settings request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("settings endpoint returned HTTP {0}")]
    Status(u16),

    #[error("settings body is not a valid record: {0}")]
    Body(#[from] serde_json::Error),
}

/// Failure loading an animation module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to load animation module `{module}`: {reason}")]
pub struct LoadError {
    pub module: String,
    pub reason: String,
}

impl LoadError {
    pub fn new(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

/// Failures building or initializing the application context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("animation runtime is already initialized")]
    AlreadyInitialized,

    #[error(transparent)]
    Animation(#[from] LoadError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
