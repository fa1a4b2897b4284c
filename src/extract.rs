//! Average-color extraction.
//!
//! An image is fetched, decoded, drawn onto a small square canvas and the
//! red, green and blue channels are averaged over every canvas pixel. The
//! canvas is a deliberate downsample for speed; images smaller than the
//! canvas are upscaled onto it.
//!
//! Any failure produces a [`Extraction::Degraded`] result carrying a random
//! entry from the [fallback palette](crate::color::FALLBACK_PALETTE).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::color::{Color, random_fallback};
use crate::error::ExtractError;

/// Edge length of the sampling canvas in pixels.
pub const CANVAS_SIZE: u32 = 50;

// ============================================================================
// Extraction Result
// ============================================================================

/// Outcome of a color extraction.
///
/// Both variants carry a displayable color; `Degraded` additionally records
/// why the real color could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// The mean color of the image.
    Extracted(Color),

    /// A palette color substituted after a failure.
    Degraded { color: Color, reason: String },
}

impl Extraction {
    /// Builds a degraded result with a random palette color.
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            color: random_fallback(&mut rand::rng()),
            reason: reason.into(),
        }
    }

    /// The color to display, whichever variant this is.
    pub fn color(&self) -> Color {
        match self {
            Self::Extracted(color) | Self::Degraded { color, .. } => *color,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    /// The failure message, if this is a degraded result.
    pub fn reason(&self) -> Option<&str> {
        match self {
            Self::Extracted(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}

// ============================================================================
// Wire Types
// ============================================================================

/// Request body of `POST /api/extract-color`.
///
/// ```json
/// { "imageUrl": "https://cdn.example.com/photo.jpg" }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct ExtractColorRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl ExtractColorRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: Some(image_url.into()),
        }
    }
}

/// Response body of `POST /api/extract-color`.
///
/// ```json
/// { "success": false, "color": "rgb(54, 162, 235)", "error": "Image URL is required" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ExtractColorResponse {
    pub success: bool,

    /// Formatted as `rgb(r, g, b)`.
    pub color: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Extraction> for ExtractColorResponse {
    fn from(extraction: Extraction) -> Self {
        match extraction {
            Extraction::Extracted(color) => Self {
                success: true,
                color: color.to_string(),
                error: None,
            },
            Extraction::Degraded { color, reason } => Self {
                success: false,
                color: color.to_string(),
                error: Some(reason),
            },
        }
    }
}

// ============================================================================
// Image Fetching
// ============================================================================

/// Source of raw (still encoded) image bytes.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError>;
}

/// Largest encoded image the HTTP fetcher will download by default.
pub const MAX_IMAGE_BYTES: usize = 20 * 1024 * 1024;

/// Fetches images over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
    max_bytes: usize,
}

impl HttpImageFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ExtractError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            max_bytes: MAX_IMAGE_BYTES,
        }
    }

    /// Rejects bodies larger than `max_bytes`.
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ExtractError> {
        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status(status.as_u16()));
        }

        let limit = self.max_bytes;
        let declared = response.content_length().unwrap_or(0);
        if declared > limit as u64 {
            return Err(ExtractError::TooLarge { limit });
        }

        // Content-Length may be absent or wrong, so the streamed total is checked too.
        let mut body = Vec::with_capacity(declared as usize);
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > limit {
                return Err(ExtractError::TooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

// ============================================================================
// Averaging
// ============================================================================

/// Draws `image` onto a `canvas_size` square and returns its mean color.
///
/// The canvas starts transparent black and resampling happens on
/// premultiplied pixels, so fully transparent areas read back as black and
/// hidden RGB values under zero alpha never bleed into visible pixels. The
/// alpha byte itself is not averaged; each channel mean is rounded half-up.
pub fn average_color(image: &DynamicImage, canvas_size: u32) -> Result<Color, ExtractError> {
    if canvas_size == 0 || image.width() == 0 || image.height() == 0 {
        return Err(ExtractError::EmptyCanvas);
    }

    let canvas = imageops::resize(&premultiplied(image), canvas_size, canvas_size, FilterType::Triangle);
    Ok(mean_rgb(&canvas))
}

fn premultiplied(image: &DynamicImage) -> RgbaImage {
    let mut buffer = image.to_rgba8();
    for pixel in buffer.pixels_mut() {
        let alpha = pixel.0[3] as u32;
        for channel in &mut pixel.0[..3] {
            *channel = ((*channel as u32 * alpha + 127) / 255) as u8;
        }
    }
    buffer
}

/// Un-premultiplies one channel the way a canvas read-back does.
fn straight_channel(premultiplied: u8, alpha: u8) -> u64 {
    if alpha == 0 {
        return 0;
    }
    let (value, alpha) = (premultiplied as u64, alpha as u64);
    ((value * 255 + alpha / 2) / alpha).min(255)
}

/// Averages a premultiplied canvas.
fn mean_rgb(canvas: &RgbaImage) -> Color {
    let mut totals = [0u64; 3];
    let mut count = 0u64;

    for pixel in canvas.pixels() {
        let [r, g, b, a] = pixel.0;
        totals[0] += straight_channel(r, a);
        totals[1] += straight_channel(g, a);
        totals[2] += straight_channel(b, a);
        count += 1;
    }

    // (2 * sum + count) / (2 * count) == round_half_up(sum / count)
    let mean = |total: u64| ((2 * total + count) / (2 * count)) as u8;
    Color::new(mean(totals[0]), mean(totals[1]), mean(totals[2]))
}

// ============================================================================
// ColorExtractor
// ============================================================================

/// The extraction service: fetch, decode, downsample, average.
#[derive(Clone)]
pub struct ColorExtractor {
    fetcher: Arc<dyn ImageFetcher>,
    canvas_size: u32,
}

impl std::fmt::Debug for ColorExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorExtractor")
            .field("canvas_size", &self.canvas_size)
            .finish_non_exhaustive()
    }
}

impl ColorExtractor {
    /// Creates an extractor sampling onto the default 50x50 canvas.
    pub fn new(fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self {
            fetcher,
            canvas_size: CANVAS_SIZE,
        }
    }

    pub fn with_canvas_size(mut self, canvas_size: u32) -> Self {
        self.canvas_size = canvas_size;
        self
    }

    pub fn canvas_size(&self) -> u32 {
        self.canvas_size
    }

    /// Runs the extraction and reports the first failure.
    pub async fn try_extract(&self, image_url: Option<&str>) -> Result<Color, ExtractError> {
        let url = image_url
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or(ExtractError::MissingImageUrl)?;

        let bytes = self.fetcher.fetch(url).await?;
        let image = image::load_from_memory(&bytes)?;
        let color = average_color(&image, self.canvas_size)?;

        debug!(url, %color, "extracted average color");
        Ok(color)
    }

    /// Runs the extraction, substituting a palette color on any failure.
    pub async fn extract(&self, image_url: Option<&str>) -> Extraction {
        match self.try_extract(image_url).await {
            Ok(color) => Extraction::Extracted(color),
            Err(err) => {
                error!("Error extracting color: {err}");
                Extraction::degraded(err.to_string())
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
