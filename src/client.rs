//! Client side of color extraction, plus the per-gallery color cache.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{error, warn};

use crate::color::Color;
use crate::error::ClientError;
use crate::extract::{ExtractColorRequest, ExtractColorResponse, Extraction};
use crate::server::EXTRACT_COLOR_PATH;

// ============================================================================
// Transport
// ============================================================================

/// Something that answers extract-color requests.
#[async_trait]
pub trait ColorService: Send + Sync {
    async fn extract_color(&self, request: &ExtractColorRequest) -> Result<ExtractColorResponse, ClientError>;
}

/// Calls a remote extraction service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpColorService {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpColorService {
    /// Targets `{base_url}/api/extract-color`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), EXTRACT_COLOR_PATH),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ColorService for HttpColorService {
    async fn extract_color(&self, request: &ExtractColorRequest) -> Result<ExtractColorResponse, ClientError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }
        Ok(response.json::<ExtractColorResponse>().await?)
    }
}

// ============================================================================
// ColorExtractionClient
// ============================================================================

/// Requests image colors from the extraction service and remembers the
/// color chosen for each gallery.
///
/// [`extract_color_from_image`](Self::extract_color_from_image) never fails:
/// when the service reports a failure or cannot be reached, a color from the
/// client's own copy of the fallback palette is returned instead.
#[derive(Debug)]
pub struct ColorExtractionClient<S = HttpColorService> {
    service: S,
    extracted_colors: HashMap<String, Color>,
}

impl<S: ColorService> ColorExtractionClient<S> {
    pub fn new(service: S) -> Self {
        Self {
            service,
            extracted_colors: HashMap::new(),
        }
    }

    /// Asks the service for the average color of `image_url`.
    pub async fn extract_color_from_image(&self, image_url: &str) -> Extraction {
        let request = ExtractColorRequest::new(image_url);

        match self.service.extract_color(&request).await {
            Ok(response) if response.success => match response.color.parse::<Color>() {
                Ok(color) => Extraction::Extracted(color),
                Err(err) => {
                    let err = ClientError::from(err);
                    error!("Error calling color extraction API: {err}");
                    Extraction::degraded(err.to_string())
                }
            },
            Ok(response) => {
                let reason = response.error.unwrap_or_else(|| "unknown error".to_string());
                warn!("Color extraction failed, using fallback: {reason}");
                Extraction::degraded(reason)
            }
            Err(err) => {
                error!("Error calling color extraction API: {err}");
                Extraction::degraded(err.to_string())
            }
        }
    }

    /// Returns the cached color for `gallery_id`, if one was set.
    pub fn color_for_gallery(&self, gallery_id: &str) -> Option<Color> {
        self.extracted_colors.get(gallery_id).copied()
    }

    /// Caches `color` for `gallery_id`, replacing any earlier value.
    pub fn set_color_for_gallery(&mut self, gallery_id: impl Into<String>, color: Color) {
        self.extracted_colors.insert(gallery_id.into(), color);
    }

    pub fn extracted_colors(&self) -> &HashMap<String, Color> {
        &self.extracted_colors
    }

    pub fn service(&self) -> &S {
        &self.service
    }
}

// ============================================================================
// Tests
// ============================================================================
