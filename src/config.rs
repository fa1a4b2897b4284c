//! Runtime configuration.
//!
//! [`KitConfig`] is a plain serde record so it can be shipped as JSON
//! between processes; every field has a default, so `{}` is a valid config.
//! With the `clap` feature, [`ServeArgs`] maps command-line flags and
//! environment variables onto it.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::extract::{CANVAS_SIZE, MAX_IMAGE_BYTES};
use crate::image_url::{DEFAULT_DATASET, DEFAULT_PROJECT_ID, ImageUrlBuilder};

/// Settings shared by the service binary and client-side helpers.
///
/// # JSON Format
///
/// ```json
/// {
///   "bind": "0.0.0.0:3000",
///   "canvasSize": 50,
///   "fetchTimeoutSecs": 10,
///   "maxImageBytes": 20971520,
///   "serviceBaseUrl": "http://localhost:3000",
///   "cmsProjectId": "wwwrb2ji",
///   "cmsDataset": "production"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase", default)]
pub struct KitConfig {
    /// Socket address the extraction service listens on.
    pub bind: String,

    /// Edge length of the sampling canvas.
    pub canvas_size: u32,

    /// Timeout applied to every outbound HTTP request.
    pub fetch_timeout_secs: u64,

    /// Largest encoded image the service will download.
    pub max_image_bytes: usize,

    /// Base URL under which `/api/extract-color` and `/api/sanity` live.
    pub service_base_url: String,

    pub cms_project_id: String,
    pub cms_dataset: String,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:3000".to_string(),
            canvas_size: CANVAS_SIZE,
            fetch_timeout_secs: 10,
            max_image_bytes: MAX_IMAGE_BYTES,
            service_base_url: "http://localhost:3000".to_string(),
            cms_project_id: DEFAULT_PROJECT_ID.to_string(),
            cms_dataset: DEFAULT_DATASET.to_string(),
        }
    }
}

impl KitConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// An image URL builder for the configured CMS project.
    pub fn image_url_builder(&self) -> ImageUrlBuilder {
        ImageUrlBuilder::new(&self.cms_project_id, &self.cms_dataset)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Command-line and environment overrides for the service binary.
#[cfg(feature = "clap")]
#[derive(Debug, Clone, clap::Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "SITE_KIT_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Edge length of the sampling canvas in pixels.
    #[arg(long, env = "SITE_KIT_CANVAS_SIZE", default_value_t = CANVAS_SIZE)]
    pub canvas_size: u32,

    /// Timeout for fetching images, in seconds.
    #[arg(long, env = "SITE_KIT_FETCH_TIMEOUT_SECS", default_value_t = 10)]
    pub fetch_timeout_secs: u64,

    /// Largest image body to download, in bytes.
    #[arg(long, env = "SITE_KIT_MAX_IMAGE_BYTES", default_value_t = MAX_IMAGE_BYTES)]
    pub max_image_bytes: usize,

    /// Optional JSON config file; flags override its values.
    #[arg(long, env = "SITE_KIT_CONFIG")]
    pub config: Option<std::path::PathBuf>,
}

#[cfg(feature = "clap")]
impl ServeArgs {
    /// Merges the flags over `base`.
    pub fn apply_to(&self, mut base: KitConfig) -> KitConfig {
        base.bind = self.bind.clone();
        base.canvas_size = self.canvas_size;
        base.fetch_timeout_secs = self.fetch_timeout_secs;
        base.max_image_bytes = self.max_image_bytes;
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(KitConfig::from_json("{}").unwrap(), KitConfig::default());
    }

    #[test]
    fn partial_json_overrides_fields() {
        let config = KitConfig::from_json(r#"{"canvasSize": 16, "cmsDataset": "staging"}"#).unwrap();
        assert_eq!(config.canvas_size, 16);
        assert_eq!(config.cms_dataset, "staging");
        assert_eq!(config.cms_project_id, "wwwrb2ji");
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_image_bytes, MAX_IMAGE_BYTES);
    }

    #[test]
    fn json_format_is_camel_case() {
        let json = KitConfig::default().to_json_pretty().unwrap();
        assert!(json.contains("\"canvasSize\""));
        assert!(json.contains("\"fetchTimeoutSecs\""));
        assert!(json.contains("\"serviceBaseUrl\""));
    }
}
