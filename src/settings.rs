//! CMS site settings with per-field defaults.
//!
//! The settings record is fetched once per [`SiteSettingsAccessor`] and
//! shared by every later read. A failed fetch, a missing record and a
//! missing field all read as the documented default.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::SettingsError;
use crate::favicon::FaviconAssets;
use crate::image_url::ImageSource;

/// Cache name the settings fetch is memoized under.
pub const SETTINGS_CACHE_KEY: &str = "siteSettings-v2";

pub const DEFAULT_TITLE: &str = "Chelsea Beach";
pub const DEFAULT_BOOKING_TITLE: &str = "Book Your Appointment Now";

// ============================================================================
// Record
// ============================================================================

/// Favicon images configured in the CMS.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FaviconSettings {
    #[serde(deserialize_with = "lenient")]
    pub favicon: Option<ImageSource>,
    #[serde(deserialize_with = "lenient")]
    pub favicon_png: Option<ImageSource>,
    #[serde(deserialize_with = "lenient")]
    pub favicon_dark_png: Option<ImageSource>,
    #[serde(deserialize_with = "lenient")]
    pub apple_touch_icon: Option<ImageSource>,
    #[serde(deserialize_with = "lenient")]
    pub android_icon: Option<ImageSource>,
}

/// The site settings document as stored in the CMS.
///
/// Every field is optional and a field of the wrong JSON type reads as
/// absent, so one bad field never discards the rest of the record. Use the
/// accessor methods for defaulted values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    #[serde(deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub contact_info: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient")]
    pub opening_times: Option<Vec<Value>>,
    #[serde(deserialize_with = "lenient")]
    pub linkedin_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub instagram_url: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub preloader_images: Option<Vec<ImageSource>>,
    #[serde(deserialize_with = "lenient")]
    pub logotype: Option<ImageSource>,
    #[serde(deserialize_with = "lenient")]
    pub booking_title: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub booking_link: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub favicon: Option<FaviconSettings>,
    #[serde(deserialize_with = "lenient")]
    pub disable_preloader: Option<bool>,
}

/// Deserializes `T`, treating a value of the wrong shape as `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|s| !s.is_empty())
}

fn asset_url(source: Option<&ImageSource>) -> &str {
    source.and_then(ImageSource::resolved_url).unwrap_or("")
}

impl SiteSettings {
    pub fn title(&self) -> &str {
        non_empty(self.title.as_deref()).unwrap_or(DEFAULT_TITLE)
    }

    pub fn contact_info(&self) -> &[Value] {
        self.contact_info.as_deref().unwrap_or_default()
    }

    pub fn opening_times(&self) -> &[Value] {
        self.opening_times.as_deref().unwrap_or_default()
    }

    pub fn linkedin_url(&self) -> &str {
        self.linkedin_url.as_deref().unwrap_or("")
    }

    pub fn instagram_url(&self) -> &str {
        self.instagram_url.as_deref().unwrap_or("")
    }

    pub fn preloader_images(&self) -> &[ImageSource] {
        self.preloader_images.as_deref().unwrap_or_default()
    }

    pub fn logotype(&self) -> Option<&ImageSource> {
        self.logotype.as_ref()
    }

    pub fn booking_title(&self) -> &str {
        non_empty(self.booking_title.as_deref()).unwrap_or(DEFAULT_BOOKING_TITLE)
    }

    pub fn booking_link(&self) -> &str {
        self.booking_link.as_deref().unwrap_or("")
    }

    /// The favicon group, or an empty one.
    pub fn favicon(&self) -> FaviconSettings {
        self.favicon.clone().unwrap_or_default()
    }

    pub fn favicon_url(&self) -> &str {
        asset_url(self.favicon.as_ref().and_then(|f| f.favicon.as_ref()))
    }

    pub fn favicon_png_url(&self) -> &str {
        asset_url(self.favicon.as_ref().and_then(|f| f.favicon_png.as_ref()))
    }

    pub fn favicon_dark_png_url(&self) -> &str {
        asset_url(self.favicon.as_ref().and_then(|f| f.favicon_dark_png.as_ref()))
    }

    pub fn apple_touch_icon_url(&self) -> &str {
        asset_url(self.favicon.as_ref().and_then(|f| f.apple_touch_icon.as_ref()))
    }

    pub fn android_icon_url(&self) -> &str {
        asset_url(self.favicon.as_ref().and_then(|f| f.android_icon.as_ref()))
    }

    /// True only when the record explicitly says `true`.
    pub fn disable_preloader(&self) -> bool {
        self.disable_preloader == Some(true)
    }

    /// The favicon URLs in the shape the favicon updater consumes.
    pub fn favicon_assets(&self) -> FaviconAssets {
        let owned = |url: &str| non_empty(Some(url)).map(str::to_string);
        FaviconAssets {
            favicon: owned(self.favicon_url()),
            png: owned(self.favicon_png_url()),
            dark_png: owned(self.favicon_dark_png_url()),
            apple_touch_icon: owned(self.apple_touch_icon_url()),
            android_icon: owned(self.android_icon_url()),
        }
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Where the settings record comes from.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Fetches the record; `Ok(None)` means the CMS has no settings document.
    async fn fetch(&self) -> Result<Option<SiteSettings>, SettingsError>;
}

/// Reads settings from `GET {base}/api/sanity?type=siteSettings`.
#[derive(Debug, Clone)]
pub struct HttpSettingsSource {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSettingsSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SettingsError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            endpoint: format!("{}/api/sanity", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl SettingsSource for HttpSettingsSource {
    async fn fetch(&self) -> Result<Option<SiteSettings>, SettingsError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("type", "siteSettings")])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SettingsError::Status(status.as_u16()));
        }
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

// ============================================================================
// Accessor
// ============================================================================

/// Memoizing front for a [`SettingsSource`].
///
/// Concurrent first reads share one in-flight fetch; later reads return the
/// stored record without touching the source again.
pub struct SiteSettingsAccessor<S = HttpSettingsSource> {
    source: S,
    settings: OnceCell<SiteSettings>,
}

impl<S> std::fmt::Debug for SiteSettingsAccessor<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteSettingsAccessor")
            .field("cache_key", &SETTINGS_CACHE_KEY)
            .field("loaded", &self.settings.initialized())
            .finish()
    }
}

impl<S: SettingsSource> SiteSettingsAccessor<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            settings: OnceCell::new(),
        }
    }

    pub fn cache_key(&self) -> &'static str {
        SETTINGS_CACHE_KEY
    }

    /// Returns the settings record, fetching it on first use.
    pub async fn settings(&self) -> &SiteSettings {
        self.settings
            .get_or_init(|| async {
                match self.source.fetch().await {
                    Ok(Some(settings)) => {
                        debug!(key = SETTINGS_CACHE_KEY, "site settings loaded");
                        settings
                    }
                    Ok(None) => SiteSettings::default(),
                    Err(err) => {
                        warn!("Failed to fetch site settings, using defaults: {err}");
                        SiteSettings::default()
                    }
                }
            })
            .await
    }

    /// The record if it has already been fetched.
    pub fn cached(&self) -> Option<&SiteSettings> {
        self.settings.get()
    }
}
