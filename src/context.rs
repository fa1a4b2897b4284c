//! The application context handed to every consumer.
//!
//! [`SiteContext`] owns the settings accessor, the image URL builder, the
//! color client and the animation runtime. It is built once at startup and
//! passed by reference; nothing in this crate keeps process-wide state.

use std::sync::OnceLock;

use tracing::info;

use crate::animation::{AnimationRuntime, PluginLoader, load_animation_runtime};
use crate::client::{ColorExtractionClient, ColorService, HttpColorService};
use crate::config::KitConfig;
use crate::error::ContextError;
use crate::favicon::FaviconAssets;
use crate::image_url::{ImageSource, ImageUrlBuilder};
use crate::settings::{HttpSettingsSource, SettingsSource, SiteSettingsAccessor};

pub struct SiteContext<S = HttpSettingsSource, C = HttpColorService> {
    config: KitConfig,
    settings: SiteSettingsAccessor<S>,
    image_urls: ImageUrlBuilder,
    colors: ColorExtractionClient<C>,
    animation: OnceLock<AnimationRuntime>,
}

impl<S, C> std::fmt::Debug for SiteContext<S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SiteContext")
            .field("config", &self.config)
            .field("settings", &self.settings)
            .field("image_urls", &self.image_urls)
            .field("animation", &self.animation.get())
            .finish_non_exhaustive()
    }
}

impl SiteContext {
    /// Builds a context that talks HTTP to `config.service_base_url`.
    pub fn from_config(config: KitConfig) -> Result<Self, ContextError> {
        let http = reqwest::Client::builder().timeout(config.fetch_timeout()).build()?;
        let settings = HttpSettingsSource::with_client(http.clone(), &config.service_base_url);
        let colors = HttpColorService::with_client(http, &config.service_base_url);
        Ok(Self::new(config, settings, colors))
    }
}

impl<S: SettingsSource, C: ColorService> SiteContext<S, C> {
    pub fn new(config: KitConfig, settings: S, colors: C) -> Self {
        Self {
            image_urls: config.image_url_builder(),
            settings: SiteSettingsAccessor::new(settings),
            colors: ColorExtractionClient::new(colors),
            animation: OnceLock::new(),
            config,
        }
    }

    pub fn config(&self) -> &KitConfig {
        &self.config
    }

    pub fn settings(&self) -> &SiteSettingsAccessor<S> {
        &self.settings
    }

    pub fn image_urls(&self) -> &ImageUrlBuilder {
        &self.image_urls
    }

    /// Shorthand for [`ImageUrlBuilder::url_for`].
    pub fn image_url(&self, source: Option<&ImageSource>) -> Option<String> {
        self.image_urls.url_for(source)
    }

    pub fn colors(&self) -> &ColorExtractionClient<C> {
        &self.colors
    }

    pub fn colors_mut(&mut self) -> &mut ColorExtractionClient<C> {
        &mut self.colors
    }

    /// Favicon URLs from the (possibly defaulted) site settings.
    pub async fn favicon_assets(&self) -> FaviconAssets {
        self.settings.settings().await.favicon_assets()
    }

    /// Loads the animation runtime. May only succeed once per context.
    ///
    /// A second call returns [`ContextError::AlreadyInitialized`] without
    /// touching the loader; the first runtime stays in place.
    pub async fn init_animation<L: PluginLoader + ?Sized>(&self, loader: &L) -> Result<&AnimationRuntime, ContextError> {
        if self.animation.get().is_some() {
            return Err(ContextError::AlreadyInitialized);
        }

        let runtime = load_animation_runtime(loader).await?;
        let plugins = runtime.plugins().len();
        self.animation
            .set(runtime)
            .map_err(|_| ContextError::AlreadyInitialized)?;
        info!(plugins, "animation runtime initialized");

        self.animation.get().ok_or(ContextError::AlreadyInitialized)
    }

    /// The animation runtime, once [`init_animation`](Self::init_animation) succeeded.
    pub fn animation(&self) -> Option<&AnimationRuntime> {
        self.animation.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{BundledModules, ModuleHandle};
    use crate::color::Color;
    use crate::error::{ClientError, SettingsError};
    use crate::extract::{ExtractColorRequest, ExtractColorResponse};
    use crate::settings::SiteSettings;
    use async_trait::async_trait;

    struct NoSettings;

    #[async_trait]
    impl SettingsSource for NoSettings {
        async fn fetch(&self) -> Result<Option<SiteSettings>, SettingsError> {
            Err(SettingsError::Status(500))
        }
    }

    struct JsonSettings(&'static str);

    #[async_trait]
    impl SettingsSource for JsonSettings {
        async fn fetch(&self) -> Result<Option<SiteSettings>, SettingsError> {
            Ok(serde_json::from_str(self.0)?)
        }
    }

    struct Offline;

    #[async_trait]
    impl ColorService for Offline {
        async fn extract_color(&self, _: &ExtractColorRequest) -> Result<ExtractColorResponse, ClientError> {
            Err(ClientError::Status(503))
        }
    }

    fn full_bundle() -> BundledModules {
        ["gsap", "ScrollTrigger", "SplitText", "Draggable", "InertiaPlugin"]
            .into_iter()
            .fold(BundledModules::new(), |b, n| b.with_module(ModuleHandle::new(n)))
    }

    #[tokio::test]
    async fn animation_initializes_once() {
        let ctx = SiteContext::new(KitConfig::default(), NoSettings, Offline);
        assert!(ctx.animation().is_none());

        let runtime = ctx.init_animation(&full_bundle()).await.unwrap();
        assert_eq!(runtime.plugins().len(), 4);

        let again = ctx.init_animation(&BundledModules::new()).await;
        assert!(matches!(again, Err(ContextError::AlreadyInitialized)));
        assert_eq!(ctx.animation().unwrap().plugins().len(), 4);
    }

    #[tokio::test]
    async fn failed_animation_load_can_be_retried() {
        let ctx = SiteContext::new(KitConfig::default(), NoSettings, Offline);

        let err = ctx.init_animation(&BundledModules::new()).await.unwrap_err();
        assert!(matches!(err, ContextError::Animation(_)));
        assert!(ctx.animation().is_none());

        assert!(ctx.init_animation(&full_bundle()).await.is_ok());
    }

    #[tokio::test]
    async fn favicon_assets_come_from_settings() {
        let ctx = SiteContext::new(
            KitConfig::default(),
            JsonSettings(r#"{"favicon":{"faviconDarkPng":{"asset":{"url":"https://cdn/d.png"}}}}"#),
            Offline,
        );
        let assets = ctx.favicon_assets().await;
        assert_eq!(assets.dark_png.as_deref(), Some("https://cdn/d.png"));
        assert_eq!(assets.png, None);
    }

    #[tokio::test]
    async fn defaults_when_settings_unavailable() {
        let ctx = SiteContext::new(KitConfig::default(), NoSettings, Offline);
        assert_eq!(ctx.settings().settings().await.title(), "Chelsea Beach");
        assert_eq!(ctx.favicon_assets().await, FaviconAssets::default());
    }

    #[test]
    fn image_urls_use_configured_project() {
        let config = KitConfig::from_json(r#"{"cmsProjectId":"abc","cmsDataset":"dev"}"#).unwrap();
        let ctx = SiteContext::new(config, NoSettings, Offline);
        assert_eq!(
            ctx.image_url(Some(&ImageSource::from_ref("image-x-jpg"))).as_deref(),
            Some("https://cdn.sanity.io/images/abc/dev/x.jpg")
        );
    }

    #[test]
    fn gallery_cache_through_context() {
        let mut ctx = SiteContext::new(KitConfig::default(), NoSettings, Offline);
        ctx.colors_mut().set_color_for_gallery("g1", Color::new(3, 4, 5));
        assert_eq!(ctx.colors().color_for_gallery("g1"), Some(Color::new(3, 4, 5)));
    }

    #[test]
    fn http_context_builds() {
        let ctx = SiteContext::from_config(KitConfig::default()).unwrap();
        assert_eq!(ctx.colors().service().endpoint(), "http://localhost:3000/api/extract-color");
    }
}
