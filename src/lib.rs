//! chelsea-site-kit: integration helpers for the Chelsea Beach website
//!
//! This crate provides the small pieces the site needs around its headless
//! CMS: average-color extraction for gallery images (an HTTP service and a
//! client for it), favicon selection for light and dark mode, defaulted
//! access to the CMS site settings, CDN URLs for CMS image references, and
//! startup loading of the animation library.
//!
//! # Example
//!
//! ```
//! use chelsea_site_kit::{Color, ExtractColorResponse, Extraction};
//!
//! // Every extraction carries a displayable color, degraded or not.
//! let ok = Extraction::Extracted(Color::new(12, 34, 56));
//! let response = ExtractColorResponse::from(ok);
//! assert!(response.success);
//! assert_eq!(response.color, "rgb(12, 34, 56)");
//! ```
//!
//! # Running the service
//!
//! ```no_run
//! use std::sync::Arc;
//! use chelsea_site_kit::{ColorExtractor, HttpImageFetcher, server};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let fetcher = HttpImageFetcher::new(std::time::Duration::from_secs(10))?;
//! let app = server::router(ColorExtractor::new(Arc::new(fetcher)));
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! server::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

mod animation;
mod client;
mod color;
mod config;
mod context;
mod error;
mod extract;
mod favicon;
mod image_url;
mod settings;

pub mod server;

pub use animation::{
    AnimationRuntime, BundledModules, CORE_MODULE, ModuleHandle, OPTIONAL_PLUGINS, PluginLoader,
    REQUIRED_PLUGINS, load_animation_runtime,
};
pub use client::{ColorExtractionClient, ColorService, HttpColorService};
pub use color::{Color, FALLBACK_PALETTE, is_fallback, random_fallback};
#[cfg(feature = "clap")]
pub use config::ServeArgs;
pub use config::KitConfig;
pub use context::SiteContext;
pub use error::{ClientError, ColorParseError, ContextError, ExtractError, LoadError, SettingsError};
pub use extract::{
    CANVAS_SIZE, ColorExtractor, ExtractColorRequest, ExtractColorResponse, Extraction, HttpImageFetcher,
    ImageFetcher, MAX_IMAGE_BYTES, average_color,
};
pub use favicon::{
    ColorScheme, FaviconAssets, FaviconSet, FaviconUpdater, HeadDocument, LOCAL_DARK_FAVICON, LOCAL_LIGHT_FAVICON,
    LinkOp, LinkRelation, LinkTag, MemoryHead, mime_type_for, reconcile, with_mode_param,
};
pub use image_url::{AssetRef, DEFAULT_DATASET, DEFAULT_PROJECT_ID, DecodedRef, ImageSource, ImageUrlBuilder, decode_ref};
pub use settings::{
    DEFAULT_BOOKING_TITLE, DEFAULT_TITLE, FaviconSettings, HttpSettingsSource, SETTINGS_CACHE_KEY, SettingsSource,
    SiteSettings, SiteSettingsAccessor,
};
