//! Startup loading of the animation library and its plugins.
//!
//! The core library and the free plugins are required; the commercial-tier
//! plugins are additive and the runtime simply comes up without them when
//! they cannot be loaded.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::LoadError;

/// The core animation module.
pub const CORE_MODULE: &str = "gsap";
/// Plugins registered unconditionally.
pub const REQUIRED_PLUGINS: [&str; 2] = ["ScrollTrigger", "SplitText"];
/// Plugins registered only when available.
pub const OPTIONAL_PLUGINS: [&str; 2] = ["Draggable", "InertiaPlugin"];

/// A loaded module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHandle {
    pub name: String,
    pub version: Option<String>,
}

impl ModuleHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }
}

/// Resolves module names to loaded modules.
#[async_trait]
pub trait PluginLoader: Send + Sync {
    async fn load(&self, module: &str) -> Result<ModuleHandle, LoadError>;
}

/// A loader backed by a fixed table of bundled modules.
#[derive(Debug, Clone, Default)]
pub struct BundledModules {
    modules: HashMap<String, ModuleHandle>,
}

impl BundledModules {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_module(mut self, handle: ModuleHandle) -> Self {
        self.modules.insert(handle.name.clone(), handle);
        self
    }
}

#[async_trait]
impl PluginLoader for BundledModules {
    async fn load(&self, module: &str) -> Result<ModuleHandle, LoadError> {
        self.modules
            .get(module)
            .cloned()
            .ok_or_else(|| LoadError::new(module, "module is not bundled"))
    }
}

/// The loaded animation library with its registered plugins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnimationRuntime {
    core: ModuleHandle,
    plugins: Vec<ModuleHandle>,
}

impl AnimationRuntime {
    pub fn core(&self) -> &ModuleHandle {
        &self.core
    }

    /// Registered plugins in registration order.
    pub fn plugins(&self) -> &[ModuleHandle] {
        &self.plugins
    }

    pub fn plugin(&self, name: &str) -> Option<&ModuleHandle> {
        self.plugins.iter().find(|p| p.name == name)
    }

    /// True when the commercial-tier plugins were registered.
    pub fn has_optional_plugins(&self) -> bool {
        OPTIONAL_PLUGINS.iter().all(|name| self.plugin(name).is_some())
    }

    fn register(&mut self, plugins: impl IntoIterator<Item = ModuleHandle>) {
        self.plugins.extend(plugins);
    }
}

async fn load_all<L: PluginLoader + ?Sized>(loader: &L, names: &[&str]) -> Result<Vec<ModuleHandle>, LoadError> {
    let mut handles = Vec::with_capacity(names.len());
    for name in names {
        handles.push(loader.load(name).await?);
    }
    Ok(handles)
}

/// Loads the core library and plugins.
///
/// Fails if the core or a required plugin cannot be loaded. The optional
/// plugins load as a group: if any of them fails, none are registered.
pub async fn load_animation_runtime<L: PluginLoader + ?Sized>(loader: &L) -> Result<AnimationRuntime, LoadError> {
    let core = loader.load(CORE_MODULE).await?;
    let mut runtime = AnimationRuntime {
        core,
        plugins: Vec::new(),
    };
    runtime.register(load_all(loader, &REQUIRED_PLUGINS).await?);

    match load_all(loader, &OPTIONAL_PLUGINS).await {
        Ok(optional) => {
            runtime.register(optional);
            info!("loaded optional animation plugins: {}", OPTIONAL_PLUGINS.join(", "));
        }
        Err(err) => warn!("continuing without optional animation plugins: {err}"),
    }

    Ok(runtime)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bundle(names: &[&str]) -> BundledModules {
        names
            .iter()
            .fold(BundledModules::new(), |b, name| b.with_module(ModuleHandle::new(*name)))
    }

    #[tokio::test]
    async fn loads_everything_when_available() {
        let loader = bundle(&["gsap", "ScrollTrigger", "SplitText", "Draggable", "InertiaPlugin"]);
        let runtime = load_animation_runtime(&loader).await.unwrap();

        assert_eq!(runtime.core().name, "gsap");
        let names: Vec<_> = runtime.plugins().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["ScrollTrigger", "SplitText", "Draggable", "InertiaPlugin"]);
        assert!(runtime.has_optional_plugins());
    }

    #[tokio::test]
    async fn optional_plugins_are_all_or_nothing() {
        let loader = bundle(&["gsap", "ScrollTrigger", "SplitText", "Draggable"]);
        let runtime = load_animation_runtime(&loader).await.unwrap();

        assert_eq!(runtime.plugins().len(), 2);
        assert!(runtime.plugin("Draggable").is_none());
        assert!(!runtime.has_optional_plugins());
    }

    #[tokio::test]
    async fn missing_required_plugin_is_fatal() {
        let loader = bundle(&["gsap", "ScrollTrigger"]);
        let err = load_animation_runtime(&loader).await.unwrap_err();
        assert_eq!(err.module, "SplitText");
    }

    #[tokio::test]
    async fn missing_core_is_fatal() {
        let err = load_animation_runtime(&BundledModules::new()).await.unwrap_err();
        assert_eq!(err, LoadError::new("gsap", "module is not bundled"));
    }
}
