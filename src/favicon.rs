//! Favicon selection and `<link>` reconciliation.
//!
//! The document head is modelled as an ordered list of [`LinkTag`]s. Given
//! the configured [`FaviconAssets`] and the active [`ColorScheme`],
//! [`reconcile`] computes the [`LinkOp`]s that bring a head to the desired
//! state; a [`HeadDocument`] implementation applies them to a concrete
//! surface. [`FaviconUpdater`] drives this from color-scheme signals.
//!
//! ```
//! use chelsea_site_kit::{ColorScheme, FaviconAssets, FaviconUpdater, MemoryHead};
//!
//! let assets = FaviconAssets {
//!     png: Some("https://cdn.example.com/icon.png".into()),
//!     ..FaviconAssets::default()
//! };
//! let mut updater = FaviconUpdater::new(MemoryHead::default(), assets);
//! updater.start(Some(ColorScheme::Dark), false);
//!
//! let icon = updater.head().find(chelsea_site_kit::LinkRelation::Icon).unwrap();
//! assert_eq!(icon.href, "https://cdn.example.com/icon.png?v=dark");
//! ```

use tracing::debug;

/// Local icon used in dark mode when the CMS configures none.
pub const LOCAL_DARK_FAVICON: &str = "/favicon-dark.png";
/// Local icon used in light mode when the CMS configures none.
pub const LOCAL_LIGHT_FAVICON: &str = "/favicon-light.png";

const ANDROID_ICON_SIZES: &str = "192x192";

// ============================================================================
// ColorScheme
// ============================================================================

/// The active light/dark appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

impl ColorScheme {
    pub fn from_dark(dark: bool) -> Self {
        if dark { Self::Dark } else { Self::Light }
    }

    pub fn is_dark(self) -> bool {
        self == Self::Dark
    }

    /// `"dark"` or `"light"`; also the cache-busting tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    fn local_favicon(self) -> &'static str {
        match self {
            Self::Light => LOCAL_LIGHT_FAVICON,
            Self::Dark => LOCAL_DARK_FAVICON,
        }
    }
}

// ============================================================================
// Assets
// ============================================================================

fn configured(url: &Option<String>) -> Option<&str> {
    url.as_deref().filter(|u| !u.is_empty())
}

/// Favicon URLs supplied by the CMS. Each may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaviconAssets {
    pub favicon: Option<String>,
    pub png: Option<String>,
    pub dark_png: Option<String>,
    pub apple_touch_icon: Option<String>,
    pub android_icon: Option<String>,
}

impl FaviconAssets {
    /// Picks the best icon for `scheme`.
    ///
    /// Priority: dark PNG (dark mode only), PNG, generic favicon, then the
    /// bundled local file for the mode.
    pub fn resolve(&self, scheme: ColorScheme) -> &str {
        let dark_png = if scheme.is_dark() { configured(&self.dark_png) } else { None };
        dark_png
            .or_else(|| configured(&self.png))
            .or_else(|| configured(&self.favicon))
            .unwrap_or(scheme.local_favicon())
    }
}

/// Appends `v=<mode>` to the query so browsers refetch the icon after a mode
/// switch. Any `#fragment` stays at the end.
pub fn with_mode_param(url: &str, scheme: ColorScheme) -> String {
    let (base, fragment) = match url.split_once('#') {
        Some((base, fragment)) => (base, Some(fragment)),
        None => (url, None),
    };
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut out = format!("{base}{separator}v={}", scheme.as_str());
    if let Some(fragment) = fragment {
        out.push('#');
        out.push_str(fragment);
    }
    out
}

/// MIME type implied by the URL's file extension, if recognised.
pub fn mime_type_for(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    match extension.as_str() {
        "ico" => Some("image/x-icon"),
        "png" => Some("image/png"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

// ============================================================================
// Link Model
// ============================================================================

/// What a `<link>` is for, as far as favicons are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkRelation {
    /// `rel="icon"` (any size except the Android one).
    Icon,
    /// `rel="shortcut icon"`, the legacy form.
    ShortcutIcon,
    /// `rel="apple-touch-icon"`.
    AppleTouchIcon,
    /// `rel="icon" sizes="192x192"`.
    AndroidIcon,
    /// Anything else (stylesheets, preloads, ...). Never touched.
    Other,
}

/// A `<link>` element in the document head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkTag {
    pub rel: String,
    pub href: String,
    pub mime_type: Option<String>,
    pub sizes: Option<String>,
}

impl LinkTag {
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            mime_type: None,
            sizes: None,
        }
    }

    /// Sets the `type` attribute from the href's extension.
    pub fn typed(mut self) -> Self {
        self.mime_type = mime_type_for(&self.href).map(str::to_string);
        self
    }

    pub fn with_sizes(mut self, sizes: impl Into<String>) -> Self {
        self.sizes = Some(sizes.into());
        self
    }

    pub fn relation(&self) -> LinkRelation {
        let rel = self.rel.trim().to_ascii_lowercase();
        match rel.as_str() {
            "icon" if self.sizes.as_deref() == Some(ANDROID_ICON_SIZES) => LinkRelation::AndroidIcon,
            "icon" => LinkRelation::Icon,
            "shortcut icon" => LinkRelation::ShortcutIcon,
            "apple-touch-icon" => LinkRelation::AppleTouchIcon,
            _ => LinkRelation::Other,
        }
    }
}

/// A single change to the head's link list.
///
/// Indices refer to positions in the list the ops were computed against;
/// [`reconcile`] orders ops so they stay valid when applied in sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOp {
    Update { index: usize, href: String },
    Remove(usize),
    Insert(LinkTag),
}

/// The favicon links the head should contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaviconSet {
    /// Cache-busted primary icon URL.
    pub icon: String,
    pub apple_touch_icon: Option<String>,
    pub android_icon: Option<String>,
}

impl FaviconSet {
    /// Resolves the set wanted for `scheme`.
    pub fn for_scheme(assets: &FaviconAssets, scheme: ColorScheme) -> Self {
        Self {
            icon: with_mode_param(assets.resolve(scheme), scheme),
            apple_touch_icon: configured(&assets.apple_touch_icon).map(str::to_string),
            android_icon: configured(&assets.android_icon).map(str::to_string),
        }
    }
}

// ============================================================================
// Reconciliation
// ============================================================================

/// Computes the ops that turn `current` into a head satisfying `desired`.
///
/// Every `icon` and `shortcut icon` link is removed and one fresh link of
/// each is inserted. Apple and Android links are found by relation and
/// updated in place, or inserted when missing. Unrelated links are kept.
pub fn reconcile(desired: &FaviconSet, current: &[LinkTag]) -> Vec<LinkOp> {
    let mut ops = Vec::new();
    let mut inserts = Vec::new();

    let find = |relation: LinkRelation| current.iter().position(|link| link.relation() == relation);

    let extras = [
        (LinkRelation::AppleTouchIcon, desired.apple_touch_icon.as_deref()),
        (LinkRelation::AndroidIcon, desired.android_icon.as_deref()),
    ];
    for (relation, href) in extras {
        let Some(href) = href else { continue };
        match find(relation) {
            Some(index) if current[index].href != href => ops.push(LinkOp::Update {
                index,
                href: href.to_string(),
            }),
            Some(_) => {}
            None => inserts.push(match relation {
                LinkRelation::AppleTouchIcon => LinkTag::new("apple-touch-icon", href).typed(),
                _ => LinkTag::new("icon", href).typed().with_sizes(ANDROID_ICON_SIZES),
            }),
        }
    }

    let stale = current
        .iter()
        .enumerate()
        .filter(|(_, link)| matches!(link.relation(), LinkRelation::Icon | LinkRelation::ShortcutIcon))
        .map(|(index, _)| index)
        .rev();
    ops.extend(stale.map(LinkOp::Remove));

    ops.push(LinkOp::Insert(LinkTag::new("icon", desired.icon.as_str()).typed()));
    ops.push(LinkOp::Insert(LinkTag::new("shortcut icon", desired.icon.as_str()).typed()));
    ops.extend(inserts.into_iter().map(LinkOp::Insert));
    ops
}

// ============================================================================
// Head Surfaces
// ============================================================================

/// A rendering surface holding `<link>` elements.
pub trait HeadDocument {
    /// The current links, in document order.
    fn links(&self) -> Vec<LinkTag>;

    /// Applies one op. Out-of-range indices are ignored.
    fn apply(&mut self, op: LinkOp);
}

/// An in-memory head, for servers rendering markup and for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryHead {
    links: Vec<LinkTag>,
}

impl MemoryHead {
    pub fn from_links(links: Vec<LinkTag>) -> Self {
        Self { links }
    }

    pub fn as_slice(&self) -> &[LinkTag] {
        &self.links
    }

    /// First link with the given relation.
    pub fn find(&self, relation: LinkRelation) -> Option<&LinkTag> {
        self.links.iter().find(|link| link.relation() == relation)
    }

    pub fn count(&self, relation: LinkRelation) -> usize {
        self.links.iter().filter(|link| link.relation() == relation).count()
    }
}

impl HeadDocument for MemoryHead {
    fn links(&self) -> Vec<LinkTag> {
        self.links.clone()
    }

    fn apply(&mut self, op: LinkOp) {
        match op {
            LinkOp::Update { index, href } => {
                if let Some(link) = self.links.get_mut(index) {
                    link.href = href;
                    link.mime_type = mime_type_for(&link.href).map(str::to_string);
                }
            }
            LinkOp::Remove(index) => {
                if index < self.links.len() {
                    self.links.remove(index);
                }
            }
            LinkOp::Insert(link) => self.links.push(link),
        }
    }
}

// ============================================================================
// FaviconUpdater
// ============================================================================

/// Keeps a head's favicon links in sync with the color scheme.
///
/// The OS preference wins when the host exposes one; otherwise the
/// application's own dark-mode signal drives updates.
#[derive(Debug)]
pub struct FaviconUpdater<H> {
    head: H,
    assets: FaviconAssets,
    scheme: Option<ColorScheme>,
    follows_system: bool,
}

impl<H: HeadDocument> FaviconUpdater<H> {
    pub fn new(head: H, assets: FaviconAssets) -> Self {
        Self {
            head,
            assets,
            scheme: None,
            follows_system: false,
        }
    }

    /// Establishes the initial icon.
    ///
    /// `system` is the OS preference when available; `app_dark` is used
    /// only when it is not.
    pub fn start(&mut self, system: Option<ColorScheme>, app_dark: bool) -> ColorScheme {
        self.follows_system = system.is_some();
        let scheme = system.unwrap_or(ColorScheme::from_dark(app_dark));
        self.apply(scheme);
        scheme
    }

    /// Handles an OS color-scheme change event.
    pub fn on_system_scheme_change(&mut self, scheme: ColorScheme) {
        self.follows_system = true;
        self.apply(scheme);
    }

    /// Handles a change of the application's dark-mode flag.
    ///
    /// Ignored while the OS preference is being followed.
    pub fn on_app_dark_mode_change(&mut self, dark: bool) {
        if self.follows_system {
            return;
        }
        self.apply(ColorScheme::from_dark(dark));
    }

    /// Replaces the asset set and re-applies the current scheme.
    pub fn set_assets(&mut self, assets: FaviconAssets) {
        self.assets = assets;
        if let Some(scheme) = self.scheme {
            self.apply(scheme);
        }
    }

    /// Rewrites the head's favicon links for `scheme`.
    pub fn apply(&mut self, scheme: ColorScheme) {
        let desired = FaviconSet::for_scheme(&self.assets, scheme);
        let ops = reconcile(&desired, &self.head.links());
        debug!(scheme = scheme.as_str(), icon = %desired.icon, ops = ops.len(), "updating favicon links");
        for op in ops {
            self.head.apply(op);
        }
        self.scheme = Some(scheme);
    }

    /// The scheme last applied, if any.
    pub fn scheme(&self) -> Option<ColorScheme> {
        self.scheme
    }

    pub fn head(&self) -> &H {
        &self.head
    }

    pub fn into_head(self) -> H {
        self.head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn png_only() -> FaviconAssets {
        FaviconAssets {
            png: Some("https://cdn/icon.png".into()),
            ..FaviconAssets::default()
        }
    }

    #[test]
    fn dark_without_dark_png_uses_png() {
        let set = FaviconSet::for_scheme(&png_only(), ColorScheme::Dark);
        assert_eq!(set.icon, "https://cdn/icon.png?v=dark");
    }

    #[test]
    fn resolve_priority() {
        let mut assets = FaviconAssets {
            favicon: Some("https://cdn/favicon.ico".into()),
            png: Some("https://cdn/icon.png".into()),
            dark_png: Some("https://cdn/dark.png".into()),
            ..FaviconAssets::default()
        };
        assert_eq!(assets.resolve(ColorScheme::Dark), "https://cdn/dark.png");
        assert_eq!(assets.resolve(ColorScheme::Light), "https://cdn/icon.png");

        assets.png = None;
        assert_eq!(assets.resolve(ColorScheme::Light), "https://cdn/favicon.ico");

        assets.favicon = None;
        assert_eq!(assets.resolve(ColorScheme::Light), LOCAL_LIGHT_FAVICON);
        assert_eq!(assets.resolve(ColorScheme::Dark), "https://cdn/dark.png");

        assert_eq!(FaviconAssets::default().resolve(ColorScheme::Dark), LOCAL_DARK_FAVICON);
    }

    #[test]
    fn mode_param_respects_existing_query() {
        assert_eq!(with_mode_param("/a.png", ColorScheme::Light), "/a.png?v=light");
        assert_eq!(with_mode_param("/a.png?w=32", ColorScheme::Dark), "/a.png?w=32&v=dark");
        assert_eq!(with_mode_param("/a.png#x", ColorScheme::Dark), "/a.png?v=dark#x");
        assert_eq!(with_mode_param("/a.png?w=32#x?y", ColorScheme::Light), "/a.png?w=32&v=light#x?y");
    }

    #[test]
    fn mime_types_by_extension() {
        assert_eq!(mime_type_for("/favicon.ico"), Some("image/x-icon"));
        assert_eq!(mime_type_for("/a.PNG?v=dark"), Some("image/png"));
        assert_eq!(mime_type_for("https://cdn/x.svg#frag"), Some("image/svg+xml"));
        assert_eq!(mime_type_for("https://cdn/x.webp"), None);
        assert_eq!(mime_type_for("https://cdn/noext"), None);
    }

    #[test]
    fn relation_classification() {
        assert_eq!(LinkTag::new("icon", "/a").relation(), LinkRelation::Icon);
        assert_eq!(LinkTag::new("Shortcut Icon", "/a").relation(), LinkRelation::ShortcutIcon);
        assert_eq!(LinkTag::new("icon", "/a").with_sizes("192x192").relation(), LinkRelation::AndroidIcon);
        assert_eq!(LinkTag::new("icon", "/a").with_sizes("32x32").relation(), LinkRelation::Icon);
        assert_eq!(LinkTag::new("apple-touch-icon", "/a").relation(), LinkRelation::AppleTouchIcon);
        assert_eq!(LinkTag::new("stylesheet", "/a.css").relation(), LinkRelation::Other);
    }

    #[test]
    fn reconcile_on_empty_head_inserts_pair() {
        let desired = FaviconSet::for_scheme(&png_only(), ColorScheme::Light);
        let ops = reconcile(&desired, &[]);
        assert_eq!(
            ops,
            vec![
                LinkOp::Insert(LinkTag::new("icon", "https://cdn/icon.png?v=light").typed()),
                LinkOp::Insert(LinkTag::new("shortcut icon", "https://cdn/icon.png?v=light").typed()),
            ]
        );
        if let LinkOp::Insert(link) = &ops[0] {
            assert_eq!(link.mime_type.as_deref(), Some("image/png"));
        }
    }

    #[test]
    fn reconcile_removes_in_descending_order() {
        let current = vec![
            LinkTag::new("icon", "/old.ico"),
            LinkTag::new("stylesheet", "/site.css"),
            LinkTag::new("shortcut icon", "/old.ico"),
        ];
        let desired = FaviconSet::for_scheme(&FaviconAssets::default(), ColorScheme::Dark);
        let ops = reconcile(&desired, &current);
        assert_eq!(ops[0], LinkOp::Remove(2));
        assert_eq!(ops[1], LinkOp::Remove(0));

        let mut head = MemoryHead::from_links(current);
        for op in ops {
            head.apply(op);
        }
        assert_eq!(head.find(LinkRelation::Other).unwrap().href, "/site.css");
        assert_eq!(head.find(LinkRelation::Icon).unwrap().href, "/favicon-dark.png?v=dark");
    }

    #[test]
    fn many_switches_leave_one_pair() {
        let mut updater = FaviconUpdater::new(
            MemoryHead::from_links(vec![LinkTag::new("icon", "/stale.ico"), LinkTag::new("icon", "/stale2.ico")]),
            png_only(),
        );
        updater.start(None, false);
        for i in 0..7 {
            updater.on_app_dark_mode_change(i % 2 == 0);
        }

        let head = updater.head();
        assert_eq!(head.count(LinkRelation::Icon), 1);
        assert_eq!(head.count(LinkRelation::ShortcutIcon), 1);
        assert_eq!(head.find(LinkRelation::Icon).unwrap().href, "https://cdn/icon.png?v=dark");
        assert_eq!(updater.scheme(), Some(ColorScheme::Dark));
    }

    #[test]
    fn apple_and_android_are_found_or_created() {
        let mut assets = png_only();
        assets.apple_touch_icon = Some("https://cdn/apple.png".into());
        assets.android_icon = Some("https://cdn/android.png".into());

        let mut updater = FaviconUpdater::new(
            MemoryHead::from_links(vec![LinkTag::new("apple-touch-icon", "/old-apple.png")]),
            assets.clone(),
        );
        updater.start(Some(ColorScheme::Light), false);
        updater.on_system_scheme_change(ColorScheme::Dark);

        let head = updater.head();
        assert_eq!(head.count(LinkRelation::AppleTouchIcon), 1);
        assert_eq!(head.count(LinkRelation::AndroidIcon), 1);
        assert_eq!(head.find(LinkRelation::AppleTouchIcon).unwrap().href, "https://cdn/apple.png");
        let android = head.find(LinkRelation::AndroidIcon).unwrap();
        assert_eq!(android.href, "https://cdn/android.png");
        assert_eq!(android.sizes.as_deref(), Some("192x192"));
        assert_eq!(head.count(LinkRelation::Icon), 1);
    }

    #[test]
    fn unconfigured_extras_are_left_alone() {
        let mut updater = FaviconUpdater::new(
            MemoryHead::from_links(vec![LinkTag::new("apple-touch-icon", "/static-apple.png")]),
            png_only(),
        );
        updater.start(None, true);
        assert_eq!(
            updater.head().find(LinkRelation::AppleTouchIcon).unwrap().href,
            "/static-apple.png"
        );
    }

    #[test]
    fn system_preference_overrides_app_signal() {
        let mut updater = FaviconUpdater::new(MemoryHead::default(), png_only());
        assert_eq!(updater.start(Some(ColorScheme::Dark), false), ColorScheme::Dark);

        updater.on_app_dark_mode_change(false);
        assert_eq!(updater.scheme(), Some(ColorScheme::Dark));

        updater.on_system_scheme_change(ColorScheme::Light);
        assert_eq!(updater.scheme(), Some(ColorScheme::Light));
        assert_eq!(
            updater.head().find(LinkRelation::ShortcutIcon).unwrap().href,
            "https://cdn/icon.png?v=light"
        );
    }

    #[test]
    fn set_assets_reapplies() {
        let mut updater = FaviconUpdater::new(MemoryHead::default(), FaviconAssets::default());
        updater.start(None, false);
        assert_eq!(
            updater.head().find(LinkRelation::Icon).unwrap().href,
            "/favicon-light.png?v=light"
        );

        updater.set_assets(png_only());
        assert_eq!(
            updater.head().find(LinkRelation::Icon).unwrap().href,
            "https://cdn/icon.png?v=light"
        );
        assert_eq!(updater.head().count(LinkRelation::Icon), 1);
    }
}
