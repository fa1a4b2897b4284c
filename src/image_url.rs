//! CMS image references and CDN URL derivation.

use serde::{Deserialize, Serialize};

/// Default CMS project id.
pub const DEFAULT_PROJECT_ID: &str = "wwwrb2ji";
/// Default CMS dataset.
pub const DEFAULT_DATASET: &str = "production";

const CDN_BASE: &str = "https://cdn.sanity.io/images";

// ============================================================================
// CMS Reference Shapes
// ============================================================================

/// An asset pointer as delivered by the CMS.
///
/// ```json
/// { "url": "https://cdn.sanity.io/...", "_ref": "image-abc123-800x600-png" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct AssetRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(rename = "_ref", default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

/// A CMS image field: `{ "asset": { ... } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ImageSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset: Option<AssetRef>,
}

impl ImageSource {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetRef {
                url: Some(url.into()),
                reference: None,
            }),
        }
    }

    pub fn from_ref(reference: impl Into<String>) -> Self {
        Self {
            asset: Some(AssetRef {
                url: None,
                reference: Some(reference.into()),
            }),
        }
    }

    /// The already-resolved URL, if the CMS supplied one.
    pub fn resolved_url(&self) -> Option<&str> {
        self.asset
            .as_ref()?
            .url
            .as_deref()
            .filter(|url| !url.is_empty())
    }
}

/// A decoded `<type>-<id>-<extension>` asset reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRef<'a> {
    pub kind: &'a str,
    pub id: &'a str,
    pub extension: &'a str,
}

/// Splits an asset reference into type, id and extension.
///
/// The id is everything between the first and last `-`, so references that
/// embed dimensions (`image-abc-800x600-png`) keep them in the id.
pub fn decode_ref(reference: &str) -> Option<DecodedRef<'_>> {
    let (kind, rest) = reference.split_once('-')?;
    let (id, extension) = rest.rsplit_once('-')?;
    if kind.is_empty() || id.is_empty() || extension.is_empty() {
        return None;
    }
    Some(DecodedRef { kind, id, extension })
}

// ============================================================================
// ImageUrlBuilder
// ============================================================================

/// Turns CMS image fields into fetchable CDN URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageUrlBuilder {
    project_id: String,
    dataset: String,
}

impl Default for ImageUrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_PROJECT_ID, DEFAULT_DATASET)
    }
}

impl ImageUrlBuilder {
    pub fn new(project_id: impl Into<String>, dataset: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            dataset: dataset.into(),
        }
    }

    /// Resolves `source` to a URL.
    ///
    /// A URL already present on the asset wins; otherwise the reference is
    /// decoded. Returns `None` when there is no asset or the reference is
    /// malformed.
    pub fn url_for(&self, source: Option<&ImageSource>) -> Option<String> {
        let source = source?;
        if let Some(url) = source.resolved_url() {
            return Some(url.to_string());
        }

        let reference = source.asset.as_ref()?.reference.as_deref()?;
        let decoded = decode_ref(reference)?;
        Some(format!(
            "{CDN_BASE}/{}/{}/{}.{}",
            self.project_id, self.dataset, decoded.id, decoded.extension
        ))
    }
}
