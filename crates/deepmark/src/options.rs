//! Rendering options.

/// Flags controlling how a document is rendered.
///
/// With the `serde` feature this deserializes from a table where every field
/// is optional.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(default))]
pub struct RenderOptions {
    /// Enable the extended dialect: header ids, footnotes, abbreviations
    /// and the extra escapable characters.
    pub extra_mode: bool,
    /// Encode any HTML that fails the tag whitelist instead of passing it
    /// through.
    pub safe_mode: bool,
    /// Generate ids for headings without an explicit `{#id}`.
    pub auto_heading_ids: bool,
    /// Passed to the image hooks: the image is rendered as a titled figure.
    pub titled_image: bool,
    /// Add `rel="nofollow"` to links.
    pub no_follow_links: bool,
    /// Add `target="_blank"` to links with a fully qualified url.
    pub new_window_for_external_links: bool,
    /// Add `target="_blank"` to relative links.
    pub new_window_for_local_links: bool,
    /// Base url that relative link and image targets are joined to.
    pub url_base_location: Option<String>,
    /// Url that root-relative (`/...`) targets are joined to. Falls back to
    /// the scheme and host of `url_base_location`.
    pub url_root_location: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            extra_mode: false,
            safe_mode: false,
            auto_heading_ids: true,
            titled_image: false,
            no_follow_links: false,
            new_window_for_external_links: false,
            new_window_for_local_links: false,
            url_base_location: None,
            url_root_location: None,
        }
    }
}

impl RenderOptions {
    /// Default options with the extended dialect enabled.
    pub fn extra() -> Self {
        Self {
            extra_mode: true,
            ..Self::default()
        }
    }
}
