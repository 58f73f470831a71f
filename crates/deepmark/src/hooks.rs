//! Extension points called while rendering.
//!
//! [`RenderHooks`] sees every anchor and image tag before it is written and
//! decides how urls are qualified. [`CodeBlockFormatter`] replaces the
//! default `<pre><code>` markup for code blocks.
//!
//! # Example
//!
//! ```
//! use deepmark::{HtmlTag, ImageInfo, RenderHooks, RenderOptions};
//!
//! struct FixedSizeImages;
//!
//! impl RenderHooks for FixedSizeImages {
//!     fn image_size(&self, url: &str, titled_image: bool) -> Option<ImageInfo> {
//!         Some(ImageInfo {
//!             url: url.to_owned(),
//!             titled_image,
//!             width: 640,
//!             height: 480,
//!         })
//!     }
//! }
//!
//! let mut tag = HtmlTag::new("img");
//! tag.set_attribute("src", "cat.png");
//! FixedSizeImages.prepare_image(&RenderOptions::default(), &mut tag, false);
//! assert_eq!(tag.attribute("width"), Some("640"));
//! ```

use crate::html_tag::HtmlTag;
use crate::options::RenderOptions;
use crate::records::ImageInfo;
use crate::util::is_url_fully_qualified;

/// Callbacks for link and image tags.
///
/// Every method has a default implementing the standard behaviour, so
/// implementations override only what they need. The prepare defaults call
/// [`qualify_url`](Self::qualify_url) and [`image_size`](Self::image_size)
/// through `self`, so overriding those is enough to change urls or sizes.
pub trait RenderHooks {
    /// Turn a link or image target into the url written to the output.
    ///
    /// Default: targets are joined to `url_base_location` unless they are
    /// fragments or already fully qualified. Root-relative targets use
    /// `url_root_location`, or the scheme and host of the base location.
    fn qualify_url(&self, options: &RenderOptions, url: &str) -> String {
        let Some(base) = options
            .url_base_location
            .as_deref()
            .filter(|b| !b.is_empty())
        else {
            return url.to_owned();
        };

        if url.starts_with('#') || is_url_fully_qualified(url) {
            return url.to_owned();
        }

        if url.starts_with('/') {
            if let Some(root) = options
                .url_root_location
                .as_deref()
                .filter(|r| !r.is_empty())
            {
                return format!("{root}{url}");
            }
            let host_start = base.find("://").map_or(0, |pos| pos + 3);
            let domain = match base[host_start..].find('/') {
                Some(slash) => &base[..host_start + slash],
                None => base,
            };
            return format!("{domain}{url}");
        }

        if base.ends_with('/') {
            format!("{base}{url}")
        } else {
            format!("{base}/{url}")
        }
    }

    /// Report the size of an image. Default: unknown.
    fn image_size(&self, _url: &str, _titled_image: bool) -> Option<ImageInfo> {
        None
    }

    /// Adjust an `<a>` tag before it is written.
    ///
    /// Default: adds `rel="nofollow"` and `target="_blank"` as configured,
    /// then qualifies `href`.
    fn prepare_link(&self, options: &RenderOptions, tag: &mut HtmlTag) {
        let Some(href) = tag.attribute("href").map(str::to_owned) else {
            return;
        };

        if options.no_follow_links {
            tag.set_attribute("rel", "nofollow");
        }

        let external = is_url_fully_qualified(&href);
        if (options.new_window_for_external_links && external)
            || (options.new_window_for_local_links && !external)
        {
            tag.set_attribute("target", "_blank");
        }

        tag.set_attribute("href", self.qualify_url(options, &href));
    }

    /// Adjust an `<img>` tag before it is written.
    ///
    /// Default: sets `width`/`height` from [`image_size`](Self::image_size)
    /// when known, then qualifies `src`.
    fn prepare_image(&self, options: &RenderOptions, tag: &mut HtmlTag, titled_image: bool) {
        let Some(src) = tag.attribute("src").map(str::to_owned) else {
            return;
        };

        if let Some(info) = self.image_size(&src, titled_image) {
            tag.set_attribute("width", info.width.to_string());
            tag.set_attribute("height", info.height.to_string());
        }

        tag.set_attribute("src", self.qualify_url(options, &src));
    }
}

/// Hooks with the standard behaviour and nothing else.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl RenderHooks for DefaultHooks {}

/// Replacement renderer for code blocks.
///
/// Receives the block's lines already HTML-encoded with tabs expanded, each
/// followed by `\n`. The returned markup is inserted verbatim.
pub trait CodeBlockFormatter {
    fn format_code_block(&self, options: &RenderOptions, code: &str) -> String;
}

impl<F> CodeBlockFormatter for F
where
    F: Fn(&RenderOptions, &str) -> String,
{
    fn format_code_block(&self, options: &RenderOptions, code: &str) -> String {
        self(options, code)
    }
}
