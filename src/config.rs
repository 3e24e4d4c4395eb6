//! Gallery configuration.
//!
//! Every gallery instance is configured once, at construction, and the
//! configuration never changes afterwards. Callers describe what they want
//! with [`LiteboxOptions`], where every field has a default, and the options
//! are resolved into an immutable [`Config`] when the instance is created.
//!
//! ## Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! image_source = "img"        # "img": thumbnail src, "a": enclosing link href
//! description = "alt"         # "alt", "title", or a CSS selector
//! cleanup_on_close = false    # remove the overlay from the document on close
//! lazy_render = true          # build the overlay on first open, not at setup
//! teardown = "next_tick"      # when cleanup runs: "next_tick" or "immediate"
//! ```
//!
//! ## Partial Configuration
//!
//! From Rust, use struct update syntax:
//!
//! ```
//! use litebox::config::{ImageSource, LiteboxOptions};
//!
//! let options = LiteboxOptions {
//!     image_source: ImageSource::Link,
//!     ..Default::default()
//! };
//! assert!(options.lazy_render);
//! ```
//!
//! From TOML, a sparse table is layered over the stock defaults with
//! [`merge_toml`], so a `litebox.toml` only needs the keys it changes.
//! Unknown keys are rejected to catch typos early.
//!
//! ## Description Source
//!
//! The `description` string is interpreted once, at resolution time:
//! `"alt"` and `"title"` read that attribute of the thumbnail; anything else
//! must parse as a CSS selector and reads the text of a matching element next
//! to the thumbnail (see [`crate::resolve::image_description`]).

use crate::dom::{Selector, SelectorError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
    #[error("Invalid description selector: {0}")]
    DescriptionSelector(#[from] SelectorError),
}

/// Where the large image URL of a thumbnail comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImageSource {
    /// The thumbnail's own `src`.
    #[default]
    #[serde(rename = "img")]
    Img,
    /// The `href` of the nearest enclosing link.
    #[serde(rename = "a")]
    Link,
}

/// When a closed overlay is removed, if `cleanup_on_close` is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownPolicy {
    /// On the host's next tick, after the hide has taken effect.
    #[default]
    NextTick,
    /// Synchronously, as part of the close.
    Immediate,
}

/// Caller-facing gallery options. All fields have defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LiteboxOptions {
    /// Where large image URLs come from.
    pub image_source: ImageSource,
    /// `"alt"`, `"title"`, or a CSS selector for a caption element.
    pub description: String,
    /// Remove the overlay from the document when it is closed.
    pub cleanup_on_close: bool,
    /// Defer building the overlay until the gallery is first opened.
    pub lazy_render: bool,
    /// Scheduling of the removal triggered by `cleanup_on_close`.
    pub teardown: TeardownPolicy,
}

impl Default for LiteboxOptions {
    fn default() -> Self {
        Self {
            image_source: ImageSource::Img,
            description: "alt".to_string(),
            cleanup_on_close: false,
            lazy_render: true,
            teardown: TeardownPolicy::NextTick,
        }
    }
}

impl LiteboxOptions {
    /// Validate the options and resolve them into a [`Config`].
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        Ok(Config {
            image_source: self.image_source,
            description: DescriptionSource::parse(&self.description)?,
            cleanup_on_close: self.cleanup_on_close,
            lazy_render: self.lazy_render,
            teardown: self.teardown,
        })
    }
}

/// How a thumbnail's description is found.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptionSource {
    /// An attribute of the thumbnail itself (`alt` or `title`).
    Attribute(String),
    /// The text of an element near the thumbnail matching a selector.
    Element(Selector),
}

impl DescriptionSource {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        match value.trim() {
            "" => Err(ConfigError::Validation(
                "description must be \"alt\", \"title\" or a CSS selector".into(),
            )),
            attr @ ("alt" | "title") => Ok(Self::Attribute(attr.to_string())),
            selector => Ok(Self::Element(Selector::parse(selector)?)),
        }
    }
}

/// Resolved, immutable configuration of one gallery instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub image_source: ImageSource,
    pub description: DescriptionSource,
    pub cleanup_on_close: bool,
    pub lazy_render: bool,
    pub teardown: TeardownPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_source: ImageSource::Img,
            description: DescriptionSource::Attribute("alt".to_string()),
            cleanup_on_close: false,
            lazy_render: true,
            teardown: TeardownPolicy::NextTick,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default options as a `toml::Value::Table`.
///
/// This is the base layer user overrides are merged on top of.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(LiteboxOptions::default()).expect("default options must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults and deserialize.
///
/// The result is validated by resolving it, so a bad description selector
/// is reported here rather than when the gallery is created.
pub fn resolve_options(overlay: Option<toml::Value>) -> Result<LiteboxOptions, ConfigError> {
    let base = stock_defaults_value();
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let options: LiteboxOptions = merged.try_into()?;
    options.resolve()?;
    Ok(options)
}

/// Parse sparse TOML options.
pub fn parse_options(content: &str) -> Result<LiteboxOptions, ConfigError> {
    let value: toml::Value = toml::from_str(content)?;
    resolve_options(Some(value))
}

/// Load options from a TOML file.
pub fn load_options(path: &Path) -> Result<LiteboxOptions, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_options(&content)
}

/// Returns a fully-commented stock `litebox.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Litebox Configuration
# =====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# Where the large image URL comes from:
#   "img" - the thumbnail's own src attribute
#   "a"   - the href of the link wrapping the thumbnail
# Thumbnails that cannot be resolved are left out of the gallery.
image_source = "img"

# Where the caption comes from:
#   "alt" or "title" - that attribute of the thumbnail
#   any other value  - a CSS selector; the text of the first matching element
#                      inside the thumbnail's own item (e.g. "figcaption")
description = "alt"

# Remove the overlay from the page when it is closed. Reopening builds a
# fresh overlay. Keep this off for galleries that are opened often.
cleanup_on_close = false

# Build the overlay the first time the gallery is opened instead of at setup.
lazy_render = true

# When the removal requested by cleanup_on_close happens:
#   "next_tick" - after the hide has been applied, on the next tick
#   "immediate" - as part of closing
teardown = "next_tick"
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_options() {
        let options = LiteboxOptions::default();
        assert_eq!(options.image_source, ImageSource::Img);
        assert_eq!(options.description, "alt");
        assert!(!options.cleanup_on_close);
        assert!(options.lazy_render);
        assert_eq!(options.teardown, TeardownPolicy::NextTick);
    }

    #[test]
    fn default_options_resolve_to_default_config() {
        let config = LiteboxOptions::default().resolve().unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn parse_partial_options() {
        let options = parse_options(r#"image_source = "a""#).unwrap();
        assert_eq!(options.image_source, ImageSource::Link);
        // Defaults preserved
        assert_eq!(options.description, "alt");
        assert!(options.lazy_render);
    }

    #[test]
    fn parse_all_options() {
        let options = parse_options(
            r#"
image_source = "a"
description = "title"
cleanup_on_close = true
lazy_render = false
teardown = "immediate"
"#,
        )
        .unwrap();
        assert_eq!(
            options,
            LiteboxOptions {
                image_source: ImageSource::Link,
                description: "title".to_string(),
                cleanup_on_close: true,
                lazy_render: false,
                teardown: TeardownPolicy::Immediate,
            }
        );
    }

    #[test]
    fn unknown_key_rejected() {
        let err = parse_options("lazy = false").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn unknown_image_source_rejected() {
        let err = parse_options(r#"image_source = "link""#).unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn invalid_toml_is_error() {
        assert!(parse_options("image_source = ").is_err());
    }

    // =========================================================================
    // Description source resolution
    // =========================================================================

    #[test]
    fn alt_and_title_are_attributes() {
        assert_eq!(
            DescriptionSource::parse("alt").unwrap(),
            DescriptionSource::Attribute("alt".into())
        );
        assert_eq!(
            DescriptionSource::parse(" title ").unwrap(),
            DescriptionSource::Attribute("title".into())
        );
    }

    #[test]
    fn other_values_are_selectors() {
        let source = DescriptionSource::parse("figcaption.caption").unwrap();
        match source {
            DescriptionSource::Element(selector) => {
                assert_eq!(selector.as_str(), "figcaption.caption")
            }
            other => panic!("expected selector, got {other:?}"),
        }
    }

    #[test]
    fn empty_description_rejected() {
        let err = DescriptionSource::parse("  ").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn invalid_description_selector_rejected() {
        let err = LiteboxOptions {
            description: "li:first-child".into(),
            ..Default::default()
        }
        .resolve()
        .unwrap_err();
        assert!(matches!(err, ConfigError::DescriptionSelector(_)));
    }

    #[test]
    fn invalid_selector_rejected_when_loading() {
        let err = parse_options(r#"description = "[oops""#).unwrap_err();
        assert!(matches!(err, ConfigError::DescriptionSelector(_)));
    }

    // =========================================================================
    // merge_toml tests
    // =========================================================================

    #[test]
    fn merge_toml_scalar_override() {
        let base: toml::Value = toml::from_str("lazy_render = true").unwrap();
        let overlay: toml::Value = toml::from_str("lazy_render = false").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["lazy_render"].as_bool(), Some(false));
    }

    #[test]
    fn merge_toml_preserves_base_keys() {
        let base = stock_defaults_value();
        let overlay: toml::Value = toml::from_str("cleanup_on_close = true").unwrap();
        let merged = merge_toml(base, overlay);
        assert_eq!(merged["cleanup_on_close"].as_bool(), Some(true));
        assert_eq!(merged["description"].as_str(), Some("alt"));
        assert_eq!(merged["image_source"].as_str(), Some("img"));
    }

    #[test]
    fn merge_toml_three_layers() {
        let base = stock_defaults_value();
        let site: toml::Value = toml::from_str(r#"image_source = "a""#).unwrap();
        let page: toml::Value = toml::from_str(r#"description = "title""#).unwrap();
        let merged = merge_toml(merge_toml(base, site), page);
        let options: LiteboxOptions = merged.try_into().unwrap();
        assert_eq!(options.image_source, ImageSource::Link);
        assert_eq!(options.description, "title");
    }

    #[test]
    fn resolve_options_without_overlay_is_default() {
        assert_eq!(resolve_options(None).unwrap(), LiteboxOptions::default());
    }

    // =========================================================================
    // File loading and stock config
    // =========================================================================

    #[test]
    fn load_options_reads_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("litebox.toml");
        fs::write(&path, "cleanup_on_close = true\n").unwrap();
        let options = load_options(&path).unwrap();
        assert!(options.cleanup_on_close);
        assert_eq!(options.image_source, ImageSource::Img);
    }

    #[test]
    fn load_options_missing_file_is_io_error() {
        let tmp = TempDir::new().unwrap();
        let err = load_options(&tmp.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn stock_defaults_value_is_table() {
        assert!(stock_defaults_value().is_table());
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let options = parse_options(stock_config_toml()).unwrap();
        assert_eq!(options, LiteboxOptions::default());
    }

    #[test]
    fn stock_config_toml_contains_all_keys() {
        let content = stock_config_toml();
        for key in [
            "image_source",
            "description",
            "cleanup_on_close",
            "lazy_render",
            "teardown",
        ] {
            assert!(content.contains(key), "stock config missing {key}");
        }
    }
}
