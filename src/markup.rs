//! HTML tag and inline formatters.
//!
//! Formatters turn a built asset URL (or inline contents) into markup. A
//! default set covers scripts, stylesheets, favicons and images; hosts can
//! register their own per extension.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::config::Config;

/// Attribute map for generated tags (sorted output by construction).
pub type Attributes = BTreeMap<String, String>;

/// Formats a served URL into a tag, e.g. `<script src="...">`.
pub type TagFormatter = Box<dyn Fn(&str, &Config, &Attributes) -> String + Send + Sync>;

/// Formats raw contents into an inline tag, e.g. `<style>...</style>`.
pub type InlineFormatter = Box<dyn Fn(&str, &Config, &Attributes) -> String + Send + Sync>;

/// Attributes whose values get entity-escaped.
const ENCODED_ATTRIBUTES: [&str; 2] = ["alt", "title"];

/// Per-extension tag and inline formatter registries.
pub struct FormatterSet {
    tags: FxHashMap<String, TagFormatter>,
    inline: FxHashMap<String, InlineFormatter>,
}

impl FormatterSet {
    pub fn register_tag(&mut self, ext: &str, formatter: TagFormatter) {
        self.tags.insert(crate::adapter::to_extname(ext), formatter);
    }

    pub fn register_inline(&mut self, ext: &str, formatter: InlineFormatter) {
        self.inline.insert(crate::adapter::to_extname(ext), formatter);
    }

    pub fn tag_for(&self, ext: &str) -> Option<&TagFormatter> {
        self.tags.get(ext)
    }

    pub fn inline_for(&self, ext: &str) -> Option<&InlineFormatter> {
        self.inline.get(ext)
    }
}

impl Default for FormatterSet {
    fn default() -> Self {
        let mut set = Self {
            tags: FxHashMap::default(),
            inline: FxHashMap::default(),
        };

        set.register_tag(
            ".js",
            Box::new(|url, config, attributes| {
                let mut attributes = attributes.clone();
                if !config.html5 {
                    attributes
                        .entry("type".to_string())
                        .or_insert_with(|| "text/javascript".to_string());
                }
                format!("<script src=\"{url}\"{}></script>", stringify(&attributes))
            }),
        );

        set.register_tag(
            ".css",
            Box::new(|url, _, attributes| {
                let mut attributes = attributes.clone();
                attributes
                    .entry("rel".to_string())
                    .or_insert_with(|| "stylesheet".to_string());
                format!("<link href=\"{url}\"{} />", stringify(&attributes))
            }),
        );

        set.register_tag(
            ".ico",
            Box::new(|url, _, attributes| {
                let mut attributes = attributes.clone();
                attributes
                    .entry("rel".to_string())
                    .or_insert_with(|| "shortcut icon".to_string());
                format!("<link href=\"{url}\"{} />", stringify(&attributes))
            }),
        );

        for ext in [".jpg", ".jpeg", ".gif", ".png", ".bmp", ".svg"] {
            set.register_tag(
                ext,
                Box::new(|url, _, attributes| {
                    format!("<img src=\"{url}\"{} />", stringify(attributes))
                }),
            );
        }

        set.register_inline(
            ".js",
            Box::new(|content, config, attributes| {
                let mut attributes = attributes.clone();
                if !config.html5 {
                    attributes
                        .entry("type".to_string())
                        .or_insert_with(|| "text/javascript".to_string());
                }
                format!("<script{}>{content}</script>", stringify(&attributes))
            }),
        );

        set.register_inline(
            ".css",
            Box::new(|content, config, attributes| {
                let mut attributes = attributes.clone();
                if !config.html5 {
                    attributes
                        .entry("type".to_string())
                        .or_insert_with(|| "text/css".to_string());
                }
                format!("<style{}>{content}</style>", stringify(&attributes))
            }),
        );

        set
    }
}

/// Stringify attributes as ` key="value"` pairs, sorted by key.
pub fn stringify(attributes: &Attributes) -> String {
    let mut out = String::new();
    for (key, value) in attributes {
        if ENCODED_ATTRIBUTES.contains(&key.as_str()) {
            out.push_str(&format!(" {key}=\"{}\"", escape(value)));
        } else {
            out.push_str(&format!(" {key}=\"{value}\""));
        }
    }
    out
}

/// Minimal HTML entity escaping for attribute values.
fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
