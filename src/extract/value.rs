use super::node::Node;
use crate::scheme::{ValueKind, ValueRule};
use regex::Regex;
use std::fmt;

/// Converts an HTML fragment into a readable text/markdown rendering
pub trait MarkdownConverter: Send + Sync {
    fn convert(&self, html: &str) -> String;
}

/// Converter backed by the `html2text` crate
///
/// Rendering that does not fit the configured width is retried with
/// width overflow allowed; if that fails too the value is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Html2TextConverter {
    width: usize,
    max_wrap_width: Option<usize>,
    min_wrap_width: Option<usize>,
    pad_block_width: bool,
    raw_mode: bool,
    table_borders: bool,
}

impl Html2TextConverter {
    /// Line width used when none is configured
    pub const DEFAULT_WIDTH: usize = 78;

    pub fn new(width: usize) -> Self {
        Self {
            width,
            max_wrap_width: None,
            min_wrap_width: None,
            pad_block_width: false,
            raw_mode: false,
            table_borders: true,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Wraps paragraphs at `width` even when more room is available
    pub fn with_max_wrap_width(mut self, width: Option<usize>) -> Self {
        self.max_wrap_width = width;
        self
    }

    pub fn with_min_wrap_width(mut self, width: Option<usize>) -> Self {
        self.min_wrap_width = width;
        self
    }

    /// Pads every line out to the full width
    pub fn with_pad_block_width(mut self, pad: bool) -> Self {
        self.pad_block_width = pad;
        self
    }

    /// Renders table cells one after another instead of as a grid
    pub fn with_raw_mode(mut self, raw: bool) -> Self {
        self.raw_mode = raw;
        self
    }

    pub fn with_table_borders(mut self, borders: bool) -> Self {
        self.table_borders = borders;
        self
    }

    fn render(&self, html: &str, allow_overflow: bool) -> Result<String, html2text::Error> {
        let mut config = html2text::config::plain();
        if let Some(width) = self.max_wrap_width {
            config = config.max_wrap_width(width);
        }
        if let Some(width) = self.min_wrap_width {
            config = config.min_wrap_width(width);
        }
        if self.pad_block_width {
            config = config.pad_block_width();
        }
        if self.raw_mode {
            config = config.raw_mode(true);
        }
        if !self.table_borders {
            config = config.no_table_borders();
        }
        if allow_overflow {
            config = config.allow_width_overflow();
        }
        config.string_from_read(html.as_bytes(), self.width)
    }
}

impl Default for Html2TextConverter {
    fn default() -> Self {
        Self::new(Self::DEFAULT_WIDTH)
    }
}

impl MarkdownConverter for Html2TextConverter {
    fn convert(&self, html: &str) -> String {
        match self.render(html, false) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("html2text: {}, retrying with width overflow", e);
                self.render(html, true).unwrap_or_else(|e| {
                    tracing::warn!("Failed to convert html to text: {}", e);
                    String::new()
                })
            }
        }
    }
}

impl fmt::Debug for dyn MarkdownConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MarkdownConverter")
    }
}

/// Turns matched nodes into strings according to `rule`
///
/// Every node is extracted by the rule's type, trimmed when `strip` is set,
/// and then, if a `reg` is present, replaced by all of the regex's matches.
/// Output order follows node order.
pub fn extract_values(
    nodes: &[Node<'_>],
    rule: &ValueRule,
    converter: &dyn MarkdownConverter,
) -> Vec<String> {
    let mut values = Vec::new();

    for node in nodes {
        let Some(raw) = extract_one(node, rule, converter) else {
            continue;
        };
        let raw = if rule.strip {
            raw.trim().to_string()
        } else {
            raw
        };

        match &rule.reg {
            Some(re) => values.extend(find_all(re, &raw)),
            None => values.push(raw),
        }
    }

    values
}

fn extract_one(node: &Node<'_>, rule: &ValueRule, converter: &dyn MarkdownConverter) -> Option<String> {
    match rule.kind {
        ValueKind::Text | ValueKind::Content => Some(node.text()),
        ValueKind::Attribute => rule
            .attribute
            .as_deref()
            .and_then(|name| node.attr_joined(name)),
        ValueKind::Html => Some(node.markup()),
        ValueKind::Markdown => Some(converter.convert(&node.markup())),
    }
}

/// All matches of `re` in `haystack`
///
/// Without capture groups each match contributes its full text; with groups,
/// every participating group contributes in order.
fn find_all(re: &Regex, haystack: &str) -> Vec<String> {
    if re.captures_len() <= 1 {
        return re
            .find_iter(haystack)
            .map(|m| m.as_str().to_string())
            .collect();
    }

    re.captures_iter(haystack)
        .flat_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}
