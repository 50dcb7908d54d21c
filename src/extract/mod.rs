//! Scheme-driven extraction over parsed HTML
//!
//! This module contains the pure, synchronous part of a scrape:
//! - Tree matching of match levels against a document
//! - Value extraction (text, attributes, markup, markdown)
//! - Recursive scheme evaluation
//! - Shrink normalization of evaluation results
//!
//! Nothing here mutates the parsed document, so one document can be
//! evaluated with several schemes concurrently.

mod evaluate;
mod matcher;
mod node;
mod shrink;
mod value;

pub use evaluate::evaluate;
pub use matcher::match_tree;
pub use node::{is_multi_valued, parse_document, Node};
pub use shrink::{shrink, shrink_owned};
pub use value::{extract_values, Html2TextConverter, MarkdownConverter};

use crate::scheme::Scheme;
use serde_json::{Map, Value};

/// Parses `html` and evaluates `scheme` against the whole document
///
/// # Example
///
/// ```
/// use scheme_scrape::extract::{extract_document, Html2TextConverter};
/// use scheme_scrape::scheme::Scheme;
///
/// let scheme = Scheme::from_json(
///     r#"{"title": {"tree": [{"name": "h1"}], "value": {"type": "text", "strip": true}}}"#,
/// ).unwrap();
/// let result = extract_document("<h1> Hi </h1>", &scheme, &Html2TextConverter::default());
/// assert_eq!(result["title"][0]["value"][0], "Hi");
/// ```
pub fn extract_document(html: &str, scheme: &Scheme, converter: &dyn MarkdownConverter) -> Map<String, Value> {
    let document = parse_document(html);
    evaluate(Node::Document(&document), scheme, converter)
}
