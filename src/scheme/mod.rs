//! Extraction scheme definitions
//!
//! A scheme is a JSON document mapping field names to entity descriptors:
//!
//! ```json
//! {
//!   "items": {
//!     "tree": [{"name": "li", "class": "item"}],
//!     "children": {
//!       "title": {"tree": [{"name": "a"}], "value": {"type": "text", "strip": true}},
//!       "link": {"tree": [{"name": "a"}], "value": {"type": "attribute", "attribute": "href"}}
//!     }
//!   }
//! }
//! ```
//!
//! The raw document is deserialized into the types in [`types`] and then
//! compiled into a [`Scheme`], with regular expressions and selectors ready
//! for evaluation.

mod compile;
pub mod selector;
pub mod types;

pub use compile::{Entity, Level, Pattern, Scheme, ValueRule, VALUE_FIELD};
pub use selector::{Selector, SelectorError};
pub use types::{EntitySpec, LevelSpec, PatternSpec, SchemeSpec, SelectorSpec, ValueKind, ValueSpec};
