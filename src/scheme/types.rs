use serde::Deserialize;
use std::collections::BTreeMap;

/// Raw scheme document: field name to entity descriptor
pub type SchemeSpec = BTreeMap<String, EntitySpec>;

/// Entity descriptor for one scheme field
///
/// For the reserved field name `"value"` the descriptor itself carries the
/// value rule (`type`, `attribute`, `reg`, `strip`), which is why those keys
/// are flattened into `rule`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitySpec {
    /// Match levels used to move down the tree
    #[serde(default)]
    pub tree: Option<Vec<LevelSpec>>,

    /// Nested scheme evaluated against every matched node
    #[serde(default)]
    pub children: Option<SchemeSpec>,

    /// Shorthand for `children: {"value": ...}`
    #[serde(default)]
    pub value: Option<ValueSpec>,

    #[serde(flatten)]
    pub rule: ValueSpec,
}

/// One level of a tree match
#[derive(Debug, Clone, Deserialize)]
pub struct LevelSpec {
    /// Tag name filter
    #[serde(default)]
    pub name: Option<PatternSpec>,

    /// Text content filter
    #[serde(default)]
    pub text: Option<PatternSpec>,

    /// Search all descendants (default) or only direct children
    #[serde(default = "default_recursive")]
    pub recursive: bool,

    /// Index or range selector applied to the candidates
    #[serde(rename = "[]", default)]
    pub select: Option<SelectorSpec>,

    /// Every other key is an attribute filter
    #[serde(flatten)]
    pub attributes: BTreeMap<String, PatternSpec>,
}

fn default_recursive() -> bool {
    true
}

/// How matched nodes are turned into strings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueSpec {
    #[serde(rename = "type", default)]
    pub kind: Option<ValueKind>,

    #[serde(default)]
    pub attribute: Option<String>,

    #[serde(default)]
    pub reg: Option<PatternSpec>,

    #[serde(default)]
    pub strip: Option<bool>,
}

/// Extraction policy of a value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Text,
    Content,
    Attribute,
    Html,
    #[default]
    Markdown,
}

/// A filter value: literal, `{"type": "reg", "reg": ...}`, or presence flag
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PatternSpec {
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        reg: String,
    },
    Literal(String),
    Present(bool),
    Number(serde_json::Number),
}

/// Raw `"[]"` selector value
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SelectorSpec {
    Index(u64),
    Signed(i64),
    Expr(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_collects_attributes() {
        let level: LevelSpec = serde_json::from_str(
            r#"{"name": "div", "class": "item", "id": {"type": "reg", "reg": "^x"}, "[]": "0"}"#,
        )
        .unwrap();

        assert!(matches!(level.name, Some(PatternSpec::Literal(ref n)) if n == "div"));
        assert!(level.recursive);
        assert!(matches!(level.select, Some(SelectorSpec::Expr(ref s)) if s == "0"));
        assert_eq!(level.attributes.len(), 2);
        assert!(matches!(
            level.attributes.get("id"),
            Some(PatternSpec::Tagged { kind, reg }) if kind == "reg" && reg == "^x"
        ));
    }

    #[test]
    fn test_level_non_recursive() {
        let level: LevelSpec = serde_json::from_str(r#"{"name": "li", "recursive": false}"#).unwrap();
        assert!(!level.recursive);
        assert!(level.attributes.is_empty());
    }

    #[test]
    fn test_entity_flattens_value_rule() {
        let entity: EntitySpec =
            serde_json::from_str(r#"{"type": "attribute", "attribute": "href", "strip": true}"#).unwrap();

        assert_eq!(entity.rule.kind, Some(ValueKind::Attribute));
        assert_eq!(entity.rule.attribute.as_deref(), Some("href"));
        assert_eq!(entity.rule.strip, Some(true));
        assert!(entity.tree.is_none());
    }

    #[test]
    fn test_unknown_value_type_rejected() {
        let result: Result<ValueSpec, _> = serde_json::from_str(r#"{"type": "pdf"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_numeric_selector() {
        let level: LevelSpec = serde_json::from_str(r#"{"[]": 2}"#).unwrap();
        assert!(matches!(level.select, Some(SelectorSpec::Index(2))));
    }
}
