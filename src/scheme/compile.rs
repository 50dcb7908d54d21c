//! Compilation of raw scheme documents
//!
//! Every regular expression is compiled here, once, so evaluation never
//! touches the scheme document again.

use super::selector::Selector;
use super::types::{EntitySpec, LevelSpec, PatternSpec, SchemeSpec, ValueKind, ValueSpec};
use crate::{SchemeError, SchemeResult};
use regex::Regex;

/// Field name that extracts a value instead of recursing
pub const VALUE_FIELD: &str = "value";

/// A compiled extraction scheme
#[derive(Debug, Clone, Default)]
pub struct Scheme {
    pub fields: Vec<(String, Entity)>,
}

/// A compiled scheme field
#[derive(Debug, Clone, Default)]
pub struct Entity {
    pub tree: Option<Vec<Level>>,
    pub children: Option<Scheme>,
    /// Present only on `"value"` fields
    pub rule: Option<ValueRule>,
}

/// A compiled match level
#[derive(Debug, Clone)]
pub struct Level {
    pub name: Option<Pattern>,
    pub text: Option<Pattern>,
    pub recursive: bool,
    pub select: Option<Selector>,
    pub attributes: Vec<(String, Pattern)>,
}

/// A compiled value rule
#[derive(Debug, Clone)]
pub struct ValueRule {
    pub kind: ValueKind,
    pub attribute: Option<String>,
    pub reg: Option<Regex>,
    pub strip: bool,
}

/// A compiled filter
#[derive(Debug, Clone)]
pub enum Pattern {
    Exact(String),
    Regex(Regex),
    Present(bool),
}

impl Scheme {
    /// Parses and compiles a scheme from JSON text
    pub fn from_json(text: &str) -> SchemeResult<Self> {
        let spec: SchemeSpec = serde_json::from_str(text)?;
        Self::compile(&spec)
    }

    /// Compiles a scheme from an already deserialized JSON value
    pub fn from_value(value: serde_json::Value) -> SchemeResult<Self> {
        let spec: SchemeSpec = serde_json::from_value(value)?;
        Self::compile(&spec)
    }

    /// Compiles a raw scheme document
    pub fn compile(spec: &SchemeSpec) -> SchemeResult<Self> {
        compile_scheme(spec, "")
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Top-level field names in evaluation order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(name, _)| name.as_str()).collect()
    }
}

fn compile_scheme(spec: &SchemeSpec, prefix: &str) -> SchemeResult<Scheme> {
    let mut fields = Vec::with_capacity(spec.len());

    for (name, entity) in spec {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{}.{}", prefix, name)
        };
        fields.push((name.clone(), compile_entity(name, entity, &path)?));
    }

    Ok(Scheme { fields })
}

fn compile_entity(name: &str, spec: &EntitySpec, path: &str) -> SchemeResult<Entity> {
    let tree = spec
        .tree
        .as_ref()
        .map(|levels| {
            levels
                .iter()
                .enumerate()
                .map(|(i, level)| compile_level(level, &format!("{}.tree[{}]", path, i)))
                .collect::<SchemeResult<Vec<_>>>()
        })
        .transpose()?;

    let mut children = spec
        .children
        .as_ref()
        .map(|children| compile_scheme(children, &format!("{}.children", path)))
        .transpose()?;

    // {"tree": ..., "value": {...}} is shorthand for children {"value": {...}}
    if let Some(value) = &spec.value {
        if name != VALUE_FIELD {
            let value_path = format!("{}.value", path);
            let rule = compile_rule(value, &value_path)?;
            let scheme = children.get_or_insert_with(Scheme::default);

            if scheme.fields.iter().any(|(field, _)| field == VALUE_FIELD) {
                return Err(SchemeError::Invalid {
                    field: value_path,
                    message: "value defined both inline and in children".to_string(),
                });
            }
            scheme.fields.push((
                VALUE_FIELD.to_string(),
                Entity {
                    tree: None,
                    children: None,
                    rule: Some(rule),
                },
            ));
            scheme.fields.sort_by(|a, b| a.0.cmp(&b.0));
        }
    }

    let rule = if name == VALUE_FIELD {
        Some(compile_rule(&spec.rule, path)?)
    } else {
        None
    };

    Ok(Entity {
        tree,
        children,
        rule,
    })
}

fn compile_level(spec: &LevelSpec, path: &str) -> SchemeResult<Level> {
    let name = spec
        .name
        .as_ref()
        .map(|p| compile_pattern(p, &format!("{}.name", path)))
        .transpose()?;
    let text = spec
        .text
        .as_ref()
        .map(|p| compile_pattern(p, &format!("{}.text", path)))
        .transpose()?;

    let attributes = spec
        .attributes
        .iter()
        .map(|(attr, p)| Ok((attr.clone(), compile_pattern(p, &format!("{}.{}", path, attr))?)))
        .collect::<SchemeResult<Vec<_>>>()?;

    Ok(Level {
        name,
        text,
        recursive: spec.recursive,
        select: spec.select.as_ref().map(Selector::from),
        attributes,
    })
}

fn compile_rule(spec: &ValueSpec, path: &str) -> SchemeResult<ValueRule> {
    let kind = spec.kind.unwrap_or_default();

    let attribute = spec.attribute.clone().filter(|a| !a.is_empty());
    if kind == ValueKind::Attribute && attribute.is_none() {
        return Err(SchemeError::MissingAttribute {
            field: path.to_string(),
        });
    }

    let reg = spec
        .reg
        .as_ref()
        .map(|p| compile_regex(p, &format!("{}.reg", path)))
        .transpose()?;

    Ok(ValueRule {
        kind,
        attribute,
        reg,
        strip: spec.strip.unwrap_or(false),
    })
}

fn compile_pattern(spec: &PatternSpec, path: &str) -> SchemeResult<Pattern> {
    match spec {
        PatternSpec::Tagged { .. } => compile_regex(spec, path).map(Pattern::Regex),
        PatternSpec::Literal(value) => Ok(Pattern::Exact(value.clone())),
        PatternSpec::Number(value) => Ok(Pattern::Exact(value.to_string())),
        PatternSpec::Present(flag) => Ok(Pattern::Present(*flag)),
    }
}

/// `reg` accepts either a bare pattern string or the tagged form
fn compile_regex(spec: &PatternSpec, path: &str) -> SchemeResult<Regex> {
    let pattern = match spec {
        PatternSpec::Tagged { kind, reg } => {
            if kind != "reg" {
                return Err(SchemeError::UnknownPatternType {
                    field: path.to_string(),
                    kind: kind.clone(),
                });
            }
            reg.as_str()
        }
        PatternSpec::Literal(reg) => reg.as_str(),
        PatternSpec::Present(_) | PatternSpec::Number(_) => {
            return Err(SchemeError::Invalid {
                field: path.to_string(),
                message: "expected a regular expression".to_string(),
            })
        }
    };

    Regex::new(pattern).map_err(|source| SchemeError::InvalidRegex {
        field: path.to_string(),
        source,
    })
}
