use super::node::{is_multi_valued, Node};
use crate::scheme::{Level, Pattern};

/// Finds all nodes reached by following `levels` down from `node`
///
/// Each level filters the descendants (or direct children, when the level is
/// not recursive) of every node produced by the previous level. An empty
/// level list matches `node` itself.
///
/// # Returns
///
/// * `Some(nodes)` - Matches in document order, never empty
/// * `None` - Some level found no candidates, its selector failed, or no
///   candidate matched the remaining levels
pub fn match_tree<'a>(node: Node<'a>, levels: &[Level]) -> Option<Vec<Node<'a>>> {
    let Some((level, rest)) = levels.split_first() else {
        return Some(vec![node]);
    };

    let pool = if level.recursive {
        node.descendants()
    } else {
        node.children()
    };
    let candidates: Vec<Node<'a>> = pool
        .into_iter()
        .filter(|candidate| level_matches(level, candidate))
        .collect();

    if candidates.is_empty() {
        return None;
    }

    let candidates = match &level.select {
        Some(selector) => match selector.apply(&candidates) {
            Ok(selected) => selected,
            Err(e) => {
                tracing::debug!("Selector {:?} matched nothing: {}", selector, e);
                return None;
            }
        },
        None => candidates,
    };

    let mut result = Vec::new();
    for candidate in candidates {
        if let Some(found) = match_tree(candidate, rest) {
            result.extend(found);
        }
    }

    if result.is_empty() {
        None
    } else {
        Some(result)
    }
}

fn level_matches(level: &Level, node: &Node<'_>) -> bool {
    let Some(tag) = node.tag_name() else {
        return false;
    };

    if let Some(pattern) = &level.name {
        let ok = match pattern {
            Pattern::Exact(name) => tag.eq_ignore_ascii_case(name),
            Pattern::Regex(re) => re.is_match(tag),
            Pattern::Present(flag) => *flag,
        };
        if !ok {
            return false;
        }
    }

    if let Some(pattern) = &level.text {
        let text = node.text();
        let ok = match pattern {
            Pattern::Exact(expected) => text.trim() == expected.trim(),
            Pattern::Regex(re) => re.is_match(&text),
            Pattern::Present(flag) => !text.trim().is_empty() == *flag,
        };
        if !ok {
            return false;
        }
    }

    level
        .attributes
        .iter()
        .all(|(name, pattern)| attribute_matches(node.attr(name), name, pattern))
}

/// Multi-valued attributes match on the whole value or on any single token
fn attribute_matches(value: Option<&str>, name: &str, pattern: &Pattern) -> bool {
    match (pattern, value) {
        (Pattern::Present(flag), value) => value.is_some() == *flag,
        (_, None) => false,
        (Pattern::Exact(expected), Some(value)) => {
            value == expected
                || (is_multi_valued(name) && value.split_whitespace().any(|token| token == expected))
        }
        (Pattern::Regex(re), Some(value)) => {
            re.is_match(value)
                || (is_multi_valued(name) && value.split_whitespace().any(|token| re.is_match(token)))
        }
    }
}
