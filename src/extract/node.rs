//! Document node abstraction over `scraper`
//!
//! The matcher and extractor only need a small, closed set of operations:
//! attribute lookup, flattened text, serialized markup, and child/descendant
//! traversal. [`Node`] provides exactly those for both the document root and
//! element nodes.

use scraper::{ElementRef, Html};

/// Attributes that HTML treats as whitespace-separated token lists
const MULTI_VALUED_ATTRIBUTES: &[&str] = &[
    "class",
    "rel",
    "rev",
    "accept-charset",
    "headers",
    "accesskey",
    "dropzone",
];

/// Parses an HTML document into a navigable tree
///
/// # Example
///
/// ```
/// use scheme_scrape::extract::{parse_document, Node};
///
/// let html = parse_document("<html><body><h1>Hi</h1></body></html>");
/// let root = Node::Document(&html);
/// assert_eq!(root.descendants().len(), 4);
/// ```
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Returns whether `name` is a multi-valued HTML attribute such as `class`
pub fn is_multi_valued(name: &str) -> bool {
    MULTI_VALUED_ATTRIBUTES
        .iter()
        .any(|attr| attr.eq_ignore_ascii_case(name))
}

/// A node of a parsed document
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// The document itself; its only element child is `<html>`
    Document(&'a Html),
    Element(ElementRef<'a>),
}

impl<'a> Node<'a> {
    /// Tag name of an element node
    pub fn tag_name(&self) -> Option<&'a str> {
        match self {
            Node::Document(_) => None,
            Node::Element(element) => Some(element.value().name()),
        }
    }

    /// Raw value of an attribute, if present
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        match self {
            Node::Document(_) => None,
            Node::Element(element) => element.value().attr(name),
        }
    }

    /// Attribute value with multi-valued attributes normalized
    ///
    /// Token lists like `class="a   b"` are re-joined with a single space.
    pub fn attr_joined(&self, name: &str) -> Option<String> {
        let value = self.attr(name)?;
        if is_multi_valued(name) {
            Some(value.split_whitespace().collect::<Vec<_>>().join(" "))
        } else {
            Some(value.to_string())
        }
    }

    /// Flattened visible text of the node and all its descendants
    pub fn text(&self) -> String {
        match self {
            Node::Document(html) => html.root_element().text().collect(),
            Node::Element(element) => element.text().collect(),
        }
    }

    /// Serialized markup of the node, including its own tag
    pub fn markup(&self) -> String {
        match self {
            Node::Document(html) => html.html(),
            Node::Element(element) => element.html(),
        }
    }

    /// Direct element children, in document order
    pub fn children(&self) -> Vec<Node<'a>> {
        match self {
            Node::Document(html) => html
                .tree
                .root()
                .children()
                .filter_map(ElementRef::wrap)
                .map(Node::Element)
                .collect(),
            Node::Element(element) => element
                .children()
                .filter_map(ElementRef::wrap)
                .map(Node::Element)
                .collect(),
        }
    }

    /// All element descendants (excluding the node itself), in document order
    pub fn descendants(&self) -> Vec<Node<'a>> {
        match self {
            Node::Document(html) => html
                .tree
                .root()
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .map(Node::Element)
                .collect(),
            Node::Element(element) => element
                .descendants()
                .skip(1)
                .filter_map(ElementRef::wrap)
                .map(Node::Element)
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>T</title></head><body>
        <div id="main" class="box   wide"><p>One</p><p>Two <b>bold</b></p></div>
        </body></html>"#;

    fn first<'a>(root: Node<'a>, tag: &str) -> Node<'a> {
        root.descendants()
            .into_iter()
            .find(|n| n.tag_name() == Some(tag))
            .unwrap()
    }

    #[test]
    fn test_document_children_is_html() {
        let html = parse_document(PAGE);
        let children = Node::Document(&html).children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].tag_name(), Some("html"));
    }

    #[test]
    fn test_descendants_in_document_order() {
        let html = parse_document(PAGE);
        let names: Vec<_> = Node::Document(&html)
            .descendants()
            .iter()
            .filter_map(|n| n.tag_name())
            .collect();
        assert_eq!(names, vec!["html", "head", "title", "body", "div", "p", "p", "b"]);
    }

    #[test]
    fn test_children_vs_descendants() {
        let html = parse_document(PAGE);
        let div = first(Node::Document(&html), "div");
        assert_eq!(div.children().len(), 2);
        assert_eq!(div.descendants().len(), 3);
    }

    #[test]
    fn test_text_flattens() {
        let html = parse_document(PAGE);
        let div = first(Node::Document(&html), "div");
        assert_eq!(div.text(), "OneTwo bold");
    }

    #[test]
    fn test_markup_includes_tag() {
        let html = parse_document(PAGE);
        let b = first(Node::Document(&html), "b");
        assert_eq!(b.markup(), "<b>bold</b>");
    }

    #[test]
    fn test_attr_joined_multi_valued() {
        let html = parse_document(PAGE);
        let div = first(Node::Document(&html), "div");
        assert_eq!(div.attr("id"), Some("main"));
        assert_eq!(div.attr_joined("class"), Some("box wide".to_string()));
        assert_eq!(div.attr_joined("missing"), None);
    }

    #[test]
    fn test_is_multi_valued() {
        assert!(is_multi_valued("class"));
        assert!(is_multi_valued("REL"));
        assert!(!is_multi_valued("href"));
    }
}
