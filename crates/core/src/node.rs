//! The document tree handed to display renderers.
//!
//! `Node` is a closed set of variants. Passes dispatch on the variant instead
//! of sniffing class names, except at the one place where trees from outside
//! the pipeline have to be recognized: [`Element::is_rendered_math`] and
//! [`Element::is_error_artifact`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute that marks an element as typeset math output.
pub const MATH_ATTR: &str = "data-math";
/// Attribute that marks an element as a failed math render.
pub const MATH_ERROR_ATTR: &str = "data-math-error";

const MATH_CLASS_MARKERS: [&str; 3] = ["katex", "katex-display", "katex-mathml"];
const ERROR_CLASS_MARKERS: [&str; 2] = ["katex-error", "math-error"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Node {
    Text { value: String },
    Element(Element),
    Math(MathNode),
    MathError(MathError),
    Table(Table),
    Code(CodeBlock),
}

impl Node {
    pub fn text(value: impl Into<String>) -> Self {
        Node::Text {
            value: value.into(),
        }
    }

    pub fn element(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Node::Element(Element::new(tag, children))
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Node::Text { value } => Some(value),
            _ => None,
        }
    }

    /// Nodes the substitution walker must copy without looking inside.
    pub fn is_opaque(&self) -> bool {
        match self {
            Node::Math(_) | Node::MathError(_) | Node::Code(_) => true,
            Node::Element(element) => element.is_rendered_math(),
            Node::Text { .. } | Node::Table(_) => false,
        }
    }

    /// Whether this node is the leftover of a failed math render.
    pub fn is_error_artifact(&self) -> bool {
        match self {
            Node::MathError(_) => true,
            Node::Element(element) => element.is_error_artifact(),
            _ => false,
        }
    }

    /// Concatenated text of every string leaf, in document order.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match self {
            Node::Text { value } => out.push_str(value),
            Node::Element(element) => {
                for child in &element.children {
                    child.collect_text(out);
                }
            }
            Node::Table(table) => {
                for cell in table.cells() {
                    for child in &cell.children {
                        child.collect_text(out);
                    }
                }
            }
            Node::Code(code) => out.push_str(&code.content),
            Node::Math(_) | Node::MathError(_) => {}
        }
    }
}

/// A generic tagged element with attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(tag: impl Into<String>, children: Vec<Node>) -> Self {
        Self {
            tag: tag.into(),
            attributes: BTreeMap::new(),
            children,
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or_default().split_whitespace()
    }

    /// Markup emitted by a math typesetter, ours or a foreign one.
    pub fn is_rendered_math(&self) -> bool {
        self.attributes.contains_key(MATH_ATTR)
            || self.classes().any(|class| MATH_CLASS_MARKERS.contains(&class))
    }

    /// Error markup emitted by a math typesetter.
    pub fn is_error_artifact(&self) -> bool {
        self.attributes.contains_key(MATH_ERROR_ATTR)
            || self.classes().any(|class| ERROR_CLASS_MARKERS.contains(&class))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MathDisplay {
    Inline,
    Block,
}

impl MathDisplay {
    pub fn as_str(self) -> &'static str {
        match self {
            MathDisplay::Inline => "inline",
            MathDisplay::Block => "block",
        }
    }
}

/// Successfully typeset math. Always a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathNode {
    pub display: MathDisplay,
    /// The expression without delimiters.
    pub source: String,
    /// Markup produced by the math renderer.
    pub markup: String,
}

/// Placeholder for an expression that failed to render. Always a leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathError {
    pub display: MathDisplay,
    pub source: String,
    pub message: String,
}

/// A table synthesized from a `table` fence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    pub head: Vec<TableCell>,
    pub rows: Vec<Vec<TableCell>>,
}

impl Table {
    pub fn cells(&self) -> impl Iterator<Item = &TableCell> {
        self.head.iter().chain(self.rows.iter().flatten())
    }

    /// Rebuilds the table with every cell's children passed through `f`.
    pub fn map_cells(&self, mut f: impl FnMut(&[Node]) -> Vec<Node>) -> Table {
        let head = self
            .head
            .iter()
            .map(|cell| TableCell {
                children: f(&cell.children),
            })
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| TableCell {
                        children: f(&cell.children),
                    })
                    .collect()
            })
            .collect();
        Table { head, rows }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCell {
    pub children: Vec<Node>,
}

/// Code, either a highlighted block or a plain `<code>` span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    /// Present only for fenced blocks with a language annotation; those are
    /// highlighted. Everything else renders as plain inline code.
    pub language: Option<String>,
    pub content: String,
}
