//! Removes failed-math artifacts from a node tree.
//!
//! This is the second line of defense after [`SafeMathRenderer`]: trees can
//! come from elsewhere (deserialized JSON, a foreign typesetter's output) and
//! carry `katex-error` style markup. The input is never touched; a cleaned
//! copy is rebuilt bottom-up.
//!
//! [`SafeMathRenderer`]: crate::math::SafeMathRenderer

use crate::node::{Element, Node};

/// Rebuilds `node` without error artifacts. `None` in, or an artifact at the
/// root, gives `None`.
pub fn scrub(node: Option<&Node>) -> Option<Node> {
    let node = node?;
    if node.is_error_artifact() {
        return None;
    }
    Some(match node {
        Node::Element(element) => Node::Element(Element {
            tag: element.tag.clone(),
            attributes: element.attributes.clone(),
            children: scrub_nodes(&element.children),
        }),
        Node::Table(table) => Node::Table(table.map_cells(scrub_nodes)),
        Node::Text { .. } | Node::Math(_) | Node::MathError(_) | Node::Code(_) => node.clone(),
    })
}

/// [`scrub`] over a node list.
pub fn scrub_nodes(nodes: &[Node]) -> Vec<Node> {
    nodes.iter().filter_map(|node| scrub(Some(node))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{MathDisplay, MathError, MathNode, Table, TableCell};
    use pretty_assertions::assert_eq;

    fn error() -> Node {
        Node::MathError(MathError {
            display: MathDisplay::Inline,
            source: r"\frac{".into(),
            message: "unclosed group".into(),
        })
    }

    #[test]
    fn absent_input_gives_nothing() {
        assert_eq!(scrub(None), None);
        assert_eq!(scrub(Some(&error())), None);
    }

    #[test]
    fn removes_nested_artifacts_and_keeps_the_rest() {
        let katex_error = Node::Element(
            Element::new("span", vec![Node::text("\\frac{")]).with_attr("class", "katex-error"),
        );
        let good = Node::Math(MathNode {
            display: MathDisplay::Block,
            source: "x".into(),
            markup: "<math/>".into(),
        });
        let tree = Node::element(
            "div",
            vec![
                Node::text("a "),
                Node::element("em", vec![error(), Node::text("b")]),
                katex_error,
                good.clone(),
            ],
        );
        let original = tree.clone();

        assert_eq!(
            scrub(Some(&tree)),
            Some(Node::element(
                "div",
                vec![
                    Node::text("a "),
                    Node::element("em", vec![Node::text("b")]),
                    good,
                ]
            ))
        );
        assert_eq!(tree, original);
    }

    #[test]
    fn table_cells_are_cleaned() {
        let table = Node::Table(Table {
            head: vec![TableCell {
                children: vec![error(), Node::text("h")],
            }],
            rows: vec![vec![TableCell {
                children: vec![error()],
            }]],
        });
        let Some(Node::Table(cleaned)) = scrub(Some(&table)) else {
            panic!("table survives");
        };
        assert_eq!(cleaned.head[0].children, vec![Node::text("h")]);
        assert!(cleaned.rows[0][0].children.is_empty());
    }
}
