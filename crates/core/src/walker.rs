//! Replaces `$…$` / `$$…$$` runs inside string leaves with rendered math.

use crate::math::{MathDiagnostic, MathRenderer, RenderOutcome, SafeMathRenderer};
use crate::node::{Element, Node};
use crate::options::MathOptions;
use crate::tokenize::{TokenKind, contains_math_tokens, normalize, tokenize_normalized};

/// Pre-order, depth-first math substitution over a node list.
///
/// Input trees are borrowed and never modified. Rendered math, failure
/// placeholders and code are copied as-is, so walking the walker's own
/// output changes nothing.
pub struct MathWalker<'a, M> {
    math: &'a SafeMathRenderer<M>,
    options: &'a MathOptions,
}

impl<'a, M: MathRenderer> MathWalker<'a, M> {
    pub fn new(math: &'a SafeMathRenderer<M>, options: &'a MathOptions) -> Self {
        Self { math, options }
    }

    /// Walks `nodes`, appending one diagnostic per failed expression in
    /// document order.
    pub fn walk(&self, nodes: &[Node], diagnostics: &mut Vec<MathDiagnostic>) -> Vec<Node> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            self.walk_node(node, &mut out, diagnostics);
        }
        out
    }

    fn walk_node(&self, node: &Node, out: &mut Vec<Node>, diagnostics: &mut Vec<MathDiagnostic>) {
        if node.is_opaque() {
            out.push(node.clone());
            return;
        }
        match node {
            Node::Text { value } => self.substitute(value, out, diagnostics),
            Node::Element(element) => out.push(Node::Element(Element {
                tag: element.tag.clone(),
                attributes: element.attributes.clone(),
                children: self.walk(&element.children, diagnostics),
            })),
            Node::Table(table) => {
                out.push(Node::Table(table.map_cells(|cell| self.walk(cell, diagnostics))))
            }
            Node::Math(_) | Node::MathError(_) | Node::Code(_) => out.push(node.clone()),
        }
    }

    /// Expands one string leaf into text runs and math nodes.
    pub fn substitute(&self, text: &str, out: &mut Vec<Node>, diagnostics: &mut Vec<MathDiagnostic>) {
        let text = if self.options.strip_chem_macro {
            normalize(text)
        } else {
            text.into()
        };

        if !contains_math_tokens(&text) {
            if !text.is_empty() {
                out.push(Node::text(text.into_owned()));
            }
            return;
        }

        for token in tokenize_normalized(&text) {
            let Some(display) = token.kind.display() else {
                debug_assert_eq!(token.kind, TokenKind::Text);
                out.push(Node::text(token.content));
                continue;
            };
            match self.math.render(&token.content, display) {
                RenderOutcome::Success(node) => out.push(node),
                RenderOutcome::Failure(diagnostic) => {
                    if self.options.preserve_failures {
                        out.push(diagnostic.to_node());
                    }
                    diagnostics.push(diagnostic);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::testing::StubRenderer;
    use crate::node::{MathDisplay, MathNode};
    use pretty_assertions::assert_eq;

    fn math(display: MathDisplay, source: &str) -> Node {
        Node::Math(MathNode {
            display,
            source: source.into(),
            markup: format!("<math display=\"{}\">{source}</math>", display.as_str()),
        })
    }

    fn walk(nodes: &[Node]) -> (Vec<Node>, Vec<MathDiagnostic>) {
        let safe = SafeMathRenderer::new(StubRenderer::default());
        let options = MathOptions::default();
        let mut diagnostics = Vec::new();
        let out = MathWalker::new(&safe, &options).walk(nodes, &mut diagnostics);
        (out, diagnostics)
    }

    #[test]
    fn substitutes_block_math_between_text_runs() {
        let tree = vec![Node::element("div", vec![Node::text("Energy: $$E=mc^2$$ is famous.")])];
        let (out, diagnostics) = walk(&tree);
        assert_eq!(
            out,
            vec![Node::element(
                "div",
                vec![
                    Node::text("Energy: "),
                    math(MathDisplay::Block, "E=mc^2"),
                    Node::text(" is famous."),
                ]
            )]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn failed_token_is_omitted_and_reported_once() {
        let tree = vec![Node::element("div", vec![Node::text(r"before $\frac{1$ after")])];
        let (out, diagnostics) = walk(&tree);
        assert_eq!(
            out,
            vec![Node::element("div", vec![Node::text("before "), Node::text(" after")])]
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].source, r"\frac{1");
    }

    #[test]
    fn preserve_failures_keeps_placeholder() {
        let safe = SafeMathRenderer::new(StubRenderer::default());
        let options = MathOptions {
            preserve_failures: true,
            ..MathOptions::default()
        };
        let mut diagnostics = Vec::new();
        let out = MathWalker::new(&safe, &options).walk(&[Node::text(r"$\bad$")], &mut diagnostics);
        assert_eq!(out, vec![diagnostics[0].to_node()]);
    }

    #[test]
    fn walking_twice_equals_walking_once() {
        let tree = vec![
            Node::element(
                "div",
                vec![
                    Node::text("$x$ and $y$, costs $5, $\\bad$ and $$\n\\sum\n$$"),
                    Node::element("em", vec![Node::text("$z$")]),
                ],
            ),
            Node::text(r"\ce{H2O} is $\ce{H2O}$"),
        ];
        let (once, _) = walk(&tree);
        let (twice, diagnostics) = walk(&once);
        assert_eq!(twice, once);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn opaque_nodes_are_not_reentered() {
        let katex = Node::Element(
            Element::new("span", vec![Node::text("$not math$")]).with_attr("class", "katex"),
        );
        let code = Node::Code(crate::node::CodeBlock {
            language: None,
            content: "$x$".into(),
        });
        let tree = vec![katex.clone(), code.clone()];
        let safe = SafeMathRenderer::new(StubRenderer::default());
        let options = MathOptions::default();
        let mut diagnostics = Vec::new();
        let out = MathWalker::new(&safe, &options).walk(&tree, &mut diagnostics);
        assert_eq!(out, vec![katex, code]);
        assert_eq!(safe.inner().calls.get(), 0);
    }

    #[test]
    fn emptied_elements_are_preserved() {
        let (out, diagnostics) = walk(&[Node::element("strong", vec![Node::text(r"$\bad$")])]);
        assert_eq!(out, vec![Node::element("strong", vec![])]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn table_cells_are_walked() {
        let table = crate::table::build_table(
            "A,$x$",
            &Default::default(),
            &crate::tree_builder::TagRewrites::default(),
        )
        .expect("table");
        let (out, _) = walk(&[table]);
        let Node::Table(table) = &out[0] else {
            panic!("expected table");
        };
        assert_eq!(
            table.head[1].children,
            vec![Node::element(
                "th",
                vec![Node::element("div", vec![math(MathDisplay::Inline, "x")])]
            )]
        );
    }

    #[test]
    fn dollar_runs_still_reach_the_tokenizer() {
        let (out, diagnostics) = walk(&[Node::text("a $$$$$ b")]);
        assert_eq!(
            out,
            vec![Node::text("a "), math(MathDisplay::Block, "$"), Node::text(" b")]
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn chem_macro_normalization_can_be_disabled() {
        let safe = SafeMathRenderer::new(StubRenderer::default());
        let options = MathOptions {
            strip_chem_macro: false,
            ..MathOptions::default()
        };
        let mut diagnostics = Vec::new();
        let out = MathWalker::new(&safe, &options).walk(&[Node::text(r"$\ce{O2}$")], &mut diagnostics);
        assert_eq!(out, vec![math(MathDisplay::Inline, r"\ce{O2}")]);
    }
}
