use std::io::{self, Write};

use crate::highlight::{PlainHighlighter, SyntaxHighlighter};
use crate::node::{CodeBlock, Element, MATH_ATTR, MATH_ERROR_ATTR, MathDisplay, MathError, MathNode, Node, Table, TableCell};

const VOID_ELEMENTS: [&str; 4] = ["br", "hr", "img", "input"];

/// Writes a node tree as HTML.
///
/// Text and attributes are escaped. Math markup comes from the math renderer
/// and is written verbatim; code blocks with a language go through the
/// configured [`SyntaxHighlighter`].
pub struct HtmlRenderer<'h, W: Write> {
    writer: W,
    highlighter: &'h dyn SyntaxHighlighter,
}

impl<W: Write> HtmlRenderer<'static, W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            highlighter: &PlainHighlighter,
        }
    }
}

impl<'h, W: Write> HtmlRenderer<'h, W> {
    pub fn with_highlighter(writer: W, highlighter: &'h dyn SyntaxHighlighter) -> Self {
        Self {
            writer,
            highlighter,
        }
    }

    pub fn render(mut self, nodes: &[Node]) -> io::Result<W> {
        self.write_nodes(nodes)?;
        Ok(self.writer)
    }

    fn write_nodes(&mut self, nodes: &[Node]) -> io::Result<()> {
        for node in nodes {
            self.write_node(node)?;
        }
        Ok(())
    }

    fn write_node(&mut self, node: &Node) -> io::Result<()> {
        match node {
            Node::Text { value } => self.escape_html(value),
            Node::Element(element) => self.write_element(element),
            Node::Math(math) => self.write_math(math),
            Node::MathError(error) => self.write_math_error(error),
            Node::Table(table) => self.write_table(table),
            Node::Code(code) => self.write_code(code),
        }
    }

    fn write_element(&mut self, element: &Element) -> io::Result<()> {
        write!(self.writer, "<{}", element.tag)?;
        for (key, value) in &element.attributes {
            self.write_attr(key, value)?;
        }
        if VOID_ELEMENTS.contains(&element.tag.as_str()) {
            return self.writer.write_all(b" />");
        }
        self.writer.write_all(b">")?;
        self.write_nodes(&element.children)?;
        write!(self.writer, "</{}>", element.tag)
    }

    fn write_math(&mut self, math: &MathNode) -> io::Result<()> {
        let (tag, class) = match math.display {
            MathDisplay::Inline => ("span", "math math-inline"),
            MathDisplay::Block => ("div", "math math-display"),
        };
        write!(self.writer, "<{tag} class=\"{class}\"")?;
        self.write_attr(MATH_ATTR, math.display.as_str())?;
        self.writer.write_all(b">")?;
        self.writer.write_all(math.markup.as_bytes())?;
        write!(self.writer, "</{tag}>")
    }

    fn write_math_error(&mut self, error: &MathError) -> io::Result<()> {
        self.writer.write_all(b"<span class=\"math-error\"")?;
        self.write_attr(MATH_ERROR_ATTR, error.display.as_str())?;
        self.write_attr("title", &error.message)?;
        self.writer.write_all(b"><code>")?;
        self.escape_html(&error.source)?;
        self.writer.write_all(b"</code></span>")
    }

    fn write_table(&mut self, table: &Table) -> io::Result<()> {
        self.writer.write_all(
            b"<div class=\"table-block\"><div class=\"table-container\"><table class=\"styled-table\">",
        )?;
        if !table.head.is_empty() {
            self.writer.write_all(b"<thead><tr>")?;
            self.write_cells(&table.head)?;
            self.writer.write_all(b"</tr></thead>")?;
        }
        if !table.rows.is_empty() {
            self.writer.write_all(b"<tbody>")?;
            for row in &table.rows {
                self.writer.write_all(b"<tr>")?;
                self.write_cells(row)?;
                self.writer.write_all(b"</tr>")?;
            }
            self.writer.write_all(b"</tbody>")?;
        }
        self.writer.write_all(b"</table></div></div>\n")
    }

    fn write_cells(&mut self, cells: &[TableCell]) -> io::Result<()> {
        for cell in cells {
            self.write_nodes(&cell.children)?;
        }
        Ok(())
    }

    fn write_code(&mut self, code: &CodeBlock) -> io::Result<()> {
        match &code.language {
            Some(language) => {
                let html = self.highlighter.highlight(language, &code.content);
                self.writer.write_all(html.as_bytes())
            }
            None => {
                self.writer.write_all(b"<code>")?;
                self.escape_html(&code.content)?;
                self.writer.write_all(b"</code>")
            }
        }
    }

    fn escape_html(&mut self, text: &str) -> io::Result<()> {
        for ch in text.chars() {
            match ch {
                '&' => self.writer.write_all(b"&amp;")?,
                '<' => self.writer.write_all(b"&lt;")?,
                '>' => self.writer.write_all(b"&gt;")?,
                '"' => self.writer.write_all(b"&quot;")?,
                '\'' => self.writer.write_all(b"&#39;")?,
                _ => self
                    .writer
                    .write_all(ch.encode_utf8(&mut [0; 4]).as_bytes())?,
            }
        }
        Ok(())
    }

    fn write_attr(&mut self, key: &str, value: &str) -> io::Result<()> {
        write!(self.writer, " {}=\"", key)?;
        self.escape_html(value)?;
        self.writer.write_all(b"\"")
    }
}

/// Renders `nodes` into a fresh `String` with the plain highlighter.
pub fn to_html(nodes: &[Node]) -> String {
    let bytes = HtmlRenderer::new(Vec::new())
        .render(nodes)
        .unwrap_or_default();
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_elements_attributes_and_void_tags() {
        let nodes = vec![Node::element(
            "div",
            vec![
                Node::text("a < b & \"c\""),
                Node::Element(Element::new("img", vec![]).with_attr("src", "/x.png").with_attr("alt", "x")),
                Node::element("br", vec![]),
            ],
        )];
        assert_eq!(
            to_html(&nodes),
            "<div>a &lt; b &amp; &quot;c&quot;<img alt=\"x\" src=\"/x.png\" /><br /></div>"
        );
    }

    #[test]
    fn math_markup_is_written_verbatim_in_a_marked_wrapper() {
        let nodes = vec![Node::Math(MathNode {
            display: MathDisplay::Block,
            source: "x".into(),
            markup: "<math><mi>x</mi></math>".into(),
        })];
        assert_eq!(
            to_html(&nodes),
            "<div class=\"math math-display\" data-math=\"block\"><math><mi>x</mi></math></div>"
        );
    }

    #[test]
    fn math_errors_show_escaped_source() {
        let nodes = vec![Node::MathError(MathError {
            display: MathDisplay::Inline,
            source: "a<b".into(),
            message: "bad".into(),
        })];
        assert_eq!(
            to_html(&nodes),
            "<span class=\"math-error\" data-math-error=\"inline\" title=\"bad\"><code>a&lt;b</code></span>"
        );
    }

    #[test]
    fn tables_get_container_markup() {
        let table = Node::Table(Table {
            head: vec![TableCell {
                children: vec![Node::element("th", vec![Node::element("div", vec![Node::text("A")])])],
            }],
            rows: vec![vec![TableCell {
                children: vec![Node::element("td", vec![Node::element("div", vec![Node::text("1")])])],
            }]],
        });
        assert_eq!(
            to_html(&[table]),
            "<div class=\"table-block\"><div class=\"table-container\"><table class=\"styled-table\">\
             <thead><tr><th><div>A</div></th></tr></thead>\
             <tbody><tr><td><div>1</div></td></tr></tbody></table></div></div>\n"
        );
    }

    #[test]
    fn code_without_language_is_inline() {
        let nodes = vec![
            Node::Code(CodeBlock {
                language: None,
                content: "<x>".into(),
            }),
            Node::Code(CodeBlock {
                language: Some("js".into()),
                content: "1 < 2".into(),
            }),
        ];
        assert_eq!(
            to_html(&nodes),
            "<code>&lt;x&gt;</code><pre><code class=\"language-js\">1 &lt; 2</code></pre>"
        );
    }
}
