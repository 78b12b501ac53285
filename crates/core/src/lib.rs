//! Math-aware markdown rendering for generated course lessons.
//!
//! Lesson text mixes markdown, `$…$` / `$$…$$` math and fenced `table`
//! blocks. [`Renderer::render`] turns it into a [`Node`] tree in which every
//! math run is typeset and every failed expression is gone, and
//! [`Renderer::render_html`] writes that tree out as HTML.
//!
//! ```
//! let document = lessonmark_core::render("Energy: $$E=mc^2$$ is famous.");
//! assert!(document.diagnostics.is_empty());
//! assert!(!document.has_unparsed_math());
//! ```

pub mod error;
pub mod event;
pub mod highlight;
pub mod html_renderer;
#[cfg(feature = "markdown-rs")]
pub mod markdown_adapter;
pub mod math;
pub mod node;
pub mod options;
pub mod scrub;
pub mod segment;
pub mod streaming_rewriter;
pub mod table;
pub mod tokenize;
pub mod tree_builder;
pub mod walker;

use std::io::{self, Write};

use lol_html::errors::RewritingError;
use serde::Serialize;

pub use error::{Error, MathRenderError};
pub use highlight::{PlainHighlighter, SyntaxHighlighter};
#[cfg(feature = "syntect")]
pub use highlight::SyntectHighlighter;
pub use html_renderer::{HtmlRenderer, to_html};
pub use math::{LatexRenderer, MathDiagnostic, MathRenderer, RenderOutcome, SafeMathRenderer};
pub use node::{CodeBlock, Element, MathDisplay, MathError, MathNode, Node, Table, TableCell};
pub use options::{MarkdownOptions, MathOptions, Options, ParserBackend, TableOptions};
pub use scrub::{scrub, scrub_nodes};
pub use segment::{Segment, SegmentKind, split_segments};
pub use streaming_rewriter::{RewriteOptions, StreamingRewriter};
pub use tokenize::{Token, TokenKind, contains_unparsed_math, tokenize};
pub use tree_builder::TagRewrites;
pub use walker::MathWalker;

/// The result of rendering one content unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    pub nodes: Vec<Node>,
    /// One entry per math expression that failed to render, in document order.
    pub diagnostics: Vec<MathDiagnostic>,
}

impl Document {
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string(self)?)
    }

    /// Whether any text leaf outside math and code still looks like
    /// delimited math.
    pub fn has_unparsed_math(&self) -> bool {
        self.nodes.iter().any(node_has_unparsed_math)
    }
}

fn node_has_unparsed_math(node: &Node) -> bool {
    if node.is_opaque() {
        return false;
    }
    match node {
        Node::Text { value } => contains_unparsed_math(value),
        Node::Element(element) => element.children.iter().any(node_has_unparsed_math),
        Node::Table(table) => table
            .cells()
            .any(|cell| cell.children.iter().any(node_has_unparsed_math)),
        Node::Math(_) | Node::MathError(_) | Node::Code(_) => false,
    }
}

/// Runs the full pipeline: segmentation, markdown parsing, math substitution
/// and error scrubbing.
///
/// A renderer holds no per-document state, so one instance can serve any
/// number of [`render`](Self::render) calls.
pub struct Renderer<M = LatexRenderer> {
    options: Options,
    rewrites: TagRewrites,
    math: SafeMathRenderer<M>,
    highlighter: Box<dyn SyntaxHighlighter>,
}

impl Renderer<LatexRenderer> {
    pub fn new(options: Options) -> Self {
        Self::with_math_renderer(options, LatexRenderer)
    }
}

impl Default for Renderer<LatexRenderer> {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl<M: MathRenderer> Renderer<M> {
    /// Uses `math` instead of the built-in MathML renderer.
    pub fn with_math_renderer(options: Options, math: M) -> Self {
        Self {
            options,
            rewrites: TagRewrites::default(),
            math: SafeMathRenderer::new(math),
            highlighter: Box::new(PlainHighlighter),
        }
    }

    /// Replaces the code highlighter used by the HTML entry points.
    pub fn with_highlighter(mut self, highlighter: impl SyntaxHighlighter + 'static) -> Self {
        self.highlighter = Box::new(highlighter);
        self
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Renders a lesson body. Bad content degrades to omitted fragments; this
    /// never fails.
    #[tracing::instrument(skip_all, fields(len = input.len()))]
    pub fn render(&self, input: &str) -> Document {
        let segments = split_segments(input, &self.options.tables);
        tracing::debug!(segments = segments.len(), "split input");

        let mut nodes = Vec::new();
        for segment in &segments {
            match segment.kind {
                SegmentKind::Prose => nodes.extend(tree_builder::build_prose(
                    &segment.content,
                    &self.options.markdown,
                    &self.rewrites,
                )),
                SegmentKind::Table => {
                    match table::build_table(&segment.content, &self.options.markdown, &self.rewrites) {
                        Some(table) => nodes.push(table),
                        None => tracing::debug!("skipped empty table block"),
                    }
                }
            }
        }

        self.substitute(&nodes)
    }

    /// Renders a bare string (a quiz question or answer) without markdown
    /// parsing. Only math is substituted.
    pub fn render_fragment(&self, input: &str) -> Document {
        self.substitute(&[Node::text(input)])
    }

    pub fn render_html(&self, input: &str) -> Result<String, Error> {
        let bytes = self.render_to_writer(input, Vec::new())?;
        String::from_utf8(bytes).map_err(|err| Error::Io(io::Error::new(io::ErrorKind::InvalidData, err)))
    }

    /// Streams the rendered document through the HTML rewriter into `writer`.
    pub fn render_to_writer<W: Write>(&self, input: &str, writer: W) -> Result<W, Error> {
        let document = self.render(input);
        let mut rewriter = StreamingRewriter::new(writer, self.rewrite_options());
        HtmlRenderer::with_highlighter(&mut rewriter, self.highlighter.as_ref())
            .render(&document.nodes)
            .map_err(output_error)?;
        rewriter.into_inner().map_err(output_error)
    }

    fn substitute(&self, nodes: &[Node]) -> Document {
        let mut diagnostics = Vec::new();
        let walked = MathWalker::new(&self.math, &self.options.math).walk(nodes, &mut diagnostics);
        let nodes = if self.options.math.preserve_failures {
            walked
        } else {
            scrub_nodes(&walked)
        };
        if !diagnostics.is_empty() {
            tracing::debug!(failed = diagnostics.len(), "math expressions dropped");
        }
        Document { nodes, diagnostics }
    }

    fn rewrite_options(&self) -> RewriteOptions {
        let mut output = self.options.output;
        if self.options.math.preserve_failures {
            output.scrub_error_markup = false;
        }
        output
    }
}

fn output_error(err: io::Error) -> Error {
    if err.get_ref().is_some_and(|inner| inner.is::<RewritingError>()) {
        Error::Rewrite(err.to_string())
    } else {
        Error::Io(err)
    }
}

/// [`Renderer::render`] with default options.
pub fn render(input: &str) -> Document {
    Renderer::default().render(input)
}

/// [`Renderer::render_fragment`] with default options.
pub fn render_fragment(input: &str) -> Document {
    Renderer::default().render_fragment(input)
}

/// [`Renderer::render_html`] with default options.
pub fn render_html(input: &str) -> Result<String, Error> {
    Renderer::default().render_html(input)
}

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
