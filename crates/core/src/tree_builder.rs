//! Builds `Node` trees from markdown prose.
//!
//! The markdown backend is lowered to [`Event`]s first; [`TreeBuilder`] then
//! folds those events into nodes, applying the [`TagRewrites`] registry.

use pulldown_cmark::{CodeBlockKind, Event as CmarkEvent, Options as CmarkOptions, Parser, Tag as CmarkTag};

use crate::event::{Event, HeadingLevel, Tag, code_language};
use crate::node::{CodeBlock, Element, Node};
use crate::options::{MarkdownOptions, ParserBackend};

/// How one markdown construct is turned into an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rewrite {
    pub tag: &'static str,
    pub class: Option<&'static str>,
    /// Wraps all children in one extra element of this tag.
    pub wrap_children: Option<&'static str>,
}

impl Rewrite {
    pub const fn plain(tag: &'static str) -> Self {
        Self {
            tag,
            class: None,
            wrap_children: None,
        }
    }

    pub const fn wrapped(tag: &'static str, wrapper: &'static str) -> Self {
        Self {
            tag,
            class: None,
            wrap_children: Some(wrapper),
        }
    }

    pub fn apply(&self, children: Vec<Node>) -> Element {
        let children = match self.wrap_children {
            Some(wrapper) => vec![Node::element(wrapper, children)],
            None => children,
        };
        let element = Element::new(self.tag, children);
        match self.class {
            Some(class) => element.with_attr("class", class),
            None => element,
        }
    }
}

/// The fixed rewrite registry for lesson content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRewrites {
    /// Levels 1 through 4; deeper headings keep their own tag.
    pub headings: [Rewrite; 4],
    pub emphasis: Rewrite,
    pub strong: Rewrite,
    pub list_item: Rewrite,
    pub table_header_cell: Rewrite,
    pub table_cell: Rewrite,
    /// Paragraphs become block containers so block math can nest inside.
    pub paragraph: Rewrite,
}

impl Default for TagRewrites {
    fn default() -> Self {
        Self {
            headings: [
                Rewrite::plain("h1"),
                Rewrite::plain("h2"),
                Rewrite::plain("h3"),
                Rewrite::plain("h4"),
            ],
            emphasis: Rewrite::plain("em"),
            strong: Rewrite::plain("strong"),
            list_item: Rewrite::wrapped("li", "div"),
            table_header_cell: Rewrite::wrapped("th", "div"),
            table_cell: Rewrite::wrapped("td", "div"),
            paragraph: Rewrite::plain("div"),
        }
    }
}

impl TagRewrites {
    fn heading(&self, level: HeadingLevel) -> Rewrite {
        let index = level as usize - 1;
        self.headings
            .get(index)
            .copied()
            .unwrap_or(Rewrite::plain(level.tag_name()))
    }

    /// Code rule: a language annotation asks for highlighting, anything else
    /// is plain inline code.
    pub fn code_block(&self, language: Option<String>, mut content: String) -> Node {
        if content.ends_with('\n') {
            content.pop();
        }
        Node::Code(CodeBlock { language, content })
    }
}

struct Frame {
    tag: Tag,
    children: Vec<Node>,
}

/// Folds a well-nested [`Event`] stream into a node list.
///
/// Unbalanced streams are tolerated: stray `End`s are ignored and frames
/// still open at [`finish`](Self::finish) are closed in order.
pub struct TreeBuilder<'r> {
    rewrites: &'r TagRewrites,
    stack: Vec<Frame>,
    root: Vec<Node>,
}

impl<'r> TreeBuilder<'r> {
    pub fn new(rewrites: &'r TagRewrites) -> Self {
        Self {
            rewrites,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    pub fn push(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.stack.push(Frame {
                tag,
                children: Vec::new(),
            }),
            Event::End => self.close(),
            Event::Text(text) | Event::Html(text) => self.append_text(&text),
            Event::SoftBreak => self.append_text("\n"),
            Event::Code(code) => self.append(Node::Code(CodeBlock {
                language: None,
                content: code,
            })),
            Event::FootnoteReference(label) => {
                let link = Element::new("a", vec![Node::text(label.clone())])
                    .with_attr("href", format!("#fn-{label}"));
                let sup = Element::new("sup", vec![Node::Element(link)])
                    .with_attr("class", "footnote-ref");
                self.append(Node::Element(sup));
            }
            Event::TaskListMarker(checked) => {
                let mut input = Element::new("input", Vec::new())
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked {
                    input = input.with_attr("checked", "");
                }
                self.append(Node::Element(input));
            }
            Event::Rule => self.append(Node::element("hr", Vec::new())),
            Event::HardBreak => self.append(Node::element("br", Vec::new())),
        }
    }

    pub fn finish(mut self) -> Vec<Node> {
        while !self.stack.is_empty() {
            self.close();
        }
        self.root
    }

    fn children(&mut self) -> &mut Vec<Node> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn append_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let children = self.children();
        if let Some(Node::Text { value }) = children.last_mut() {
            value.push_str(text);
        } else {
            children.push(Node::text(text));
        }
    }

    fn append(&mut self, node: Node) {
        match node {
            Node::Text { value } => self.append_text(&value),
            node => self.children().push(node),
        }
    }

    fn close(&mut self) {
        let Some(Frame { tag, children }) = self.stack.pop() else {
            return;
        };
        let rewrites = self.rewrites;
        let node = match tag {
            Tag::Paragraph => Node::Element(rewrites.paragraph.apply(children)),
            Tag::Heading(level) => Node::Element(rewrites.heading(level).apply(children)),
            Tag::Emphasis => Node::Element(rewrites.emphasis.apply(children)),
            Tag::Strong => Node::Element(rewrites.strong.apply(children)),
            Tag::Item => Node::Element(rewrites.list_item.apply(children)),
            Tag::Strikethrough => Node::element("del", children),
            Tag::BlockQuote => Node::element("blockquote", children),
            Tag::CodeBlock(language) => rewrites.code_block(language, plain_text(&children)),
            Tag::List(Some(start)) => Node::Element(
                Element::new("ol", children).with_attr("start", start.to_string()),
            ),
            Tag::List(None) => Node::element("ul", children),
            Tag::FootnoteDefinition(label) => Node::Element(
                Element::new("section", children)
                    .with_attr("class", "footnote")
                    .with_attr("id", format!("fn-{label}")),
            ),
            Tag::Link { dest_url, title } => {
                let mut link = Element::new("a", children).with_attr("href", dest_url);
                if !title.is_empty() {
                    link = link.with_attr("title", title);
                }
                Node::Element(link)
            }
            Tag::Image { dest_url, title } => {
                let mut image = Element::new("img", Vec::new())
                    .with_attr("src", dest_url)
                    .with_attr("alt", plain_text(&children));
                if !title.is_empty() {
                    image = image.with_attr("title", title);
                }
                Node::Element(image)
            }
            Tag::Other => {
                for child in children {
                    self.append(child);
                }
                return;
            }
        };
        self.append(node);
    }
}

fn plain_text(children: &[Node]) -> String {
    children.iter().map(Node::plain_text).collect()
}

/// Folds `events` into a node list using `rewrites`.
pub fn build_tree(events: impl IntoIterator<Item = Event>, rewrites: &TagRewrites) -> Vec<Node> {
    let mut builder = TreeBuilder::new(rewrites);
    for event in events {
        builder.push(event);
    }
    builder.finish()
}

/// Parses one prose segment with the configured backend.
pub fn build_prose(content: &str, options: &MarkdownOptions, rewrites: &TagRewrites) -> Vec<Node> {
    match options.backend {
        ParserBackend::PulldownCmark => build_tree(cmark_events(content, options), rewrites),
        #[cfg(feature = "markdown-rs")]
        ParserBackend::MarkdownRs => match crate::markdown_adapter::MarkdownRsEventIter::new(content, options) {
            Ok(events) => build_tree(events, rewrites),
            Err(err) => {
                tracing::warn!(error = %err, "markdown-rs rejected segment, falling back to pulldown-cmark");
                build_tree(cmark_events(content, options), rewrites)
            }
        },
    }
}

/// Math parsing is always on so LaTeX reaches the tokenizer without
/// backslash-escape processing.
fn cmark_options(options: &MarkdownOptions) -> CmarkOptions {
    let mut cmark = CmarkOptions::ENABLE_MATH;
    if options.strikethrough {
        cmark.insert(CmarkOptions::ENABLE_STRIKETHROUGH);
    }
    if options.tasklists {
        cmark.insert(CmarkOptions::ENABLE_TASKLISTS);
    }
    if options.footnotes {
        cmark.insert(CmarkOptions::ENABLE_FOOTNOTES);
    }
    if options.smart_punctuation {
        cmark.insert(CmarkOptions::ENABLE_SMART_PUNCTUATION);
    }
    cmark
}

/// Lowers pulldown-cmark output to the neutral event vocabulary.
pub fn cmark_events<'a>(content: &'a str, options: &MarkdownOptions) -> impl Iterator<Item = Event> + 'a {
    Parser::new_ext(content, cmark_options(options)).map(lower_cmark_event)
}

fn lower_cmark_event(event: CmarkEvent<'_>) -> Event {
    match event {
        CmarkEvent::Start(tag) => Event::Start(lower_cmark_tag(tag)),
        CmarkEvent::End(_) => Event::End,
        CmarkEvent::Text(text) => Event::Text(text.into_string()),
        CmarkEvent::Code(code) => Event::Code(code.into_string()),
        // Hand math back with its delimiters; the walker owns tokenization.
        CmarkEvent::InlineMath(math) => Event::Text(format!("${math}$")),
        CmarkEvent::DisplayMath(math) => Event::Text(format!("$${math}$$")),
        CmarkEvent::Html(html) | CmarkEvent::InlineHtml(html) => Event::Html(html.into_string()),
        CmarkEvent::FootnoteReference(label) => Event::FootnoteReference(label.into_string()),
        CmarkEvent::SoftBreak => Event::SoftBreak,
        CmarkEvent::HardBreak => Event::HardBreak,
        CmarkEvent::Rule => Event::Rule,
        CmarkEvent::TaskListMarker(checked) => Event::TaskListMarker(checked),
    }
}

fn lower_cmark_tag(tag: CmarkTag<'_>) -> Tag {
    match tag {
        CmarkTag::Paragraph => Tag::Paragraph,
        CmarkTag::Heading { level, .. } => {
            Tag::Heading(HeadingLevel::try_from(level as usize).unwrap_or(HeadingLevel::H6))
        }
        CmarkTag::BlockQuote(_) => Tag::BlockQuote,
        CmarkTag::CodeBlock(CodeBlockKind::Fenced(info)) => Tag::CodeBlock(code_language(&info)),
        CmarkTag::CodeBlock(CodeBlockKind::Indented) => Tag::CodeBlock(None),
        CmarkTag::List(start) => Tag::List(start),
        CmarkTag::Item => Tag::Item,
        CmarkTag::FootnoteDefinition(label) => Tag::FootnoteDefinition(label.into_string()),
        CmarkTag::Emphasis => Tag::Emphasis,
        CmarkTag::Strong => Tag::Strong,
        CmarkTag::Strikethrough => Tag::Strikethrough,
        CmarkTag::Link {
            dest_url, title, ..
        } => Tag::Link {
            dest_url: dest_url.into_string(),
            title: title.into_string(),
        },
        CmarkTag::Image {
            dest_url, title, ..
        } => Tag::Image {
            dest_url: dest_url.into_string(),
            title: title.into_string(),
        },
        _ => Tag::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(content: &str) -> Vec<Node> {
        build_prose(content, &MarkdownOptions::default(), &TagRewrites::default())
    }

    #[test]
    fn paragraphs_become_divs_with_merged_text() {
        assert_eq!(
            parse("Energy: $$E=mc^2$$ is [famous]."),
            vec![Node::element("div", vec![Node::text("Energy: $$E=mc^2$$ is [famous].")])]
        );
    }

    #[test]
    fn soft_breaks_stay_inside_one_text_run() {
        assert_eq!(
            parse("before\n$$\nx\n$$\nafter"),
            vec![Node::element("div", vec![Node::text("before\n$$\nx\n$$\nafter")])]
        );
    }

    #[test]
    fn headings_and_inline_formatting() {
        assert_eq!(
            parse("## Title *a* **b**"),
            vec![Node::element(
                "h2",
                vec![
                    Node::text("Title "),
                    Node::element("em", vec![Node::text("a")]),
                    Node::text(" "),
                    Node::element("strong", vec![Node::text("b")]),
                ]
            )]
        );
        assert_eq!(parse("###### deep"), vec![Node::element("h6", vec![Node::text("deep")])]);
    }

    #[test]
    fn list_items_wrap_content_in_div() {
        assert_eq!(
            parse("- one\n- two"),
            vec![Node::element(
                "ul",
                vec![
                    Node::element("li", vec![Node::element("div", vec![Node::text("one")])]),
                    Node::element("li", vec![Node::element("div", vec![Node::text("two")])]),
                ]
            )]
        );
    }

    #[test]
    fn code_rule_distinguishes_language() {
        assert_eq!(
            parse("```python\nprint(1)\n```"),
            vec![Node::Code(CodeBlock {
                language: Some("python".into()),
                content: "print(1)".into(),
            })]
        );
        assert_eq!(
            parse("```\nplain\n```"),
            vec![Node::Code(CodeBlock {
                language: None,
                content: "plain".into(),
            })]
        );
        assert_eq!(
            parse("use `x`"),
            vec![Node::element(
                "div",
                vec![
                    Node::text("use "),
                    Node::Code(CodeBlock {
                        language: None,
                        content: "x".into(),
                    }),
                ]
            )]
        );
    }

    #[test]
    fn latex_escapes_survive_markdown() {
        assert_eq!(
            parse(r"Set $\{a\,b\}$ here"),
            vec![Node::element("div", vec![Node::text(r"Set $\{a\,b\}$ here")])]
        );
        assert_eq!(
            parse(r"$$\begin{matrix}a \\ b\end{matrix}$$ and $a*b*c\;\_x$"),
            vec![Node::element(
                "div",
                vec![Node::text(r"$$\begin{matrix}a \\ b\end{matrix}$$ and $a*b*c\;\_x$")]
            )]
        );
    }

    #[test]
    fn escapes_outside_math_still_apply() {
        assert_eq!(
            parse(r"\*not emphasis\* costs \$5"),
            vec![Node::element("div", vec![Node::text("*not emphasis* costs $5")])]
        );
    }

    #[test]
    fn raw_html_is_kept_as_text() {
        assert_eq!(
            parse("a <b>bold</b>"),
            vec![Node::element("div", vec![Node::text("a <b>bold</b>")])]
        );
    }

    #[test]
    fn links_and_images_carry_attributes() {
        let nodes = parse("[site](https://a.example \"T\") ![alt *x*](/i.png)");
        let Node::Element(div) = &nodes[0] else {
            panic!("expected paragraph div");
        };
        let Node::Element(link) = &div.children[0] else {
            panic!("expected link");
        };
        assert_eq!(link.attr("href"), Some("https://a.example"));
        assert_eq!(link.attr("title"), Some("T"));
        let Node::Element(image) = &div.children[2] else {
            panic!("expected image");
        };
        assert_eq!(image.tag, "img");
        assert_eq!(image.attr("alt"), Some("alt x"));
        assert!(image.children.is_empty());
    }

    #[test]
    fn markdown_tables_are_not_parsed() {
        let nodes = parse("a | b\n--|--\n1 | 2");
        assert!(nodes.iter().all(|node| !matches!(node, Node::Table(_))));
        assert_eq!(nodes.len(), 1);
    }

    #[test]
    fn unbalanced_event_streams_are_tolerated() {
        let rewrites = TagRewrites::default();
        let nodes = build_tree(
            vec![
                Event::End,
                Event::Start(Tag::Strong),
                Event::Text("x".into()),
                Event::Start(Tag::Other),
                Event::Text("y".into()),
            ],
            &rewrites,
        );
        assert_eq!(nodes, vec![Node::element("strong", vec![Node::text("xy")])]);
    }
}
