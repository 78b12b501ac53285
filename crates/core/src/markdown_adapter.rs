#![cfg(feature = "markdown-rs")]
//! Adapter that lowers `markdown-rs` AST nodes to the crate's [`Event`]s.

use std::collections::HashMap;

use markdown::{Constructs, ParseOptions, mdast, message::Message, to_mdast};

use crate::event::{Event, HeadingLevel, Tag, code_language};
use crate::options::MarkdownOptions;

/// Iterator that yields neutral events backed by `markdown-rs`.
///
/// The AST is materialized up front because reference links need their
/// definitions before the first event can be produced.
pub struct MarkdownRsEventIter {
    events: std::vec::IntoIter<Event>,
}

impl MarkdownRsEventIter {
    /// Parses the input with `markdown-rs` and prepares an event stream.
    pub fn new(input: &str, options: &MarkdownOptions) -> Result<Self, Message> {
        let tree = to_mdast(input, &parse_options(options))?;
        let mut builder = EventBuilder::new(input);
        builder.collect_definitions(&tree);
        builder.visit(&tree);
        Ok(Self {
            events: builder.events.into_iter(),
        })
    }
}

impl Iterator for MarkdownRsEventIter {
    type Item = Event;

    fn next(&mut self) -> Option<Self::Item> {
        self.events.next()
    }
}

/// GFM tables stay off: ad-hoc tables are handled before markdown parsing.
/// Math stays on so LaTeX escapes are never processed as markdown.
fn parse_options(options: &MarkdownOptions) -> ParseOptions {
    ParseOptions {
        constructs: Constructs {
            math_text: true,
            math_flow: true,
            gfm_strikethrough: options.strikethrough,
            gfm_task_list_item: options.tasklists,
            gfm_footnote_definition: options.footnotes,
            gfm_label_start_footnote: options.footnotes,
            gfm_table: false,
            ..Constructs::default()
        },
        ..ParseOptions::default()
    }
}

struct Definition {
    url: String,
    title: String,
}

struct EventBuilder<'a> {
    source: &'a str,
    events: Vec<Event>,
    definitions: HashMap<String, Definition>,
    tight_list_depth: usize,
}

impl<'a> EventBuilder<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            events: Vec::new(),
            definitions: HashMap::new(),
            tight_list_depth: 0,
        }
    }

    /// mdast drops the delimiter width; `$$x$$` inside a paragraph is display math.
    fn is_double_dollar(&self, position: Option<&markdown::unist::Position>) -> bool {
        position
            .and_then(|position| self.source.get(position.start.offset..position.end.offset))
            .is_some_and(|raw| raw.starts_with("$$"))
    }

    fn collect_definitions(&mut self, node: &mdast::Node) {
        if let mdast::Node::Definition(definition) = node {
            self.definitions
                .entry(definition.identifier.clone())
                .or_insert_with(|| Definition {
                    url: definition.url.clone(),
                    title: definition.title.clone().unwrap_or_default(),
                });
        }
        if let Some(children) = node.children() {
            for child in children {
                self.collect_definitions(child);
            }
        }
    }

    fn visit(&mut self, node: &mdast::Node) {
        match node {
            mdast::Node::Root(root) => self.visit_children(&root.children),
            mdast::Node::Paragraph(paragraph) => {
                if self.tight_list_depth > 0 {
                    self.visit_children(&paragraph.children);
                } else {
                    self.with_tag(Tag::Paragraph, &paragraph.children)
                }
            }
            mdast::Node::Heading(heading) => {
                let level =
                    HeadingLevel::try_from(heading.depth as usize).unwrap_or(HeadingLevel::H6);
                self.with_tag(Tag::Heading(level), &heading.children)
            }
            mdast::Node::Blockquote(block) => self.with_tag(Tag::BlockQuote, &block.children),
            mdast::Node::List(list) => {
                let start = list.ordered.then(|| u64::from(list.start.unwrap_or(1)));
                self.with_tag(Tag::List(start), &list.children)
            }
            mdast::Node::ListItem(item) => {
                self.events.push(Event::Start(Tag::Item));
                if let Some(checked) = item.checked {
                    self.events.push(Event::TaskListMarker(checked));
                }
                let is_tight = !item.spread;
                if is_tight {
                    self.tight_list_depth += 1;
                }
                self.visit_children(&item.children);
                if is_tight {
                    self.tight_list_depth -= 1;
                }
                self.events.push(Event::End);
            }
            mdast::Node::ThematicBreak(_) => self.events.push(Event::Rule),
            mdast::Node::Code(code) => {
                let language = code.lang.as_deref().and_then(code_language);
                self.events.push(Event::Start(Tag::CodeBlock(language)));
                self.events.push(Event::Text(code.value.clone()));
                self.events.push(Event::End);
            }
            mdast::Node::Text(text) => self.events.push(Event::Text(text.value.clone())),
            mdast::Node::Emphasis(emphasis) => self.with_tag(Tag::Emphasis, &emphasis.children),
            mdast::Node::Strong(strong) => self.with_tag(Tag::Strong, &strong.children),
            mdast::Node::Delete(delete) => self.with_tag(Tag::Strikethrough, &delete.children),
            mdast::Node::InlineCode(code) => self.events.push(Event::Code(code.value.clone())),
            // Hand math back with its delimiters; the walker owns tokenization.
            mdast::Node::InlineMath(math) => {
                let text = if self.is_double_dollar(math.position.as_ref()) {
                    format!("$${}$$", math.value)
                } else {
                    format!("${}$", math.value)
                };
                self.events.push(Event::Text(text))
            }
            mdast::Node::Math(math) => {
                self.events.push(Event::Start(Tag::Paragraph));
                self.events
                    .push(Event::Text(format!("$$\n{}\n$$", math.value)));
                self.events.push(Event::End);
            }
            mdast::Node::Break(_) => self.events.push(Event::HardBreak),
            mdast::Node::Link(link) => {
                let tag = Tag::Link {
                    dest_url: link.url.clone(),
                    title: link.title.clone().unwrap_or_default(),
                };
                self.with_tag(tag, &link.children)
            }
            mdast::Node::Image(image) => {
                let tag = Tag::Image {
                    dest_url: image.url.clone(),
                    title: image.title.clone().unwrap_or_default(),
                };
                self.image(tag, &image.alt)
            }
            mdast::Node::LinkReference(link) => {
                let tag = self.reference_tag(&link.identifier, false);
                self.with_tag(tag, &link.children)
            }
            mdast::Node::ImageReference(image) => {
                let tag = self.reference_tag(&image.identifier, true);
                self.image(tag, &image.alt)
            }
            mdast::Node::Html(html) => self.events.push(Event::Html(html.value.clone())),
            mdast::Node::FootnoteDefinition(def) => {
                self.with_tag(Tag::FootnoteDefinition(def.identifier.clone()), &def.children)
            }
            mdast::Node::FootnoteReference(reference) => self
                .events
                .push(Event::FootnoteReference(reference.identifier.clone())),
            mdast::Node::Definition(_) => {}
            other => {
                if let Some(children) = other.children() {
                    self.with_tag(Tag::Other, children);
                }
            }
        }
    }

    fn visit_children(&mut self, children: &[mdast::Node]) {
        for child in children {
            self.visit(child);
        }
    }

    fn with_tag(&mut self, tag: Tag, children: &[mdast::Node]) {
        self.events.push(Event::Start(tag));
        self.visit_children(children);
        self.events.push(Event::End);
    }

    fn image(&mut self, tag: Tag, alt: &str) {
        self.events.push(Event::Start(tag));
        if !alt.is_empty() {
            self.events.push(Event::Text(alt.to_owned()));
        }
        self.events.push(Event::End);
    }

    fn reference_tag(&self, identifier: &str, image: bool) -> Tag {
        let (dest_url, title) = match self.definitions.get(identifier) {
            Some(definition) => (definition.url.clone(), definition.title.clone()),
            None => (String::new(), String::new()),
        };
        if image {
            Tag::Image { dest_url, title }
        } else {
            Tag::Link { dest_url, title }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use crate::tree_builder::{TagRewrites, build_tree, cmark_events};
    use pretty_assertions::assert_eq;

    fn both(input: &str) -> (Vec<Node>, Vec<Node>) {
        let options = MarkdownOptions::default();
        let rewrites = TagRewrites::default();
        let events = MarkdownRsEventIter::new(input, &options).expect("markdown-rs parses");
        (
            build_tree(events, &rewrites),
            build_tree(cmark_events(input, &options), &rewrites),
        )
    }

    #[test]
    fn agrees_with_pulldown_on_common_blocks() {
        for input in [
            "## Title *a* **b**",
            "- one\n- two",
            "1. first\n2. second",
            "```python\nprint(1)\n```",
            "before\nafter with `code`",
            "a <b>bold</b>",
            "> quoted",
            r"Set $\{a\,b\}$ and $$x \\ y$$ here",
        ] {
            let (markdown_rs, pulldown) = both(input);
            assert_eq!(markdown_rs, pulldown, "input: {input:?}");
        }
    }

    #[test]
    fn task_list_items_emit_markers() {
        let events: Vec<Event> = MarkdownRsEventIter::new("- [x] done", &MarkdownOptions::default())
            .expect("markdown-rs parses")
            .collect();
        assert!(events.contains(&Event::TaskListMarker(true)));
    }

    #[test]
    fn reference_links_resolve_definitions() {
        let events: Vec<Event> =
            MarkdownRsEventIter::new("[site][a]\n\n[a]: https://a.example \"T\"", &MarkdownOptions::default())
                .expect("markdown-rs parses")
                .collect();
        assert!(events.contains(&Event::Start(Tag::Link {
            dest_url: "https://a.example".into(),
            title: "T".into(),
        })));
    }

    #[test]
    fn flow_math_keeps_latex_verbatim() {
        let (markdown_rs, _) = both("$$\n\\begin{matrix}a \\\\ b\\end{matrix}\n$$");
        assert_eq!(
            markdown_rs,
            vec![Node::element(
                "div",
                vec![Node::text("$$\n\\begin{matrix}a \\\\ b\\end{matrix}\n$$")]
            )]
        );
    }

    #[test]
    fn pipe_tables_stay_text() {
        let (markdown_rs, _) = both("a | b\n--|--\n1 | 2");
        assert!(markdown_rs.iter().all(|node| !matches!(node, Node::Table(_))));
    }
}
