use std::convert::TryFrom;

/// A parser-neutral markdown event.
///
/// Both markdown backends lower their output to this vocabulary so the tree
/// builder only has to know one shape. Strings are owned because the tree
/// outlives the parser's borrowed buffers.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Start of a tagged element.
    Start(Tag),
    /// End of the innermost open element.
    End,
    /// Text node.
    Text(String),
    /// Inline code span.
    Code(String),
    /// Raw HTML. Rendered as escaped text, never as markup.
    Html(String),
    /// Footnote reference.
    FootnoteReference(String),
    /// Task list checkbox marker.
    TaskListMarker(bool),
    /// Horizontal rule.
    Rule,
    /// Hard line break.
    HardBreak,
    /// Soft line break.
    SoftBreak,
}

/// Tags for container elements.
#[derive(Debug, Clone, PartialEq)]
pub enum Tag {
    Paragraph,
    Heading(HeadingLevel),
    BlockQuote,
    /// Fenced or indented code; carries the first word of the info string.
    CodeBlock(Option<String>),
    List(Option<u64>),
    Item,
    FootnoteDefinition(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link { dest_url: String, title: String },
    Image { dest_url: String, title: String },
    /// Anything the backend produced that has no rewrite rule. Its children
    /// are spliced into the parent unchanged.
    Other,
}

/// Heading depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeadingLevel {
    H1 = 1,
    H2,
    H3,
    H4,
    H5,
    H6,
}

impl HeadingLevel {
    pub fn tag_name(self) -> &'static str {
        match self {
            HeadingLevel::H1 => "h1",
            HeadingLevel::H2 => "h2",
            HeadingLevel::H3 => "h3",
            HeadingLevel::H4 => "h4",
            HeadingLevel::H5 => "h5",
            HeadingLevel::H6 => "h6",
        }
    }
}

impl TryFrom<usize> for HeadingLevel {
    type Error = ();

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(HeadingLevel::H1),
            2 => Ok(HeadingLevel::H2),
            3 => Ok(HeadingLevel::H3),
            4 => Ok(HeadingLevel::H4),
            5 => Ok(HeadingLevel::H5),
            6 => Ok(HeadingLevel::H6),
            _ => Err(()),
        }
    }
}

/// Extracts the language from a fenced code block info string.
pub(crate) fn code_language(info: &str) -> Option<String> {
    info.split_whitespace()
        .next()
        .filter(|lang| !lang.is_empty())
        .map(str::to_owned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_levels_round_trip_through_usize() {
        assert_eq!(HeadingLevel::try_from(3), Ok(HeadingLevel::H3));
        assert_eq!(HeadingLevel::try_from(3).map(HeadingLevel::tag_name), Ok("h3"));
        assert!(HeadingLevel::try_from(7).is_err());
    }

    #[test]
    fn code_language_takes_first_word() {
        assert_eq!(code_language("rust ignore"), Some("rust".to_string()));
        assert_eq!(code_language("   "), None);
        assert_eq!(code_language(""), None);
    }
}
