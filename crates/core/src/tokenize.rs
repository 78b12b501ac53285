//! Splits plain strings into text, inline-math and block-math tokens.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use crate::node::MathDisplay;

/// `$$…$$` may span lines and is tried first; `$…$` may not start with
/// whitespace and may not contain a newline or another `$`.
static MATH_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s:\$\$(.+?)\$\$)|\$([^\s$][^$\n]*)\$").expect("math token pattern is valid")
});

static CHEM_MACRO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\ce\{").expect("chem macro pattern is valid"));

static UNPARSED_MATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s:\$\$[^$]+?\$\$)|\$[^$]+?\$|\\\([^)]*\\\)|(?s:\\\[.*?\\\])")
        .expect("unparsed math pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Text,
    InlineMath,
    BlockMath,
}

impl TokenKind {
    pub fn display(self) -> Option<MathDisplay> {
        match self {
            TokenKind::Text => None,
            TokenKind::InlineMath => Some(MathDisplay::Inline),
            TokenKind::BlockMath => Some(MathDisplay::Block),
        }
    }
}

/// A classified run of a string. Math content excludes its delimiters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub content: String,
}

impl Token {
    fn new(kind: TokenKind, content: &str) -> Self {
        Self {
            kind,
            content: content.to_owned(),
        }
    }

    /// The token as it appeared in the scanned string, delimiters included.
    pub fn source(&self) -> Cow<'_, str> {
        match self.kind {
            TokenKind::Text => Cow::Borrowed(&self.content),
            TokenKind::InlineMath => Cow::Owned(format!("${}$", self.content)),
            TokenKind::BlockMath => Cow::Owned(format!("$${}$$", self.content)),
        }
    }
}

/// Removes the `\ce` name from `\ce{…}` so chemistry reads as bare braces.
pub fn normalize(input: &str) -> Cow<'_, str> {
    CHEM_MACRO.replace_all(input, "{")
}

/// Tokenizes `input` after `\ce` normalization.
pub fn tokenize(input: &str) -> Vec<Token> {
    tokenize_normalized(&normalize(input))
}

/// Tokenizes `input` as-is.
///
/// Total: any string yields tokens whose sources concatenate back to the
/// input. Unbalanced delimiters stay inside text tokens; no token is empty
/// text.
pub fn tokenize_normalized(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut last = 0;

    for captures in MATH_TOKEN.captures_iter(input) {
        let Some(whole) = captures.get(0) else {
            continue;
        };
        if whole.start() > last {
            tokens.push(Token::new(TokenKind::Text, &input[last..whole.start()]));
        }
        if let Some(block) = captures.get(1) {
            tokens.push(Token::new(TokenKind::BlockMath, block.as_str()));
        } else if let Some(inline) = captures.get(2) {
            tokens.push(Token::new(TokenKind::InlineMath, inline.as_str()));
        }
        last = whole.end();
    }

    if last < input.len() {
        tokens.push(Token::new(TokenKind::Text, &input[last..]));
    }

    tokens
}

/// Whether [`tokenize_normalized`] would find at least one math token.
pub fn contains_math_tokens(text: &str) -> bool {
    MATH_TOKEN.is_match(text)
}

/// Byte ranges of the math tokens in `input`, delimiters included.
pub(crate) fn math_spans(input: &str) -> impl Iterator<Item = Range<usize>> + '_ {
    MATH_TOKEN.find_iter(input).map(|found| found.range())
}

/// Whether `text` still holds something that looks like raw math:
/// `$$…$$`, `$…$`, `\(…\)` or `\[…\]`.
pub fn contains_unparsed_math(text: &str) -> bool {
    UNPARSED_MATH.is_match(text)
}
