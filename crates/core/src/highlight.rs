//! Syntax highlighting for fenced code blocks that name a language.

/// Turns a code block into block-level HTML.
pub trait SyntaxHighlighter {
    fn highlight(&self, language: &str, code: &str) -> String;
}

/// Escapes the code and tags it with a `language-*` class for client-side
/// highlighters.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainHighlighter;

impl SyntaxHighlighter for PlainHighlighter {
    fn highlight(&self, language: &str, code: &str) -> String {
        let mut html = String::with_capacity(code.len() + 48);
        html.push_str("<pre><code class=\"language-");
        escape_into(&mut html, language);
        html.push_str("\">");
        escape_into(&mut html, code);
        html.push_str("</code></pre>");
        html
    }
}

pub(crate) fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(feature = "syntect")]
pub use self::syntect_highlighter::SyntectHighlighter;

#[cfg(feature = "syntect")]
mod syntect_highlighter {
    use syntect::highlighting::ThemeSet;
    use syntect::html::highlighted_html_for_string;
    use syntect::parsing::SyntaxSet;

    use super::{PlainHighlighter, SyntaxHighlighter};

    /// Server-side highlighting with syntect's bundled syntaxes and themes.
    pub struct SyntectHighlighter {
        syntaxes: SyntaxSet,
        themes: ThemeSet,
        theme: String,
    }

    impl SyntectHighlighter {
        pub fn new(theme: impl Into<String>) -> Self {
            Self {
                syntaxes: SyntaxSet::load_defaults_newlines(),
                themes: ThemeSet::load_defaults(),
                theme: theme.into(),
            }
        }
    }

    impl Default for SyntectHighlighter {
        fn default() -> Self {
            Self::new("base16-ocean.dark")
        }
    }

    impl SyntaxHighlighter for SyntectHighlighter {
        fn highlight(&self, language: &str, code: &str) -> String {
            let syntax = self
                .syntaxes
                .find_syntax_by_token(language)
                .or_else(|| self.syntaxes.find_syntax_by_first_line(code));
            let (Some(syntax), Some(theme)) = (syntax, self.themes.themes.get(&self.theme)) else {
                return PlainHighlighter.highlight(language, code);
            };
            match highlighted_html_for_string(code, &self.syntaxes, syntax, theme) {
                Ok(html) => html,
                Err(err) => {
                    tracing::debug!(language, error = %err, "syntect failed, using plain code block");
                    PlainHighlighter.highlight(language, code)
                }
            }
        }
    }

}
