//! Rendering configuration.
//!
//! Every field has a default so partial JSON documents (e.g. `{"math":{}}`)
//! deserialize cleanly.

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::streaming_rewriter::RewriteOptions;

/// Top-level options for a [`Renderer`](crate::Renderer).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub markdown: MarkdownOptions,
    pub math: MathOptions,
    pub tables: TableOptions,
    pub output: RewriteOptions,
}

impl Options {
    /// Parses options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Which markdown parser backs the prose segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParserBackend {
    #[default]
    PulldownCmark,
    #[cfg(feature = "markdown-rs")]
    MarkdownRs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownOptions {
    #[serde(default = "default_true")]
    pub strikethrough: bool,
    #[serde(default = "default_true")]
    pub tasklists: bool,
    #[serde(default)]
    pub footnotes: bool,
    /// Off by default: `$` runs the markdown parser does not treat as math
    /// would get `--` and straight quotes turned into typographic characters.
    #[serde(default)]
    pub smart_punctuation: bool,
    #[serde(default)]
    pub backend: ParserBackend,
}

impl Default for MarkdownOptions {
    fn default() -> Self {
        Self {
            strikethrough: true,
            tasklists: true,
            footnotes: false,
            smart_punctuation: false,
            backend: ParserBackend::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathOptions {
    /// Drop the `\ce` macro name so `\ce{H2O}` is tokenized as `{H2O}`.
    #[serde(default = "default_true")]
    pub strip_chem_macro: bool,
    /// Keep failed expressions as [`Node::MathError`](crate::Node::MathError)
    /// placeholders and skip the error scrub. Meant for authoring tools.
    #[serde(default)]
    pub preserve_failures: bool,
}

impl Default for MathOptions {
    fn default() -> Self {
        Self {
            strip_chem_macro: true,
            preserve_failures: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableOptions {
    /// Turn ad-hoc pipe tables into table segments instead of deleting them.
    #[serde(default)]
    pub wrap_pipe_tables: bool,
}

pub(crate) fn default_true() -> bool {
    true
}
