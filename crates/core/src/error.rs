use std::io;

use thiserror::Error;

/// Errors surfaced by the output and configuration entry points.
///
/// Content problems (bad math, unterminated fences, odd parser output) never
/// show up here; they degrade to omitted fragments instead.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to write rendered output: {0}")]
    Io(#[from] io::Error),

    #[error("html rewriting failed: {0}")]
    Rewrite(String),

    #[error("invalid options: {0}")]
    Config(#[from] serde_json::Error),
}

/// Failure reported by a [`MathRenderer`](crate::math::MathRenderer).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MathRenderError {
    #[error("{0}")]
    Parse(String),

    #[error("could not emit markup: {0}")]
    Output(String),
}
