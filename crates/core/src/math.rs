//! LaTeX math rendering with failure containment.
//!
//! [`MathRenderer`] is the typesetting seam; [`LatexRenderer`] implements it
//! with pulldown-latex → MathML. [`SafeMathRenderer`] wraps any renderer so a
//! bad expression turns into a [`RenderOutcome::Failure`] plus one `warn`
//! event instead of an error.

use pulldown_latex::{
    Parser, Storage,
    config::{DisplayMode, RenderConfig},
    mathml::push_mathml,
};
use serde::Serialize;

use crate::error::MathRenderError;
use crate::node::{MathDisplay, MathError, MathNode, Node};

/// A math typesetting engine.
pub trait MathRenderer {
    /// Renders `source` (no delimiters) to markup.
    fn render(&self, source: &str, display: MathDisplay) -> Result<String, MathRenderError>;

    /// Strict check of `source` without producing output.
    fn validate(&self, source: &str, display: MathDisplay) -> Result<(), MathRenderError>;
}

impl<R: MathRenderer + ?Sized> MathRenderer for &R {
    fn render(&self, source: &str, display: MathDisplay) -> Result<String, MathRenderError> {
        (**self).render(source, display)
    }

    fn validate(&self, source: &str, display: MathDisplay) -> Result<(), MathRenderError> {
        (**self).validate(source, display)
    }
}

/// pulldown-latex backed renderer producing MathML.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatexRenderer;

impl LatexRenderer {
    fn display_mode(display: MathDisplay) -> DisplayMode {
        match display {
            MathDisplay::Inline => DisplayMode::Inline,
            MathDisplay::Block => DisplayMode::Block,
        }
    }

    fn parse_errors(source: &str) -> Vec<String> {
        let storage = Storage::new();
        Parser::new(source, &storage)
            .filter_map(|event| event.err().map(|err| err.to_string()))
            .collect()
    }
}

impl MathRenderer for LatexRenderer {
    fn render(&self, source: &str, display: MathDisplay) -> Result<String, MathRenderError> {
        let storage = Storage::new();
        let events: Vec<_> = Parser::new(source, &storage).collect();

        // push_mathml would inline parse errors into the markup; refuse instead.
        let errors: Vec<String> = events
            .iter()
            .filter_map(|event| event.as_ref().err().map(|err| err.to_string()))
            .collect();
        if !errors.is_empty() {
            return Err(MathRenderError::Parse(errors.join("; ")));
        }

        let config = RenderConfig {
            display_mode: Self::display_mode(display),
            ..Default::default()
        };
        let mut mathml = String::new();
        push_mathml(&mut mathml, events.into_iter(), config)
            .map_err(|err| MathRenderError::Output(err.to_string()))?;
        Ok(mathml)
    }

    fn validate(&self, source: &str, _display: MathDisplay) -> Result<(), MathRenderError> {
        if source.trim().is_empty() {
            return Err(MathRenderError::Parse("empty expression".to_owned()));
        }
        let errors = Self::parse_errors(source);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(MathRenderError::Parse(errors.join("; ")))
        }
    }
}

/// A failed math token, as reported to the diagnostic channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MathDiagnostic {
    pub source: String,
    pub display: MathDisplay,
    pub message: String,
}

impl MathDiagnostic {
    /// The placeholder node used when failures are preserved.
    pub fn to_node(&self) -> Node {
        Node::MathError(MathError {
            display: self.display,
            source: self.source.clone(),
            message: self.message.clone(),
        })
    }
}

/// Result of rendering one math token. Never an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    Success(Node),
    Failure(MathDiagnostic),
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RenderOutcome::Success(_))
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            RenderOutcome::Success(node) => Some(node),
            RenderOutcome::Failure(_) => None,
        }
    }
}

/// Renders math tokens without ever propagating a failure.
///
/// The primary attempt goes straight to the wrapped renderer. If it fails, a
/// strict validation decides whether a single retry is worthwhile; when
/// validation fails too (or the retry does), the token is given up on.
#[derive(Debug, Clone, Default)]
pub struct SafeMathRenderer<M> {
    inner: M,
}

impl<M: MathRenderer> SafeMathRenderer<M> {
    pub fn new(inner: M) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn render(&self, source: &str, display: MathDisplay) -> RenderOutcome {
        let error = match self.attempt(source, display) {
            Ok(markup) => return success(source, display, markup),
            Err(error) => error,
        };

        let error = match self.inner.validate(source, display) {
            Ok(()) => match self.attempt(source, display) {
                Ok(markup) => return success(source, display, markup),
                Err(retry) => retry,
            },
            Err(strict) => {
                tracing::trace!(first = %error, strict = %strict, "strict validation rejected math");
                strict
            }
        };

        let mode = display.as_str();
        tracing::warn!(
            source,
            display = mode,
            error = %error,
            "math expression failed to render"
        );
        RenderOutcome::Failure(MathDiagnostic {
            source: source.to_owned(),
            display,
            message: error.to_string(),
        })
    }

    fn attempt(&self, source: &str, display: MathDisplay) -> Result<String, MathRenderError> {
        if source.trim().is_empty() {
            return Err(MathRenderError::Parse("empty expression".to_owned()));
        }
        self.inner.render(source, display)
    }
}

fn success(source: &str, display: MathDisplay, markup: String) -> RenderOutcome {
    RenderOutcome::Success(Node::Math(MathNode {
        display,
        source: source.to_owned(),
        markup,
    }))
}


#[cfg(test)]
mod tests {
    use super::testing::StubRenderer;
    use super::*;

    #[test]
    fn latex_renderer_emits_mathml() {
        let markup = LatexRenderer
            .render(r"\frac{a}{b}", MathDisplay::Block)
            .expect("valid latex");
        assert!(markup.contains("<math"));
        assert!(markup.contains("<mfrac"));
    }

    #[test]
    fn latex_renderer_rejects_unclosed_group() {
        let result = LatexRenderer.render(r"\frac{1", MathDisplay::Inline);
        assert!(matches!(result, Err(MathRenderError::Parse(_))));
        assert!(LatexRenderer.validate(r"\frac{1", MathDisplay::Inline).is_err());
    }

    #[test]
    fn safe_renderer_wraps_success_in_math_node() {
        let safe = SafeMathRenderer::new(LatexRenderer);
        match safe.render("E=mc^2", MathDisplay::Block) {
            RenderOutcome::Success(Node::Math(math)) => {
                assert_eq!(math.display, MathDisplay::Block);
                assert_eq!(math.source, "E=mc^2");
            }
            other => panic!("expected math node, got {other:?}"),
        }
    }

    #[test]
    fn safe_renderer_contains_failure() {
        let safe = SafeMathRenderer::new(StubRenderer::default());
        let outcome = safe.render(r"\bad{x}", MathDisplay::Inline);
        let RenderOutcome::Failure(diagnostic) = outcome else {
            panic!("expected failure");
        };
        assert_eq!(diagnostic.source, r"\bad{x}");
        assert_eq!(diagnostic.display, MathDisplay::Inline);
        // Strict validation said no, so the renderer is not retried.
        assert_eq!(safe.inner().calls.get(), 1);
    }

    #[test]
    fn transient_failure_is_retried_after_validation() {
        let safe = SafeMathRenderer::new(StubRenderer::flaky(1));
        assert!(safe.render("x^2", MathDisplay::Inline).is_success());
        assert_eq!(safe.inner().calls.get(), 2);
    }

    #[test]
    fn persistent_failure_gives_up_after_one_retry() {
        let safe = SafeMathRenderer::new(StubRenderer::flaky(5));
        assert!(!safe.render("x^2", MathDisplay::Inline).is_success());
        assert_eq!(safe.inner().calls.get(), 2);
    }

    #[test]
    fn blank_expression_fails_without_calling_renderer() {
        let safe = SafeMathRenderer::new(StubRenderer::default());
        assert!(safe.render("   ", MathDisplay::Block).into_node().is_none());
        assert_eq!(safe.inner().calls.get(), 0);
    }
}
