//! Streaming HTML rewriter that scrubs math error markup on its way out.
//!
//! Typesetters can emit their own error elements for borderline input even
//! when the node tree is clean, so rendered HTML passes through lol_html once
//! more before it reaches the writer.

use lol_html::errors::RewritingError;
use lol_html::{HtmlRewriter, OutputSink, Selector, Settings, element};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use crate::options::default_true;

/// Selectors whose elements are dropped together with their content.
const ERROR_SELECTORS: [&str; 3] = [".katex-error", ".math-error", "[data-math-error]"];

/// Configuration flags that control how the streaming rewriter manipulates HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewriteOptions {
    /// Remove `.katex-error` / `.math-error` elements.
    #[serde(default = "default_true")]
    pub scrub_error_markup: bool,
    /// When enabled, missing `loading` attributes on `<img>` tags are defaulted to `lazy`.
    #[serde(default = "default_true")]
    pub enforce_img_loading_lazy: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        RewriteOptions {
            scrub_error_markup: true,
            enforce_img_loading_lazy: true,
        }
    }
}

/// Implements [`Write`] so rendered HTML can be pushed straight into lol_html.
///
/// The destination writer is shared through a single `Rc<RefCell<Option<W>>>`,
/// which is what lol_html's `OutputSink` needs without buffering whole
/// documents.
pub struct StreamingRewriter<W: Write> {
    rewriter: Option<HtmlRewriter<'static, OutputProxy<W>>>,
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
}

impl<W: Write> StreamingRewriter<W> {
    /// Creates a new streaming rewriter that forwards lol_html output into `writer` while applying
    /// the supplied rewrite options.
    pub fn new(writer: W, options: RewriteOptions) -> Self {
        let target = Rc::new(RefCell::new(Some(writer)));
        let sink_error = Rc::new(RefCell::new(None));
        let output_sink = OutputProxy::new(Rc::clone(&target), Rc::clone(&sink_error));
        let settings = options.into_settings();
        let rewriter = HtmlRewriter::new(settings, output_sink);

        Self {
            rewriter: Some(rewriter),
            target,
            sink_error,
        }
    }

    /// Consumes the rewriter, ensures lol_html has flushed, and returns the underlying writer.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.finalize_if_needed()?;

        let cell = Rc::try_unwrap(self.target)
            .map_err(|_| io::Error::other("rewriter still borrowed"))?;

        cell.into_inner()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "writer missing"))
    }

    fn finalize_if_needed(&mut self) -> io::Result<()> {
        if let Some(rewriter) = self.rewriter.take() {
            rewriter.end().map_err(rewriting_error_to_io)?;
        }

        Self::take_sink_error(&self.sink_error)
    }

    fn take_sink_error(cell: &Rc<RefCell<Option<io::Error>>>) -> io::Result<()> {
        if let Some(err) = cell.borrow_mut().take() {
            Err(err)
        } else {
            Ok(())
        }
    }
}

impl<W: Write> Write for StreamingRewriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let rewriter = self
            .rewriter
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "rewriter finalized"))?;

        rewriter.write(buf).map_err(rewriting_error_to_io)?;
        Self::take_sink_error(&self.sink_error)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.finalize_if_needed()
    }
}

impl RewriteOptions {
    fn into_settings(self) -> Settings<'static, 'static> {
        let mut settings = Settings::default();
        let mut handlers = Vec::new();

        if self.scrub_error_markup {
            handlers.extend(ERROR_SELECTORS.into_iter().map(error_markup_handler));
        }
        if self.enforce_img_loading_lazy {
            handlers.push(lazy_img_handler());
        }

        settings.element_content_handlers = handlers;
        settings
    }
}

fn error_markup_handler(
    selector: &'static str,
) -> (
    Cow<'static, Selector>,
    lol_html::ElementContentHandlers<'static>,
) {
    element!(selector, |el| {
        tracing::debug!(tag = %el.tag_name(), "removed math error markup");
        el.remove();
        Ok(())
    })
}

fn lazy_img_handler() -> (
    Cow<'static, Selector>,
    lol_html::ElementContentHandlers<'static>,
) {
    element!("img", |el| {
        if el.get_attribute("loading").is_none() {
            el.set_attribute("loading", "lazy")?;
        }

        Ok(())
    })
}

fn rewriting_error_to_io(err: RewritingError) -> io::Error {
    io::Error::other(err)
}

struct OutputProxy<W: Write> {
    target: Rc<RefCell<Option<W>>>,
    sink_error: Rc<RefCell<Option<io::Error>>>,
}

impl<W: Write> OutputProxy<W> {
    fn new(target: Rc<RefCell<Option<W>>>, sink_error: Rc<RefCell<Option<io::Error>>>) -> Self {
        OutputProxy { target, sink_error }
    }
}

impl<W: Write> OutputSink for OutputProxy<W> {
    fn handle_chunk(&mut self, chunk: &[u8]) {
        if chunk.is_empty() {
            return;
        }

        if self.sink_error.borrow().is_some() {
            return;
        }

        let mut borrow = self.target.borrow_mut();

        if let Some(writer) = borrow.as_mut() {
            if let Err(err) = writer.write_all(chunk) {
                *self.sink_error.borrow_mut() = Some(err);
            }
        }
    }
}
