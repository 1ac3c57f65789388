//! Splices rendered diagrams into HTML documents.
//!
//! Every `<script type="text/typogram">` element is converted and an
//! `<svg>` element holding the output is inserted right before it:
//!
//! ```text
//! <script type="text/typogram">+--+</script>
//!   =>
//! <svg>…</svg><script type="text/typogram">+--+</script>
//! ```
//!
//! The script element stays in place so the source survives re-rendering.

use regex::Regex;
use std::sync::LazyLock;
use typogram_core::error::{BridgeError, Result};

/// Matches a script element and captures its attributes and raw body.
///
/// Pattern: `(?is)<script\b([^>]*)>(.*?)</script\s*>`
static SCRIPT_ELEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b([^>]*)>(.*?)</script\s*>")
        .unwrap_or_else(|_| panic!("Static regex 'SCRIPT_ELEMENT' failed to compile"))
});

/// Matches a `type` attribute selecting typogram sources, quoted or not.
///
/// Pattern: `(?i)(?:^|\s)type\s*=\s*(?:"text/typogram"|'text/typogram'|text/typogram(?:\s|/|$))`
static TYPOGRAM_TYPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)(?:^|\s)type\s*=\s*(?:"text/typogram"|'text/typogram'|text/typogram(?:\s|/|$))"#,
    )
    .unwrap_or_else(|_| panic!("Static regex 'TYPOGRAM_TYPE' failed to compile"))
});

/// A document with its diagrams rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    /// The rewritten document.
    pub html: String,
    /// Number of diagram blocks converted.
    pub blocks: usize,
}

/// Convert every typogram script block in `html`.
///
/// Blocks are converted in document order. The first failing block aborts
/// rendering with [`BridgeError::Render`] carrying its index and cause.
/// A document without blocks is returned unchanged.
pub fn render_document<F>(html: &str, mut convert: F) -> Result<Rendered>
where
    F: FnMut(&str) -> Result<String>,
{
    let mut out = String::with_capacity(html.len());
    let mut last = 0;
    let mut blocks = 0;

    for caps in SCRIPT_ELEMENT.captures_iter(html) {
        let (Some(element), Some(attrs), Some(body)) = (caps.get(0), caps.get(1), caps.get(2))
        else {
            continue;
        };
        if !TYPOGRAM_TYPE.is_match(attrs.as_str()) {
            continue;
        }

        let svg = convert(body.as_str()).map_err(|e| BridgeError::Render {
            block: blocks,
            source: Box::new(e),
        })?;
        tracing::debug!(
            block = blocks,
            source_bytes = body.len(),
            output_bytes = svg.len(),
            "Rendered diagram block"
        );

        out.push_str(&html[last..element.start()]);
        out.push_str("<svg>");
        out.push_str(&svg);
        out.push_str("</svg>");
        out.push_str(element.as_str());
        last = element.end();
        blocks += 1;
    }

    out.push_str(&html[last..]);
    Ok(Rendered { html: out, blocks })
}
