//! Derives display output from a note's body.
//!
//! The title line always renders as escaped literal text. Body lines go
//! through one of two paths: the plain path escapes each line and marks up
//! task prefixes, one block per raw line; the rich path hands the joined
//! body text to an injected markdown capability, sanitizes the result and
//! expands diagram/math code blocks through further optional capabilities.

use log::{debug, warn};
use pulldown_cmark::{html, Options, Parser};

use crate::{sanitize::sanitize, split_body, tasks, Note, Result, DEFAULT_ALLOW_LIST};

/// Renders markdown text to display markup.
pub trait RichTextRenderer {
    fn render(&self, text: &str) -> Result<String>;
}

/// Renders diagram source (fenced `mermaid` blocks) to a display node.
pub trait DiagramRenderer {
    fn render(&self, source: &str) -> Result<String>;
}

/// Renders math source (fenced `math` blocks) to a display node.
pub trait MathRenderer {
    fn render(&self, source: &str) -> Result<String>;
}

/// The optional external rendering services, detected once at construction
/// and never re-probed per render call.
pub struct RenderCapabilities {
    pub rich_text: Option<Box<dyn RichTextRenderer>>,
    pub diagram: Option<Box<dyn DiagramRenderer>>,
    pub math: Option<Box<dyn MathRenderer>>,
}

impl RenderCapabilities {
    /// No capabilities: every note renders through the plain path.
    pub fn none() -> Self {
        Self {
            rich_text: None,
            diagram: None,
            math: None,
        }
    }

    /// The built-in markdown capability, without diagram or math services.
    pub fn standard() -> Self {
        Self {
            rich_text: Some(Box::new(MarkdownRenderer::new())),
            diagram: None,
            math: None,
        }
    }
}

/// Markdown capability backed by pulldown-cmark with GFM-style extensions.
pub struct MarkdownRenderer {
    options: Options,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        Self { options }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl RichTextRenderer for MarkdownRenderer {
    fn render(&self, text: &str) -> Result<String> {
        let parser = Parser::new_ext(text, self.options);
        let mut out = String::with_capacity(text.len() * 2);
        html::push_html(&mut out, parser);
        Ok(out)
    }
}

/// One rendered block in plain mode. Every raw body line produces exactly
/// one block, so block indices line up with raw line indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlainBlock {
    /// An escaped literal line; an empty line keeps its own block.
    Text(String),
    /// A task line: marker state plus the escaped remainder.
    Task { checked: bool, text: String },
}

/// Display output for a note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedNote {
    /// The escaped title line; empty when the title line is empty, which
    /// the display surface shows as an empty-line placeholder.
    pub title: String,
    pub body: RenderedBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedBody {
    /// Line-per-block output with task markers.
    Plain(Vec<PlainBlock>),
    /// Sanitized rich-text markup.
    Rich(String),
}

impl RenderedBody {
    /// Rendered task markers in rendering order, for plain output. Rich
    /// output carries its markers inside the markup, counted by the UI.
    pub fn task_markers(&self) -> Vec<bool> {
        match self {
            RenderedBody::Plain(blocks) => blocks
                .iter()
                .filter_map(|b| match b {
                    PlainBlock::Task { checked, .. } => Some(*checked),
                    PlainBlock::Text(_) => None,
                })
                .collect(),
            RenderedBody::Rich(_) => Vec::new(),
        }
    }
}

/// Escapes text for literal embedding in display markup. Applied
/// unconditionally to all display-bound text, before any task-marker
/// substitution.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders a note for display. Rich-text output is produced only when the
/// note has markdown enabled and a rich-text capability is present;
/// otherwise every body line becomes one plain block.
pub fn render_note(note: &Note, caps: &RenderCapabilities) -> RenderedNote {
    let (title_line, body_text) = split_body(&note.body);
    let title = escape_text(title_line);

    if note.markdown_enabled {
        if let Some(renderer) = &caps.rich_text {
            let body = match renderer.render(body_text.unwrap_or("")) {
                Ok(markup) => {
                    let clean = sanitize(&markup, &DEFAULT_ALLOW_LIST);
                    expand_code_blocks(&clean, caps)
                }
                Err(e) => {
                    warn!("Rich-text renderer failed, showing error inline: {}", e);
                    format!(
                        "<div class=\"render-error\">{}</div>",
                        escape_text(&e.to_string())
                    )
                }
            };
            return RenderedNote {
                title,
                body: RenderedBody::Rich(body),
            };
        }
        debug!("Markdown enabled but no rich-text capability, using plain path");
    }

    let blocks = match body_text {
        Some(text) => text.split('\n').map(render_plain_line).collect(),
        None => Vec::new(),
    };
    RenderedNote {
        title,
        body: RenderedBody::Plain(blocks),
    }
}

fn render_plain_line(line: &str) -> PlainBlock {
    if let Some(rest) = tasks::parse_checked(line) {
        return PlainBlock::Task {
            checked: true,
            text: escape_text(rest),
        };
    }
    if let Some(rest) = tasks::parse_unchecked(line) {
        return PlainBlock::Task {
            checked: false,
            text: escape_text(rest),
        };
    }
    PlainBlock::Text(escape_text(line))
}

const DIAGRAM_OPEN: &str = "<pre><code class=\"language-mermaid\">";
const MATH_OPEN: &str = "<pre><code class=\"language-math\">";
const CODE_CLOSE: &str = "</code></pre>";

#[derive(Clone, Copy)]
enum SpecialKind {
    Diagram,
    Math,
}

impl SpecialKind {
    fn label(self) -> &'static str {
        match self {
            SpecialKind::Diagram => "diagram",
            SpecialKind::Math => "math",
        }
    }
}

/// Replaces fenced `mermaid` and `math` code blocks in sanitized markup
/// with the output of the optional capabilities. A capability failure
/// degrades to inline error text; the rest of the note still renders.
fn expand_code_blocks(markup: &str, caps: &RenderCapabilities) -> String {
    if caps.diagram.is_none() && caps.math.is_none() {
        return markup.to_string();
    }

    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some((at, kind, open_len)) = find_special_block(rest) {
        let after_open = &rest[at + open_len..];
        let Some(end) = after_open.find(CODE_CLOSE) else {
            break;
        };

        out.push_str(&rest[..at]);
        let source = unescape_text(after_open[..end].trim_end_matches('\n'));

        let capability = match kind {
            SpecialKind::Diagram => caps.diagram.as_ref().map(|c| c.render(&source)),
            SpecialKind::Math => caps.math.as_ref().map(|c| c.render(&source)),
        };
        match capability {
            Some(Ok(node)) => {
                out.push_str(&format!("<div class=\"{}\">{}</div>", kind.label(), node));
            }
            Some(Err(e)) => {
                warn!("{} rendering failed: {}", kind.label(), e);
                out.push_str(&format!(
                    "<div class=\"render-error\">{} error: {}</div>",
                    kind.label(),
                    escape_text(&e.to_string())
                ));
            }
            None => {
                // No capability for this block kind: keep the code block.
                out.push_str(&rest[at..at + open_len + end + CODE_CLOSE.len()]);
            }
        }
        rest = &after_open[end + CODE_CLOSE.len()..];
    }

    out.push_str(rest);
    out
}

fn find_special_block(s: &str) -> Option<(usize, SpecialKind, usize)> {
    let diagram = s
        .find(DIAGRAM_OPEN)
        .map(|i| (i, SpecialKind::Diagram, DIAGRAM_OPEN.len()));
    let math = s
        .find(MATH_OPEN)
        .map(|i| (i, SpecialKind::Math, MATH_OPEN.len()));
    match (diagram, math) {
        (Some(d), Some(m)) => Some(if d.0 <= m.0 { d } else { m }),
        (d, m) => d.or(m),
    }
}

/// Undoes the entity escaping the markdown renderer applies to code-block
/// content, recovering the raw diagram/math source.
fn unescape_text(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
