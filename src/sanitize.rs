//! Markup sanitization for the rich-text rendering path.
//!
//! Strips every tag and attribute not on an explicit allow-list from a
//! rendered markup fragment. Disallowed elements are dropped while their
//! text content is kept, except for script and style elements whose content
//! is dropped with them. Event-handler attributes never survive because no
//! `on*` attribute is on the allow-list.

use log::trace;

/// Tags and attributes allowed to survive sanitization.
#[derive(Debug, Clone)]
pub struct AllowList {
    pub tags: &'static [&'static str],
    pub attributes: &'static [&'static str],
}

/// Block and inline text structure, links, lists, tables, images, code and
/// line breaks. Nothing that can carry script.
pub const DEFAULT_ALLOW_LIST: AllowList = AllowList {
    tags: &[
        "p", "b", "i", "em", "strong", "a", "ul", "ol", "li", "h1", "h2", "h3", "h4", "h5", "h6",
        "blockquote", "pre", "code", "table", "thead", "tbody", "tr", "th", "td", "hr", "br",
        "div", "span", "img", "del", "input",
    ],
    attributes: &[
        "href", "title", "alt", "src", "class", "type", "checked", "disabled",
    ],
};

const VOID_ELEMENTS: &[&str] = &["br", "hr", "img", "input"];

impl AllowList {
    fn allows_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(name))
    }

    fn allows_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug)]
struct Tag {
    name: String,
    closing: bool,
    attrs: Vec<(String, Option<String>)>,
    /// Bytes consumed from the opening `<`
    len: usize,
}

/// Rewrites a markup fragment so that only allow-listed tags and attributes
/// remain. Text content is passed through verbatim.
pub fn sanitize(markup: &str, allow: &AllowList) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut rest = markup;

    while let Some(pos) = rest.find('<') {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];

        let Some(tag) = parse_tag(tail) else {
            // A bare '<' that does not open a tag.
            out.push_str("&lt;");
            rest = &tail[1..];
            continue;
        };

        if tag.name == "script" || tag.name == "style" {
            trace!("Dropping {} element and its content", tag.name);
            if tag.closing {
                rest = &tail[tag.len..];
            } else {
                let after = &tail[tag.len..];
                match find_closing(after, &tag.name) {
                    Some(end) => rest = &after[end..],
                    // Unterminated: drop everything that follows.
                    None => return out,
                }
            }
        } else if allow.allows_tag(&tag.name) {
            emit_tag(&mut out, &tag, allow);
            rest = &tail[tag.len..];
        } else {
            // Disallowed tag: drop the tag itself, keep surrounding content.
            trace!("Stripping disallowed tag {}", tag.name);
            rest = &tail[tag.len..];
        }
    }

    out.push_str(rest);
    out
}

/// Parses one tag starting at a `<`. Comments and markup declarations are
/// returned under reserved names so the caller drops them.
fn parse_tag(input: &str) -> Option<Tag> {
    let bytes = input.as_bytes();

    if input[1..].starts_with("!--") {
        let end = input.find("-->")?;
        return Some(Tag {
            name: "!comment".to_string(),
            closing: false,
            attrs: Vec::new(),
            len: end + 3,
        });
    }
    if bytes.get(1) == Some(&b'!') || bytes.get(1) == Some(&b'?') {
        let end = input.find('>')?;
        return Some(Tag {
            name: "!declaration".to_string(),
            closing: false,
            attrs: Vec::new(),
            len: end + 1,
        });
    }

    let mut i = 1;
    let mut closing = false;
    if bytes.get(i) == Some(&b'/') {
        closing = true;
        i += 1;
    }

    let name_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphanumeric() {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = input[name_start..i].to_ascii_lowercase();

    let mut attrs = Vec::new();
    loop {
        while i < bytes.len() && bytes[i].is_ascii_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            // Unterminated tag.
            return None;
        }
        match bytes[i] {
            b'>' => {
                i += 1;
                break;
            }
            b'/' => {
                i += 1;
            }
            _ => {
                let attr_start = i;
                while i < bytes.len()
                    && !bytes[i].is_ascii_whitespace()
                    && !matches!(bytes[i], b'=' | b'>' | b'/')
                {
                    i += 1;
                }
                if i == attr_start {
                    return None;
                }
                let attr_name = input[attr_start..i].to_ascii_lowercase();

                while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
                let value = if bytes.get(i) == Some(&b'=') {
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                        i += 1;
                    }
                    if matches!(bytes.get(i), Some(&b'"') | Some(&b'\'')) {
                        let quote = bytes[i];
                        i += 1;
                        let value_start = i;
                        while i < bytes.len() && bytes[i] != quote {
                            i += 1;
                        }
                        if i >= bytes.len() {
                            return None;
                        }
                        let value = input[value_start..i].to_string();
                        i += 1;
                        Some(value)
                    } else {
                        let value_start = i;
                        while i < bytes.len() && !bytes[i].is_ascii_whitespace() && bytes[i] != b'>'
                        {
                            i += 1;
                        }
                        Some(input[value_start..i].to_string())
                    }
                } else {
                    None
                };
                attrs.push((attr_name, value));
            }
        }
    }

    Some(Tag {
        name,
        closing,
        attrs,
        len: i,
    })
}

fn emit_tag(out: &mut String, tag: &Tag, allow: &AllowList) {
    if tag.closing {
        if !VOID_ELEMENTS.contains(&tag.name.as_str()) {
            out.push_str("</");
            out.push_str(&tag.name);
            out.push('>');
        }
        return;
    }

    out.push('<');
    out.push_str(&tag.name);
    for (name, value) in &tag.attrs {
        if !allow.allows_attribute(name) {
            continue;
        }
        match value {
            Some(value) => {
                if matches!(name.as_str(), "href" | "src") && is_unsafe_url(value) {
                    continue;
                }
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                // Values arrive entity-escaped; only the quote needs care.
                out.push_str(&value.replace('"', "&quot;"));
                out.push('"');
            }
            None => {
                out.push(' ');
                out.push_str(name);
            }
        }
    }
    out.push('>');
}

fn is_unsafe_url(value: &str) -> bool {
    let normalized: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    normalized.starts_with("javascript:")
        || normalized.starts_with("vbscript:")
        || normalized.starts_with("data:text/html")
}

/// Finds the end of the matching close tag for `name` (already lower-case),
/// returning the offset just past its `>`.
fn find_closing(input: &str, name: &str) -> Option<usize> {
    let lower = input.to_ascii_lowercase();
    let at = lower.find(&format!("</{name}"))?;
    let end = lower[at..].find('>')?;
    Some(at + end + 1)
}
