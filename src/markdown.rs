//! Markdown rendering for episode descriptions.
//!
//! Descriptions are rendered with pulldown-cmark. Raw HTML embedded in the
//! markdown is not trusted: it is emitted as escaped text, so the only markup
//! in the output is what the markdown syntax itself produces. Link and image
//! destinations with a script-capable scheme (`javascript:`, `vbscript:`,
//! `data:`) are replaced with `#`.
//!
//! [`MarkdownCache`] is owned by a single build. Each uid is rendered at most
//! once per build and every consumer reads the same string; dropping the cache
//! at the end of the build (on success or failure) is what clears it.

use pulldown_cmark::{CowStr, Event, Options, Parser, Tag, html as md_html};
use std::collections::HashMap;

const UNSAFE_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// Render markdown to HTML with embedded raw HTML escaped. Output is trimmed.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_FOOTNOTES);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Link {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) => Event::Start(Tag::Image {
            link_type,
            dest_url: safe_destination(dest_url),
            title,
            id,
        }),
        other => other,
    });
    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    md_html::push_html(&mut html, parser);
    html.trim().to_string()
}

/// `dest` unless its scheme can run script, in which case `#`.
///
/// Browsers drop whitespace and control characters inside a scheme, so
/// those are ignored when matching.
fn safe_destination(dest: CowStr<'_>) -> CowStr<'_> {
    let normalized: String = dest
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    if UNSAFE_SCHEMES.iter().any(|s| normalized.starts_with(s)) {
        CowStr::Borrowed("#")
    } else {
        dest
    }
}

/// Build-scoped map from episode uid to rendered description HTML.
#[derive(Debug, Default)]
pub struct MarkdownCache {
    rendered: HashMap<String, String>,
}

impl MarkdownCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rendered HTML for `uid`, rendering `markdown` only on the first call.
    pub fn render(&mut self, uid: &str, markdown: &str) -> &str {
        self.rendered
            .entry(uid.to_string())
            .or_insert_with(|| render_markdown(markdown))
    }

    /// Number of uids rendered so far.
    pub fn rendered_count(&self) -> usize {
        self.rendered.len()
    }
}
