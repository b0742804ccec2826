use std::collections::HashMap;
use std::panic;

use log::{debug, warn};
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::errors::WikiError;
use crate::types::MarkdownResult;
use crate::utils::escape_attr;

/// Service for handling markdown rendering
#[derive(Clone, Copy, Default)]
pub struct MarkdownService;

impl MarkdownService {
    /// Create a new markdown service
    pub fn new() -> Self {
        Self
    }

    /// Render markdown to HTML
    pub fn render(&self, content: &str) -> Result<String, WikiError> {
        Ok(self.render_with_toc(content)?.html)
    }

    /// Render markdown with heading anchors and a table of contents.
    ///
    /// A panic inside the parser is reported as [`WikiError::RenderError`]
    /// so callers can fall back to the raw text.
    pub fn render_with_toc(&self, content: &str) -> Result<MarkdownResult, WikiError> {
        if content.is_empty() {
            return Ok(MarkdownResult { html: String::new(), toc: String::new(), title: None });
        }
        match panic::catch_unwind(|| render_markdown_with_toc(content)) {
            Ok(result) => {
                debug!("Rendered {} bytes of markdown into {} bytes of HTML", content.len(), result.html.len());
                Ok(result)
            }
            Err(_) => {
                warn!("Markdown renderer panicked on {} bytes of input", content.len());
                Err(WikiError::RenderError("markdown renderer panicked".to_string()))
            }
        }
    }
}

fn options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options
}

fn render_markdown_with_toc(content: &str) -> MarkdownResult {
    let options = options();

    // First pass: collect headings
    let mut headings: Vec<(u32, String, String)> = Vec::new(); // (level, id, text)
    let mut in_heading: Option<u32> = None;
    let mut buf = String::new();
    let mut id_counts: HashMap<String, usize> = HashMap::new();

    for ev in Parser::new_ext(content, options) {
        match ev {
            Event::Start(Tag::Heading { level, .. }) => {
                in_heading = Some(heading_level_to_u32(level));
                buf.clear();
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some(lvl) = in_heading.take() {
                    let mut id = slugify(&buf);
                    if id.is_empty() { id = format!("h{}", lvl); }
                    let count = id_counts.entry(id.clone()).or_insert(0);
                    if *count > 0 { id = format!("{}-{}", id, *count); }
                    *count += 1;
                    headings.push((lvl, id, buf.clone()));
                }
                buf.clear();
            }
            Event::Text(t) | Event::Code(t) => {
                if in_heading.is_some() { buf.push_str(&t); }
            }
            Event::SoftBreak | Event::HardBreak => {
                if in_heading.is_some() { buf.push(' '); }
            }
            _ => {}
        }
    }

    // Second pass: swap heading tags for ones carrying the collected ids
    let mut out = String::new();
    let mut idx = 0usize;
    let events = Parser::new_ext(content, options).map(|ev| match ev {
        Event::Start(Tag::Heading { level, .. }) => {
            let lvl = heading_level_to_u32(level);
            let id = headings.get(idx).map(|(_, id, _)| id.as_str()).unwrap_or("");
            idx += 1;
            Event::Html(format!("<h{} id=\"{}\">", lvl, escape_attr(id)).into())
        }
        Event::End(TagEnd::Heading(level)) => {
            Event::Html(format!("</h{}>\n", heading_level_to_u32(level)).into())
        }
        other => other,
    });
    html::push_html(&mut out, events);

    MarkdownResult {
        html: out,
        toc: build_toc_html(&headings),
        title: first_heading_text(&headings),
    }
}

/// Build HTML for the Table of Contents
fn build_toc_html(headings: &[(u32, String, String)]) -> String {
    if headings.is_empty() { return String::new(); }
    let mut html = String::new();
    html.push_str("<nav class=\"toc\"><div class=\"toc-title\">Contents</div>");
    let mut current = 0u32;
    for (level, id, title) in headings {
        while current < *level { html.push_str("<ul>"); current += 1; }
        while current > *level { html.push_str("</ul>"); current -= 1; }
        html.push_str(&format!("<li><a href=\"#{}\">{}</a></li>", escape_attr(id), crate::utils::escape_html(title)));
    }
    while current > 0 { html.push_str("</ul>"); current -= 1; }
    html.push_str("</nav>");
    html
}

fn heading_level_to_u32(level: HeadingLevel) -> u32 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

/// Create URL-friendly slug from heading text
fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_dash = false;
    for ch in text.chars() {
        let c = ch.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
            last_dash = false;
        } else if (c.is_ascii_whitespace() || c == '-' || c == '_') && !last_dash && !out.is_empty() {
            out.push('-');
            last_dash = true;
        }
    }
    if out.ends_with('-') { out.pop(); }
    out
}

fn first_heading_text(headings: &[(u32, String, String)]) -> Option<String> {
    headings
        .iter()
        .find(|(lvl, _, text)| *lvl == 1 && !text.trim().is_empty())
        .map(|(_, _, text)| text.clone())
}
