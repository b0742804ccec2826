use crate::types::TemplateContext;
use crate::utils::{escape_attr, escape_html};

const STYLE: &str = "body{font-family:sans-serif;margin:0}\
header{display:flex;gap:1em;align-items:center;padding:.6em 1em;background:#f4f4f4}\
.layout{display:flex;gap:2em;padding:1em}\
.sidebar{min-width:14em}\
.content{flex:1;max-width:52em}\
.fab a,.fab button{margin-right:.8em}\
pre.patch{background:#f8f8f8;padding:1em;overflow:auto}\
.meta{color:#777;font-size:.9em}";

/// Component for handling HTML template rendering
#[derive(Default)]
pub struct TemplateComponent;

impl TemplateComponent {
    /// Create a new template component
    pub fn new() -> Self {
        Self
    }

    /// Render the HTML shell around a page
    pub fn render_shell(&self, context: &TemplateContext) -> String {
        format!(
            "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
<title>{title}</title><style>{style}</style></head><body>\
<header><a href=\"/a/list\">Home</a><a href=\"/a/list/all\">All pages</a>\
<a href=\"/a/history\">History</a><a href=\"/a/tarball\">Download</a>\
<form action=\"/a/search\" method=\"get\"><input type=\"text\" name=\"search\" placeholder=\"Search...\"></form>\
<form action=\"/e/new\" method=\"get\"><input type=\"text\" name=\"page\" placeholder=\"New page...\"></form>\
</header><div class=\"layout\"><aside class=\"sidebar\">{sidebar}</aside>\
<main class=\"content\">{fab}{content}</main></div></body></html>",
            title = escape_html(&context.title),
            style = STYLE,
            sidebar = context.sidebar,
            fab = context.fab,
            content = context.content,
        )
    }

    /// Generate a complete page with navigation and content
    pub fn render_page(&self, sidebar: &str, content: &str, fab: &str, title: &str) -> String {
        let context = TemplateContext {
            title: title.to_string(),
            content: content.to_string(),
            sidebar: sidebar.to_string(),
            fab: fab.to_string(),
        };
        self.render_shell(&context)
    }

    /// Editor for a page; `intname` is the target of the form post
    pub fn edit_form(&self, intname: &str, raw_body: &str) -> String {
        format!(
            "<form class=\"editor\" action=\"/e/{action}\" method=\"post\">\
<textarea name=\"body\" rows=\"24\" cols=\"80\">{body}</textarea>\
<p><label>Message <input type=\"text\" name=\"message\" size=\"60\"></label></p>\
<p><button type=\"submit\">Save</button></p></form>",
            action = escape_attr(intname),
            body = escape_html(raw_body),
        )
    }

    /// Multipart upload form for a page's attachments
    pub fn upload_form(&self, intname: &str) -> String {
        format!(
            "<form action=\"/a/file/upload/{action}\" method=\"post\" enctype=\"multipart/form-data\">\
<p><input type=\"file\" name=\"file\"></p>\
<p><label>Name (optional) <input type=\"text\" name=\"name\"></label></p>\
<p><button type=\"submit\">Upload</button></p></form>",
            action = escape_attr(intname),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shell_escapes_title_but_not_content() {
        let html = TemplateComponent::new().render_page("<nav/>", "<p>hi</p>", "", "A <b> title");
        assert!(html.contains("<title>A &lt;b&gt; title</title>"));
        assert!(html.contains("<p>hi</p>"));
        assert!(html.contains("<nav/>"));
    }

    #[test]
    fn edit_form_escapes_body() {
        let html = TemplateComponent::new().edit_form("docs/intro", "</textarea><script>");
        assert!(html.contains("action=\"/e/docs/intro\""));
        assert!(html.contains("&lt;/textarea&gt;&lt;script&gt;"));
    }
}
