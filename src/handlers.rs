use axum::{
    body::Body,
    extract::{Multipart, Path as AxumPath, Query, State},
    http::{header, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use std::path::Path;

use crate::components::{FabComponent, NavigationComponent, TemplateComponent};
use crate::errors::WikiError;
use crate::page::{list_pages, Attachment, ListScope, Page};
use crate::services::{GitService, SearchService};
use crate::types::{AppState, CommitInfo, WriteOutcome};
use crate::utils::naming::{is_blank, ATTACH_DIR_SUFFIX, HOMEPAGE};
use crate::utils::{content_type_for, escape_attr, escape_html, is_revision, normalize_path};

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NewPageParams {
    page: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EditForm {
    body: Option<String>,
    message: Option<String>,
    markdown: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    search: Option<String>,
}

/// Handle root path requests
pub async fn handle_root() -> Redirect {
    Redirect::to("/a/list")
}

/// Show a page, or its raw body (`/{page}/raw`), or append to it (`/{page}/append?text=`)
pub async fn handle_page(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(params): Query<PageParams>,
) -> Result<Response, WikiError> {
    let path = normalize_path(&path);
    log::info!("Page request received: '{}'", path);

    if let Some(name) = path.strip_suffix("/raw") {
        let page = named_page(&state.git, name)?;
        return Ok(plain_text(page.raw_body().to_string()));
    }

    if let Some(name) = path.strip_suffix("/append") {
        let mut page = named_page(&state.git, name)?;
        page.append(params.text.as_deref().unwrap_or_default())?;
        return Ok(Redirect::to(&format!("/{}", page.basename())).into_response());
    }

    let page = named_page(&state.git, &path)?;
    if page.is_tracked() {
        return Ok(show_page(&state.git, &page, page.title()));
    }

    if state.git.root().join(page.basename()).is_dir() {
        let home = Page::new(&state.git, &format!("{}/{}", page.basename(), HOMEPAGE));
        log::debug!("'{}' is a directory, redirecting to {}", path, home.basename());
        return Ok(Redirect::to(&format!("/e/{}", home.basename())).into_response());
    }

    log::debug!("'{}' is untracked, redirecting to editor", path);
    Ok(Redirect::to(&format!("/e/{}", page.basename())).into_response())
}

/// Edit form; `/e/new?page=` redirects to the editor of the named page
pub async fn handle_edit(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Query(params): Query<NewPageParams>,
) -> Result<Response, WikiError> {
    let path = normalize_path(&path);
    if path == "new" {
        let page = named_page(&state.git, params.page.as_deref().unwrap_or_default())?;
        return Ok(Redirect::to(&format!("/e/{}", page.basename())).into_response());
    }

    let page = named_page(&state.git, &path)?;
    let templates = TemplateComponent::new();
    let (heading, back) = if page.is_tracked() {
        (format!("Edit {}", page.title()), format!("/{}", page.intname()))
    } else {
        (format!("Create {}", page.title()), "/".to_string())
    };

    let mut content = format!("<h1>{}</h1>", escape_html(&heading));
    content.push_str(&format!("<p><a href=\"{}\">Back</a></p>", escape_attr(&back)));
    content.push_str(&templates.edit_form(page.intname(), page.raw_body()));
    content.push_str(&attachments_html(&page));
    content.push_str(&format!(
        "<p><a href=\"/a/file/upload/{}\">Attach a file</a></p>",
        escape_attr(page.intname())
    ));

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html(page.intname());
    Ok(Html(templates.render_page(&sidebar, &content, "", &heading)).into_response())
}

/// Save a page, or render a preview for `/e/preview` and `/e/{dir}/preview`
pub async fn handle_save(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Form(form): Form<EditForm>,
) -> Result<Response, WikiError> {
    let path = normalize_path(&path);
    if path == "preview" || path.ends_with("/preview") {
        let markdown = form.markdown.unwrap_or_default();
        return Ok(Html(Page::preview(&markdown)).into_response());
    }

    let mut page = named_page(&state.git, &path)?;
    let outcome = page.update(&form.body.unwrap_or_default(), form.message.as_deref())?;
    log_outcome(&outcome, page.basename());
    Ok(Redirect::to(&format!("/{}", page.basename())).into_response())
}

/// In-place edit: save the body and answer with the rendered page
pub async fn handle_edit_in_place(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    Form(form): Form<EditForm>,
) -> Result<Html<String>, WikiError> {
    let mut page = named_page(&state.git, &normalize_path(&path))?;
    let outcome = page.update(&form.body.unwrap_or_default(), None)?;
    log_outcome(&outcome, page.basename());
    Ok(Html(page.body()))
}

pub async fn handle_delete(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Html<String>, WikiError> {
    let mut page = named_page(&state.git, &normalize_path(&path))?;
    let outcome = page.delete()?;
    log_outcome(&outcome, page.basename());
    Ok(Html(format!("Deleted {}", escape_html(page.basename()))))
}

/// Page history, or the page pinned to a revision (`/h/{page}/{rev}`)
pub async fn handle_history(
    State(state): State<AppState>,
    AxumPath(rest): AxumPath<String>,
) -> Result<Response, WikiError> {
    let rest = normalize_path(&rest);
    let (name, revision) = split_revision(&rest);

    if let Some(rev) = revision {
        let page = Page::at_revision(&state.git, name, Some(rev));
        if page.basename().is_empty() {
            return Err(WikiError::InvalidPath);
        }
        return Ok(show_page(&state.git, &page, format!("Version {}", rev)));
    }

    let page = named_page(&state.git, name)?;
    let history = page.history().ok_or(WikiError::NotFound)?;
    let mut content = format!("<h1>History of {}</h1>", escape_html(&page.title()));
    content.push_str(&format!("<p><a href=\"/{0}\">{1}</a></p>", escape_attr(page.intname()), escape_html(&page.title())));
    content.push_str(&history_table(&history, |commit| {
        format!(
            "<a href=\"/h/{0}/{1}\">view</a> <a href=\"/d/{0}/{1}\">diff</a>",
            escape_attr(page.intname()),
            commit.id
        )
    }));

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html(page.intname());
    let html = TemplateComponent::new().render_page(&sidebar, &content, "", "History");
    Ok(Html(html).into_response())
}

/// Diff view of a page against a revision
pub async fn handle_diff(
    State(state): State<AppState>,
    AxumPath(rest): AxumPath<String>,
) -> Result<Html<String>, WikiError> {
    let rest = normalize_path(&rest);
    let (name, Some(rev)) = split_revision(&rest) else {
        return Err(WikiError::InvalidPath);
    };
    let page = named_page(&state.git, name)?;

    let mut content = format!("<h1>Diff of {}</h1>", escape_html(&page.title()));
    content.push_str(&format!(
        "<p><a href=\"/{0}\">{1}</a> <a href=\"/a/patch/{0}/{2}\">Download patch</a></p>",
        escape_attr(page.intname()),
        escape_html(&page.title()),
        rev
    ));
    content.push_str(&format!("<pre class=\"patch\">{}</pre>", escape_html(&page.delta(rev))));

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html(page.intname());
    Ok(Html(TemplateComponent::new().render_page(&sidebar, &content, "", "Diff")))
}

/// Raw patch download
pub async fn handle_patch(
    State(state): State<AppState>,
    AxumPath(rest): AxumPath<String>,
) -> Result<Response, WikiError> {
    let rest = normalize_path(&rest);
    let (name, Some(rev)) = split_revision(&rest) else {
        return Err(WikiError::InvalidPath);
    };
    let page = named_page(&state.git, name)?;
    Ok(download(page.delta(rev).into_bytes(), "text/x-diff", "patch.diff"))
}

/// Top-level pages
pub async fn handle_list(State(state): State<AppState>) -> Html<String> {
    render_listing(&state.git, ListScope::TopLevel, "Home")
}

/// `/a/list/all` lists every page, any other segment lists that directory
pub async fn handle_list_dir(
    State(state): State<AppState>,
    AxumPath(dir): AxumPath<String>,
) -> Html<String> {
    let dir = normalize_path(&dir);
    if dir == "all" {
        return render_listing(&state.git, ListScope::All, "All pages");
    }
    render_listing(&state.git, ListScope::Directory(&dir), &dir)
}

/// Handle search requests
pub async fn handle_search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Html<String> {
    let query = params.search.unwrap_or_default();
    log::info!("Search request received for query: '{}'", query);

    let start_time = std::time::Instant::now();
    let results = SearchService::new(&state.git).search(&query);

    let mut content = format!("<h1>Search results for '{}'</h1>", escape_html(&query));
    if results.is_empty() {
        content.push_str("<p>No matches.</p>");
    } else {
        content.push_str("<ul class=\"search-results\">");
        for result in &results {
            content.push_str(&format!(
                "<li><a href=\"/{}\">{}</a> <span class=\"meta\">line {}</span><br>{}</li>",
                escape_attr(&result.page),
                escape_html(&result.title),
                result.line_number,
                escape_html(&result.excerpt)
            ));
        }
        content.push_str("</ul>");
    }

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html("");
    let page = TemplateComponent::new().render_page(&sidebar, &content, "", "Search Results");
    log::info!("Search request completed in {:?}ms", start_time.elapsed().as_millis());
    Html(page)
}

/// Repository-wide history with revert links
pub async fn handle_branch_history(State(state): State<AppState>) -> Result<Html<String>, WikiError> {
    let history = state.git.log(None, None)?;
    let mut content = String::from("<h1>History</h1>");
    content.push_str(&history_table(&history, |commit| {
        format!("<a href=\"/a/revert_branch/{}\">revert to here</a>", commit.id)
    }));

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html("");
    Ok(Html(TemplateComponent::new().render_page(&sidebar, &content, "", "History")))
}

pub async fn handle_revert_branch(
    State(state): State<AppState>,
    AxumPath(sha): AxumPath<String>,
) -> Result<Redirect, WikiError> {
    if !is_revision(&sha) {
        return Err(WikiError::InvalidPath);
    }
    let id = state.git.revert_to(&sha)?;
    log::info!("Reverted branch to {} as {}", sha, id);
    Ok(Redirect::to("/a/history"))
}

/// Gzipped tarball of HEAD
pub async fn handle_tarball(State(state): State<AppState>) -> Result<Response, WikiError> {
    let bytes = state.git.archive("HEAD", "wiki/")?;
    Ok(download(bytes, "application/x-gzip", "archive.tgz"))
}

pub async fn handle_upload_form(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
) -> Result<Html<String>, WikiError> {
    let page = named_page(&state.git, &normalize_path(&path))?;
    let templates = TemplateComponent::new();
    let mut content = format!("<h1>Attach a file to {}</h1>", escape_html(&page.title()));
    content.push_str(&format!("<p><a href=\"/{0}\">{1}</a></p>", escape_attr(page.intname()), escape_html(&page.title())));
    content.push_str(&templates.upload_form(page.intname()));
    content.push_str(&attachments_html(&page));

    let sidebar = NavigationComponent::new(&state.git).build_sidebar_html(page.intname());
    Ok(Html(templates.render_page(&sidebar, &content, "", "Attach File")))
}

/// Multipart upload: `file` carries the bytes, `name` an optional display name
pub async fn handle_upload(
    State(state): State<AppState>,
    AxumPath(path): AxumPath<String>,
    mut multipart: Multipart,
) -> Result<Redirect, WikiError> {
    let mut upload: Option<(String, Vec<u8>)> = None;
    let mut display_name: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| WikiError::UploadError(e.to_string()))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| WikiError::UploadError(e.to_string()))?;
                upload = Some((filename, bytes.to_vec()));
            }
            Some("name") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| WikiError::UploadError(e.to_string()))?;
                display_name = Some(text).filter(|name| !is_blank(name));
            }
            _ => {}
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| WikiError::UploadError("no file in upload".into()))?;
    let page = named_page(&state.git, &normalize_path(&path))?;
    let outcome = Attachment::save(&page, &bytes, &filename, display_name.as_deref())?;
    log_outcome(&outcome, page.basename());
    Ok(Redirect::to(&format!("/e/{}", page.basename())))
}

/// `POST /a/file/delete/{page}_files/{file}`
pub async fn handle_file_delete(
    State(state): State<AppState>,
    AxumPath(rest): AxumPath<String>,
) -> Result<Html<String>, WikiError> {
    let rest = normalize_path(&rest);
    let (dir, filename) = rest.rsplit_once('/').ok_or(WikiError::InvalidPath)?;
    if !dir.ends_with(ATTACH_DIR_SUFFIX) || !is_plain_filename(filename) {
        return Err(WikiError::InvalidPath);
    }

    let page = Page::from_attachment_dir(&state.git, dir);
    let outcome = Attachment::delete(&page, filename)?;
    log_outcome(&outcome, page.basename());
    Ok(Html(format!("Deleted {}", escape_html(filename))))
}

/// Serve an attachment as `/f/{page}/{file}`
pub async fn handle_file(
    State(state): State<AppState>,
    AxumPath(rest): AxumPath<String>,
) -> Result<Response, WikiError> {
    let rest = normalize_path(&rest);
    let (name, filename) = rest.rsplit_once('/').ok_or(WikiError::InvalidPath)?;
    if !is_plain_filename(filename) {
        return Err(WikiError::InvalidPath);
    }

    let page = named_page(&state.git, name)?;
    let path = page.attachment_dir().join(filename);
    if !path.is_file() {
        log::warn!("Attachment not found: {:?}", path);
        return Err(WikiError::NotFound);
    }

    let bytes = std::fs::read(&path)?;
    let mut resp = Response::new(Body::from(bytes));
    resp.headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type_for(&path)));
    Ok(resp)
}

fn named_page<'g>(git: &'g GitService, name: &str) -> Result<Page<'g>, WikiError> {
    let page = Page::new(git, name);
    if page.basename().is_empty() {
        log::warn!("Rejected page name '{}'", name);
        return Err(WikiError::InvalidPath);
    }
    Ok(page)
}

/// Split a trailing 40-hex revision segment off a path
fn split_revision(rest: &str) -> (&str, Option<&str>) {
    match rest.rsplit_once('/') {
        Some((name, rev)) if is_revision(rev) => (name, Some(rev)),
        _ => (rest, None),
    }
}

fn is_plain_filename(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && Path::new(name).file_name().is_some_and(|f| f == name)
}

fn log_outcome(outcome: &WriteOutcome, page: &str) {
    match outcome {
        WriteOutcome::Committed(id) => log::info!("Committed {} for '{}'", id, page),
        WriteOutcome::CommitFailed(reason) => log::warn!("Saved '{}' without a commit: {}", page, reason),
        WriteOutcome::Unchanged => log::debug!("Nothing to do for '{}'", page),
    }
}

fn show_page(git: &GitService, page: &Page<'_>, title: String) -> Response {
    let rendered = page.rendered();
    let mut content = format!("<h1>{}</h1>", escape_html(&page.title()));

    if let Some(rev) = page.revision() {
        content.push_str(&format!(
            "<p class=\"meta\">Version {} of <a href=\"/{}\">{}</a></p>",
            escape_html(rev),
            escape_attr(page.intname()),
            escape_html(&page.title())
        ));
    }
    if let Some(date) = page.updated_at() {
        content.push_str(&format!("<p class=\"meta\">Last edited {}</p>", escape_html(&date)));
    }
    content.push_str(&rendered.html);
    content.push_str(&attachments_html(page));

    let fab = FabComponent::new();
    let fab_html = fab.generate_fab_html(&fab.generate_actions(page.intname(), page.is_tracked()));
    let sidebar = NavigationComponent::new(git).build_sidebar_with_toc(page.intname(), &rendered.toc);
    Html(TemplateComponent::new().render_page(&sidebar, &content, &fab_html, &title)).into_response()
}

fn attachments_html(page: &Page<'_>) -> String {
    let attachments = page.attachments();
    if attachments.is_empty() {
        return String::new();
    }

    let mut html = String::from("<h3>Attachments</h3><ul class=\"attachments\">");
    for attachment in &attachments {
        let link = escape_attr(&attachment.link_path());
        let label = if attachment.is_image() {
            format!("<img src=\"{}\" alt=\"{}\">", link, escape_attr(&attachment.nice_name()))
        } else {
            escape_html(&attachment.name())
        };
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a> <span class=\"meta\">{}</span> \
<form action=\"{}\" method=\"post\" style=\"display:inline\"><button type=\"submit\">delete</button></form></li>",
            link,
            label,
            escape_html(&attachment.size()),
            escape_attr(&attachment.delete_path())
        ));
    }
    html.push_str("</ul>");
    html
}

fn history_table(history: &[CommitInfo], actions: impl Fn(&CommitInfo) -> String) -> String {
    let mut html = String::from("<table class=\"history\"><tr><th>Commit</th><th>Date</th><th>Author</th><th>Message</th><th></th></tr>");
    for commit in history {
        html.push_str(&format!(
            "<tr><td><code>{}</code></td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            commit.short_id,
            escape_html(&commit.date),
            escape_html(&commit.author),
            escape_html(&commit.summary),
            actions(commit)
        ));
    }
    html.push_str("</table>");
    html
}

fn render_listing(git: &GitService, scope: ListScope<'_>, title: &str) -> Html<String> {
    let pages = list_pages(git, scope);
    let mut content = format!("<h1>{}</h1>", escape_html(title));
    if pages.is_empty() {
        content.push_str("<p>No pages yet. <a href=\"/e/home\">Create the home page</a>.</p>");
    }
    content.push_str("<ul class=\"listing\">\n");
    for page in &pages {
        content.push_str(&format!(
            "  <li><a href=\"/{}\">{}</a></li>\n",
            escape_attr(page.intname()),
            escape_html(&page.title())
        ));
    }
    content.push_str("</ul>\n");

    let sidebar = NavigationComponent::new(git).build_sidebar_html("");
    Html(TemplateComponent::new().render_page(&sidebar, &content, "", title))
}

fn plain_text(body: String) -> Response {
    (
        [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        body,
    )
        .into_response()
}

fn download(bytes: Vec<u8>, content_type: &'static str, filename: &'static str) -> Response {
    let disposition = format!("filename={}", filename);
    let mut resp = Response::new(Body::from(bytes));
    let headers = resp.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_trailing_revision() {
        let rev = "0123456789abcdef0123456789abcdef01234567";
        let path = format!("docs/intro/{}", rev);
        assert_eq!(split_revision(&path), ("docs/intro", Some(rev)));
        assert_eq!(split_revision("docs/intro"), ("docs/intro", None));
    }

    #[test]
    fn rejects_dotted_and_nested_filenames() {
        assert!(is_plain_filename("chart.png"));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename(".hidden"));
        assert!(!is_plain_filename(""));
    }
}
