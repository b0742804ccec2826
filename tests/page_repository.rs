use std::fs;

use gitwiki::{list_pages, Attachment, Config, GitService, ListScope, Page, SearchService, WriteOutcome};
use tempfile::TempDir;

fn wiki() -> (TempDir, GitService) {
    let dir = TempDir::new().unwrap();
    let config = Config::with_custom(dir.path().to_path_buf(), None, None);
    let git = GitService::open_or_init(&config).unwrap();
    (dir, git)
}

fn names(pages: &[Page<'_>]) -> Vec<String> {
    pages.iter().map(|p| p.intname().to_string()).collect()
}

#[test]
fn update_tracks_and_renders_wiki_links() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "Foo Bar");
    assert!(!page.is_tracked());

    let outcome = page.update("Hello [[Baz Qux]]", None).unwrap();
    assert!(outcome.is_committed());
    assert!(page.is_tracked());
    assert_eq!(page.raw_body(), "Hello [[BazQux]]");
    assert!(page.body().contains("<a href=\"/baz_qux\">BazQux</a>"));
    assert_eq!(fs::read_to_string(page.path()).unwrap(), "Hello [[BazQux]]");

    let commit = page.commit().unwrap();
    assert_eq!(commit.summary, "created FooBar");
}

#[test]
fn second_update_is_an_edit_with_message() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "notes");
    page.update("one", None).unwrap();
    page.update("two", Some("fix typo")).unwrap();

    let history = page.history().unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].summary, "edited Notes : fix typo");
    assert_eq!(history[1].summary, "created Notes");
    assert_eq!(Page::new(&git, "notes").raw_body(), "two");
}

#[test]
fn rapid_updates_keep_the_last_write() {
    let (_dir, git) = wiki();
    let mut first = Page::new(&git, "race");
    let mut second = Page::new(&git, "race");
    first.update("A", None).unwrap();
    second.update("B", None).unwrap();

    assert_eq!(Page::new(&git, "race").raw_body(), "B");
    assert_eq!(Page::new(&git, "race").history().unwrap().len(), 2);
}

#[test]
fn unchanged_update_reports_commit_failure() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "same");
    page.update("text", None).unwrap();

    let outcome = page.update("text", None).unwrap();
    assert!(matches!(outcome, WriteOutcome::CommitFailed(_)));
    assert_eq!(page.history().unwrap().len(), 1);
}

#[test]
fn untracked_page_reads_empty() {
    let (_dir, git) = wiki();
    let page = Page::new(&git, "ghost");
    assert_eq!(page.raw_body(), "");
    assert!(page.history().is_none());
    assert!(page.commit().is_none());
    assert!(page.updated_at().is_none());
}

#[test]
fn pinned_revision_reads_old_body() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "doc");
    page.update("first version", None).unwrap();
    let first = page.commit().unwrap().id.clone();
    page.update("second version", None).unwrap();

    let old = Page::at_revision(&git, "doc", Some(&first));
    assert_eq!(old.raw_body(), "first version");
    assert_eq!(old.commit().unwrap().id, first);
    assert_eq!(Page::new(&git, "doc").raw_body(), "second version");

    let patch = Page::new(&git, "doc").delta(&first);
    assert!(patch.contains("first version"));
    assert!(patch.contains("second version"));
}

#[test]
fn append_adds_a_paragraph() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "log");
    page.update("start", None).unwrap();
    page.append("more").unwrap();
    assert_eq!(Page::new(&git, "log").raw_body(), "start\n\nmore");
}

#[test]
fn delete_removes_page_and_attachments() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "docs/Guide");
    page.update("guide", None).unwrap();
    Attachment::save(&page, b"\x89PNG", "Diagram One.png", None).unwrap();
    assert_eq!(page.attachments().len(), 1);

    let outcome = page.delete().unwrap();
    assert!(outcome.is_committed());
    assert!(!page.path().exists());
    assert!(!page.attachment_dir().exists());
    assert!(!page.is_tracked());
    assert_eq!(git.log(None, None).unwrap()[0].summary, "removed DocsGuide");

    assert!(matches!(page.delete().unwrap(), WriteOutcome::Unchanged));
}

#[test]
fn attachments_save_and_delete() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "gallery");
    page.update("pics", None).unwrap();

    Attachment::save(&page, b"data", "My Photo.JPG", None).unwrap();
    Attachment::save(&page, b"0123456789", "upload.pdf", Some("Annual Report")).unwrap();

    let attachments = page.attachments();
    let names: Vec<String> = attachments.iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["annual_report.pdf", "my_photo.JPG"]);
    assert!(attachments[1].is_image());
    assert_eq!(attachments[0].size(), "10 bytes");
    assert_eq!(attachments[0].link_path(), "/f/gallery/annual_report.pdf");
    assert_eq!(git.log(None, None).unwrap()[0].summary, "uploaded annual_report.pdf for Gallery");

    Attachment::delete(&page, "annual_report.pdf").unwrap();
    assert_eq!(page.attachments().len(), 1);
    assert!(matches!(
        Attachment::delete(&page, "annual_report.pdf").unwrap(),
        WriteOutcome::Unchanged
    ));
}

#[test]
fn listing_scopes() {
    let (_dir, git) = wiki();
    Page::new(&git, "a").update("a", None).unwrap();
    let mut b = Page::new(&git, "dir/b");
    b.update("b", None).unwrap();
    Attachment::save(&b, b"x", "pic.png", None).unwrap();
    Page::new(&git, "dir/sub/c").update("c", None).unwrap();

    assert_eq!(names(&list_pages(&git, ListScope::TopLevel)), vec!["a"]);
    assert_eq!(names(&list_pages(&git, ListScope::All)), vec!["a", "dir/b", "dir/sub/c"]);
    assert_eq!(names(&list_pages(&git, ListScope::Directory("dir"))), vec!["dir/b"]);
    assert!(list_pages(&git, ListScope::Directory("nowhere")).is_empty());
}

#[test]
fn raw_list_recursive_and_flat() {
    let (_dir, git) = wiki();
    Page::new(&git, "a").update("a", None).unwrap();
    Page::new(&git, "dir/b").update("b", None).unwrap();

    let flat = Page::list(&git, false, None).unwrap();
    assert!(flat.contains_key("a.md"));
    assert!(flat["dir"].is_tree());
    assert!(!flat.contains_key("dir/b.md"));

    let deep = Page::list(&git, true, None).unwrap();
    assert!(deep.contains_key("dir/b.md"));

    let inside = Page::list(&git, false, Some("dir")).unwrap();
    assert_eq!(inside.keys().collect::<Vec<_>>(), vec!["dir/b.md"]);
}

#[test]
fn search_finds_committed_pages() {
    let (_dir, git) = wiki();
    Page::new(&git, "recipes/Pancakes").update("Mix FLOUR and milk", None).unwrap();
    Page::new(&git, "shopping").update("eggs\nflour", None).unwrap();

    let results = SearchService::new(&git).search("flour");
    let mut pages: Vec<&str> = results.iter().map(|r| r.page.as_str()).collect();
    pages.sort_unstable();
    assert_eq!(pages, vec!["recipes/pancakes", "shopping"]);

    let shopping = results.iter().find(|r| r.page == "shopping").unwrap();
    assert_eq!(shopping.line_number, 2);
    assert_eq!(shopping.title, "Shopping");

    assert!(SearchService::new(&git).search("").is_empty());
    assert!(SearchService::new(&git).search("nonexistent").is_empty());
}

#[test]
fn attachment_display_names_with_slashes_stay_flat() {
    let (_dir, git) = wiki();
    let mut page = Page::new(&git, "quarterly");
    page.update("numbers", None).unwrap();

    let outcome = Attachment::save(&page, b"data", "pic.png", Some("reports/q1")).unwrap();
    assert!(outcome.is_committed());
    assert!(page.attachment_dir().join("reports_q1.png").is_file());

    let names: Vec<String> = page.attachments().iter().map(|a| a.name()).collect();
    assert_eq!(names, vec!["reports_q1.png"]);

    Attachment::delete(&page, "reports_q1.png").unwrap();
    assert!(page.attachments().is_empty());
}

#[test]
fn delete_clears_nested_attachment_directories() {
    let (_dir, git) = wiki();
    let mut foo = Page::new(&git, "foo");
    foo.update("parent", None).unwrap();
    Attachment::save(&foo, b"x", "pic.png", None).unwrap();
    Page::new(&git, "foo_files/sub/child").update("nested", None).unwrap();

    let outcome = foo.delete().unwrap();
    assert!(outcome.is_committed());
    assert!(!foo.path().exists());
    assert!(!foo.attachment_dir().exists());
    assert!(!foo.is_tracked());
    assert!(!Page::new(&git, "foo_files/sub/child").is_tracked());
    assert_eq!(git.log(None, None).unwrap()[0].summary, "removed Foo");
}
