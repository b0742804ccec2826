use log::debug;

use crate::page::{list_pages, ListScope};
use crate::services::GitService;
use crate::utils::{escape_attr, escape_html};

/// Component for handling navigation and sidebar generation
pub struct NavigationComponent<'g> {
    git: &'g GitService,
}

impl<'g> NavigationComponent<'g> {
    /// Create a new navigation component
    pub fn new(git: &'g GitService) -> Self {
        Self { git }
    }

    /// Sidebar followed by the page's table of contents
    pub fn build_sidebar_with_toc(&self, current: &str, toc: &str) -> String {
        let mut html = self.build_sidebar_html(current);
        if !toc.is_empty() {
            html.push_str("<div class=\"sidebar-toc\"><h4>On This Page</h4>");
            html.push_str(toc);
            html.push_str("</div>");
        }
        html
    }

    /// Top-level pages, plus the pages of the current page's directory
    pub fn build_sidebar_html(&self, current: &str) -> String {
        let mut html = String::from("<div class=\"sidebar-nav\"><h3>Pages</h3>");
        html.push_str(&self.page_list(ListScope::TopLevel, current));

        if let Some((dir, _)) = current.rsplit_once('/') {
            html.push_str(&format!(
                "<h4><a href=\"/a/list/{}\">{}</a></h4>",
                escape_attr(dir),
                escape_html(dir)
            ));
            html.push_str(&self.page_list(ListScope::Directory(dir), current));
        }
        html.push_str("</div>");
        debug!("Built sidebar for '{}'", current);
        html
    }

    fn page_list(&self, scope: ListScope<'_>, current: &str) -> String {
        let mut html = String::from("<ul class=\"nav-list\">");
        for page in list_pages(self.git, scope) {
            let class = if page.intname() == current { " class=\"current\"" } else { "" };
            html.push_str(&format!(
                "<li{}><a href=\"/{}\">{}</a></li>",
                class,
                escape_attr(page.intname()),
                escape_html(&page.title())
            ));
        }
        html.push_str("</ul>");
        html
    }
}
