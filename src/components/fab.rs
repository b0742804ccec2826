use crate::utils::{escape_attr, escape_html};

/// Represents a page action button
pub struct FabAction {
    pub href: String,
    pub title: String,
    /// Submitted as a POST form instead of a plain link
    pub post: bool,
}

/// Component for the page action bar (edit, history, raw, attach, delete)
#[derive(Default)]
pub struct FabComponent;

impl FabComponent {
    pub fn new() -> Self {
        Self
    }

    /// Actions available for page `intname`; untracked pages can only be created
    pub fn generate_actions(&self, intname: &str, tracked: bool) -> Vec<FabAction> {
        if intname.is_empty() {
            return Vec::new();
        }
        let action = |href: String, title: &str, post: bool| FabAction { href, title: title.to_string(), post };

        if !tracked {
            return vec![action(format!("/e/{}", intname), "Create", false)];
        }
        vec![
            action(format!("/e/{}", intname), "Edit", false),
            action(format!("/h/{}", intname), "History", false),
            action(format!("/{}/raw", intname), "Raw", false),
            action(format!("/a/file/upload/{}", intname), "Attach", false),
            action(format!("/delete/{}", intname), "Delete", true),
        ]
    }

    /// Action bar HTML
    pub fn generate_fab_html(&self, actions: &[FabAction]) -> String {
        if actions.is_empty() {
            return String::new();
        }
        let mut html = String::from("<div class=\"fab\">");
        for action in actions {
            if action.post {
                html.push_str(&format!(
                    "<form action=\"{}\" method=\"post\" style=\"display:inline\"><button type=\"submit\">{}</button></form>",
                    escape_attr(&action.href),
                    escape_html(&action.title)
                ));
            } else {
                html.push_str(&format!(
                    "<a href=\"{}\">{}</a>",
                    escape_attr(&action.href),
                    escape_html(&action.title)
                ));
            }
        }
        html.push_str("</div>");
        html
    }
}
