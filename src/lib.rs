//! Git Wiki - a wiki whose pages and attachments live in a git repository
//!
//! Every edit is a commit, page history is the repository log and diffs are
//! repository diffs. The core lives in [`page`]; [`handlers`] and
//! [`components`] are the HTTP surface on top of it.

pub mod components;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod logger;
pub mod page;
pub mod services;
pub mod types;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};

// Re-export commonly used items
pub use config::Config;
pub use errors::WikiError;
pub use page::{list_pages, Attachment, ListScope, Page};
pub use services::{GitService, MarkdownService, SearchService};
pub use types::{AppState, CommitInfo, SearchResult, WriteOutcome};

/// The full route table; most specific routes first, `/*path` catches pages
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::handle_root))
        .route("/e/*page", get(handlers::handle_edit).post(handlers::handle_save))
        .route("/eip/*page", post(handlers::handle_edit_in_place))
        .route("/delete/*page", post(handlers::handle_delete))
        .route("/h/*rest", get(handlers::handle_history))
        .route("/d/*rest", get(handlers::handle_diff))
        .route("/a/patch/*rest", get(handlers::handle_patch))
        .route("/a/list", get(handlers::handle_list))
        .route("/a/list/*dir", get(handlers::handle_list_dir))
        .route("/a/search", get(handlers::handle_search))
        .route("/a/history", get(handlers::handle_branch_history))
        .route("/a/revert_branch/:sha", get(handlers::handle_revert_branch))
        .route("/a/tarball", get(handlers::handle_tarball))
        .route(
            "/a/file/upload/*page",
            get(handlers::handle_upload_form).post(handlers::handle_upload),
        )
        .route("/a/file/delete/*rest", post(handlers::handle_file_delete))
        .route("/f/*rest", get(handlers::handle_file))
        .route("/*path", get(handlers::handle_page))
        .with_state(state)
}
