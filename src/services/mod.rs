pub mod git_service;
pub mod markdown_service;
pub mod search_service;

pub use git_service::GitService;
pub use markdown_service::MarkdownService;
pub use search_service::SearchService;
