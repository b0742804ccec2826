use tokio::net::TcpListener;

use gitwiki::logger::Logger;
use gitwiki::{router, AppState, Config, GitService, WikiError};

#[tokio::main]
async fn main() -> Result<(), WikiError> {
    if let Err(e) = Logger::init() {
        eprintln!("Failed to install logger: {}", e);
    }

    let config = Config::from_env();
    let git = GitService::open_or_init(&config)?;
    log::info!("Serving wiki repository at {:?}", git.root());

    let addr = config.socket_addr();
    let state = AppState { git };
    let app = router(state);

    log::info!("Wiki listening on http://{}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await.map_err(WikiError::from)
}
