use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use webmention_engine::config::EngineConfig;
use webmention_engine::fetch::ReqwestTransport;
use webmention_engine::mf2::ClassScanParser;
use webmention_engine::notify::NoopNotifier;
use webmention_engine::protocol::Engine;
use webmention_engine::server::{build_router, AppState};
use webmention_engine::store::{MemoryStore, Post};
use webmention_engine::types::PostId;
use webmention_engine::worker::{ClaimTracker, Dispatcher};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webmention_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let base_url = std::env::var("SITE_BASE_URL")
        .ok()
        .and_then(|raw| Url::parse(&raw).ok())
        .unwrap_or_else(|| Url::parse("https://example.com/").unwrap());
    let config = EngineConfig::new(base_url);

    let store = Arc::new(demo_store());
    let transport = Arc::new(ReqwestTransport::new().expect("building HTTP client"));
    let engine = Arc::new(Engine::new(
        config,
        store.clone(),
        store,
        transport,
        Arc::new(ClassScanParser),
        Arc::new(NoopNotifier),
    ));
    let tracker = Arc::new(ClaimTracker::new());
    let dispatcher = Arc::new(Dispatcher::new(engine, tracker));

    let app = build_router(AppState::new(dispatcher.clone()));

    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(dispatcher))
        .await
        .unwrap();
}

async fn shutdown_signal(dispatcher: Arc<Dispatcher>) {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown requested");
    dispatcher.shutdown_all().await;
}

/// A small in-memory site so the binary does something out of the box.
fn demo_store() -> MemoryStore {
    let store = MemoryStore::new();
    store.add_post(
        Post::new(PostId(1), "/note/2020/01/05/a1")
            .with_slugless_path("/note/2020/01/05")
            .with_short_path("/n/Ab3x")
            .with_historic_path("/2020/01/05/a1"),
    );
    store
}
