use tokio::sync::oneshot;
use tracing::info;

use taskboard_sync::{Scope, SyncConfig, SyncEngine};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let backend_url =
        std::env::var("TASKBOARD_BACKEND_URL").expect("TASKBOARD_BACKEND_URL to be set");
    let ws_url = std::env::var("TASKBOARD_WS_URL").expect("TASKBOARD_WS_URL to be set");
    let session_file = std::env::var("TASKBOARD_SESSION_FILE")
        .unwrap_or_else(|_| "taskboard-session.json".to_string());
    let scope = match std::env::var("TASKBOARD_SCOPE").as_deref() {
        Ok("admin") => Scope::Admin,
        _ => Scope::Employee,
    };

    let config = SyncConfig::new(&backend_url, &ws_url, session_file);
    let (mut engine, mut notifications) =
        SyncEngine::connect(&config, scope).expect("no session found, sign in first");

    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            info!(?notification, "notification");
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.expect("installing ctrl-c handler");
        let _ = shutdown_tx.send(());
    });

    info!(subject_id = engine.subject_id(), "Starting sync engine");
    engine.run(shutdown_rx).await.expect("sync engine failed");
}
