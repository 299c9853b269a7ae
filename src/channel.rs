use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, protocol::Message};
use tracing::{info, warn};
use url::Url;

use crate::models::{ClientFrame, PushEvent};

pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(3);

#[derive(Debug)]
pub enum ChannelEvent {
    Connected,
    Push(PushEvent),
    /// The server rejected the credentials during the handshake. Not retried;
    /// the engine clears the session.
    AuthFailed,
}

#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub ws_url: String,
    pub token: String,
    pub subject_id: i64,
    pub reconnect_backoff: Duration,
}

/// Owner handle for the connection task. Dropping it also tears the
/// connection down (the shutdown sender goes away); `close` additionally
/// waits for the task to finish.
pub struct ChannelHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Tears the connection down. No event is delivered after this returns.
    pub async fn close(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}

/// Opens one authenticated, auto-reconnecting connection scoped to the
/// subject. Push events arrive on the returned receiver in connection order.
pub fn spawn(config: ChannelConfig) -> (ChannelHandle, mpsc::Receiver<ChannelEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let task = tokio::spawn(run(config, tx, shutdown_rx));
    (
        ChannelHandle {
            shutdown: shutdown_tx,
            task,
        },
        rx,
    )
}

async fn run(config: ChannelConfig, tx: mpsc::Sender<ChannelEvent>, mut shutdown: watch::Receiver<bool>) {
    let url = match authenticated_url(&config.ws_url, &config.token) {
        Ok(url) => url,
        Err(err) => {
            warn!(error = %err, "Invalid realtime channel URL");
            return;
        }
    };

    loop {
        if *shutdown.borrow() {
            return;
        }

        match connect_async(url.as_str()).await {
            Ok((ws_stream, _)) => {
                info!(subject_id = config.subject_id, "Realtime channel connected");
                if tx.send(ChannelEvent::Connected).await.is_err() {
                    return;
                }

                let (mut write, mut read) = ws_stream.split();

                let join = match serde_json::to_string(&ClientFrame::Join {
                    subject_id: config.subject_id,
                }) {
                    Ok(join) => join,
                    Err(err) => {
                        warn!(error = %err, "Failed to encode join frame");
                        return;
                    }
                };
                if let Err(err) = write.send(Message::text(join)).await {
                    warn!(error = %err, "Failed to send join frame");
                } else {
                    loop {
                        tokio::select! {
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    match serde_json::from_str::<PushEvent>(text.as_str()) {
                                        Ok(event) => {
                                            if tx.send(ChannelEvent::Push(event)).await.is_err() {
                                                return;
                                            }
                                        }
                                        // Unknown frames are skipped, never fatal.
                                        Err(err) => warn!(error = %err, "Ignoring undecodable frame"),
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None => {
                                    warn!("Realtime channel closed by server");
                                    break;
                                }
                                Some(Err(err)) => {
                                    warn!(error = %err, "Realtime channel read error");
                                    break;
                                }
                                Some(Ok(_)) => {}
                            },
                            _ = shutdown.changed() => {
                                let _ = write.send(Message::Close(None)).await;
                                return;
                            }
                        }
                    }
                }
            }
            Err(err) if is_auth_failure(&err) => {
                warn!("Realtime channel rejected credentials");
                let _ = tx.send(ChannelEvent::AuthFailed).await;
                return;
            }
            Err(err) => {
                warn!(error = %err, "Realtime channel connect failed, will retry");
            }
        }

        // Fixed backoff between attempts, unbounded retries.
        tokio::select! {
            _ = tokio::time::sleep(config.reconnect_backoff) => {}
            _ = shutdown.changed() => return,
        }
    }
}

fn authenticated_url(ws_url: &str, token: &str) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(ws_url)?;
    url.query_pairs_mut().append_pair("token", token);
    Ok(url)
}

fn is_auth_failure(err: &tungstenite::Error) -> bool {
    match err {
        tungstenite::Error::Http(resp) => {
            resp.status() == tungstenite::http::StatusCode::UNAUTHORIZED
                || resp.status() == tungstenite::http::StatusCode::FORBIDDEN
        }
        _ => false,
    }
}
