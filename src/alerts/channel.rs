use std::sync::Arc;

use futures_util::StreamExt;
use serde::Serialize;
use tokio::{
    sync::{watch, Mutex},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tokio_util::sync::CancellationToken;

use crate::notify::{ClientEvent, EventSink};

use super::on_alert_message;

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "camelCase")]
pub enum ChannelStatus {
    Disconnected,
    Connected,
    Error(String),
}

struct Worker {
    handle: JoinHandle<()>,
    cancel_token: CancellationToken,
}

/// Push channel for informational alerts. Each `connect` drops the previous
/// socket and dials again; there is no automatic retry.
#[derive(Clone)]
pub struct AlertChannel {
    events: EventSink,
    status: Arc<watch::Sender<ChannelStatus>>,
    worker: Arc<Mutex<Option<Worker>>>,
}

impl AlertChannel {
    pub fn new(events: EventSink) -> Self {
        let (status, _) = watch::channel(ChannelStatus::Disconnected);
        Self {
            events,
            status: Arc::new(status),
            worker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ChannelStatus> {
        self.status.subscribe()
    }

    pub async fn connect(&self, endpoint: impl Into<String>) {
        let endpoint = endpoint.into();
        let mut guard = self.worker.lock().await;
        if let Some(previous) = guard.take() {
            stop_worker(previous).await;
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(channel_loop(
            endpoint,
            self.events.clone(),
            self.status.clone(),
            cancel_token.clone(),
        ));

        *guard = Some(Worker {
            handle,
            cancel_token,
        });
    }

    pub async fn disconnect(&self) {
        if let Some(worker) = self.worker.lock().await.take() {
            stop_worker(worker).await;
        }
        set_status(&self.status, &self.events, ChannelStatus::Disconnected);
    }
}

async fn stop_worker(worker: Worker) {
    worker.cancel_token.cancel();
    if let Err(err) = worker.handle.await {
        log_warn!("alert channel task failed to join: {err}");
    }
}

fn set_status(status: &watch::Sender<ChannelStatus>, events: &EventSink, next: ChannelStatus) {
    let changed = *status.borrow() != next;
    status.send_replace(next.clone());
    if changed {
        events.emit(ClientEvent::ChannelStatus(next));
    }
}

async fn channel_loop(
    endpoint: String,
    events: EventSink,
    status: Arc<watch::Sender<ChannelStatus>>,
    cancel_token: CancellationToken,
) {
    let connected = tokio::select! {
        result = connect_async(endpoint.as_str()) => result,
        _ = cancel_token.cancelled() => return,
    };

    let (mut stream, _) = match connected {
        Ok(pair) => pair,
        Err(err) => {
            log_warn!("alert channel connect to {endpoint} failed: {err}");
            set_status(&status, &events, ChannelStatus::Error("WebSocket error".into()));
            return;
        }
    };

    log_info!("alert channel connected to {endpoint}");
    set_status(&status, &events, ChannelStatus::Connected);

    loop {
        tokio::select! {
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    on_alert_message(&events, &text);
                }
                Some(Ok(Message::Binary(bytes))) => {
                    on_alert_message(&events, &String::from_utf8_lossy(&bytes));
                }
                Some(Ok(Message::Close(_))) | None => {
                    log_info!("alert channel closed by server");
                    set_status(&status, &events, ChannelStatus::Disconnected);
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    log_error!("alert channel error: {err}");
                    set_status(&status, &events, ChannelStatus::Error("WebSocket error".into()));
                    break;
                }
            },
            _ = cancel_token.cancelled() => {
                let _ = stream.close(None).await;
                break;
            }
        }
    }
}
