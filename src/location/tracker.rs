use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::{sync::watch, task::JoinHandle};

use crate::notify::{ClientEvent, EventSink, Notification};

use super::{Coordinates, LocationFault, LocationProvider, PermissionStatus};

const ENABLE_LOGS: bool = true;

use crate::{log_info, log_warn};

/// Most recently seen location state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum LocationSnapshot {
    Unknown,
    Fetching,
    Ready(Coordinates),
    Failed(LocationFault),
}

impl LocationSnapshot {
    pub fn is_fetching(&self) -> bool {
        matches!(self, LocationSnapshot::Fetching)
    }
}

struct FetchSlot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// Keeps the latest position from a [`LocationProvider`]. A new fetch
/// supersedes the previous one; only the newest result is stored.
#[derive(Clone)]
pub struct LocationTracker {
    provider: Arc<dyn LocationProvider>,
    snapshot: Arc<watch::Sender<LocationSnapshot>>,
    slot: Arc<Mutex<FetchSlot>>,
    events: EventSink,
}

impl LocationTracker {
    pub fn new(provider: Arc<dyn LocationProvider>, events: EventSink) -> Self {
        let (snapshot, _) = watch::channel(LocationSnapshot::Unknown);
        Self {
            provider,
            snapshot: Arc::new(snapshot),
            slot: Arc::new(Mutex::new(FetchSlot {
                generation: 0,
                task: None,
            })),
            events,
        }
    }

    pub fn snapshot(&self) -> LocationSnapshot {
        *self.snapshot.borrow()
    }

    /// Starts a fetch, aborting any fetch still in flight.
    pub fn refresh(&self) {
        let mut slot = lock_slot(&self.slot);
        slot.generation = slot.generation.wrapping_add(1);
        let generation = slot.generation;
        if let Some(task) = slot.task.take() {
            task.abort();
        }

        self.snapshot.send_replace(LocationSnapshot::Fetching);
        self.events
            .emit(ClientEvent::Location(LocationSnapshot::Fetching));

        let provider = self.provider.clone();
        let snapshot = self.snapshot.clone();
        let slot_ref = self.slot.clone();
        let events = self.events.clone();

        slot.task = Some(tokio::spawn(async move {
            let result = fetch_position(provider.as_ref()).await;
            let next = match result {
                Ok(coords) => LocationSnapshot::Ready(coords),
                Err(fault) => LocationSnapshot::Failed(fault),
            };

            let mut slot = lock_slot(&slot_ref);
            if slot.generation != generation {
                return;
            }
            slot.task = None;
            snapshot.send_replace(next);
            drop(slot);

            match next {
                LocationSnapshot::Failed(fault) => {
                    log_warn!("location fetch failed: {}", fault.reason_code());
                    events.notify(Notification::error(fault.to_string()));
                }
                LocationSnapshot::Ready(coords) => {
                    log_info!(
                        "location fix {:.4}, {:.4}",
                        coords.latitude,
                        coords.longitude
                    );
                }
                _ => {}
            }
            events.emit(ClientEvent::Location(next));
        }));
    }

    /// Waits until the current fetch (if any) has settled.
    pub async fn settled(&self) -> LocationSnapshot {
        let mut rx = self.snapshot.subscribe();
        let settled = match rx.wait_for(|snapshot| !snapshot.is_fetching()).await {
            Ok(snapshot) => *snapshot,
            Err(_) => self.snapshot(),
        };
        settled
    }
}

async fn fetch_position(provider: &dyn LocationProvider) -> Result<Coordinates, LocationFault> {
    if provider.request_permission().await == PermissionStatus::Denied {
        return Err(LocationFault::PermissionDenied);
    }
    provider.current_position().await
}

fn lock_slot(slot: &Mutex<FetchSlot>) -> MutexGuard<'_, FetchSlot> {
    match slot.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
