pub mod alerts;
pub mod api;
pub mod config;
pub mod location;
pub mod notify;
pub mod session;
pub mod trigger;
pub mod utils;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc::UnboundedReceiver;

use alerts::AlertChannel;
use api::ApiClient;
use config::ClientConfig;
use location::{LocationProvider, LocationTracker, StaticLocationProvider};
use notify::{ClientEvent, EventSink};
use session::SessionStore;
use trigger::{TriggerController, TriggerDeps};

/// Everything a client shell needs, built once and passed by reference.
pub struct AppState {
    pub config: ClientConfig,
    pub session: Arc<SessionStore>,
    pub api: ApiClient,
    pub location: LocationTracker,
    pub trigger: TriggerController,
    pub alerts: AlertChannel,
    pub events: EventSink,
}

impl AppState {
    /// Wires the core with the given location source. The receiver carries
    /// every [`ClientEvent`] the shell should render.
    pub fn new(
        config: ClientConfig,
        location_provider: Arc<dyn LocationProvider>,
    ) -> Result<(Self, UnboundedReceiver<ClientEvent>)> {
        config.ensure_data_dir()?;

        let (events, rx) = EventSink::channel();
        let session = Arc::new(SessionStore::open(config.session_path())?);
        let api = ApiClient::new(config.api_base_url.clone(), session.clone())
            .context("failed to build API client")?;
        let location = LocationTracker::new(location_provider, events.clone());

        let trigger = TriggerController::new(
            config.hold,
            TriggerDeps {
                identity: session.clone(),
                location: location.clone(),
                submitter: Arc::new(api.clone()),
                events: events.clone(),
            },
        );
        let alerts = AlertChannel::new(events.clone());

        Ok((
            Self {
                config,
                session,
                api,
                location,
                trigger,
                alerts,
                events,
            },
            rx,
        ))
    }

    /// Terminal shell wiring: the position comes from config.
    pub fn for_terminal(config: ClientConfig) -> Result<(Self, UnboundedReceiver<ClientEvent>)> {
        let provider = Arc::new(StaticLocationProvider::new(config.static_location));
        Self::new(config, provider)
    }

    pub async fn shutdown(&self) {
        self.trigger.teardown().await;
        self.alerts.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Coordinates;
    use crate::trigger::{TriggerError, TriggerPhase};

    #[tokio::test]
    async fn terminal_wiring_starts_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = ClientConfig::load_from(dir.path()).unwrap();
        config.static_location = Some(Coordinates::new(-33.86, 151.21));

        let (state, _rx) = AppState::for_terminal(config).unwrap();
        state.location.refresh();
        state.location.settled().await;

        assert_eq!(
            state.trigger.begin_hold().await,
            Err(TriggerError::NotAuthenticated)
        );
        assert_eq!(state.trigger.phase().await, TriggerPhase::Idle);
        state.shutdown().await;
    }
}
