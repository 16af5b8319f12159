use std::{sync::Arc, time::Duration};

use log::{info, warn};
use serde::Serialize;
use tokio::{
    sync::Mutex,
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    alerts::{self, DecodedAlert},
    api::{EmergencyReport, EmergencySubmitter},
    config::HoldSettings,
    location::{LocationSnapshot, LocationTracker},
    notify::{ClientEvent, EventSink, Notification},
    session::IdentityProvider,
};

use super::{TriggerError, TriggerPhase, TriggerSession, TriggerSnapshot};

const SUBMISSION_FALLBACK: &str = "Failed to send emergency signal.";
const SUBMISSION_SENT: &str = "Emergency signal sent. Help is on the way.";

/// Result of a confirmed hold, emitted once per attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "camelCase")]
pub enum TriggerOutcome {
    Sent { report: EmergencyReport },
    Failed { error: TriggerError },
}

/// Collaborators the controller talks to. Each client shell supplies its own.
#[derive(Clone)]
pub struct TriggerDeps {
    pub identity: Arc<dyn IdentityProvider>,
    pub location: LocationTracker,
    pub submitter: Arc<dyn EmergencySubmitter>,
    pub events: EventSink,
}

#[derive(Default)]
struct HoldTimers {
    ticker: Option<JoinHandle<()>>,
    completion: Option<JoinHandle<()>>,
}

impl HoldTimers {
    fn abort_all(&mut self) {
        if let Some(handle) = self.ticker.take() {
            handle.abort();
        }
        if let Some(handle) = self.completion.take() {
            handle.abort();
        }
    }

    fn is_armed(&self) -> bool {
        [&self.ticker, &self.completion]
            .into_iter()
            .flatten()
            .any(|handle| !handle.is_finished())
    }
}

/// Drives the press-and-hold emergency gesture.
///
/// Two timers run while `Holding`: a progress ticker that only reports, and a
/// completion timer that alone decides confirmation. Lock order is always
/// `state` then `timers`.
#[derive(Clone)]
pub struct TriggerController {
    state: Arc<Mutex<TriggerSession>>,
    timers: Arc<Mutex<HoldTimers>>,
    hold_duration: Duration,
    progress_tick: Duration,
    deps: TriggerDeps,
}

impl TriggerController {
    pub fn new(settings: HoldSettings, deps: TriggerDeps) -> Self {
        let hold_duration = settings.hold_duration();
        Self {
            state: Arc::new(Mutex::new(TriggerSession::new(hold_duration))),
            timers: Arc::new(Mutex::new(HoldTimers::default())),
            hold_duration,
            progress_tick: settings.progress_tick(),
            deps,
        }
    }

    pub async fn phase(&self) -> TriggerPhase {
        self.state.lock().await.phase
    }

    pub async fn snapshot(&self) -> TriggerSnapshot {
        let mut guard = self.state.lock().await;
        let progress = guard.progress_at(Instant::now());
        guard.advance_progress(progress);
        guard.snapshot()
    }

    /// True while either hold timer is still scheduled.
    pub async fn has_active_timers(&self) -> bool {
        self.timers.lock().await.is_armed()
    }

    /// Starts a hold if the location and identity preconditions pass.
    /// A refusal is also surfaced as an error notification.
    pub async fn begin_hold(&self) -> Result<(), TriggerError> {
        let result = self.try_begin_hold().await;
        if let Err(err) = &result {
            warn!("hold refused: {err}");
            self.deps.events.notify(Notification::error(err.to_string()));
        }
        result
    }

    async fn try_begin_hold(&self) -> Result<(), TriggerError> {
        let mut session = self.state.lock().await;
        if session.phase != TriggerPhase::Idle {
            return Err(TriggerError::Busy(session.phase));
        }

        self.check_location()?;
        if self.deps.identity.current_identity().is_none() {
            return Err(TriggerError::NotAuthenticated);
        }

        let attempt_id = Uuid::new_v4().to_string();
        let now = Instant::now();
        session.begin_hold(attempt_id.clone(), now);

        {
            let mut timers = self.timers.lock().await;
            timers.abort_all();
            timers.ticker = Some(tokio::spawn(progress_loop(
                self.state.clone(),
                self.deps.events.clone(),
                attempt_id.clone(),
                self.progress_tick,
            )));
            timers.completion = Some(tokio::spawn(completion_timer(
                self.clone(),
                attempt_id.clone(),
                self.hold_duration,
            )));
        }

        info!("hold started for attempt {attempt_id}");
        self.emit_phase(&session);
        self.deps.events.emit(ClientEvent::Progress(0));
        Ok(())
    }

    /// First failing check wins; every location failure asks for a new fix.
    fn check_location(&self) -> Result<(), TriggerError> {
        let location = &self.deps.location;
        match location.snapshot() {
            LocationSnapshot::Ready(_) => Ok(()),
            LocationSnapshot::Fetching | LocationSnapshot::Unknown => {
                location.refresh();
                Err(TriggerError::PreconditionPending)
            }
            LocationSnapshot::Failed(fault) => {
                location.refresh();
                Err(fault.into())
            }
        }
    }

    /// Releases the hold. Only acts while `Holding`; safe to call any time.
    pub async fn end_hold(&self) {
        let mut session = self.state.lock().await;
        if session.phase != TriggerPhase::Holding {
            return;
        }

        self.timers.lock().await.abort_all();
        if let Some(attempt_id) = &session.attempt_id {
            info!("hold released early for attempt {attempt_id}");
        }

        session.leave_hold(TriggerPhase::Cancelled);
        self.emit_phase(&session);
        session.reset();
        self.emit_phase(&session);
        self.deps.events.emit(ClientEvent::Progress(0));
    }

    /// Cancels both timers regardless of phase, e.g. when the shell closes.
    /// A submission already in flight is left to finish.
    pub async fn teardown(&self) {
        let mut session = self.state.lock().await;
        self.timers.lock().await.abort_all();
        if session.phase == TriggerPhase::Holding {
            session.reset();
            self.emit_phase(&session);
            self.deps.events.emit(ClientEvent::Progress(0));
        }
    }

    /// Alert handling shares nothing with the hold state.
    pub fn on_alert_message(&self, raw: &str) -> DecodedAlert {
        alerts::on_alert_message(&self.deps.events, raw)
    }

    async fn on_hold_complete(&self, attempt_id: &str) {
        let report = {
            let mut session = self.state.lock().await;
            if session.phase != TriggerPhase::Holding || !session.is_attempt(attempt_id) {
                return;
            }

            {
                let mut timers = self.timers.lock().await;
                // Dropping our own handle detaches it; the ticker goes.
                timers.completion.take();
                if let Some(ticker) = timers.ticker.take() {
                    ticker.abort();
                }
            }

            if let Some(progress) = session.advance_progress(100) {
                self.deps.events.emit(ClientEvent::Progress(progress));
            }
            session.leave_hold(TriggerPhase::Confirmed);
            self.emit_phase(&session);
            self.deps.events.emit(ClientEvent::Progress(0));

            match self.capture_report() {
                Ok(report) => {
                    session.phase = TriggerPhase::Submitting;
                    self.emit_phase(&session);
                    report
                }
                Err(err) => {
                    self.finish(&mut session, Err(err));
                    return;
                }
            }
        };

        info!(
            "submitting emergency for attempt {attempt_id} at {:.4}, {:.4}",
            report.latitude, report.longitude
        );
        let submitted = self.deps.submitter.submit(&report).await;
        let result = match submitted {
            Ok(()) => Ok(report),
            Err(err) => {
                warn!("emergency submission failed: {err}");
                Err(TriggerError::SubmissionFailed(
                    err.user_message(SUBMISSION_FALLBACK),
                ))
            }
        };

        let mut session = self.state.lock().await;
        self.finish(&mut session, result);
    }

    /// Identity and position as of confirmation; later changes do not leak
    /// into the request.
    fn capture_report(&self) -> Result<EmergencyReport, TriggerError> {
        let identity = self
            .deps
            .identity
            .current_identity()
            .ok_or(TriggerError::NotAuthenticated)?;

        match self.deps.location.snapshot() {
            LocationSnapshot::Ready(position) => Ok(EmergencyReport::new(identity.user_id, position)),
            LocationSnapshot::Failed(fault) => Err(fault.into()),
            LocationSnapshot::Fetching | LocationSnapshot::Unknown => {
                Err(TriggerError::PreconditionPending)
            }
        }
    }

    fn finish(&self, session: &mut TriggerSession, result: Result<EmergencyReport, TriggerError>) {
        let events = &self.deps.events;
        let outcome = match result {
            Ok(report) => {
                session.phase = TriggerPhase::Succeeded;
                events.notify(Notification::success(SUBMISSION_SENT));
                TriggerOutcome::Sent { report }
            }
            Err(error) => {
                session.phase = TriggerPhase::Failed;
                events.notify(Notification::error(error.to_string()));
                TriggerOutcome::Failed { error }
            }
        };
        self.emit_phase(session);
        events.emit(ClientEvent::Outcome(outcome));

        session.reset();
        self.emit_phase(session);
    }

    fn emit_phase(&self, session: &TriggerSession) {
        self.deps
            .events
            .emit(ClientEvent::PhaseChanged(session.snapshot()));
    }
}

async fn completion_timer(controller: TriggerController, attempt_id: String, hold: Duration) {
    time::sleep(hold).await;
    controller.on_hold_complete(&attempt_id).await;
}

async fn progress_loop(
    state: Arc<Mutex<TriggerSession>>,
    events: EventSink,
    attempt_id: String,
    tick: Duration,
) {
    let mut interval = time::interval_at(Instant::now() + tick, tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let mut guard = state.lock().await;
        if guard.phase != TriggerPhase::Holding || !guard.is_attempt(&attempt_id) {
            break;
        }

        let progress = guard.progress_at(Instant::now());
        if let Some(progress) = guard.advance_progress(progress) {
            events.emit(ClientEvent::Progress(progress));
        }
        if progress >= 100 {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        api::ApiError,
        location::{
            Coordinates, LocationFault, LocationProvider, PermissionStatus,
            StaticLocationProvider,
        },
        notify::NotificationLevel,
        session::Identity,
    };
    use async_trait::async_trait;
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex as StdMutex,
    };
    use tokio::sync::mpsc::UnboundedReceiver;

    const SYDNEY: Coordinates = Coordinates {
        latitude: -33.86,
        longitude: 151.21,
    };

    struct FixedIdentity(Option<Identity>);

    impl IdentityProvider for FixedIdentity {
        fn current_identity(&self) -> Option<Identity> {
            self.0.clone()
        }
    }

    /// The nth fetch reports (n, n), so each fix is distinguishable.
    #[derive(Default)]
    struct MovingProvider {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl LocationProvider for MovingProvider {
        async fn request_permission(&self) -> PermissionStatus {
            PermissionStatus::Granted
        }

        async fn current_position(&self) -> Result<Coordinates, LocationFault> {
            let n = f64::from(self.fetches.fetch_add(1, Ordering::SeqCst) + 1);
            Ok(Coordinates::new(n, n))
        }
    }

    #[derive(Default)]
    struct RecordingSubmitter {
        reports: StdMutex<Vec<(EmergencyReport, Instant)>>,
        failure: Option<ApiError>,
        latency: Duration,
    }

    impl RecordingSubmitter {
        fn count(&self) -> usize {
            self.reports.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl EmergencySubmitter for RecordingSubmitter {
        async fn submit(&self, report: &EmergencyReport) -> Result<(), ApiError> {
            self.reports
                .lock()
                .unwrap()
                .push((report.clone(), Instant::now()));
            if !self.latency.is_zero() {
                time::sleep(self.latency).await;
            }
            match &self.failure {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }
    }

    struct Harness {
        controller: TriggerController,
        submitter: Arc<RecordingSubmitter>,
        location: LocationTracker,
        rx: UnboundedReceiver<ClientEvent>,
        seen: Vec<ClientEvent>,
    }

    impl Harness {
        /// Waits for the next outcome. Events read on the way stay visible
        /// to the following `drain`.
        async fn next_outcome(&mut self) -> TriggerOutcome {
            loop {
                let event = self.rx.recv().await.expect("event stream closed");
                self.seen.push(event.clone());
                if let ClientEvent::Outcome(outcome) = event {
                    return outcome;
                }
            }
        }

        fn drain(&mut self) -> Vec<ClientEvent> {
            let mut events = std::mem::take(&mut self.seen);
            while let Ok(event) = self.rx.try_recv() {
                events.push(event);
            }
            events
        }
    }

    fn pilot() -> Option<Identity> {
        Some(Identity {
            user_id: "pilot-7".into(),
            token: "jwt-abc".into(),
        })
    }

    async fn harness(
        provider: StaticLocationProvider,
        identity: Option<Identity>,
        submitter: RecordingSubmitter,
        settle_location: bool,
    ) -> Harness {
        harness_with(Arc::new(provider), identity, submitter, settle_location).await
    }

    async fn harness_with(
        provider: Arc<dyn LocationProvider>,
        identity: Option<Identity>,
        submitter: RecordingSubmitter,
        settle_location: bool,
    ) -> Harness {
        let (events, rx) = EventSink::channel();
        let location = LocationTracker::new(provider, events.clone());
        if settle_location {
            location.refresh();
            location.settled().await;
        }
        let submitter = Arc::new(submitter);
        let controller = TriggerController::new(
            HoldSettings::default(),
            TriggerDeps {
                identity: Arc::new(FixedIdentity(identity)),
                location: location.clone(),
                submitter: submitter.clone(),
                events,
            },
        );
        let mut harness = Harness {
            controller,
            submitter,
            location,
            rx,
            seen: Vec::new(),
        };
        harness.drain();
        harness
    }

    async fn ready_harness() -> Harness {
        harness(
            StaticLocationProvider::new(Some(SYDNEY)),
            pilot(),
            RecordingSubmitter::default(),
            true,
        )
        .await
    }

    #[tokio::test(start_paused = true)]
    async fn full_hold_submits_once_with_captured_location() {
        let mut h = ready_harness().await;
        let started = Instant::now();

        h.controller.begin_hold().await.unwrap();
        assert_eq!(h.controller.phase().await, TriggerPhase::Holding);
        assert!(h.controller.has_active_timers().await);

        let outcome = h.next_outcome().await;
        let expected = EmergencyReport {
            user_id: "pilot-7".into(),
            latitude: -33.86,
            longitude: 151.21,
        };
        assert_eq!(
            outcome,
            TriggerOutcome::Sent {
                report: expected.clone()
            }
        );

        let reports = h.submitter.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, expected);
        assert_eq!(reports[0].1 - started, Duration::from_millis(3000));

        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
        assert!(!h.controller.has_active_timers().await);
    }

    #[tokio::test(start_paused = true)]
    async fn report_uses_position_known_at_confirmation() {
        let mut h = harness_with(
            Arc::new(MovingProvider::default()),
            pilot(),
            RecordingSubmitter {
                latency: Duration::from_millis(2000),
                ..Default::default()
            },
            true,
        )
        .await;
        assert_eq!(
            h.location.snapshot(),
            LocationSnapshot::Ready(Coordinates::new(1.0, 1.0))
        );

        h.controller.begin_hold().await.unwrap();

        // The fix moves mid-hold; confirmation must pick up the newer one.
        time::sleep(Duration::from_millis(1000)).await;
        h.location.refresh();
        assert_eq!(
            h.location.settled().await,
            LocationSnapshot::Ready(Coordinates::new(2.0, 2.0))
        );

        // It moves again while the request is in flight; the report is fixed.
        time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(h.controller.phase().await, TriggerPhase::Submitting);
        h.location.refresh();
        assert_eq!(
            h.location.settled().await,
            LocationSnapshot::Ready(Coordinates::new(3.0, 3.0))
        );

        let expected = EmergencyReport {
            user_id: "pilot-7".into(),
            latitude: 2.0,
            longitude: 2.0,
        };
        assert_eq!(
            h.next_outcome().await,
            TriggerOutcome::Sent {
                report: expected.clone()
            }
        );
        let reports = h.submitter.reports.lock().unwrap().clone();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, expected);
        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn release_before_threshold_never_submits() {
        let mut h = ready_harness().await;

        h.controller.begin_hold().await.unwrap();
        time::sleep(Duration::from_millis(2999)).await;
        h.controller.end_hold().await;

        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
        assert!(!h.controller.has_active_timers().await);

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.submitter.count(), 0);

        let phases: Vec<_> = h
            .drain()
            .into_iter()
            .filter_map(|event| match event {
                ClientEvent::PhaseChanged(snapshot) => Some(snapshot.phase),
                _ => None,
            })
            .collect();
        assert_eq!(
            phases,
            vec![
                TriggerPhase::Holding,
                TriggerPhase::Cancelled,
                TriggerPhase::Idle
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn progress_rises_monotonically_then_resets() {
        let mut h = ready_harness().await;
        h.controller.begin_hold().await.unwrap();
        h.next_outcome().await;

        let mut holding = false;
        let mut during_hold = Vec::new();
        let mut after_hold = Vec::new();
        for event in h.drain() {
            match event {
                ClientEvent::PhaseChanged(snapshot) => {
                    holding = snapshot.phase == TriggerPhase::Holding;
                    if !holding {
                        assert_eq!(snapshot.progress_percent, 0);
                    }
                }
                ClientEvent::Progress(p) if holding => during_hold.push(p),
                ClientEvent::Progress(p) => after_hold.push(p),
                _ => {}
            }
        }

        assert_eq!(during_hold.first(), Some(&0));
        assert_eq!(during_hold.last(), Some(&100));
        assert!(during_hold.windows(2).all(|w| w[0] <= w[1]));
        assert!(during_hold.len() > 10);
        assert_eq!(after_hold, vec![0]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_location_starts_no_timers_and_fetches() {
        let mut h = harness(
            StaticLocationProvider::new(Some(SYDNEY)).with_delay(Duration::from_secs(1)),
            pilot(),
            RecordingSubmitter::default(),
            false,
        )
        .await;

        let err = h.controller.begin_hold().await.unwrap_err();
        assert_eq!(err, TriggerError::PreconditionPending);
        assert!(!h.controller.has_active_timers().await);
        assert!(h.location.snapshot().is_fetching());

        // Still fetching: rejected again, and the fetch is restarted.
        let err = h.controller.begin_hold().await.unwrap_err();
        assert_eq!(err, TriggerError::PreconditionPending);

        assert_eq!(h.location.settled().await, LocationSnapshot::Ready(SYDNEY));
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(h.submitter.count(), 0);

        let errors = h
            .drain()
            .into_iter()
            .filter(|event| {
                matches!(event, ClientEvent::Notification(n) if n.level == NotificationLevel::Error)
            })
            .count();
        assert_eq!(errors, 2);

        h.controller.begin_hold().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn denied_location_is_a_failed_precondition() {
        let h = harness(
            StaticLocationProvider::denied(),
            pilot(),
            RecordingSubmitter::default(),
            true,
        )
        .await;

        let err = h.controller.begin_hold().await.unwrap_err();
        assert_eq!(
            err,
            TriggerError::PreconditionFailed("permission_denied".into())
        );
        assert!(!h.controller.has_active_timers().await);
        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
        assert_eq!(h.submitter.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn unavailable_location_triggers_refetch() {
        let h = harness(
            StaticLocationProvider::failing(LocationFault::Timeout),
            pilot(),
            RecordingSubmitter::default(),
            true,
        )
        .await;

        let err = h.controller.begin_hold().await.unwrap_err();
        assert_eq!(err, TriggerError::PreconditionFailed("timeout".into()));
        assert!(h.location.snapshot().is_fetching());
    }

    #[tokio::test(start_paused = true)]
    async fn logged_out_user_cannot_hold() {
        let h = harness(
            StaticLocationProvider::new(Some(SYDNEY)),
            None,
            RecordingSubmitter::default(),
            true,
        )
        .await;

        assert_eq!(
            h.controller.begin_hold().await,
            Err(TriggerError::NotAuthenticated)
        );
        assert!(!h.controller.has_active_timers().await);
    }

    #[tokio::test(start_paused = true)]
    async fn submission_failure_reports_server_message_and_recovers() {
        let mut h = harness(
            StaticLocationProvider::new(Some(SYDNEY)),
            pilot(),
            RecordingSubmitter {
                failure: Some(ApiError::Server {
                    status: 503,
                    message: Some("Dispatch offline".into()),
                }),
                ..Default::default()
            },
            true,
        )
        .await;

        h.controller.begin_hold().await.unwrap();
        assert_eq!(
            h.next_outcome().await,
            TriggerOutcome::Failed {
                error: TriggerError::SubmissionFailed("Dispatch offline".into())
            }
        );
        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);

        // Immediately retriable.
        h.controller.begin_hold().await.unwrap();
        h.next_outcome().await;
        assert_eq!(h.submitter.count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn network_failure_uses_generic_message() {
        let mut h = harness(
            StaticLocationProvider::new(Some(SYDNEY)),
            pilot(),
            RecordingSubmitter {
                failure: Some(ApiError::Network("connection refused".into())),
                ..Default::default()
            },
            true,
        )
        .await;

        h.controller.begin_hold().await.unwrap();
        assert_eq!(
            h.next_outcome().await,
            TriggerOutcome::Failed {
                error: TriggerError::SubmissionFailed(SUBMISSION_FALLBACK.into())
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn no_new_hold_while_submission_in_flight() {
        let mut h = harness(
            StaticLocationProvider::new(Some(SYDNEY)),
            pilot(),
            RecordingSubmitter {
                latency: Duration::from_secs(2),
                ..Default::default()
            },
            true,
        )
        .await;

        h.controller.begin_hold().await.unwrap();
        assert_eq!(
            h.controller.begin_hold().await,
            Err(TriggerError::Busy(TriggerPhase::Holding))
        );

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(h.controller.phase().await, TriggerPhase::Submitting);
        assert_eq!(
            h.controller.begin_hold().await,
            Err(TriggerError::Busy(TriggerPhase::Submitting))
        );
        // Release after confirmation changes nothing.
        h.controller.end_hold().await;
        assert_eq!(h.controller.phase().await, TriggerPhase::Submitting);

        assert!(matches!(h.next_outcome().await, TriggerOutcome::Sent { .. }));
        assert_eq!(h.submitter.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_both_timers() {
        let h = ready_harness().await;

        h.controller.begin_hold().await.unwrap();
        time::sleep(Duration::from_millis(1200)).await;
        h.controller.teardown().await;

        assert!(!h.controller.has_active_timers().await);
        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(h.submitter.count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn stray_end_hold_calls_are_no_ops() {
        let mut h = ready_harness().await;

        h.controller.end_hold().await;
        h.controller.end_hold().await;
        assert_eq!(h.controller.phase().await, TriggerPhase::Idle);
        assert!(h.drain().is_empty());

        for _ in 0..3 {
            h.controller.begin_hold().await.unwrap();
            time::sleep(Duration::from_millis(500)).await;
            h.controller.end_hold().await;
            h.controller.end_hold().await;
        }
        assert_eq!(h.submitter.count(), 0);
        assert_eq!(h.controller.snapshot().await.progress_percent, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn alerts_do_not_disturb_a_hold() {
        let mut h = ready_harness().await;
        h.controller.begin_hold().await.unwrap();

        let decoded = h.controller.on_alert_message("not json at all");
        assert_eq!(decoded.text, "not json at all");
        assert_eq!(h.controller.phase().await, TriggerPhase::Holding);

        assert!(matches!(h.next_outcome().await, TriggerOutcome::Sent { .. }));
    }
}
