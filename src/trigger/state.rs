use serde::{Deserialize, Serialize};
use std::{cmp, fmt, time::Duration};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TriggerPhase {
    #[default]
    Idle,
    Holding,
    Confirmed,
    Cancelled,
    Submitting,
    Succeeded,
    Failed,
}

impl TriggerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerPhase::Idle => "idle",
            TriggerPhase::Holding => "holding",
            TriggerPhase::Confirmed => "confirmed",
            TriggerPhase::Cancelled => "cancelled",
            TriggerPhase::Submitting => "submitting",
            TriggerPhase::Succeeded => "succeeded",
            TriggerPhase::Failed => "failed",
        }
    }
}

impl fmt::Display for TriggerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSnapshot {
    pub phase: TriggerPhase,
    pub progress_percent: u8,
    pub hold_duration_ms: u64,
}

/// State of one confirmation attempt. Reset to `Idle` between attempts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerSession {
    pub phase: TriggerPhase,
    pub attempt_id: Option<String>,
    pub hold_duration_ms: u64,
    /// Last progress value handed out; only grows while `Holding`.
    pub progress_percent: u8,
    #[serde(skip)]
    pub held_since: Option<Instant>,
}

impl TriggerSession {
    pub fn new(hold_duration: Duration) -> Self {
        Self {
            phase: TriggerPhase::Idle,
            attempt_id: None,
            hold_duration_ms: cmp::max(hold_duration.as_millis() as u64, 1),
            progress_percent: 0,
            held_since: None,
        }
    }

    pub fn snapshot(&self) -> TriggerSnapshot {
        TriggerSnapshot {
            phase: self.phase,
            progress_percent: self.progress_percent,
            hold_duration_ms: self.hold_duration_ms,
        }
    }

    pub fn is_attempt(&self, attempt_id: &str) -> bool {
        self.attempt_id.as_deref() == Some(attempt_id)
    }

    pub fn begin_hold(&mut self, attempt_id: String, now: Instant) {
        self.phase = TriggerPhase::Holding;
        self.attempt_id = Some(attempt_id);
        self.progress_percent = 0;
        self.held_since = Some(now);
    }

    /// `min(100, elapsed / hold_duration * 100)` while holding.
    pub fn progress_at(&self, now: Instant) -> u8 {
        match (self.phase, self.held_since) {
            (TriggerPhase::Holding, Some(since)) => {
                let elapsed_ms = now.saturating_duration_since(since).as_millis() as u64;
                cmp::min(100, elapsed_ms.saturating_mul(100) / self.hold_duration_ms) as u8
            }
            _ => self.progress_percent,
        }
    }

    /// Records `percent` if it moves progress forward. Returns the new value.
    pub fn advance_progress(&mut self, percent: u8) -> Option<u8> {
        if self.phase != TriggerPhase::Holding || percent <= self.progress_percent {
            return None;
        }
        self.progress_percent = cmp::min(percent, 100);
        Some(self.progress_percent)
    }

    /// Leaves `Holding` for `next`, clearing the hold clock and progress.
    pub fn leave_hold(&mut self, next: TriggerPhase) {
        self.phase = next;
        self.held_since = None;
        self.progress_percent = 0;
    }

    pub fn reset(&mut self) {
        self.phase = TriggerPhase::Idle;
        self.attempt_id = None;
        self.held_since = None;
        self.progress_percent = 0;
    }
}
