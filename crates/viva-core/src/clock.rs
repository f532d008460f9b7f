//! Countdown clock for the current question.
//!
//! One-second resolution, armed or disarmed, associated with the current
//! question only. The clock pushes typed events onto a channel the session
//! driver owns; it never calls back into the controller. Expiry events
//! carry a generation counter so an event queued before a disarm is
//! recognizable as stale and dropped by the controller.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Events emitted by an armed [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    /// One second elapsed; `remaining_secs` seconds left.
    Tick { remaining_secs: u64 },
    /// The countdown reached zero. Fired at most once per arm.
    Expired { generation: u64 },
}

/// A countdown timer with one-second resolution.
pub struct Clock {
    tx: mpsc::UnboundedSender<ClockEvent>,
    generation: u64,
    task: Option<JoinHandle<()>>,
    armed_at: Option<Instant>,
    duration_secs: u64,
}

impl Clock {
    /// Create a disarmed clock and the receiving end of its event channel.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ClockEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                generation: 0,
                task: None,
                armed_at: None,
                duration_secs: 0,
            },
            rx,
        )
    }

    /// Start counting down from `duration_secs`.
    ///
    /// Arming while already armed first disarms the previous timer: no two
    /// countdowns ever overlap.
    pub fn arm(&mut self, duration_secs: u64) {
        self.disarm();
        self.armed_at = Some(Instant::now());
        self.duration_secs = duration_secs;

        let tx = self.tx.clone();
        let generation = self.generation;
        self.task = Some(tokio::spawn(async move {
            let mut remaining = duration_secs;
            while remaining > 0 {
                tokio::time::sleep(Duration::from_secs(1)).await;
                remaining -= 1;
                if tx
                    .send(ClockEvent::Tick {
                        remaining_secs: remaining,
                    })
                    .is_err()
                {
                    return;
                }
            }
            let _ = tx.send(ClockEvent::Expired { generation });
        }));
    }

    /// Cancel any pending expiry. Idempotent.
    ///
    /// Bumps the generation so an `Expired` event already sitting in the
    /// channel no longer matches [`Clock::generation`].
    pub fn disarm(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        self.generation += 1;
    }

    /// Generation of the current (or next) arm. An `Expired` event is live
    /// only if its generation matches.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a countdown is currently running.
    pub fn is_armed(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Whole seconds since the current arm, clamped to the armed duration.
    pub fn elapsed_secs(&self) -> u64 {
        self.armed_at
            .map(|t| t.elapsed().as_secs().min(self.duration_secs))
            .unwrap_or(0)
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}
