use crate::alerts::AlertPlayer;
use crate::app_error::AppError;
use crate::data_store::DataStore;
use crate::events::{ChangeSink, TimerChange};
use crate::models::{Timer, TimerDraft, TimerKind, TimerPatch};
use crate::notify::NotificationSink;
use crate::recovery;
use crate::ticker::{spawn_ticker, TickHandle};
use crate::timer_engine::{
    transition_patch, PhaseEvent, TickOutcome, TimerEngine, TimerError, TICK_PERIOD,
};
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

pub type ActionResult<T> = Result<T, AppError>;

/// Wires the countdown engine to the store and the side-effect sinks, and
/// owns the tick loop for the single active timer.
///
/// Sequencing contract for every state change: mutate the engine, persist,
/// broadcast the persisted record, then fire notifications and audio. Side
/// effects and failed writes are never visible to the state machine; the
/// in-memory record stays authoritative for display (the next throttled tick
/// or restart recovery repairs the store).
pub struct TimerController {
    engine: Mutex<TimerEngine>,
    store: DataStore,
    notifier: Arc<dyn NotificationSink>,
    alerts: Mutex<AlertPlayer>,
    changes: Arc<dyn ChangeSink>,
    ticker: Mutex<Option<TickHandle>>,
    tick_period: Duration,
}

impl TimerController {
    pub fn new(
        store: DataStore,
        notifier: Arc<dyn NotificationSink>,
        changes: Arc<dyn ChangeSink>,
    ) -> Arc<Self> {
        Self::with_settings(store, notifier, changes, AlertPlayer::new(), TICK_PERIOD)
    }

    pub fn with_settings(
        store: DataStore,
        notifier: Arc<dyn NotificationSink>,
        changes: Arc<dyn ChangeSink>,
        alerts: AlertPlayer,
        tick_period: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            engine: Mutex::new(TimerEngine::new()),
            store,
            notifier,
            alerts: Mutex::new(alerts),
            changes,
            ticker: Mutex::new(None),
            tick_period,
        })
    }

    pub fn list_timers(&self) -> ActionResult<Vec<Timer>> {
        Ok(self.store.list_timers()?)
    }

    pub fn active_timer(&self) -> ActionResult<Option<Timer>> {
        Ok(self.lock_engine()?.active_timer().cloned())
    }

    pub fn create_timer(&self, draft: TimerDraft) -> ActionResult<Timer> {
        validate_draft(&draft)?;
        let timer = self.store.create_timer(draft)?;
        self.changes.timer_changed(&TimerChange::Create {
            timer: timer.clone(),
        });
        Ok(timer)
    }

    /// Deleting the active timer halts its tick loop first. A missing id is
    /// a silent no-op apart from the delete announcement.
    pub fn delete_timer(&self, id: &str) -> ActionResult<()> {
        {
            let mut engine = self.lock_engine()?;
            if engine.active_timer_id() == Some(id) {
                self.halt_ticker();
                engine.clear_active();
            }
        }
        self.store.delete_timer(id)?;
        self.changes.timer_changed(&TimerChange::Delete {
            timer_id: id.to_string(),
        });
        Ok(())
    }

    /// Start or resume a timer, making it the active countdown. Starting a
    /// different timer halts the previous tick loop before the switch; the
    /// previous timer keeps whatever state the store last saw. Returns `None`
    /// when the id is not in the store.
    pub fn start_timer(self: &Arc<Self>, id: &str) -> ActionResult<Option<Timer>> {
        let Some(stored) = self.store.get_timer(id)? else {
            return Ok(None);
        };
        let (patch, snapshot) = {
            let mut engine = self.lock_engine()?;
            if engine.active_timer_id() != Some(id) {
                self.halt_ticker();
                engine.activate(stored);
            }
            let patch = engine.start()?;
            (patch, engine.active_timer().cloned())
        };
        if let Some(updated) = self.persist_patch(id, patch) {
            self.changes
                .timer_changed(&TimerChange::Update { timer: updated });
        }
        self.spawn_ticker_loop();
        Ok(snapshot)
    }

    /// Pause the active countdown at its true remaining time.
    pub fn pause_active(&self) -> ActionResult<Option<Timer>> {
        self.halt_ticker();
        let (patch, snapshot) = {
            let mut engine = self.lock_engine()?;
            let patch = engine.pause()?;
            (patch, engine.active_timer().cloned())
        };
        if let Some(timer) = &snapshot {
            if let Some(updated) = self.persist_patch(&timer.id, patch) {
                self.changes
                    .timer_changed(&TimerChange::Update { timer: updated });
            }
        }
        Ok(snapshot)
    }

    /// Stop and reset the active timer back to planned.
    pub fn stop_active(&self) -> ActionResult<Option<Timer>> {
        self.halt_ticker();
        let (patch, snapshot) = {
            let mut engine = self.lock_engine()?;
            let patch = engine.reset()?;
            (patch, engine.active_timer().cloned())
        };
        if let Some(timer) = &snapshot {
            if let Some(updated) = self.persist_patch(&timer.id, patch) {
                self.changes
                    .timer_changed(&TimerChange::Update { timer: updated });
            }
        }
        Ok(snapshot)
    }

    pub fn toggle_global_mute(&self) -> ActionResult<bool> {
        let mut alerts = self
            .alerts
            .lock()
            .map_err(|_| AppError::system("Alert state lock failed"))?;
        Ok(alerts.toggle_global_mute())
    }

    /// Reconcile a timer the previous session left running: rebase its
    /// baseline against wall-clock downtime, then resume ticking or run the
    /// phase completion the downtime crossed.
    // TODO: downtime longer than one segment only advances a single phase
    // boundary here; cascade through every segment that fully elapsed.
    pub fn recover_on_startup(self: &Arc<Self>) -> ActionResult<Option<Timer>> {
        let timers = self.store.list_timers()?;
        let Some(interrupted) = recovery::find_interrupted_timer(&timers) else {
            return Ok(None);
        };
        let rebased = match recovery::rebase_interrupted(&self.store, interrupted, Utc::now())? {
            Some(timer) => timer,
            None => return Ok(None),
        };
        self.changes.timer_changed(&TimerChange::Update {
            timer: rebased.clone(),
        });
        let elapsed_out = rebased.remaining_ms == 0;
        {
            let mut engine = self.lock_engine()?;
            self.halt_ticker();
            engine.adopt_running(rebased)?;
        }
        let keep_ticking = if elapsed_out { self.tick_active() } else { true };
        if keep_ticking {
            self.spawn_ticker_loop();
        }
        self.active_timer()
    }

    /// One pass of the countdown for the active timer; the tick loop runs
    /// this until it returns false.
    pub fn tick_active(&self) -> bool {
        let (outcome, snapshot) = {
            let Ok(mut engine) = self.engine.lock() else {
                return false;
            };
            (engine.tick(), engine.active_timer().cloned())
        };
        match outcome {
            TickOutcome::Idle => false,
            TickOutcome::Running {
                remaining_ms,
                persist,
            } => {
                if persist {
                    if let Some(timer) = &snapshot {
                        let patch = TimerPatch {
                            remaining_ms: Some(remaining_ms),
                            ..TimerPatch::default()
                        };
                        if let Some(updated) = self.persist_patch(&timer.id, patch) {
                            self.changes
                                .timer_changed(&TimerChange::Update { timer: updated });
                        }
                    }
                }
                true
            }
            TickOutcome::Phase(event) => {
                let Some(timer) = snapshot else {
                    return false;
                };
                let patch = transition_patch(&timer, &event);
                if let Some(updated) = self.persist_patch(&timer.id, patch) {
                    self.changes
                        .timer_changed(&TimerChange::Update { timer: updated });
                }
                self.announce_phase(&timer, &event);
                matches!(
                    event,
                    PhaseEvent::BreakStarted { .. } | PhaseEvent::RoundStarted { .. }
                )
            }
        }
    }

    fn announce_phase(&self, timer: &Timer, event: &PhaseEvent) {
        let (title, body) = match event {
            PhaseEvent::Finished => match timer.kind {
                TimerKind::Simple => (
                    "Timer Complete!".to_string(),
                    format!("\"{}\" has finished.", display_label(timer)),
                ),
                TimerKind::Pomodoro => (
                    "Pomodoro Complete!".to_string(),
                    format!("All {} rounds finished!", timer.rounds),
                ),
            },
            PhaseEvent::BreakStarted { round } => (
                "Break Time!".to_string(),
                format!("Work round {round} complete. Take a break!"),
            ),
            PhaseEvent::RoundStarted { round } => (
                "Back to Work!".to_string(),
                format!("Starting round {round} of {}", timer.rounds),
            ),
        };
        if timer.desktop_notification {
            self.notifier.notify(&title, &body);
        }
        if let Ok(mut alerts) = self.alerts.lock() {
            let record = alerts.play_alert(&timer.id, timer.audio_alert);
            if alerts.should_notify_failure(&record) {
                log::warn!("audible alert failed for timer {}", timer.id);
            }
        }
    }

    /// Fire-and-forget write-back: failures are logged and dropped, the
    /// in-memory state is not rolled back.
    fn persist_patch(&self, id: &str, patch: TimerPatch) -> Option<Timer> {
        match self.store.update_timer(id, patch) {
            Ok(Some(timer)) => Some(timer),
            Ok(None) => {
                log::warn!("timer {id} vanished from the store; keeping in-memory state");
                None
            }
            Err(err) => {
                log::warn!("failed to persist timer {id}: {err}");
                None
            }
        }
    }

    fn halt_ticker(&self) {
        if let Ok(mut guard) = self.ticker.lock() {
            if let Some(handle) = guard.take() {
                handle.stop();
            }
        }
    }

    fn spawn_ticker_loop(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = spawn_ticker(self.tick_period, move || match weak.upgrade() {
            Some(controller) => controller.tick_active(),
            None => false,
        });
        if let Ok(mut guard) = self.ticker.lock() {
            if let Some(old) = guard.take() {
                old.stop();
            }
            *guard = Some(handle);
        }
    }

    fn lock_engine(&self) -> Result<MutexGuard<'_, TimerEngine>, AppError> {
        self.engine
            .lock()
            .map_err(|_| AppError::system("Timer state lock failed"))
    }
}

fn display_label(timer: &Timer) -> &str {
    if timer.label.is_empty() {
        "Timer"
    } else {
        &timer.label
    }
}

/// Zero durations never reach the store; creation is simply refused.
fn validate_draft(draft: &TimerDraft) -> Result<(), TimerError> {
    match draft.kind.unwrap_or(TimerKind::Simple) {
        TimerKind::Simple => {
            if draft.duration_ms.unwrap_or(0) == 0 {
                return Err(TimerError::InvalidTimer(
                    "duration must be at least 1 millisecond".to_string(),
                ));
            }
        }
        TimerKind::Pomodoro => {
            if draft.work_ms == Some(0) || draft.break_ms == Some(0) {
                return Err(TimerError::InvalidTimer(
                    "work and break durations must be at least 1 millisecond".to_string(),
                ));
            }
            if draft.rounds == Some(0) {
                return Err(TimerError::InvalidTimer(
                    "rounds must be at least 1".to_string(),
                ));
            }
        }
    }
    Ok(())
}
