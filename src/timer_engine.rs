use crate::models::{Timer, TimerKind, TimerPatch, TimerPhase, TimerStatus};
use chrono::Utc;
use std::fmt;
use std::time::{Duration, Instant};

/// Period of the countdown tick loop.
pub const TICK_PERIOD: Duration = Duration::from_millis(250);
/// Minimum interval between throttled progress writes to the store.
pub const PERSIST_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, PartialEq, Eq)]
pub enum TimerError {
    NoActiveTimer,
    AlreadyRunning,
    NotRunning,
    AlreadyCompleted,
    InvalidTimer(String),
}

impl fmt::Display for TimerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerError::NoActiveTimer => write!(f, "No timer is active"),
            TimerError::AlreadyRunning => write!(f, "Timer already running"),
            TimerError::NotRunning => write!(f, "Timer not running"),
            TimerError::AlreadyCompleted => write!(f, "Timer already completed"),
            TimerError::InvalidTimer(message) => write!(f, "Invalid timer: {message}"),
        }
    }
}

impl std::error::Error for TimerError {}

/// Zero-crossing of the current countdown segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Simple timer elapsed, or a pomodoro exhausted its final break.
    Finished,
    /// A pomodoro work segment ended; the break for the same round begins.
    BreakStarted { round: u32 },
    /// A pomodoro break ended with rounds left; work for `round` begins.
    RoundStarted { round: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// No timer is counting down.
    Idle,
    /// Still counting; `persist` is set when the throttle interval elapsed
    /// and this tick's remaining time should be written through.
    Running { remaining_ms: u64, persist: bool },
    Phase(PhaseEvent),
}

/// Session-only resume point. Lives beside the persisted record, never inside
/// it, so persistence cannot serialize transient state.
#[derive(Debug, Clone, Copy)]
struct RunBaseline {
    started_at: Instant,
    remaining_at_start: Duration,
}

#[derive(Debug)]
struct ActiveCountdown {
    timer: Timer,
    /// Some exactly while the timer is running.
    baseline: Option<RunBaseline>,
    last_persist: Option<Instant>,
}

/// Countdown state machine for the single timer shown in the countdown view.
///
/// The engine owns only in-memory state; persistence and side effects are the
/// caller's job, driven by the patches and events returned here. Remaining
/// time is always recomputed from the baseline captured at the last
/// start/resume, so tick jitter never accumulates drift.
#[derive(Debug, Default)]
pub struct TimerEngine {
    active: Option<ActiveCountdown>,
}

impl TimerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_timer(&self) -> Option<&Timer> {
        self.active.as_ref().map(|active| &active.timer)
    }

    pub fn active_timer_id(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.timer.id.as_str())
    }

    pub fn is_ticking(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.baseline.is_some())
    }

    /// Make `timer` the displayed countdown. Replaces any previously active
    /// timer; the caller must have halted that timer's tick loop first.
    pub fn activate(&mut self, timer: Timer) {
        self.active = Some(ActiveCountdown {
            timer,
            baseline: None,
            last_persist: None,
        });
    }

    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// planned|paused -> running. Captures the resume baseline and returns
    /// the fields to persist.
    pub fn start(&mut self) -> Result<TimerPatch, TimerError> {
        let active = self.active.as_mut().ok_or(TimerError::NoActiveTimer)?;
        match active.timer.status {
            TimerStatus::Running => return Err(TimerError::AlreadyRunning),
            TimerStatus::Completed => return Err(TimerError::AlreadyCompleted),
            TimerStatus::Planned | TimerStatus::Paused => {}
        }
        let now = Instant::now();
        let started_at = Utc::now().to_rfc3339();
        active.timer.status = TimerStatus::Running;
        active.timer.started_at = Some(started_at.clone());
        active.baseline = Some(RunBaseline {
            started_at: now,
            remaining_at_start: Duration::from_millis(active.timer.remaining_ms),
        });
        active.last_persist = Some(now);
        Ok(TimerPatch {
            status: Some(TimerStatus::Running),
            started_at: Some(Some(started_at)),
            ..TimerPatch::default()
        })
    }

    /// Adopt a timer whose running state (status, startedAt, remaining) was
    /// already rebased and persisted, as restart recovery does.
    pub fn adopt_running(&mut self, timer: Timer) -> Result<(), TimerError> {
        if timer.status != TimerStatus::Running || timer.started_at.is_none() {
            return Err(TimerError::NotRunning);
        }
        let now = Instant::now();
        let remaining_at_start = Duration::from_millis(timer.remaining_ms);
        self.active = Some(ActiveCountdown {
            timer,
            baseline: Some(RunBaseline {
                started_at: now,
                remaining_at_start,
            }),
            last_persist: Some(now),
        });
        Ok(())
    }

    /// running -> paused. Computes true remaining time at the pause instant.
    pub fn pause(&mut self) -> Result<TimerPatch, TimerError> {
        let active = self.active.as_mut().ok_or(TimerError::NoActiveTimer)?;
        let baseline = match (active.timer.status, active.baseline) {
            (TimerStatus::Running, Some(baseline)) => baseline,
            _ => return Err(TimerError::NotRunning),
        };
        let remaining = remaining_in_phase(baseline, Instant::now());
        active.timer.status = TimerStatus::Paused;
        active.timer.remaining_ms = remaining.as_millis() as u64;
        active.timer.started_at = None;
        active.baseline = None;
        active.last_persist = None;
        Ok(TimerPatch {
            status: Some(TimerStatus::Paused),
            remaining_ms: Some(active.timer.remaining_ms),
            started_at: Some(None),
            ..TimerPatch::default()
        })
    }

    /// Back to planned: round 1, work phase, remaining reseeded. Idempotent.
    pub fn reset(&mut self) -> Result<TimerPatch, TimerError> {
        let active = self.active.as_mut().ok_or(TimerError::NoActiveTimer)?;
        active.timer.status = TimerStatus::Planned;
        active.timer.phase = TimerPhase::Work;
        active.timer.current_round = 1;
        active.timer.remaining_ms = active.timer.initial_remaining_ms();
        active.timer.started_at = None;
        active.timer.completed_at = None;
        active.baseline = None;
        active.last_persist = None;
        Ok(TimerPatch {
            status: Some(TimerStatus::Planned),
            phase: Some(TimerPhase::Work),
            current_round: Some(1),
            remaining_ms: Some(active.timer.remaining_ms),
            started_at: Some(None),
            completed_at: Some(None),
            ..TimerPatch::default()
        })
    }

    /// One pass of the countdown. Recomputes remaining time from the resume
    /// baseline, flags a throttled write when due, and resolves the phase
    /// completion on a zero crossing.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(active) = self.active.as_mut() else {
            return TickOutcome::Idle;
        };
        let Some(baseline) = active.baseline else {
            return TickOutcome::Idle;
        };
        if active.timer.status != TimerStatus::Running {
            return TickOutcome::Idle;
        }
        let now = Instant::now();
        let remaining = remaining_in_phase(baseline, now);
        active.timer.remaining_ms = remaining.as_millis() as u64;
        if remaining.is_zero() {
            return TickOutcome::Phase(complete_phase(active, now));
        }
        let persist = match active.last_persist {
            Some(last) => now.duration_since(last) >= PERSIST_INTERVAL,
            None => true,
        };
        if persist {
            active.last_persist = Some(now);
        }
        TickOutcome::Running {
            remaining_ms: active.timer.remaining_ms,
            persist,
        }
    }

    #[cfg(test)]
    pub(crate) fn rewind_baseline(&mut self, delta: Duration) {
        if let Some(baseline) = self
            .active
            .as_mut()
            .and_then(|active| active.baseline.as_mut())
        {
            baseline.started_at -= delta;
        }
    }

    #[cfg(test)]
    pub(crate) fn rewind_last_persist(&mut self, delta: Duration) {
        if let Some(last) = self
            .active
            .as_mut()
            .and_then(|active| active.last_persist.as_mut())
        {
            *last -= delta;
        }
    }
}

fn remaining_in_phase(baseline: RunBaseline, now: Instant) -> Duration {
    baseline
        .remaining_at_start
        .saturating_sub(now.duration_since(baseline.started_at))
}

fn complete_phase(active: &mut ActiveCountdown, now: Instant) -> PhaseEvent {
    match active.timer.kind {
        TimerKind::Simple => {
            finish(&mut active.timer);
            active.baseline = None;
            active.last_persist = None;
            PhaseEvent::Finished
        }
        TimerKind::Pomodoro => match active.timer.phase {
            TimerPhase::Work => {
                active.timer.phase = TimerPhase::Break;
                let segment_ms = active.timer.break_ms;
                begin_segment(active, segment_ms, now);
                PhaseEvent::BreakStarted {
                    round: active.timer.current_round,
                }
            }
            TimerPhase::Break => {
                if active.timer.current_round < active.timer.rounds {
                    active.timer.current_round += 1;
                    active.timer.phase = TimerPhase::Work;
                    let segment_ms = active.timer.work_ms;
                    begin_segment(active, segment_ms, now);
                    PhaseEvent::RoundStarted {
                        round: active.timer.current_round,
                    }
                } else {
                    finish(&mut active.timer);
                    active.baseline = None;
                    active.last_persist = None;
                    PhaseEvent::Finished
                }
            }
        },
    }
}

/// Reseed the countdown for the next pomodoro segment and rebase the resume
/// baseline at the zero-crossing instant.
fn begin_segment(active: &mut ActiveCountdown, segment_ms: u64, now: Instant) {
    active.timer.remaining_ms = segment_ms;
    active.timer.started_at = Some(Utc::now().to_rfc3339());
    active.baseline = Some(RunBaseline {
        started_at: now,
        remaining_at_start: Duration::from_millis(segment_ms),
    });
    active.last_persist = Some(now);
}

fn finish(timer: &mut Timer) {
    timer.status = TimerStatus::Completed;
    timer.remaining_ms = 0;
    timer.completed_at = Some(Utc::now().to_rfc3339());
    timer.started_at = None;
}

/// Builds the store patch for a phase transition the engine just applied to
/// `timer`. Transitions persist immediately, never on the tick throttle.
pub fn transition_patch(timer: &Timer, event: &PhaseEvent) -> TimerPatch {
    match event {
        PhaseEvent::Finished => TimerPatch {
            status: Some(TimerStatus::Completed),
            remaining_ms: Some(0),
            started_at: Some(None),
            completed_at: Some(timer.completed_at.clone()),
            ..TimerPatch::default()
        },
        PhaseEvent::BreakStarted { .. } => TimerPatch {
            phase: Some(TimerPhase::Break),
            remaining_ms: Some(timer.remaining_ms),
            started_at: Some(timer.started_at.clone()),
            ..TimerPatch::default()
        },
        PhaseEvent::RoundStarted { round } => TimerPatch {
            current_round: Some(*round),
            phase: Some(TimerPhase::Work),
            remaining_ms: Some(timer.remaining_ms),
            started_at: Some(timer.started_at.clone()),
            ..TimerPatch::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::{PhaseEvent, TickOutcome, TimerEngine, TimerError};
    use crate::models::{Timer, TimerKind, TimerPhase, TimerStatus};
    use std::time::Duration;

    fn simple_timer(duration_ms: u64) -> Timer {
        Timer {
            id: "timer-1".to_string(),
            kind: TimerKind::Simple,
            label: "Tea".to_string(),
            duration_ms,
            work_ms: 1_500_000,
            break_ms: 300_000,
            rounds: 4,
            current_round: 1,
            phase: TimerPhase::Work,
            status: TimerStatus::Planned,
            remaining_ms: duration_ms,
            started_at: None,
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
            completed_at: None,
            audio_alert: true,
            desktop_notification: true,
        }
    }

    fn pomodoro_timer(work_ms: u64, break_ms: u64, rounds: u32) -> Timer {
        Timer {
            id: "timer-2".to_string(),
            kind: TimerKind::Pomodoro,
            label: "Focus".to_string(),
            duration_ms: 0,
            work_ms,
            break_ms,
            rounds,
            current_round: 1,
            phase: TimerPhase::Work,
            status: TimerStatus::Planned,
            remaining_ms: work_ms,
            started_at: None,
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
            completed_at: None,
            audio_alert: true,
            desktop_notification: true,
        }
    }

    fn started_engine(timer: Timer) -> TimerEngine {
        let mut engine = TimerEngine::new();
        engine.activate(timer);
        engine.start().expect("start timer");
        engine
    }

    #[test]
    fn start_sets_running_state_and_patch() {
        let mut engine = TimerEngine::new();
        engine.activate(simple_timer(5_000));

        let patch = engine.start().expect("start timer");

        assert_eq!(patch.status, Some(TimerStatus::Running));
        assert!(matches!(patch.started_at, Some(Some(_))));
        let timer = engine.active_timer().expect("active timer");
        assert_eq!(timer.status, TimerStatus::Running);
        assert!(timer.started_at.is_some());
        assert!(engine.is_ticking());
    }

    #[test]
    fn start_requires_an_active_timer() {
        let mut engine = TimerEngine::new();
        assert_eq!(engine.start(), Err(TimerError::NoActiveTimer));
    }

    #[test]
    fn start_rejects_running_and_completed() {
        let mut engine = started_engine(simple_timer(5_000));
        assert_eq!(engine.start(), Err(TimerError::AlreadyRunning));

        engine.rewind_baseline(Duration::from_millis(5_100));
        let _ = engine.tick();
        assert_eq!(engine.start(), Err(TimerError::AlreadyCompleted));
    }

    #[test]
    fn pause_computes_remaining_and_clears_started_at() {
        let mut engine = started_engine(simple_timer(5_000));
        engine.rewind_baseline(Duration::from_millis(2_500));

        let patch = engine.pause().expect("pause timer");

        let remaining = patch.remaining_ms.expect("remaining in patch");
        assert!(remaining <= 2_500, "remaining was {remaining}");
        assert!(remaining > 2_300, "remaining was {remaining}");
        assert_eq!(patch.status, Some(TimerStatus::Paused));
        assert_eq!(patch.started_at, Some(None));
        let timer = engine.active_timer().expect("active timer");
        assert!(timer.started_at.is_none());
        assert!(!engine.is_ticking());
    }

    #[test]
    fn resume_after_pause_does_not_double_subtract() {
        let mut engine = started_engine(simple_timer(5_000));
        engine.rewind_baseline(Duration::from_millis(2_500));
        engine.pause().expect("pause timer");

        engine.start().expect("resume timer");
        engine.rewind_baseline(Duration::from_millis(1_000));

        match engine.tick() {
            TickOutcome::Running { remaining_ms, .. } => {
                assert!(remaining_ms <= 1_500, "remaining was {remaining_ms}");
                assert!(remaining_ms > 1_300, "remaining was {remaining_ms}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn pause_requires_running() {
        let mut engine = TimerEngine::new();
        engine.activate(simple_timer(5_000));
        assert_eq!(engine.pause(), Err(TimerError::NotRunning));
    }

    #[test]
    fn reset_is_idempotent() {
        let mut engine = started_engine(pomodoro_timer(1_000, 1_000, 2));
        engine.rewind_baseline(Duration::from_millis(1_000));
        let _ = engine.tick();

        let first = engine.reset().expect("reset timer");
        let second = engine.reset().expect("reset timer again");

        for patch in [first, second] {
            assert_eq!(patch.status, Some(TimerStatus::Planned));
            assert_eq!(patch.phase, Some(TimerPhase::Work));
            assert_eq!(patch.current_round, Some(1));
            assert_eq!(patch.remaining_ms, Some(1_000));
            assert_eq!(patch.started_at, Some(None));
            assert_eq!(patch.completed_at, Some(None));
        }
        let timer = engine.active_timer().expect("active timer");
        assert_eq!(timer.status, TimerStatus::Planned);
        assert!(timer.started_at.is_none());
        assert!(timer.completed_at.is_none());
    }

    #[test]
    fn ticks_never_increase_remaining() {
        let mut engine = started_engine(simple_timer(60_000));
        let mut previous = u64::MAX;
        for _ in 0..5 {
            engine.rewind_baseline(Duration::from_millis(10));
            match engine.tick() {
                TickOutcome::Running { remaining_ms, .. } => {
                    assert!(remaining_ms <= previous);
                    previous = remaining_ms;
                }
                other => panic!("unexpected outcome: {other:?}"),
            }
        }
    }

    #[test]
    fn tick_throttles_persistence() {
        let mut engine = started_engine(simple_timer(60_000));

        match engine.tick() {
            TickOutcome::Running { persist, .. } => assert!(!persist),
            other => panic!("unexpected outcome: {other:?}"),
        }

        engine.rewind_last_persist(Duration::from_secs(6));
        match engine.tick() {
            TickOutcome::Running { persist, .. } => assert!(persist),
            other => panic!("unexpected outcome: {other:?}"),
        }
        match engine.tick() {
            TickOutcome::Running { persist, .. } => assert!(!persist),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn simple_timer_completes_once() {
        let mut engine = started_engine(simple_timer(5_000));
        engine.rewind_baseline(Duration::from_millis(5_100));

        let outcome = engine.tick();
        assert_eq!(outcome, TickOutcome::Phase(PhaseEvent::Finished));

        let timer = engine.active_timer().expect("active timer");
        assert_eq!(timer.status, TimerStatus::Completed);
        assert_eq!(timer.remaining_ms, 0);
        assert!(timer.started_at.is_none());
        assert!(timer.completed_at.is_some());

        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn pomodoro_walks_every_phase_boundary() {
        let mut engine = started_engine(pomodoro_timer(1_000, 1_000, 2));

        engine.rewind_baseline(Duration::from_millis(1_000));
        assert_eq!(
            engine.tick(),
            TickOutcome::Phase(PhaseEvent::BreakStarted { round: 1 })
        );
        {
            let timer = engine.active_timer().expect("active timer");
            assert_eq!(timer.phase, TimerPhase::Break);
            assert_eq!(timer.current_round, 1);
            assert_eq!(timer.remaining_ms, 1_000);
            assert_eq!(timer.status, TimerStatus::Running);
            assert!(timer.started_at.is_some());
        }

        engine.rewind_baseline(Duration::from_millis(1_000));
        assert_eq!(
            engine.tick(),
            TickOutcome::Phase(PhaseEvent::RoundStarted { round: 2 })
        );
        {
            let timer = engine.active_timer().expect("active timer");
            assert_eq!(timer.phase, TimerPhase::Work);
            assert_eq!(timer.current_round, 2);
            assert_eq!(timer.remaining_ms, 1_000);
        }

        engine.rewind_baseline(Duration::from_millis(1_000));
        assert_eq!(
            engine.tick(),
            TickOutcome::Phase(PhaseEvent::BreakStarted { round: 2 })
        );

        engine.rewind_baseline(Duration::from_millis(1_000));
        assert_eq!(engine.tick(), TickOutcome::Phase(PhaseEvent::Finished));
        let timer = engine.active_timer().expect("active timer");
        assert_eq!(timer.status, TimerStatus::Completed);
        assert_eq!(timer.current_round, 2);
        assert!(timer.started_at.is_none());

        assert_eq!(engine.tick(), TickOutcome::Idle);
    }

    #[test]
    fn round_counter_stays_within_bounds() {
        let mut engine = started_engine(pomodoro_timer(1_000, 1_000, 2));
        for _ in 0..8 {
            engine.rewind_baseline(Duration::from_millis(1_000));
            let _ = engine.tick();
            let timer = engine.active_timer().expect("active timer");
            assert!(timer.current_round >= 1);
            assert!(timer.current_round <= timer.rounds);
        }
    }

    #[test]
    fn adopt_running_requires_running_record() {
        let mut engine = TimerEngine::new();
        let timer = simple_timer(5_000);
        assert_eq!(
            engine.adopt_running(timer.clone()),
            Err(TimerError::NotRunning)
        );

        let mut running = timer;
        running.status = TimerStatus::Running;
        running.started_at = Some("2025-01-01T00:00:00+00:00".to_string());
        engine.adopt_running(running).expect("adopt timer");
        assert!(engine.is_ticking());
    }

    #[test]
    fn transition_patch_mirrors_engine_state() {
        let mut engine = started_engine(pomodoro_timer(1_000, 2_000, 2));
        engine.rewind_baseline(Duration::from_millis(1_000));
        let outcome = engine.tick();
        let TickOutcome::Phase(event) = outcome else {
            panic!("expected phase event");
        };

        let timer = engine.active_timer().expect("active timer").clone();
        assert_eq!(timer.phase_total_ms(), 2_000);
        let patch = super::transition_patch(&timer, &event);
        assert_eq!(patch.phase, Some(TimerPhase::Break));
        assert_eq!(patch.remaining_ms, Some(2_000));
        assert_eq!(patch.started_at, Some(timer.started_at.clone()));
        assert!(patch.status.is_none());
    }
}
