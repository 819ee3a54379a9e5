use crate::data_store::{DataStore, StoreResult};
use crate::models::{Timer, TimerPatch, TimerStatus};
use chrono::{DateTime, Utc};

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The timer the previous session left counting down, if any.
pub fn find_interrupted_timer(timers: &[Timer]) -> Option<&Timer> {
    timers
        .iter()
        .find(|timer| timer.status == TimerStatus::Running && timer.started_at.is_some())
}

/// True remaining time for a timer that stayed `running` while the process
/// was down: last persisted remaining minus wall-clock elapsed, clamped at
/// zero. An unreadable start timestamp counts as zero elapsed.
pub fn corrected_remaining_ms(timer: &Timer, now: DateTime<Utc>) -> u64 {
    let Some(started_at) = timer.started_at.as_deref().and_then(parse_rfc3339) else {
        return timer.remaining_ms;
    };
    let elapsed_ms = now
        .signed_duration_since(started_at)
        .num_milliseconds()
        .max(0) as u64;
    timer.remaining_ms.saturating_sub(elapsed_ms)
}

/// Rebase an interrupted timer: persist the corrected remaining time and a
/// fresh start timestamp so the countdown resumes from `now`.
pub fn rebase_interrupted(
    store: &DataStore,
    timer: &Timer,
    now: DateTime<Utc>,
) -> StoreResult<Option<Timer>> {
    let remaining_ms = corrected_remaining_ms(timer, now);
    store.update_timer(
        &timer.id,
        TimerPatch {
            remaining_ms: Some(remaining_ms),
            started_at: Some(Some(now.to_rfc3339())),
            ..TimerPatch::default()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::{corrected_remaining_ms, find_interrupted_timer, rebase_interrupted};
    use crate::data_store::DataStore;
    use crate::models::{Timer, TimerDraft, TimerKind, TimerPatch, TimerStatus};
    use chrono::{Duration, Utc};
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static TEMP_COUNTER: AtomicUsize = AtomicUsize::new(0);

    fn temp_dir() -> PathBuf {
        let mut dir = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time went backwards")
            .as_nanos();
        let counter = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        dir.push(format!(
            "sticky_timers_recovery_test_{nanos}_{counter}_{}",
            std::process::id()
        ));
        fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    fn running_timer(remaining_ms: u64, started_secs_ago: i64) -> Timer {
        let started_at = Utc::now() - Duration::seconds(started_secs_ago);
        Timer {
            id: "timer-1".to_string(),
            kind: TimerKind::Simple,
            label: "Tea".to_string(),
            duration_ms: 5_000,
            work_ms: 1_500_000,
            break_ms: 300_000,
            rounds: 4,
            current_round: 1,
            phase: crate::models::TimerPhase::Work,
            status: TimerStatus::Running,
            remaining_ms,
            started_at: Some(started_at.to_rfc3339()),
            created_at: "2025-01-01T00:00:00+00:00".to_string(),
            completed_at: None,
            audio_alert: true,
            desktop_notification: true,
        }
    }

    #[test]
    fn downtime_longer_than_remaining_clamps_to_zero() {
        let timer = running_timer(3_000, 10);
        assert_eq!(corrected_remaining_ms(&timer, Utc::now()), 0);
    }

    #[test]
    fn partial_downtime_subtracts_elapsed() {
        let timer = running_timer(10_000, 3);
        let remaining = corrected_remaining_ms(&timer, Utc::now());
        assert!(remaining <= 7_000, "remaining was {remaining}");
        assert!(remaining > 6_500, "remaining was {remaining}");
    }

    #[test]
    fn unreadable_start_timestamp_counts_as_no_elapsed_time() {
        let mut timer = running_timer(10_000, 3);
        timer.started_at = Some("not-a-date".to_string());
        assert_eq!(corrected_remaining_ms(&timer, Utc::now()), 10_000);
    }

    #[test]
    fn finds_only_running_timers_with_start_timestamps() {
        let mut planned = running_timer(5_000, 0);
        planned.status = TimerStatus::Planned;
        planned.started_at = None;
        let mut stale = running_timer(5_000, 0);
        stale.id = "timer-2".to_string();
        stale.started_at = None;
        let running = running_timer(5_000, 0);

        assert!(find_interrupted_timer(&[planned.clone(), stale.clone()]).is_none());
        let all = [planned, stale, running];
        let found = find_interrupted_timer(&all).expect("running timer");
        assert_eq!(found.id, "timer-1");
    }

    #[test]
    fn rebase_refreshes_started_at_and_keeps_the_rest() {
        let dir = temp_dir();
        let store = DataStore::new(&dir).expect("create store");
        let created = store
            .create_timer(TimerDraft {
                duration_ms: Some(5_000),
                label: Some("Tea".to_string()),
                ..TimerDraft::default()
            })
            .expect("create timer");
        let now = Utc::now();
        let stored = store
            .update_timer(
                &created.id,
                TimerPatch {
                    status: Some(TimerStatus::Running),
                    started_at: Some(Some(now.to_rfc3339())),
                    ..TimerPatch::default()
                },
            )
            .expect("update timer")
            .expect("timer exists");

        let rebased = rebase_interrupted(&store, &stored, now)
            .expect("rebase timer")
            .expect("timer exists");

        // No elapsed time: identical record apart from the refreshed start.
        assert_eq!(rebased.remaining_ms, stored.remaining_ms);
        assert_eq!(rebased.status, stored.status);
        assert_eq!(rebased.label, stored.label);
        assert_eq!(rebased.started_at.as_deref(), Some(now.to_rfc3339().as_str()));

        let _ = fs::remove_dir_all(&dir);
    }
}
