use crate::models::{Note, Timer};
use serde::Serialize;

/// One announced mutation of the timer collection. The serialized shape is
/// what list views consume: `{"action":"update","timer":{...}}`, with only
/// the identifier carried for deletions.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum TimerChange {
    Create {
        timer: Timer,
    },
    Update {
        timer: Timer,
    },
    Delete {
        #[serde(rename = "timerId")]
        timer_id: String,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum NoteChange {
    Create {
        note: Note,
    },
    Update {
        note: Note,
    },
    Delete {
        #[serde(rename = "noteId")]
        note_id: String,
    },
}

/// Receives every successful store mutation exactly once. Implementations
/// forward to whatever transport the shell uses and must swallow their own
/// delivery failures.
pub trait ChangeSink: Send + Sync {
    fn timer_changed(&self, change: &TimerChange);
    fn note_changed(&self, change: &NoteChange);
}

/// Writes changes to the log; the sink for headless runs.
#[derive(Debug, Default)]
pub struct LogBroadcast;

impl ChangeSink for LogBroadcast {
    fn timer_changed(&self, change: &TimerChange) {
        match serde_json::to_string(change) {
            Ok(json) => log::debug!("timers changed: {json}"),
            Err(err) => log::debug!("timers changed (unserializable): {err}"),
        }
    }

    fn note_changed(&self, change: &NoteChange) {
        match serde_json::to_string(change) {
            Ok(json) => log::debug!("notes changed: {json}"),
            Err(err) => log::debug!("notes changed (unserializable): {err}"),
        }
    }
}
