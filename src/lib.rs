//! Timer engine and local persistence core for a sticky-notes desktop app.
//!
//! The countdown state machine, the JSON-file store, and the best-effort
//! side-effect sinks live here; window management and the rich-text editor
//! are the embedding shell's problem.

mod alerts;
mod app_error;
mod data_store;
mod display;
mod events;
mod models;
mod note_actions;
mod notify;
mod recovery;
mod ticker;
mod timer_actions;
mod timer_engine;

pub use alerts::{AlertPlayer, AlertReason, AlertRecord, PlaybackMode};
pub use app_error::{AppError, AppErrorKind, AppErrorPayload};
pub use data_store::{DataStore, StoreError, StoreResult};
pub use display::{format_countdown, format_duration};
pub use events::{ChangeSink, LogBroadcast, NoteChange, TimerChange};
pub use models::{
    AppSettings, Note, NotePatch, SettingsPatch, Theme, Timer, TimerDraft, TimerKind, TimerPatch,
    TimerPhase, TimerStatus, WindowBounds,
};
pub use note_actions::{create_note, delete_note, set_note_color, set_note_pinned, update_note};
pub use notify::{DesktopNotifier, NotificationSink, NullNotifier};
pub use recovery::{corrected_remaining_ms, find_interrupted_timer, rebase_interrupted};
pub use ticker::{spawn_ticker, TickHandle};
pub use timer_actions::{ActionResult, TimerController};
pub use timer_engine::{
    transition_patch, PhaseEvent, TickOutcome, TimerEngine, TimerError, PERSIST_INTERVAL,
    TICK_PERIOD,
};
