use crate::models::{
    AppSettings, Note, NotePatch, SettingsPatch, Timer, TimerDraft, TimerKind, TimerPatch,
    TimerPhase, TimerStatus, WindowBounds,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const DEFAULT_WORK_MS: u64 = 1_500_000;
const DEFAULT_BREAK_MS: u64 = 300_000;
const DEFAULT_ROUNDS: u32 = 4;
const DEFAULT_NOTE_COLOR: &str = "yellow";
const NOTE_TITLE_MAX_CHARS: usize = 50;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(err) => write!(f, "I/O error: {err}"),
            StoreError::Serde(err) => write!(f, "Serialization error: {err}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable record of timers, notes and settings, one JSON document each,
/// written atomically under a single base directory.
#[derive(Debug, Clone)]
pub struct DataStore {
    base_dir: PathBuf,
    timers_path: PathBuf,
    notes_path: PathBuf,
    settings_path: PathBuf,
}

impl DataStore {
    pub fn new(base_dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let base_dir = base_dir.into();
        fs::create_dir_all(&base_dir)?;
        let timers_path = base_dir.join("timers.json");
        let notes_path = base_dir.join("notes.json");
        let settings_path = base_dir.join("settings.json");

        let store = Self {
            base_dir,
            timers_path,
            notes_path,
            settings_path,
        };

        if !store.timers_path.exists() {
            store.write_json(&store.timers_path, &Vec::<Timer>::new())?;
        }
        if !store.notes_path.exists() {
            store.write_json(&store.notes_path, &Vec::<Note>::new())?;
        }

        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn timers_path(&self) -> &Path {
        &self.timers_path
    }

    pub fn notes_path(&self) -> &Path {
        &self.notes_path
    }

    // ---- Timers ----

    /// All timers, newest created first.
    pub fn list_timers(&self) -> StoreResult<Vec<Timer>> {
        let mut timers = self.load_timers()?;
        timers.sort_by(|a, b| timestamp_key(&b.created_at).cmp(&timestamp_key(&a.created_at)));
        Ok(timers)
    }

    pub fn get_timer(&self, id: &str) -> StoreResult<Option<Timer>> {
        Ok(self.load_timers()?.into_iter().find(|item| item.id == id))
    }

    pub fn create_timer(&self, draft: TimerDraft) -> StoreResult<Timer> {
        let kind = draft.kind.unwrap_or(TimerKind::Simple);
        let duration_ms = draft.duration_ms.unwrap_or(0);
        let work_ms = draft.work_ms.unwrap_or(DEFAULT_WORK_MS);
        let timer = Timer {
            id: generate_id("timer"),
            kind,
            label: draft.label.unwrap_or_default(),
            duration_ms,
            work_ms,
            break_ms: draft.break_ms.unwrap_or(DEFAULT_BREAK_MS),
            rounds: draft.rounds.unwrap_or(DEFAULT_ROUNDS),
            current_round: 1,
            phase: TimerPhase::Work,
            status: TimerStatus::Planned,
            remaining_ms: match kind {
                TimerKind::Simple => duration_ms,
                TimerKind::Pomodoro => work_ms,
            },
            started_at: None,
            created_at: now_rfc3339(),
            completed_at: None,
            audio_alert: draft.audio_alert.unwrap_or(true),
            desktop_notification: draft.desktop_notification.unwrap_or(true),
        };
        let mut timers = self.load_timers()?;
        timers.push(timer.clone());
        self.save_timers(&timers)?;
        Ok(timer)
    }

    /// Shallow-merges `patch` into the stored record. The id is immutable.
    /// Returns `None` when no timer has that id.
    pub fn update_timer(&self, id: &str, patch: TimerPatch) -> StoreResult<Option<Timer>> {
        let mut timers = self.load_timers()?;
        let Some(timer) = timers.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        if let Some(label) = patch.label {
            timer.label = label;
        }
        if let Some(status) = patch.status {
            timer.status = status;
        }
        if let Some(phase) = patch.phase {
            timer.phase = phase;
        }
        if let Some(current_round) = patch.current_round {
            timer.current_round = current_round;
        }
        if let Some(remaining_ms) = patch.remaining_ms {
            timer.remaining_ms = remaining_ms;
        }
        if let Some(started_at) = patch.started_at {
            timer.started_at = started_at;
        }
        if let Some(completed_at) = patch.completed_at {
            timer.completed_at = completed_at;
        }
        if let Some(audio_alert) = patch.audio_alert {
            timer.audio_alert = audio_alert;
        }
        if let Some(desktop_notification) = patch.desktop_notification {
            timer.desktop_notification = desktop_notification;
        }
        let updated = timer.clone();
        self.save_timers(&timers)?;
        Ok(Some(updated))
    }

    /// Removing a missing id is a no-op.
    pub fn delete_timer(&self, id: &str) -> StoreResult<()> {
        let mut timers = self.load_timers()?;
        let before = timers.len();
        timers.retain(|item| item.id != id);
        if timers.len() != before {
            self.save_timers(&timers)?;
        }
        Ok(())
    }

    pub fn save_timers(&self, timers: &[Timer]) -> StoreResult<()> {
        self.write_json(&self.timers_path, timers)
    }

    fn load_timers(&self) -> StoreResult<Vec<Timer>> {
        if !self.timers_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.timers_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let timers = serde_json::from_str(&contents)?;
        Ok(timers)
    }

    // ---- Notes ----

    /// All notes, most recently updated first.
    pub fn list_notes(&self) -> StoreResult<Vec<Note>> {
        let mut notes = self.load_notes()?;
        notes.sort_by(|a, b| timestamp_key(&b.updated_at).cmp(&timestamp_key(&a.updated_at)));
        Ok(notes)
    }

    pub fn get_note(&self, id: &str) -> StoreResult<Option<Note>> {
        Ok(self.load_notes()?.into_iter().find(|item| item.id == id))
    }

    pub fn create_note(&self) -> StoreResult<Note> {
        let now = now_rfc3339();
        let note = Note {
            id: generate_id("note"),
            title: String::new(),
            content: serde_json::Value::Array(Vec::new()),
            plain_text: String::new(),
            color: DEFAULT_NOTE_COLOR.to_string(),
            is_pinned: false,
            created_at: now.clone(),
            updated_at: now,
            window_bounds: WindowBounds::default(),
        };
        let mut notes = self.load_notes()?;
        notes.push(note.clone());
        self.save_notes(&notes)?;
        Ok(note)
    }

    /// Applies `patch` and refreshes `updatedAt`. A content update rederives
    /// the title from the first non-empty line of the accompanying plain text.
    pub fn update_note(&self, id: &str, patch: NotePatch) -> StoreResult<Option<Note>> {
        let mut notes = self.load_notes()?;
        let Some(note) = notes.iter_mut().find(|item| item.id == id) else {
            return Ok(None);
        };
        if let Some(color) = patch.color {
            note.color = color;
        }
        if let Some(is_pinned) = patch.is_pinned {
            note.is_pinned = is_pinned;
        }
        if let Some(window_bounds) = patch.window_bounds {
            note.window_bounds = window_bounds;
        }
        let plain_text = patch.plain_text;
        if let Some(content) = patch.content {
            let is_document = content.is_array();
            note.content = content;
            if is_document {
                let text = plain_text.unwrap_or_default();
                note.title = derive_title(&text);
                note.plain_text = text;
            }
        } else if let Some(text) = plain_text {
            note.plain_text = text;
        }
        note.updated_at = now_rfc3339();
        let updated = note.clone();
        self.save_notes(&notes)?;
        Ok(Some(updated))
    }

    pub fn delete_note(&self, id: &str) -> StoreResult<()> {
        let mut notes = self.load_notes()?;
        let before = notes.len();
        notes.retain(|item| item.id != id);
        if notes.len() != before {
            self.save_notes(&notes)?;
        }
        Ok(())
    }

    pub fn save_notes(&self, notes: &[Note]) -> StoreResult<()> {
        self.write_json(&self.notes_path, notes)
    }

    fn load_notes(&self) -> StoreResult<Vec<Note>> {
        if !self.notes_path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.notes_path)?;
        if contents.trim().is_empty() {
            return Ok(Vec::new());
        }
        let notes = serde_json::from_str(&contents)?;
        Ok(notes)
    }

    // ---- Settings ----

    pub fn settings(&self) -> StoreResult<AppSettings> {
        if !self.settings_path.exists() {
            return Ok(AppSettings::default());
        }
        let contents = fs::read_to_string(&self.settings_path)?;
        if contents.trim().is_empty() {
            return Ok(AppSettings::default());
        }
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn update_settings(&self, patch: SettingsPatch) -> StoreResult<AppSettings> {
        let mut settings = self.settings()?;
        if let Some(theme) = patch.theme {
            settings.theme = theme;
        }
        if let Some(bounds) = patch.list_window_bounds {
            settings.list_window_bounds = Some(bounds);
        }
        self.write_json(&self.settings_path, &settings)?;
        Ok(settings)
    }

    fn write_json<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> StoreResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("tmp");
        let file = fs::File::create(&temp_path)?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.write_all(b"\n")?;
        writer.flush()?;

        match fs::rename(&temp_path, path) {
            Ok(()) => Ok(()),
            Err(_err) if path.exists() => {
                let _ = fs::remove_file(path);
                fs::rename(&temp_path, path).map_err(StoreError::from)
            }
            Err(err) => Err(StoreError::from(err)),
        }
    }
}

/// First non-empty line of the plain text, capped for list display.
fn derive_title(plain_text: &str) -> String {
    plain_text
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("")
        .chars()
        .take(NOTE_TITLE_MAX_CHARS)
        .collect()
}

fn timestamp_key(value: &str) -> i64 {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp_millis())
        .unwrap_or(0)
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

pub(crate) fn generate_id(prefix: &str) -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!("{prefix}-{nanos}-{}", std::process::id())
}
