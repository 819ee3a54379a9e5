use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerKind {
    Simple,
    Pomodoro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerPhase {
    Work,
    Break,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Planned,
    Running,
    Paused,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Timer {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TimerKind,
    pub label: String,
    pub duration_ms: u64,
    pub work_ms: u64,
    pub break_ms: u64,
    pub rounds: u32,
    pub current_round: u32,
    pub phase: TimerPhase,
    pub status: TimerStatus,
    pub remaining_ms: u64,
    pub started_at: Option<String>,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub audio_alert: bool,
    pub desktop_notification: bool,
}

impl Timer {
    /// Remaining time a freshly created or reset timer counts down from.
    pub fn initial_remaining_ms(&self) -> u64 {
        match self.kind {
            TimerKind::Simple => self.duration_ms,
            TimerKind::Pomodoro => self.work_ms,
        }
    }

    /// Full length of the segment currently counting down.
    pub fn phase_total_ms(&self) -> u64 {
        match self.kind {
            TimerKind::Simple => self.duration_ms,
            TimerKind::Pomodoro => match self.phase {
                TimerPhase::Work => self.work_ms,
                TimerPhase::Break => self.break_ms,
            },
        }
    }
}

/// Creation input; every omitted field falls back to a store default.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimerDraft {
    #[serde(rename = "type")]
    pub kind: Option<TimerKind>,
    pub label: Option<String>,
    pub duration_ms: Option<u64>,
    pub work_ms: Option<u64>,
    pub break_ms: Option<u64>,
    pub rounds: Option<u32>,
    pub audio_alert: Option<bool>,
    pub desktop_notification: Option<bool>,
}

/// Partial update; `None` leaves a field untouched. The nullable timestamps
/// use a nested `Option` so a patch can explicitly clear them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TimerPatch {
    pub label: Option<String>,
    pub status: Option<TimerStatus>,
    pub phase: Option<TimerPhase>,
    pub current_round: Option<u32>,
    pub remaining_ms: Option<u64>,
    pub started_at: Option<Option<String>>,
    pub completed_at: Option<Option<String>>,
    pub audio_alert: Option<bool>,
    pub desktop_notification: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    /// Rich-text document exactly as the embedded editor produced it.
    pub content: serde_json::Value,
    pub plain_text: String,
    pub color: String,
    pub is_pinned: bool,
    pub created_at: String,
    pub updated_at: String,
    pub window_bounds: WindowBounds,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowBounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<i32>,
    pub width: u32,
    pub height: u32,
}

impl Default for WindowBounds {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: 300,
            height: 350,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NotePatch {
    pub content: Option<serde_json::Value>,
    pub plain_text: Option<String>,
    pub color: Option<String>,
    pub is_pinned: Option<bool>,
    pub window_bounds: Option<WindowBounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    pub theme: Theme,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub list_window_bounds: Option<WindowBounds>,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub theme: Option<Theme>,
    pub list_window_bounds: Option<WindowBounds>,
}
