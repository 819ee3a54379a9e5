use std::process::Command;
use std::time::SystemTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertReason {
    Played,
    Muted,
    TimerDisabled,
    PlaybackDisabled,
    PlaybackFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackMode {
    #[default]
    System,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRecord {
    pub timer_id: String,
    pub played: bool,
    pub reason: AlertReason,
    pub timestamp: SystemTime,
}

/// Audible alert sink. Playback is best-effort: every attempt is recorded,
/// nothing is ever propagated back to the countdown.
#[derive(Debug, Default)]
pub struct AlertPlayer {
    global_mute: bool,
    playback_mode: PlaybackMode,
    log: Vec<AlertRecord>,
    failure_notified: bool,
}

impl AlertPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_playback_mode(playback_mode: PlaybackMode) -> Self {
        Self {
            playback_mode,
            ..Self::default()
        }
    }

    pub fn is_muted(&self) -> bool {
        self.global_mute
    }

    pub fn set_global_mute(&mut self, muted: bool) {
        self.global_mute = muted;
    }

    pub fn toggle_global_mute(&mut self) -> bool {
        self.global_mute = !self.global_mute;
        self.global_mute
    }

    pub fn records(&self) -> &[AlertRecord] {
        &self.log
    }

    /// Play the alert for a finished segment of `timer_id`, honoring the
    /// global mute and the timer's own `audioAlert` preference.
    pub fn play_alert(&mut self, timer_id: &str, audio_alert_enabled: bool) -> AlertRecord {
        let (played, reason) = if self.global_mute {
            (false, AlertReason::Muted)
        } else if !audio_alert_enabled {
            (false, AlertReason::TimerDisabled)
        } else if matches!(self.playback_mode, PlaybackMode::Disabled) {
            (false, AlertReason::PlaybackDisabled)
        } else if play_system_alert() {
            (true, AlertReason::Played)
        } else {
            (false, AlertReason::PlaybackFailed)
        };

        let record = AlertRecord {
            timer_id: timer_id.to_string(),
            played,
            reason,
            timestamp: SystemTime::now(),
        };
        self.log.push(record.clone());
        record
    }

    /// The first playback failure is worth surfacing; repeats are not.
    pub fn should_notify_failure(&mut self, record: &AlertRecord) -> bool {
        if record.reason != AlertReason::PlaybackFailed {
            return false;
        }
        if self.failure_notified {
            return false;
        }
        self.failure_notified = true;
        true
    }
}

fn play_system_alert() -> bool {
    #[cfg(target_os = "macos")]
    return spawn_player("afplay", &["/System/Library/Sounds/Glass.aiff"]);
    #[cfg(target_os = "linux")]
    return spawn_player(
        "paplay",
        &["/usr/share/sounds/freedesktop/stereo/complete.oga"],
    );
    #[cfg(target_os = "windows")]
    return spawn_player("powershell", &["-NoProfile", "-Command", "[console]::beep(800,500)"]);
    #[allow(unreachable_code)]
    false
}

fn spawn_player(program: &str, args: &[&str]) -> bool {
    match Command::new(program).args(args).spawn() {
        Ok(_child) => true,
        Err(err) => {
            log::debug!("alert playback failed: {err}");
            false
        }
    }
}
