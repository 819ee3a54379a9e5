/// Format remaining milliseconds for the countdown view. Seconds round up so
/// the display never reads 00:00 while time is left.
pub fn format_countdown(ms: u64) -> String {
    if ms == 0 {
        return "00:00".to_string();
    }
    let total_seconds = ms.div_ceil(1000);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Compact duration for list cards, rounded to whole minutes.
pub fn format_duration(ms: u64) -> String {
    let total_minutes = (ms + 30_000) / 60_000;
    if total_minutes >= 60 {
        let hours = total_minutes / 60;
        let minutes = total_minutes % 60;
        if minutes > 0 {
            format!("{hours}h {minutes}min")
        } else {
            format!("{hours}h")
        }
    } else {
        format!("{total_minutes}min")
    }
}
