use crate::data_store::StoreError;
use crate::timer_engine::TimerError;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AppErrorKind {
    System,
    Store,
    Timer,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppErrorPayload {
    pub kind: AppErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub recoverable: bool,
}

#[derive(Debug, Clone)]
pub struct AppError {
    kind: AppErrorKind,
    message: String,
    detail: Option<String>,
    recoverable: bool,
}

impl AppError {
    pub fn new(kind: AppErrorKind, message: impl Into<String>, recoverable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: None,
            recoverable,
        }
    }

    pub fn with_detail(
        kind: AppErrorKind,
        message: impl Into<String>,
        detail: impl Into<String>,
        recoverable: bool,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            detail: Some(detail.into()),
            recoverable,
        }
    }

    pub fn system(message: impl Into<String>) -> Self {
        Self::new(AppErrorKind::System, message, true)
    }

    pub fn kind(&self) -> AppErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn payload(&self) -> AppErrorPayload {
        AppErrorPayload {
            kind: self.kind,
            message: self.message.clone(),
            detail: self.detail.clone(),
            recoverable: self.recoverable,
        }
    }
}

impl From<TimerError> for AppError {
    fn from(error: TimerError) -> Self {
        let detail = error.to_string();
        let message = match error {
            TimerError::NoActiveTimer => "No timer is selected",
            TimerError::AlreadyRunning => "This timer is already running",
            TimerError::NotRunning => "This timer is not running",
            TimerError::AlreadyCompleted => "This timer has already finished",
            TimerError::InvalidTimer(ref reason) => {
                return Self::with_detail(
                    AppErrorKind::Timer,
                    format!("Invalid timer: {reason}"),
                    detail,
                    true,
                );
            }
        };
        Self::with_detail(AppErrorKind::Timer, message, detail, true)
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        let detail = error.to_string();
        let message = match error {
            StoreError::Io(_) => "Failed to read or write saved data",
            StoreError::Serde(_) => "Saved data could not be loaded",
        };
        Self::with_detail(AppErrorKind::Store, message, detail, true)
    }
}
