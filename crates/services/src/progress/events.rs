use eduplay_core::model::{PathName, PathProgress, Topic};

/// Where the UI should go after a fresh completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonRoute {
    pub topic: Topic,
    pub path: PathName,
}

/// Signals for the UI layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// New percentage and completed set to render for a path.
    ProgressChanged { path: PathName, progress: PathProgress },
    /// Open the lesson for a topic that was just completed.
    NavigateToLesson(LessonRoute),
    /// Something the user should be told about.
    Error { message: String },
}

pub trait ProgressEvents: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Sink for callers that only use return values.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEvents;

impl ProgressEvents for NoopEvents {
    fn emit(&self, _event: ProgressEvent) {}
}
