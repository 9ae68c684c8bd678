mod engine;
mod events;
mod locks;
mod remote;

pub use engine::{LoadedProgress, ProgressEngine, ProgressSource, TopicPress};
pub use events::{LessonRoute, NoopEvents, ProgressEvent, ProgressEvents};
pub use locks::UserLocks;
pub use remote::RemoteProgressClient;
