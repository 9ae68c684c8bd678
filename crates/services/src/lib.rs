#![forbid(unsafe_code)]

pub mod account_service;
pub mod app_services;
pub mod config;
pub mod context;
pub mod error;
pub mod leaderboard_service;
pub mod progress;

pub use eduplay_core::Clock;

pub use account_service::AccountService;
pub use app_services::AppServices;
pub use config::RemoteConfig;
pub use context::SessionContext;
pub use error::{AccountError, AppServicesError, LeaderboardError, ProgressError};
pub use leaderboard_service::LeaderboardService;
pub use progress::{
    LessonRoute, LoadedProgress, NoopEvents, ProgressEngine, ProgressEvent, ProgressEvents,
    ProgressSource, TopicPress,
};
