#![forbid(unsafe_code)]

pub mod ladder;
pub mod model;
pub mod time;

pub use time::Clock;
