#![forbid(unsafe_code)]

pub mod progress_store;
pub mod remote;
pub mod repository;
pub mod session_store;
pub mod sqlite;

pub use progress_store::{LocalProgressStore, ProgressCell, ProgressStoreError};
pub use remote::HttpUserDirectory;
pub use repository::{KeyValueStore, RemoteError, Storage, StorageError, UserDirectory};
pub use session_store::{SessionStore, StoredSession};
