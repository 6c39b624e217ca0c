#![forbid(unsafe_code)]

pub mod progress;
pub mod repository;
pub mod sqlite;

pub use progress::ProgressRepository;
pub use repository::{InMemoryProgressStore, ProgressKey, ProgressStore, Storage, StorageError};
