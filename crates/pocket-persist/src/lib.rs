pub mod models;
pub mod repositories;
pub mod dbs;
pub mod trait_client;
pub mod error;
pub mod builder;

pub use models::{ChatMessage, Sender, Thread, DEFAULT_THREAD_TITLE};
pub use repositories::{ThreadRepository, DEFAULT_HISTORY_KEY};
pub use dbs::{FileStorage, MemoryStorage};
pub use trait_client::StorageBackend;
pub use error::PersistError;
pub use builder::ThreadRepositoryBuilder;
