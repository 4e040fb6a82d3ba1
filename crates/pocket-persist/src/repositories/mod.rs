mod thread;

pub use thread::{ThreadRepository, DEFAULT_HISTORY_KEY};
