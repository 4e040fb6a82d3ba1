mod message;
mod thread;

pub use message::{ChatMessage, Sender};
pub use thread::{Thread, DEFAULT_THREAD_TITLE};
