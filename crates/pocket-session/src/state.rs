use serde::{Deserialize, Serialize};

/// Lifecycle of a [`crate::SessionStore`]
///
/// `Uninitialized -> Loading -> Ready <-> AwaitingReply`. `ConfigurationError`
/// is entered when a thread is requested without a chat client and is only
/// left by building a new store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorePhase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    AwaitingReply,
    ConfigurationError,
}

impl StorePhase {
    pub fn accepts_input(&self) -> bool {
        matches!(self, StorePhase::Ready)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BannerKind {
    /// Missing credential; stays until the store is rebuilt
    Configuration,
    /// Thread creation failed; can be dismissed
    Service,
}

/// Error message shown above the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub kind: BannerKind,
    pub message: String,
}

impl Banner {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Configuration,
            message: message.into(),
        }
    }

    pub fn service(message: impl Into<String>) -> Self {
        Self {
            kind: BannerKind::Service,
            message: message.into(),
        }
    }

    pub fn is_dismissible(&self) -> bool {
        self.kind == BannerKind::Service
    }
}
