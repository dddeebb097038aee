use serde::{Deserialize, Serialize};

use super::CapabilityKind;

/// Which participant produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    User,
    Dispatcher,
    Capability(CapabilityKind),
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::User => "user",
            Origin::Dispatcher => "dispatcher",
            Origin::Capability(kind) => kind.as_str(),
        }
    }
}

/// One immutable entry in a session's history.
///
/// `failed` marks handler results that describe a failure instead of data. The
/// dispatch loop treats failed and successful messages identically (forward
/// progress), but the flag spares downstream consumers from string inspection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub origin: Origin,
    pub content: String,
    pub failed: bool,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            origin: Origin::User,
            content: content.into(),
            failed: false,
        }
    }

    pub fn dispatcher(content: impl Into<String>) -> Self {
        Self {
            origin: Origin::Dispatcher,
            content: content.into(),
            failed: false,
        }
    }

    pub fn capability(kind: CapabilityKind, content: impl Into<String>) -> Self {
        Self {
            origin: Origin::Capability(kind),
            content: content.into(),
            failed: false,
        }
    }

    pub fn failure(kind: CapabilityKind, content: impl Into<String>) -> Self {
        Self {
            origin: Origin::Capability(kind),
            content: content.into(),
            failed: true,
        }
    }
}
