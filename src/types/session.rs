use serde::Serialize;
use uuid::Uuid;

use super::{Message, RouteTarget};

/// Per-request conversation state passed between the dispatcher and handlers.
///
/// The history is append-only: there is no API to reorder or truncate it, so
/// its order is always the dispatch order. A session lives for exactly one
/// user request.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    id: Uuid,
    history: Vec<Message>,
    next: Option<RouteTarget>,
}

impl Session {
    /// Create a session seeded with the user's request.
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            history: vec![Message::user(user_message)],
            next: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn last(&self) -> Option<&Message> {
        self.history.last()
    }

    pub fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Record the most recent routing choice. Written only by the dispatcher;
    /// kept for observability.
    pub fn set_next(&mut self, target: RouteTarget) {
        self.next = Some(target);
    }

    pub fn next(&self) -> Option<RouteTarget> {
        self.next
    }

    /// Plain-text rendering of the history, one line per message, used as the
    /// conversation context for the routing model and parameter extraction.
    pub fn transcript(&self) -> String {
        self.history
            .iter()
            .map(|m| {
                if m.failed {
                    format!("{} (failed): {}", m.origin.as_str(), m.content)
                } else {
                    format!("{}: {}", m.origin.as_str(), m.content)
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CapabilityKind, Origin};

    #[test]
    fn test_new_session_seeds_user_message() {
        let session = Session::new("weather in Paris");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].origin, Origin::User);
        assert_eq!(session.history()[0].content, "weather in Paris");
        assert!(session.next().is_none());
    }

    #[test]
    fn test_history_is_append_only() {
        let mut session = Session::new("hi");
        let before: Vec<_> = session.history().to_vec();

        session.push(Message::capability(CapabilityKind::Weather, "sunny"));

        assert_eq!(session.history().len(), before.len() + 1);
        assert_eq!(&session.history()[..before.len()], &before[..]);
    }

    #[test]
    fn test_set_next_records_choice() {
        let mut session = Session::new("hi");
        session.set_next(RouteTarget::Capability(CapabilityKind::Hotel));
        assert_eq!(
            session.next(),
            Some(RouteTarget::Capability(CapabilityKind::Hotel))
        );
        session.set_next(RouteTarget::Finish);
        assert_eq!(session.next(), Some(RouteTarget::Finish));
    }

    #[test]
    fn test_transcript_marks_failures() {
        let mut session = Session::new("find hotels");
        session.push(Message::failure(CapabilityKind::Hotel, "no results"));

        let transcript = session.transcript();
        assert!(transcript.contains("user: find hotels"));
        assert!(transcript.contains("hotel_search_expert (failed): no results"));
    }
}
