// state.rs
use crate::message::Message;
use crate::timeline::MessageTimeline;

/// Mutable state of one chat session.
///
/// Only the orchestrator writes `timeline` and `pending`; the UI reads them
/// and edits `draft_input` through the orchestrator.
#[derive(Debug, Default)]
pub struct OrchestratorState {
    /// Everything said so far.
    pub timeline: MessageTimeline,

    /// True while a query's backend call is in flight.
    pub pending: bool,

    /// Uncommitted contents of the input box.
    pub draft_input: String,
}

impl OrchestratorState {
    /// Creates the state for a new session, optionally opening with a bot greeting.
    pub fn new(greeting: Option<&str>) -> Self {
        let mut timeline = MessageTimeline::new();
        if let Some(text) = greeting.filter(|t| !t.trim().is_empty()) {
            timeline.append(Message::bot(text));
        }

        Self {
            timeline,
            pending: false,
            draft_input: String::new(),
        }
    }

    /// Whether a submission of `input` would be accepted right now.
    pub fn accepts(&self, input: &str) -> bool {
        !self.pending && !input.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Role;

    #[test]
    fn test_new_seeds_greeting() {
        let state = OrchestratorState::new(Some("Hello! I'm FloatChat."));
        assert_eq!(state.timeline.messages().len(), 1);
        assert_eq!(state.timeline.messages().last().map(|m| m.role), Some(Role::Bot));
        assert!(!state.pending);
        assert!(state.draft_input.is_empty());
    }

    #[test]
    fn test_blank_greeting_is_skipped() {
        assert!(OrchestratorState::new(Some("   ")).timeline.messages().is_empty());
        assert!(OrchestratorState::new(None).timeline.messages().is_empty());
    }

    #[test]
    fn test_accepts() {
        let mut state = OrchestratorState::new(None);
        assert!(state.accepts("salinity in the Arabian Sea"));
        assert!(!state.accepts(" \t\n"));

        state.pending = true;
        assert!(!state.accepts("salinity in the Arabian Sea"));
    }
}
