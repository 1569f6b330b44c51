// orchestrator.rs
use crate::backend::AnswerBackend;
use crate::location::LocationExtractor;
use crate::map::{notify_isolated, MapZoomNotifier};
use crate::message::Message;
use crate::state::OrchestratorState;
use log::{debug, info, warn};
use std::cell::{Ref, RefCell};
use std::future::Future;
use std::rc::Rc;

/// Shown when the backend answers without a summary.
pub const NO_RESPONSE_FALLBACK: &str = "Sorry, I could not generate a response right now.";

/// Shown when the backend call fails outright.
pub const ERROR_FALLBACK: &str = "Something went wrong. Please try again.";

/// Drives one chat session: turns user queries into timeline entries and
/// forwards detected places to the map.
///
/// All clones share the same session. The orchestrator is single-threaded and
/// must run inside a `tokio::task::LocalSet`, because the location lookup is
/// spawned with `spawn_local`.
#[derive(Clone)]
pub struct QueryOrchestrator {
    state: Rc<RefCell<OrchestratorState>>,
    locations: Rc<dyn LocationExtractor>,
    backend: Rc<dyn AnswerBackend>,
    notifier: MapZoomNotifier,
}

/// Clears `pending` when dropped, so a settled, failed or abandoned backend
/// call never leaves the loading flag on.
struct PendingGuard {
    state: Rc<RefCell<OrchestratorState>>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.state.borrow_mut().pending = false;
    }
}

impl QueryOrchestrator {
    pub fn new(
        state: OrchestratorState,
        locations: Rc<dyn LocationExtractor>,
        backend: Rc<dyn AnswerBackend>,
        notifier: MapZoomNotifier,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(state)),
            locations,
            backend,
            notifier,
        }
    }

    /// Processes one user query.
    ///
    /// Ignored when `raw_input` is blank or another query is still pending.
    /// Otherwise the user message is appended, the draft is cleared and
    /// `pending` is set before this returns, so the UI sees the submission
    /// at once. The returned future starts a detached location lookup and
    /// appends the backend answer (or a fallback) once the backend call
    /// settles. Never fails.
    ///
    /// Dropping the future before it completes clears `pending` without a
    /// bot reply.
    pub fn submit_query(&self, raw_input: String) -> impl Future<Output = ()> + 'static {
        let accepted = self.accept(&raw_input);
        let this = self.clone();

        async move {
            let Some(guard) = accepted else {
                return;
            };

            this.spawn_location_lookup(raw_input.clone());

            let content = match this.backend.answer(&raw_input).await {
                Ok(answer) => answer
                    .summary
                    .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string()),
                Err(e) => {
                    warn!("backend error: {}", e);
                    ERROR_FALLBACK.to_string()
                }
            };

            this.state.borrow_mut().timeline.append(Message::bot(content));
            drop(guard);
        }
    }

    /// Gates a submission and records it.
    ///
    /// # Returns
    /// * `Some(PendingGuard)` if the query was accepted.
    fn accept(&self, raw_input: &str) -> Option<PendingGuard> {
        let mut state = self.state.borrow_mut();
        if !state.accepts(raw_input) {
            debug!(
                "ignoring submission (pending: {}, blank: {})",
                state.pending,
                raw_input.trim().is_empty()
            );
            return None;
        }

        state.timeline.append(Message::user(raw_input));
        state.draft_input.clear();
        state.pending = true;
        debug!("query accepted: {}", raw_input);

        Some(PendingGuard {
            state: Rc::clone(&self.state),
        })
    }

    /// Side channel: find a place in `text` and point the map at it.
    ///
    /// The task owns only the extractor and the notifier; it cannot touch the
    /// timeline or the pending flag. Its handle is dropped on purpose.
    fn spawn_location_lookup(&self, text: String) {
        let extractor = Rc::clone(&self.locations);
        let notifier = Rc::clone(&self.notifier);

        tokio::task::spawn_local(async move {
            match extractor.extract_locations(&text).await {
                Ok(found) => match found.primary() {
                    Some(location) => {
                        info!("location detected: {}", location);
                        notify_isolated(&notifier, location);
                    }
                    None => debug!("no location in query"),
                },
                Err(e) => warn!("location detection error: {}", e),
            }
        });
    }

    /// Read access for renderers. Do not hold it across an `.await`.
    pub fn state(&self) -> Ref<'_, OrchestratorState> {
        self.state.borrow()
    }

    pub fn messages(&self) -> Vec<Message> {
        self.state.borrow().timeline.snapshot()
    }

    pub fn is_pending(&self) -> bool {
        self.state.borrow().pending
    }

    pub fn draft_input(&self) -> String {
        self.state.borrow().draft_input.clone()
    }

    #[cfg(test)]
    pub fn set_draft_input(&self, text: impl Into<String>) {
        self.state.borrow_mut().draft_input = text.into();
    }

    pub fn push_draft_char(&self, c: char) {
        self.state.borrow_mut().draft_input.push(c);
    }

    pub fn pop_draft_char(&self) {
        self.state.borrow_mut().draft_input.pop();
    }

    /// Whether the current draft may be submitted.
    pub fn can_submit(&self) -> bool {
        let state = self.state.borrow();
        state.accepts(&state.draft_input)
    }
}
