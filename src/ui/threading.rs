//! Threading and Async Integration Helpers
//!
//! Workers never touch UI state directly. They post a `UiEvent` into an
//! unbounded queue whose single consumer is the UI-owning context, which
//! drains it in submission order.

use tokio::sync::mpsc;

use crate::orchestrator::TaskCompletion;

/// Messages delivered to the UI-owning context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// A privileged task finished
    TaskCompleted(TaskCompletion),
}

/// Event queue owned by the UI-owning context
pub struct UiBridge {
    /// Cloned into every worker
    event_tx: mpsc::UnboundedSender<UiEvent>,

    /// Single consumer
    event_rx: mpsc::UnboundedReceiver<UiEvent>,
}

impl UiBridge {
    pub fn new() -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        UiBridge { event_tx, event_rx }
    }

    /// Sender handed to workers
    pub fn sender(&self) -> mpsc::UnboundedSender<UiEvent> {
        self.event_tx.clone()
    }

    /// Take the next queued event without blocking
    pub fn try_next(&mut self) -> Option<UiEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Wait for the next event
    ///
    /// The bridge holds a sender itself, so this only returns `None` if the
    /// queue was closed explicitly.
    pub async fn next(&mut self) -> Option<UiEvent> {
        self.event_rx.recv().await
    }
}

impl Default for UiBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskOutcome;
    use crate::orchestrator::TaskKind;

    fn completion(id: u64) -> UiEvent {
        UiEvent::TaskCompleted(TaskCompletion {
            id,
            kind: TaskKind::SelinuxMode,
            outcome: TaskOutcome::success(),
        })
    }

    #[tokio::test]
    async fn test_events_drain_in_submission_order() {
        let mut bridge = UiBridge::new();
        let tx = bridge.sender();
        tokio::spawn(async move {
            for id in 1..=3 {
                let _ = tx.send(completion(id));
            }
        })
        .await
        .unwrap();

        assert_eq!(bridge.next().await, Some(completion(1)));
        assert_eq!(bridge.try_next(), Some(completion(2)));
        assert_eq!(bridge.try_next(), Some(completion(3)));
        assert_eq!(bridge.try_next(), None);
    }
}
