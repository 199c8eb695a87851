//! Privileged Task State Tracking
//!
//! **Architecture**:
//! - `TaskPhase`: discrete states in a task's single-use lifecycle
//! - `TaskKind`: which logical action a task performs, used to route its completion
//! - `TaskCompletion`: the message a worker posts back to the UI-owning context

use crate::models::TaskOutcome;

/// Lifecycle of one privileged task: `Idle -> Running -> Completed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskPhase {
    /// Constructed, not yet executed
    Idle,

    /// Elevated command running on a worker
    Running,

    /// Finished; terminal
    Completed { succeeded: bool },
}

impl TaskPhase {
    /// Get the human-readable name for this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPhase::Idle => "idle",
            TaskPhase::Running => "running",
            TaskPhase::Completed { succeeded: true } => "completed(success)",
            TaskPhase::Completed { succeeded: false } => "completed(failure)",
        }
    }

    /// Check if a transition to the given phase is valid.
    pub fn can_transition_to(&self, next: TaskPhase) -> bool {
        matches!(
            (self, next),
            (TaskPhase::Idle, TaskPhase::Running) | (TaskPhase::Running, TaskPhase::Completed { .. })
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskPhase::Completed { .. })
    }
}

/// Logical action a task performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// User flipped the enforcement toggle
    SelinuxMode,
    /// Persisted enforcement override re-applied at boot
    BootRestore,
}

/// Posted exactly once per executed task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskCompletion {
    pub id: u64,
    pub kind: TaskKind,
    pub outcome: TaskOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transitions() {
        assert!(TaskPhase::Idle.can_transition_to(TaskPhase::Running));
        assert!(TaskPhase::Running.can_transition_to(TaskPhase::Completed { succeeded: false }));
        assert!(!TaskPhase::Idle.can_transition_to(TaskPhase::Completed { succeeded: true }));
        assert!(!TaskPhase::Completed { succeeded: true }.can_transition_to(TaskPhase::Running));
    }

    #[test]
    fn test_terminal_phase() {
        assert!(TaskPhase::Completed { succeeded: true }.is_terminal());
        assert!(!TaskPhase::Running.is_terminal());
        assert_eq!(TaskPhase::Completed { succeeded: false }.as_str(), "completed(failure)");
    }
}
