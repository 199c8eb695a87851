//! Async Privileged Task
//!
//! Wraps the Elevated Executor in a single-use lifecycle. `execute` accepts
//! exactly one payload item, moves the task to `Running`, and hands the
//! elevated command to a tokio blocking worker. When the command finishes the
//! worker marks the task `Completed` and posts a `TaskCompletion` to the
//! UI-owning context's event queue; the rollback decision is made there.
//!
//! Tasks are never cancelled once started.

pub mod state;

pub use state::{TaskCompletion, TaskKind, TaskPhase};

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;

use crate::error::ElevationError;
use crate::log_info;
use crate::models::{PrivilegedCommand, TaskOutcome};
use crate::system::ElevatedExecutor;
use crate::ui::threading::UiEvent;

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Builds the command for a payload item
pub type CommandBuilder<P> = fn(&P) -> PrivilegedCommand;

pub struct PrivilegedTask<P> {
    id: u64,
    kind: TaskKind,
    phase: Arc<Mutex<TaskPhase>>,
    executor: Arc<dyn ElevatedExecutor>,
    events: UnboundedSender<UiEvent>,
    runtime: Handle,
    build: CommandBuilder<P>,
}

impl<P> PrivilegedTask<P> {
    pub fn new(
        kind: TaskKind,
        executor: Arc<dyn ElevatedExecutor>,
        events: UnboundedSender<UiEvent>,
        runtime: Handle,
        build: CommandBuilder<P>,
    ) -> Self {
        PrivilegedTask {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            kind,
            phase: Arc::new(Mutex::new(TaskPhase::Idle)),
            executor,
            events,
            runtime,
            build,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn phase(&self) -> TaskPhase {
        match self.phase.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Start the task with exactly one payload item
    ///
    /// # Returns
    /// The worker handle, or `None` if the payload count is wrong or the task
    /// already left `Idle`. A rejected call performs no privileged execution.
    pub fn execute(&self, params: &[P]) -> Option<JoinHandle<()>> {
        if params.len() != 1 {
            log::error!(
                "[PrivilegedTask] {:?}#{}: invalid params count {}",
                self.kind,
                self.id,
                params.len()
            );
            return None;
        }

        {
            let mut phase = match self.phase.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            if !phase.can_transition_to(TaskPhase::Running) {
                log::error!(
                    "[PrivilegedTask] {:?}#{} is single-use, already {}",
                    self.kind,
                    self.id,
                    phase.as_str()
                );
                return None;
            }
            *phase = TaskPhase::Running;
        }

        let command = (self.build)(&params[0]);
        let executor = Arc::clone(&self.executor);
        let phase = Arc::clone(&self.phase);
        let events = self.events.clone();
        let id = self.id;
        let kind = self.kind;

        log_info!("[PrivilegedTask] {:?}#{} running '{}'", kind, id, command);

        let handle = self.runtime.spawn_blocking(move || {
            // A panicking executor still completes the task exactly once
            let result = panic::catch_unwind(AssertUnwindSafe(|| executor.run_elevated(&command)))
                .unwrap_or_else(|payload| {
                    log::error!("[PrivilegedTask] {:?}#{} executor panicked", kind, id);
                    Err(ElevationError::Aborted {
                        cmd: command.command_line().to_string(),
                        reason: panic_reason(payload.as_ref()),
                    })
                });

            let outcome = match result {
                Ok(()) => TaskOutcome::success(),
                Err(e) => {
                    if e.is_denied() {
                        log::warn!("[PrivilegedTask] {:?}#{} denied: {}", kind, id, e);
                    } else {
                        log::warn!("[PrivilegedTask] {:?}#{} failed: {}", kind, id, e);
                    }
                    TaskOutcome::failed(e)
                }
            };

            match phase.lock() {
                Ok(mut guard) => *guard = TaskPhase::Completed { succeeded: outcome.succeeded },
                Err(poisoned) => {
                    *poisoned.into_inner() = TaskPhase::Completed { succeeded: outcome.succeeded }
                }
            }

            let completion = TaskCompletion { id, kind, outcome };
            if events.send(UiEvent::TaskCompleted(completion)).is_err() {
                log::debug!("[PrivilegedTask] {:?}#{} finished after UI context closed", kind, id);
            }
        });
        Some(handle)
    }
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    struct CountingExecutor {
        calls: AtomicUsize,
        deny: bool,
    }

    impl ElevatedExecutor for CountingExecutor {
        fn run_elevated(&self, command: &PrivilegedCommand) -> Result<(), ElevationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.deny {
                Err(ElevationError::Denied {
                    cmd: command.command_line().to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn executor(deny: bool) -> Arc<CountingExecutor> {
        Arc::new(CountingExecutor {
            calls: AtomicUsize::new(0),
            deny,
        })
    }

    #[tokio::test]
    async fn test_single_payload_completes_once() {
        let exec = executor(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = PrivilegedTask::<bool>::new(
            TaskKind::SelinuxMode,
            exec.clone(),
            tx,
            Handle::current(),
            |v: &bool| PrivilegedCommand::setenforce(*v),
        );

        assert_eq!(task.phase(), TaskPhase::Idle);
        let handle = task.execute(&[true]).expect("task should start");
        handle.await.unwrap();

        assert_eq!(task.phase(), TaskPhase::Completed { succeeded: true });
        match rx.recv().await {
            Some(UiEvent::TaskCompleted(c)) => {
                assert_eq!(c.id, task.id());
                assert!(c.outcome.succeeded);
            }
            None => panic!("no completion posted"),
        }
        assert!(rx.try_recv().is_err());
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);

        // Single-use
        assert!(task.execute(&[false]).is_none());
        assert_eq!(exec.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrong_payload_count_stays_idle() {
        let exec = executor(false);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = PrivilegedTask::<bool>::new(
            TaskKind::SelinuxMode,
            exec.clone(),
            tx,
            Handle::current(),
            |v: &bool| PrivilegedCommand::setenforce(*v),
        );

        assert!(task.execute(&[]).is_none());
        assert!(task.execute(&[true, false]).is_none());
        assert_eq!(task.phase(), TaskPhase::Idle);
        assert_eq!(exec.calls.load(Ordering::SeqCst), 0);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_denied_reports_failure_with_reason() {
        let exec = executor(true);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = PrivilegedTask::<bool>::new(
            TaskKind::SelinuxMode,
            exec,
            tx,
            Handle::current(),
            |v: &bool| PrivilegedCommand::setenforce(*v),
        );

        task.execute(&[false]).unwrap().await.unwrap();
        assert_eq!(task.phase(), TaskPhase::Completed { succeeded: false });
        match rx.recv().await {
            Some(UiEvent::TaskCompleted(c)) => {
                assert!(!c.outcome.succeeded);
                assert!(c.outcome.failure.unwrap().is_denied());
            }
            None => panic!("no completion posted"),
        }
    }

    struct PanickingExecutor;

    impl ElevatedExecutor for PanickingExecutor {
        fn run_elevated(&self, _command: &PrivilegedCommand) -> Result<(), ElevationError> {
            panic!("su crashed");
        }
    }

    #[tokio::test]
    async fn test_panicking_executor_still_completes() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = PrivilegedTask::<bool>::new(
            TaskKind::SelinuxMode,
            Arc::new(PanickingExecutor),
            tx,
            Handle::current(),
            |v: &bool| PrivilegedCommand::setenforce(*v),
        );

        task.execute(&[false]).unwrap().await.unwrap();
        assert_eq!(task.phase(), TaskPhase::Completed { succeeded: false });
        match rx.recv().await {
            Some(UiEvent::TaskCompleted(c)) => {
                assert!(!c.outcome.succeeded);
                match c.outcome.failure {
                    Some(ElevationError::Aborted { reason, .. }) => assert_eq!(reason, "su crashed"),
                    other => panic!("unexpected failure {:?}", other),
                }
            }
            None => panic!("no completion posted"),
        }
        assert!(rx.try_recv().is_err());
    }
}
