//! Caller side of a run: event stream, selection/cancel control, completion

use crate::orchestrator::messages::{RunEvent, RunReport};
use crate::selection::SelectionDecision;
use crate::utils::error::{AudioloaderError, Result};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Ordered events of one run
#[derive(Debug)]
pub struct RunEvents {
    rx: mpsc::Receiver<RunEvent>,
}

impl RunEvents {
    pub(crate) fn new(rx: mpsc::Receiver<RunEvent>) -> Self {
        Self { rx }
    }

    /// Next event; `None` once the run has ended and everything was read
    pub async fn recv(&mut self) -> Option<RunEvent> {
        self.rx.recv().await
    }
}

impl Stream for RunEvents {
    type Item = RunEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<RunEvent>> {
        self.rx.poll_recv(cx)
    }
}

/// Resume and cancel a running orchestration. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RunControl {
    selection: mpsc::Sender<SelectionDecision>,
    cancel: CancellationToken,
}

impl RunControl {
    pub(crate) fn new(selection: mpsc::Sender<SelectionDecision>, cancel: CancellationToken) -> Self {
        Self { selection, cancel }
    }

    /// Answer a `SelectionNeeded` event. Only the first decision counts.
    pub fn select(&self, decision: SelectionDecision) -> Result<()> {
        self.selection.try_send(decision).map_err(|e| match e {
            TrySendError::Full(_) => {
                AudioloaderError::OperationFailed("a selection was already supplied".to_string())
            }
            TrySendError::Closed(_) => AudioloaderError::OperationFailed(
                "run is no longer waiting for a selection".to_string(),
            ),
        })
    }

    /// Request cooperative cancellation
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Completion of the spawned run
#[derive(Debug)]
pub struct RunTask {
    join: JoinHandle<RunReport>,
}

impl RunTask {
    pub async fn wait(self) -> Result<RunReport> {
        self.join
            .await
            .map_err(|e| AudioloaderError::TaskFailed(e.to_string()))
    }
}

/// Everything a caller needs to follow and steer one run
#[derive(Debug)]
pub struct RunHandle {
    run_id: String,
    events: RunEvents,
    control: RunControl,
    task: RunTask,
}

impl RunHandle {
    pub(crate) fn new(
        run_id: String,
        events: RunEvents,
        control: RunControl,
        join: JoinHandle<RunReport>,
    ) -> Self {
        Self {
            run_id,
            events,
            control,
            task: RunTask { join },
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub async fn next_event(&mut self) -> Option<RunEvent> {
        self.events.recv().await
    }

    pub fn select(&self, decision: SelectionDecision) -> Result<()> {
        self.control.select(decision)
    }

    pub fn cancel(&self) {
        self.control.cancel();
    }

    pub fn control(&self) -> RunControl {
        self.control.clone()
    }

    pub fn into_parts(self) -> (RunEvents, RunControl, RunTask) {
        (self.events, self.control, self.task)
    }

    /// Wait for the run to end. Dropping the handle's control here means a
    /// run still waiting on a selection treats it as cancelled.
    pub async fn wait(self) -> Result<RunReport> {
        let (_, _, task) = self.into_parts();
        task.wait().await
    }
}
