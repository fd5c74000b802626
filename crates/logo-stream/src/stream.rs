use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::abort::{AbortAck, AbortHandle, StreamPhase, wait_for_ack};
use crate::errors::{LogoStreamError, StreamFailure};
use crate::model::{CompletionSignal, GenerationTask, LogoEvent, TaskId, TaskState};
use crate::remote::FrameStream;
use crate::transport::{SseFrame, StreamMessage, decode_frame};

/// Who ended a stream with an abort.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AbortInitiator {
    /// `AbortHandle::abort` was called (or the consumer went away).
    User,
    /// The service sent an `aborted` message on its own.
    Server,
}

/// Events yielded by `LogoStream`.
///
/// Every stream starts with `Opened` and ends with exactly one of
/// `Completed`, `Aborted` or `Error`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamEvent {
    Opened {
        task_id: TaskId,
    },
    /// A logo was generated. `seq` is the arrival ordinal, `logo.index` the
    /// service's display position.
    Logo {
        task_id: TaskId,
        seq: u64,
        logo: LogoEvent,
    },
    Completed {
        task_id: TaskId,
        /// Logos delivered on the stream (the first logo is not included).
        generated: usize,
    },
    Aborted {
        task_id: TaskId,
        initiator: AbortInitiator,
        ack: AbortAck,
    },
    Error {
        task_id: TaskId,
        error: StreamFailure,
    },
}

impl StreamEvent {
    /// Returns `true` for the final event of a stream.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Aborted { .. } | Self::Error { .. }
        )
    }
}

/// Why a stream closed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CloseReason {
    Completed,
    Aborted,
    Errored,
}

/// Controller state. `Closed` is final; every input received there is
/// rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StreamState {
    Idle,
    Open,
    Closed(CloseReason),
}

/// State machine applied to the inputs of one stream connection.
pub(crate) struct StreamController {
    task_id: TaskId,
    state: StreamState,
    completion: CompletionSignal,
    phase: Arc<StreamPhase>,
    seen_indexes: HashSet<u32>,
    delivered: usize,
    seq: u64,
}

impl StreamController {
    pub(crate) fn new(task_id: TaskId, completion: CompletionSignal, phase: Arc<StreamPhase>) -> Self {
        Self {
            task_id,
            state: StreamState::Idle,
            completion,
            phase,
            seen_indexes: HashSet::new(),
            delivered: 0,
            seq: 0,
        }
    }

    pub(crate) fn state(&self) -> StreamState {
        self.state
    }

    pub(crate) fn is_closed(&self) -> bool {
        matches!(self.state, StreamState::Closed(_))
    }

    pub(crate) fn open(&mut self) -> Vec<StreamEvent> {
        if self.state != StreamState::Idle {
            warn!(task_id = %self.task_id, state = ?self.state, "rejecting open outside idle state");
            return Vec::new();
        }
        self.state = StreamState::Open;
        info!(task_id = %self.task_id, "logo stream opened");
        vec![StreamEvent::Opened {
            task_id: self.task_id.clone(),
        }]
    }

    pub(crate) fn on_frame(&mut self, frame: &SseFrame) -> Vec<StreamEvent> {
        if !self.accepting("frame") {
            return Vec::new();
        }
        let message = match decode_frame(frame) {
            Ok(message) => message,
            Err(message) => {
                warn!(task_id = %self.task_id, %message, "undecodable stream message");
                return self.close(
                    CloseReason::Errored,
                    StreamEvent::Error {
                        task_id: self.task_id.clone(),
                        error: StreamFailure::Protocol { message },
                    },
                );
            }
        };

        match message {
            StreamMessage::Logo { logo, is_last } => self.on_logo(logo, is_last),
            StreamMessage::Done => match self.completion {
                CompletionSignal::DoneEvent => self.complete(),
                CompletionSignal::LastFlag => {
                    debug!(task_id = %self.task_id, "ignoring done event, completion is flagged on the last logo");
                    Vec::new()
                }
            },
            StreamMessage::Aborted { total_generated } => {
                info!(task_id = %self.task_id, total_generated, "service aborted generation");
                self.close(
                    CloseReason::Aborted,
                    StreamEvent::Aborted {
                        task_id: self.task_id.clone(),
                        initiator: AbortInitiator::Server,
                        ack: AbortAck {
                            total_generated,
                            confirmed: true,
                            message: None,
                        },
                    },
                )
            }
            StreamMessage::Failed { message } => {
                warn!(task_id = %self.task_id, %message, "service reported generation error");
                self.close(
                    CloseReason::Errored,
                    StreamEvent::Error {
                        task_id: self.task_id.clone(),
                        error: StreamFailure::Remote { message },
                    },
                )
            }
            StreamMessage::Ignored { reason } => {
                debug!(task_id = %self.task_id, %reason, "ignoring stream message");
                Vec::new()
            }
        }
    }

    pub(crate) fn on_transport_error(&mut self, message: String) -> Vec<StreamEvent> {
        if !self.accepting("transport error") {
            return Vec::new();
        }
        warn!(task_id = %self.task_id, %message, "stream transport failed");
        self.close(
            CloseReason::Errored,
            StreamEvent::Error {
                task_id: self.task_id.clone(),
                error: StreamFailure::Transport { message },
            },
        )
    }

    pub(crate) fn on_end_of_stream(&mut self) -> Vec<StreamEvent> {
        self.on_transport_error("stream ended without completion signal".to_string())
    }

    pub(crate) fn on_idle_timeout(&mut self, after: Duration) -> Vec<StreamEvent> {
        if !self.accepting("idle timeout") {
            return Vec::new();
        }
        warn!(task_id = %self.task_id, after_secs = after.as_secs(), "stream idle timeout");
        self.close(
            CloseReason::Errored,
            StreamEvent::Error {
                task_id: self.task_id.clone(),
                error: StreamFailure::IdleTimeout {
                    after_secs: after.as_secs(),
                },
            },
        )
    }

    /// Final transition after a user abort was acknowledged (or failed).
    pub(crate) fn on_user_abort(&mut self, ack: AbortAck) -> Vec<StreamEvent> {
        if self.state != StreamState::Open {
            warn!(task_id = %self.task_id, state = ?self.state, "rejecting abort acknowledgment outside open state");
            return Vec::new();
        }
        self.state = StreamState::Closed(CloseReason::Aborted);
        vec![StreamEvent::Aborted {
            task_id: self.task_id.clone(),
            initiator: AbortInitiator::User,
            ack,
        }]
    }

    fn on_logo(&mut self, logo: LogoEvent, is_last: bool) -> Vec<StreamEvent> {
        if !self.seen_indexes.insert(logo.index) {
            warn!(task_id = %self.task_id, index = logo.index, "dropping duplicate logo index");
            return Vec::new();
        }
        let seq = self.seq;
        self.seq = self.seq.saturating_add(1);
        self.delivered += 1;
        debug!(task_id = %self.task_id, index = logo.index, seq, "logo generated");

        let mut events = vec![StreamEvent::Logo {
            task_id: self.task_id.clone(),
            seq,
            logo,
        }];
        if is_last && self.completion == CompletionSignal::LastFlag {
            events.extend(self.complete());
        }
        events
    }

    fn complete(&mut self) -> Vec<StreamEvent> {
        info!(task_id = %self.task_id, generated = self.delivered, "logo stream completed");
        self.close(
            CloseReason::Completed,
            StreamEvent::Completed {
                task_id: self.task_id.clone(),
                generated: self.delivered,
            },
        )
    }

    fn accepting(&self, input: &str) -> bool {
        match self.state {
            StreamState::Open if self.phase.is_abort_requested() => {
                debug!(task_id = %self.task_id, input, "abort in flight, dropping input");
                false
            }
            StreamState::Open => true,
            state => {
                debug!(task_id = %self.task_id, input, ?state, "rejecting input outside open state");
                false
            }
        }
    }

    fn close(&mut self, reason: CloseReason, event: StreamEvent) -> Vec<StreamEvent> {
        if !self.phase.finish() {
            debug!(task_id = %self.task_id, ?reason, "abort won the race, suppressing terminal event");
            return Vec::new();
        }
        self.state = StreamState::Closed(reason);
        vec![event]
    }
}

enum FrameInput {
    Frame(SseFrame),
    Failed(String),
    Ended,
    IdleTimeout(Duration),
}

enum Step {
    Cancelled,
    ConsumerGone,
    Input(FrameInput),
}

async fn next_input(frames: Option<&mut FrameStream>, idle: Option<Duration>) -> FrameInput {
    let Some(frames) = frames else {
        return std::future::pending().await;
    };
    let next = match idle {
        Some(limit) => match tokio::time::timeout(limit, frames.next()).await {
            Ok(next) => next,
            Err(_) => return FrameInput::IdleTimeout(limit),
        },
        None => frames.next().await,
    };
    match next {
        Some(Ok(frame)) => FrameInput::Frame(frame),
        Some(Err(err)) => FrameInput::Failed(err.to_string()),
        None => FrameInput::Ended,
    }
}

async fn dispatch(tx: &mpsc::Sender<StreamEvent>, events: Vec<StreamEvent>) -> bool {
    for event in events {
        if tx.send(event).await.is_err() {
            return false;
        }
    }
    true
}

pub(crate) struct ControllerTask {
    pub controller: StreamController,
    pub frames: FrameStream,
    pub tx: mpsc::Sender<StreamEvent>,
    pub cancel: CancellationToken,
    pub ack_rx: watch::Receiver<Option<AbortAck>>,
    pub abort: AbortHandle,
    pub idle_timeout: Option<Duration>,
}

/// Owns the connection for its whole life; dropping `frames` closes it.
pub(crate) async fn run_controller(task: ControllerTask) {
    let ControllerTask {
        mut controller,
        frames,
        tx,
        cancel,
        mut ack_rx,
        abort,
        idle_timeout,
    } = task;
    let mut frames = Some(frames);

    if !dispatch(&tx, controller.open()).await {
        consumer_gone(&abort).await;
        return;
    }

    while !controller.is_closed() {
        let step = tokio::select! {
            biased;
            _ = cancel.cancelled() => Step::Cancelled,
            _ = tx.closed() => Step::ConsumerGone,
            input = next_input(frames.as_mut(), idle_timeout), if frames.is_some() => Step::Input(input),
        };

        let events = match step {
            Step::Cancelled => {
                drop(frames.take());
                debug!(task_id = %abort.task_id(), "stream connection closed for abort");
                let ack = wait_for_ack(&mut ack_rx).await;
                let events = controller.on_user_abort(ack);
                let _ = dispatch(&tx, events).await;
                return;
            }
            Step::ConsumerGone => {
                drop(frames.take());
                consumer_gone(&abort).await;
                return;
            }
            Step::Input(FrameInput::Frame(frame)) => controller.on_frame(&frame),
            Step::Input(FrameInput::Failed(message)) => {
                frames = None;
                controller.on_transport_error(message)
            }
            Step::Input(FrameInput::Ended) => {
                frames = None;
                controller.on_end_of_stream()
            }
            Step::Input(FrameInput::IdleTimeout(after)) => {
                frames = None;
                controller.on_idle_timeout(after)
            }
        };

        if !dispatch(&tx, events).await {
            drop(frames.take());
            consumer_gone(&abort).await;
            return;
        }
    }
    debug!(task_id = %abort.task_id(), state = ?controller.state(), "stream controller finished");
}

async fn consumer_gone(abort: &AbortHandle) {
    debug!(task_id = %abort.task_id(), "stream consumer dropped, cancelling generation");
    let _ = abort.abort().await;
}

/// Final summary of a stream returned by `LogoStream::finish`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamOutcome {
    pub task_id: TaskId,
    pub state: TaskState,
    /// Logos received in arrival order.
    pub logos: Vec<LogoEvent>,
    /// The terminal event that ended the stream.
    pub terminal: StreamEvent,
}

/// Callback-style consumer for `LogoStream::drive`.
pub trait StreamObserver {
    fn on_logo(&mut self, logo: &LogoEvent);

    fn on_complete(&mut self, _generated: usize) {}

    fn on_error(&mut self, _error: &StreamFailure) {}

    fn on_abort(&mut self, _ack: &AbortAck, _initiator: AbortInitiator) {}
}

/// Live stream of logo events for one generation task.
///
/// Yields events until the terminal one; it cannot be restarted. Dropping it
/// before the terminal event cancels the task on the service.
pub struct LogoStream {
    task: GenerationTask,
    rx: mpsc::Receiver<StreamEvent>,
    abort_handle: AbortHandle,
    logos: Vec<LogoEvent>,
    terminal: Option<StreamEvent>,
}

impl LogoStream {
    pub(crate) fn new(
        task: GenerationTask,
        rx: mpsc::Receiver<StreamEvent>,
        abort_handle: AbortHandle,
    ) -> Self {
        Self {
            task,
            rx,
            abort_handle,
            logos: Vec::new(),
            terminal: None,
        }
    }

    /// Returns the task this stream belongs to, with its current state.
    pub fn task(&self) -> &GenerationTask {
        &self.task
    }

    /// Returns a handle that can cancel the stream.
    pub fn abort_handle(&self) -> AbortHandle {
        self.abort_handle.clone()
    }

    /// Waits for and returns the next event.
    ///
    /// Returns `None` after the terminal event. Logos still buffered when an
    /// abort is requested are dropped here.
    pub async fn next_event(&mut self) -> Option<StreamEvent> {
        if self.terminal.is_some() {
            return None;
        }
        loop {
            let event = self.rx.recv().await?;
            if let StreamEvent::Logo { logo, .. } = &event {
                if self.abort_handle.is_requested() {
                    debug!(task_id = %self.task.id(), index = logo.index, "dropping buffered logo after abort request");
                    continue;
                }
                self.logos.push(logo.clone());
            }
            match &event {
                StreamEvent::Opened { .. } => self.task.transition(TaskState::Streaming),
                StreamEvent::Completed { .. } => self.task.transition(TaskState::Completed),
                StreamEvent::Aborted { .. } => self.task.transition(TaskState::Aborted),
                StreamEvent::Error { .. } => self.task.transition(TaskState::Errored),
                StreamEvent::Logo { .. } => {}
            }
            if event.is_terminal() {
                self.terminal = Some(event.clone());
            }
            return Some(event);
        }
    }

    /// Drains the stream (if needed) and returns its outcome.
    pub async fn finish(mut self) -> Result<StreamOutcome, LogoStreamError> {
        while self.next_event().await.is_some() {}
        self.into_outcome()
    }

    /// Feeds every remaining event to `observer` and returns the outcome.
    pub async fn drive(
        mut self,
        observer: &mut impl StreamObserver,
    ) -> Result<StreamOutcome, LogoStreamError> {
        while let Some(event) = self.next_event().await {
            match &event {
                StreamEvent::Logo { logo, .. } => observer.on_logo(logo),
                StreamEvent::Completed { generated, .. } => observer.on_complete(*generated),
                StreamEvent::Error { error, .. } => observer.on_error(error),
                StreamEvent::Aborted { ack, initiator, .. } => observer.on_abort(ack, *initiator),
                StreamEvent::Opened { .. } => {}
            }
        }
        self.into_outcome()
    }

    /// Converts into a `futures::Stream` of the remaining events.
    pub fn into_events(self) -> impl futures::Stream<Item = StreamEvent> + Send {
        futures::stream::unfold(self, |mut stream| async move {
            stream.next_event().await.map(|event| (event, stream))
        })
    }

    fn into_outcome(self) -> Result<StreamOutcome, LogoStreamError> {
        let Some(terminal) = self.terminal else {
            return Err(LogoStreamError::protocol_msg(format!(
                "stream for task {} ended without a terminal event",
                self.task.id()
            )));
        };
        Ok(StreamOutcome {
            task_id: self.task.id().clone(),
            state: self.task.state(),
            logos: self.logos,
            terminal,
        })
    }
}
