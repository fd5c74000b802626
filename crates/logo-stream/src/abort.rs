use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::TaskId;
use crate::remote::LogoService;

const OPEN: u8 = 0;
const ABORT_REQUESTED: u8 = 1;
const FINISHED: u8 = 2;

/// Lifecycle phase shared by a stream's controller and its abort handles.
///
/// Leaves `OPEN` exactly once: either to `ABORT_REQUESTED` (first `abort()`)
/// or to `FINISHED` (terminal event), whichever wins.
#[derive(Debug, Default)]
pub(crate) struct StreamPhase(AtomicU8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PhaseConflict {
    AbortAlreadyRequested,
    AlreadyFinished,
}

impl StreamPhase {
    pub(crate) fn request_abort(&self) -> Result<(), PhaseConflict> {
        match self
            .0
            .compare_exchange(OPEN, ABORT_REQUESTED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => Ok(()),
            Err(ABORT_REQUESTED) => Err(PhaseConflict::AbortAlreadyRequested),
            Err(_) => Err(PhaseConflict::AlreadyFinished),
        }
    }

    /// Returns `false` when an abort got there first.
    pub(crate) fn finish(&self) -> bool {
        self.0
            .compare_exchange(OPEN, FINISHED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub(crate) fn is_abort_requested(&self) -> bool {
        self.0.load(Ordering::Acquire) == ABORT_REQUESTED
    }
}

/// Server acknowledgment of a cancellation, as reported to the consumer.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AbortAck {
    /// Logos the service reports as generated, first one included.
    pub total_generated: u32,
    /// `false` when the cancellation request failed or was not acknowledged;
    /// `total_generated` is then 0.
    pub confirmed: bool,
    pub message: Option<String>,
}

impl AbortAck {
    pub(crate) fn unconfirmed(message: impl Into<String>) -> Self {
        Self {
            total_generated: 0,
            confirmed: false,
            message: Some(message.into()),
        }
    }
}

/// Result of calling `AbortHandle::abort`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AbortOutcome {
    /// This call sent the cancellation request.
    Sent(AbortAck),
    /// An earlier call already sent it; nothing was done.
    AlreadyRequested,
    /// The stream had already reached a terminal state; nothing was sent.
    AlreadyFinished,
}

struct AbortInner {
    task_id: TaskId,
    service: Arc<dyn LogoService>,
    phase: Arc<StreamPhase>,
    cancel: CancellationToken,
    ack: watch::Sender<Option<AbortAck>>,
}

/// Handle used to cancel a running logo stream.
///
/// Clones share state: across all clones only the first `abort()` call sends
/// a cancellation request to the service.
#[derive(Clone)]
pub struct AbortHandle {
    inner: Arc<AbortInner>,
}

impl AbortHandle {
    pub(crate) fn new(
        task_id: TaskId,
        service: Arc<dyn LogoService>,
        phase: Arc<StreamPhase>,
        cancel: CancellationToken,
        ack: watch::Sender<Option<AbortAck>>,
    ) -> Self {
        Self {
            inner: Arc::new(AbortInner {
                task_id,
                service,
                phase,
                cancel,
                ack,
            }),
        }
    }

    /// Returns the task this handle cancels.
    pub fn task_id(&self) -> &TaskId {
        &self.inner.task_id
    }

    /// Returns `true` once any clone of this handle has requested an abort.
    pub fn is_requested(&self) -> bool {
        self.inner.phase.is_abort_requested()
    }

    /// Cancels the stream.
    ///
    /// The local connection is torn down before this future first yields, so
    /// no further stream messages are processed. The service is then notified
    /// and its acknowledgment is both returned here and delivered on the
    /// stream as the final `StreamEvent::Aborted`. Logos the service produced
    /// concurrently with the abort are discarded.
    pub async fn abort(&self) -> AbortOutcome {
        match self.inner.phase.request_abort() {
            Ok(()) => {}
            Err(PhaseConflict::AbortAlreadyRequested) => {
                debug!(task_id = %self.inner.task_id, "abort already sent for this task, ignoring");
                return AbortOutcome::AlreadyRequested;
            }
            Err(PhaseConflict::AlreadyFinished) => {
                debug!(task_id = %self.inner.task_id, "stream already finished, abort not sent");
                return AbortOutcome::AlreadyFinished;
            }
        }

        info!(task_id = %self.inner.task_id, "abort requested");
        self.inner.cancel.cancel();

        // Spawned so the acknowledgment still reaches the stream if the
        // caller drops this future.
        let inner = self.inner.clone();
        let request = tokio::spawn(async move {
            let ack = request_abort(inner.service.as_ref(), &inner.task_id).await;
            inner.ack.send_replace(Some(ack.clone()));
            ack
        });

        match request.await {
            Ok(ack) => AbortOutcome::Sent(ack),
            Err(err) => {
                let ack = AbortAck::unconfirmed(format!("abort request task failed: {err}"));
                self.inner.ack.send_replace(Some(ack.clone()));
                AbortOutcome::Sent(ack)
            }
        }
    }
}

async fn request_abort(service: &dyn LogoService, task_id: &TaskId) -> AbortAck {
    match service.abort(task_id).await {
        Ok(reply) if reply.is_acknowledged() => {
            info!(task_id = %task_id, total_generated = ?reply.total_generated, "abort acknowledged");
            AbortAck {
                total_generated: reply.total_generated.unwrap_or(0),
                confirmed: true,
                message: reply.message,
            }
        }
        Ok(reply) => {
            warn!(task_id = %task_id, status = %reply.status, "abort not acknowledged");
            AbortAck::unconfirmed(
                reply
                    .message
                    .unwrap_or_else(|| format!("service answered `{}`", reply.status)),
            )
        }
        Err(err) => {
            warn!(task_id = %task_id, error = %err, "abort request failed");
            AbortAck::unconfirmed(err.to_string())
        }
    }
}

pub(crate) async fn wait_for_ack(rx: &mut watch::Receiver<Option<AbortAck>>) -> AbortAck {
    match rx.wait_for(Option::is_some).await {
        Ok(ack) => ack
            .clone()
            .unwrap_or_else(|| AbortAck::unconfirmed("abort acknowledgment missing")),
        Err(_) => AbortAck::unconfirmed("abort handle dropped before acknowledgment"),
    }
}
