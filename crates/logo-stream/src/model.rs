use std::fmt;
use std::time::Duration;

/// Opaque identifier the service assigns to a generation task.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Creates a task id from any string-like value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the task id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Lifecycle of a generation task.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum TaskState {
    /// First logo returned, no stream opened yet.
    Created,
    /// A stream is open for this task.
    Streaming,
    /// The stream delivered its completion signal.
    Completed,
    /// The task was cancelled by the user or the service.
    Aborted,
    /// The stream ended with a failure.
    Errored,
}

impl TaskState {
    /// Returns `true` for states no further transition can leave.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Aborted | Self::Errored)
    }
}

/// A generation task created by `LogoClient::start_generation`.
///
/// Opening a stream consumes the task, so a task never owns more than one
/// stream and a closed stream cannot be reopened. Retrying means starting a
/// new task.
#[derive(Debug, PartialEq, Eq)]
pub struct GenerationTask {
    pub(crate) id: TaskId,
    pub(crate) company_name: String,
    pub(crate) first_image: String,
    pub(crate) state: TaskState,
}

impl GenerationTask {
    pub(crate) fn new(id: TaskId, company_name: String, first_image: String) -> Self {
        Self {
            id,
            company_name,
            first_image,
            state: TaskState::Created,
        }
    }

    pub fn id(&self) -> &TaskId {
        &self.id
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    /// Image reference of the logo returned synchronously with the task.
    pub fn first_image(&self) -> &str {
        &self.first_image
    }

    pub fn state(&self) -> TaskState {
        self.state
    }

    pub(crate) fn transition(&mut self, next: TaskState) {
        if self.state.is_terminal() {
            tracing::debug!(task_id = %self.id, from = ?self.state, to = ?next, "ignoring transition out of terminal task state");
            return;
        }
        self.state = next;
    }
}

/// Status carried by every stream message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogoStatus {
    Success,
    Aborted,
    Error,
}

/// One generated logo delivered on the stream.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LogoEvent {
    /// Ordinal assigned by the service; authoritative for display order.
    pub index: u32,
    /// Path or URL of the generated image.
    pub image: String,
    pub status: LogoStatus,
}

/// How the service marks the end of a successful stream.
///
/// Exactly one contract is active per stream; the other marker is ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum CompletionSignal {
    /// A dedicated SSE frame with `event: done`.
    #[default]
    DoneEvent,
    /// A success message carrying `is_last: true`.
    LastFlag,
}

/// Per-stream behavior options.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StreamOptions {
    /// Closes the stream with an error when no frame arrives for this long.
    pub idle_timeout: Option<Duration>,
    /// Bounded event buffer size between the controller task and the consumer.
    pub stream_buffer_capacity: usize,
    pub completion: CompletionSignal,
    /// Total number of logos to request, first one included.
    pub total_logos: Option<u32>,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            idle_timeout: Some(Duration::from_secs(180)),
            stream_buffer_capacity: 128,
            completion: CompletionSignal::default(),
            total_logos: None,
        }
    }
}

impl StreamOptions {
    pub fn idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn stream_buffer_capacity(mut self, capacity: usize) -> Self {
        self.stream_buffer_capacity = capacity;
        self
    }

    pub fn completion(mut self, completion: CompletionSignal) -> Self {
        self.completion = completion;
        self
    }

    pub fn total_logos(mut self, total: u32) -> Self {
        self.total_logos = Some(total);
        self
    }
}
