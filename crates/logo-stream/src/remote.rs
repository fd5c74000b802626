use std::pin::Pin;

use crate::errors::RemoteError;
use crate::model::TaskId;
use crate::transport::SseFrame;

/// Boxed stream of decoded SSE frames for one task.
pub type FrameStream =
    Pin<Box<dyn futures::Stream<Item = Result<SseFrame, RemoteError>> + Send + 'static>>;

/// Reply to the initial generate request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateReply {
    pub task_id: TaskId,
    pub first_image: String,
}

/// Reply to a cancellation request.
#[derive(Clone, Debug, PartialEq, Eq, serde::Deserialize)]
pub struct AbortReply {
    pub status: String,
    #[serde(default)]
    pub total_generated: Option<u32>,
    #[serde(default)]
    pub message: Option<String>,
}

impl AbortReply {
    /// The service acknowledges a cancellation with `success` or `aborted`.
    pub fn is_acknowledged(&self) -> bool {
        matches!(self.status.as_str(), "success" | "aborted")
    }
}

/// Stream request parameters passed to `LogoService::open_stream`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamRequest {
    pub task_id: TaskId,
    pub company_name: String,
    pub total_logos: Option<u32>,
}

/// Contract implemented by the remote logo generation service.
///
/// `HttpLogoService` is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait::async_trait]
pub trait LogoService: Send + Sync {
    /// Starts a task and returns its id with the first generated image.
    async fn generate(&self, company_name: &str) -> Result<GenerateReply, RemoteError>;

    /// Opens the push stream for a task. Dropping the returned stream closes
    /// the connection.
    async fn open_stream(&self, req: StreamRequest) -> Result<FrameStream, RemoteError>;

    /// Asks the service to stop generating for a task.
    async fn abort(&self, task_id: &TaskId) -> Result<AbortReply, RemoteError>;
}
