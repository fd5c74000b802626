use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::abort::{AbortHandle, StreamPhase};
use crate::config::ClientConfig;
use crate::errors::LogoStreamError;
use crate::http::HttpLogoService;
use crate::model::{GenerationTask, StreamOptions, TaskState};
use crate::remote::{LogoService, StreamRequest};
use crate::stream::{ControllerTask, LogoStream, StreamController, run_controller};

/// Entry point for starting generation tasks and streaming their logos.
#[derive(Clone)]
pub struct LogoClient {
    service: Arc<dyn LogoService>,
    options: StreamOptions,
}

impl LogoClient {
    /// Creates a client over any `LogoService` implementation.
    pub fn new(service: Arc<dyn LogoService>) -> Self {
        Self {
            service,
            options: StreamOptions::default(),
        }
    }

    /// Creates a client talking HTTP to the generation service.
    pub fn http(config: ClientConfig) -> Result<Self, LogoStreamError> {
        Ok(Self::new(Arc::new(HttpLogoService::new(config)?)))
    }

    /// Replaces the options applied to streams opened by this client.
    pub fn with_options(mut self, options: StreamOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &StreamOptions {
        &self.options
    }

    /// Starts a generation task and returns it with the first logo.
    ///
    /// The company name is validated locally; an empty name never reaches the
    /// service. Failures are not retried.
    pub async fn start_generation(
        &self,
        company_name: &str,
    ) -> Result<GenerationTask, LogoStreamError> {
        let company_name = company_name.trim();
        if company_name.is_empty() {
            return Err(LogoStreamError::Validation(
                "company name must not be empty".into(),
            ));
        }
        let reply = self.service.generate(company_name).await?;
        info!(task_id = %reply.task_id, company_name, "generation task started");
        Ok(GenerationTask::new(
            reply.task_id,
            company_name.to_string(),
            reply.first_image,
        ))
    }

    /// Opens the logo stream for `task`.
    ///
    /// The task is consumed: it can own only this one stream, and once the
    /// stream closes a new task is needed to generate again. Tasks are only
    /// handed out by `start_generation`, so `task` is always `Created` here.
    pub async fn open_stream(&self, mut task: GenerationTask) -> Result<LogoStream, LogoStreamError> {
        if self.options.stream_buffer_capacity == 0 {
            return Err(LogoStreamError::Validation(
                "stream_buffer_capacity must be greater than 0".into(),
            ));
        }
        if self.options.idle_timeout.is_some_and(|t| t.is_zero()) {
            return Err(LogoStreamError::Validation(
                "idle_timeout must be greater than 0".into(),
            ));
        }
        if self.options.total_logos == Some(0) {
            return Err(LogoStreamError::Validation(
                "total_logos must be greater than 0".into(),
            ));
        }

        let frames = self
            .service
            .open_stream(StreamRequest {
                task_id: task.id().clone(),
                company_name: task.company_name().to_string(),
                total_logos: self.options.total_logos,
            })
            .await?;
        task.transition(TaskState::Streaming);

        let (tx, rx) = mpsc::channel(self.options.stream_buffer_capacity);
        let (ack_tx, ack_rx) = watch::channel(None);
        let phase = Arc::new(StreamPhase::default());
        let cancel = CancellationToken::new();
        let abort = AbortHandle::new(
            task.id().clone(),
            self.service.clone(),
            phase.clone(),
            cancel.clone(),
            ack_tx,
        );

        tokio::spawn(run_controller(ControllerTask {
            controller: StreamController::new(task.id().clone(), self.options.completion, phase),
            frames,
            tx,
            cancel,
            ack_rx,
            abort: abort.clone(),
            idle_timeout: self.options.idle_timeout,
        }));

        Ok(LogoStream::new(task, rx, abort))
    }
}
