use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::config::ClientConfig;
use crate::errors::{LogoStreamError, RemoteError};
use crate::model::TaskId;
use crate::remote::{AbortReply, FrameStream, GenerateReply, LogoService, StreamRequest};
use crate::transport::{SseDecoder, SseFrame};

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

#[derive(serde::Serialize)]
struct GenerateBody<'a> {
    #[serde(rename = "uInput")]
    company_name: &'a str,
}

#[derive(serde::Deserialize)]
struct GenerateWire {
    #[serde(default)]
    status: Option<String>,
    #[serde(default, alias = "taskId")]
    task_id: Option<String>,
    #[serde(default, alias = "firstImage")]
    logo: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// `LogoService` backed by the generation service's HTTP API.
pub struct HttpLogoService {
    client: reqwest::Client,
    config: ClientConfig,
}

impl HttpLogoService {
    /// Creates a service from explicit client configuration.
    pub fn new(config: ClientConfig) -> Result<Self, LogoStreamError> {
        config.validate()?;
        // No client-wide timeout: it would also cut the SSE body.
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| LogoStreamError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a service using `ClientConfig::from_env`.
    pub fn from_env() -> Result<Self, LogoStreamError> {
        Self::new(ClientConfig::from_env()?)
    }
}

#[async_trait::async_trait]
impl LogoService for HttpLogoService {
    async fn generate(&self, company_name: &str) -> Result<GenerateReply, RemoteError> {
        debug!(company_name, "requesting first logo");
        let response = self
            .client
            .post(self.config.generate_url())
            .timeout(self.config.timeout)
            .json(&GenerateBody { company_name })
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("generate request failed: {e}")))?;
        let wire: GenerateWire = read_json(response).await?;

        if wire.status.as_deref() == Some("error") {
            return Err(RemoteError::service(
                wire.message
                    .unwrap_or_else(|| "logo generation failed".to_string()),
            ));
        }
        match (wire.task_id, wire.logo) {
            (Some(task_id), Some(first_image)) if !task_id.trim().is_empty() => Ok(GenerateReply {
                task_id: TaskId::new(task_id),
                first_image,
            }),
            _ => Err(RemoteError::decode(
                "generate response is missing task_id or logo",
            )),
        }
    }

    async fn open_stream(&self, req: StreamRequest) -> Result<FrameStream, RemoteError> {
        debug!(task_id = %req.task_id, "opening logo stream");
        let mut query = vec![("company_name", req.company_name.clone())];
        if let Some(total) = req.total_logos {
            query.push(("total_logos", total.to_string()));
        }
        let response = self
            .client
            .get(self.config.stream_url(req.task_id.as_str()))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .query(&query)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("stream request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(RemoteError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(sse_frame_stream(bytes_stream)))
    }

    async fn abort(&self, task_id: &TaskId) -> Result<AbortReply, RemoteError> {
        debug!(task_id = %task_id, "sending abort request");
        let response = self
            .client
            .delete(self.config.abort_url(task_id.as_str()))
            .timeout(self.config.timeout)
            .send()
            .await
            .map_err(|e| RemoteError::transport(format!("abort request failed: {e}")))?;
        read_json(response).await
    }
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RemoteError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        return Err(RemoteError::Status {
            code: status.as_u16(),
            body,
        });
    }
    let text = response
        .text()
        .await
        .map_err(|e| RemoteError::transport(format!("reading response body failed: {e}")))?;
    serde_json::from_str(&text).map_err(|e| RemoteError::decode(format!("invalid JSON body: {e}")))
}

fn sse_frame_stream(
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<SseFrame, RemoteError>> + Send {
    struct State {
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    stream::try_unfold(
        State {
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(frame) = state.pending.pop_front() {
                    return Ok(Some((frame, state)));
                }
                if state.done {
                    return Ok(None);
                }

                match state.bytes_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.decoder.push_chunk(&chunk));
                    }
                    Some(Err(e)) => {
                        return Err(RemoteError::transport(format!("stream read failed: {e}")));
                    }
                    None => {
                        state.done = true;
                        state.pending.extend(state.decoder.finish());
                    }
                }
            }
        },
    )
}
