//! Streaming client for Logo Spark generation tasks.
//!
//! A task starts with one request that returns the first logo; the remaining
//! logos arrive over a server-sent-events stream that can be cancelled at any
//! time. `Gallery` turns the stream into display state.
//!
//! ```no_run
//! use logo_stream::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), LogoStreamError> {
//! let client = LogoClient::http(ClientConfig::from_env()?)?;
//! let task = client.start_generation("Acme").await?;
//! let mut gallery = Gallery::new(task.first_image(), DEFAULT_EXPECTED_TOTAL);
//!
//! let mut stream = client.open_stream(task).await?;
//! while let Some(event) = stream.next_event().await {
//!     gallery.apply(&event);
//!     println!("{}", gallery.status_line());
//! }
//! # Ok(())
//! # }
//! ```

/// One-shot cancellation of a running stream.
pub mod abort;
/// Task initiation and stream opening.
pub mod client;
/// Client configuration.
pub mod config;
/// Public error types.
pub mod errors;
/// Display-side reconciliation of stream events.
pub mod gallery;
/// reqwest implementation of `LogoService`.
pub mod http;
/// Task, logo and option types.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Contract of the remote generation service.
pub mod remote;
/// Saved-logo CRUD client.
pub mod saved;
/// Stream controller, stream handle and events.
pub mod stream;
/// SSE frame decoding and stream message mapping.
pub mod transport;

pub use abort::{AbortAck, AbortHandle, AbortOutcome};
pub use client::LogoClient;
pub use config::{ClientConfig, SavedLogoConfig};
pub use errors::{LogoStreamError, RemoteError, StreamFailure};
pub use gallery::{DEFAULT_EXPECTED_TOTAL, Gallery, GalleryItem, GalleryPhase};
pub use http::HttpLogoService;
pub use model::{
    CompletionSignal, GenerationTask, LogoEvent, LogoStatus, StreamOptions, TaskId, TaskState,
};
pub use observability::init_observability;
pub use remote::{AbortReply, FrameStream, GenerateReply, LogoService, StreamRequest};
pub use saved::{Account, AuthSession, SavedLogo, SavedLogoClient};
pub use stream::{AbortInitiator, LogoStream, StreamEvent, StreamObserver, StreamOutcome};
pub use transport::SseFrame;
