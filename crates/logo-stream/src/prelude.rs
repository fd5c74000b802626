//! Common imports for typical client usage.
pub use crate::{
    AbortHandle, AbortOutcome, ClientConfig, CompletionSignal, DEFAULT_EXPECTED_TOTAL, Gallery,
    GenerationTask, LogoClient, LogoEvent, LogoStream, LogoStreamError, StreamEvent,
    StreamOptions, TaskId,
};
