use crate::model::{LogoEvent, LogoStatus};

/// One decoded server-sent-events frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    /// Value of the `event:` field; `None` means the default `message` event.
    pub event: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// Creates a default (`message`) frame.
    pub fn message(data: impl Into<String>) -> Self {
        Self {
            event: None,
            data: data.into(),
        }
    }

    /// Creates a named event frame.
    pub fn named(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: Some(event.into()),
            data: data.into(),
        }
    }
}

/// Incremental SSE decoder fed with raw body chunks.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some((idx, delim_len)) = find_frame_delimiter(&self.buf) {
            let frame_bytes = self.buf[..idx].to_vec();
            self.buf.drain(..idx + delim_len);
            if let Some(frame) = parse_sse_frame(&frame_bytes) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Parses whatever is left after the body ended without a trailing blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buf);
        parse_sse_frame(&rest)
    }
}

fn find_frame_delimiter(buf: &[u8]) -> Option<(usize, usize)> {
    let mut i = 0;
    while i + 1 < buf.len() {
        if buf[i] == b'\n' && buf[i + 1] == b'\n' {
            return Some((i, 2));
        }
        if i + 3 < buf.len()
            && buf[i] == b'\r'
            && buf[i + 1] == b'\n'
            && buf[i + 2] == b'\r'
            && buf[i + 3] == b'\n'
        {
            return Some((i, 4));
        }
        i += 1;
    }
    None
}

fn parse_sse_frame(bytes: &[u8]) -> Option<SseFrame> {
    let text = String::from_utf8_lossy(bytes);
    let mut event: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();
    for line in text.split('\n').map(|line| line.trim_end_matches('\r')) {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        let (field, value) = line.split_once(':').unwrap_or((line, ""));
        // A single space after the colon is part of the syntax, not the value.
        let value = value.strip_prefix(' ').unwrap_or(value);
        match field {
            "event" => event = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }
    if event.is_none() && data_lines.is_empty() {
        return None;
    }
    Some(SseFrame {
        event,
        data: data_lines.join("\n"),
    })
}

/// JSON payload of a default stream message.
#[derive(Debug, Clone, serde::Deserialize)]
struct WireMessage {
    status: Option<String>,
    #[serde(default)]
    index: Option<serde_json::Value>,
    #[serde(default)]
    logo: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    total_generated: Option<u32>,
    #[serde(default)]
    is_last: Option<bool>,
}

/// Stream message after decoding, before the controller applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum StreamMessage {
    Logo { logo: LogoEvent, is_last: bool },
    Aborted { total_generated: u32 },
    Failed { message: String },
    Done,
    /// Frames with no effect (keep-alives, unknown statuses, success without a logo).
    Ignored { reason: String },
}

pub(crate) fn decode_frame(frame: &SseFrame) -> Result<StreamMessage, String> {
    match frame.event.as_deref() {
        Some("done") => return Ok(StreamMessage::Done),
        None | Some("message") => {}
        Some(other) => {
            return Ok(StreamMessage::Ignored {
                reason: format!("unhandled event type `{other}`"),
            });
        }
    }
    if frame.data.trim().is_empty() {
        return Ok(StreamMessage::Ignored {
            reason: "empty data".into(),
        });
    }
    let wire: WireMessage =
        serde_json::from_str(&frame.data).map_err(|e| format!("invalid JSON payload: {e}"))?;

    match wire.status.as_deref() {
        Some("success") => {
            let Some(image) = wire.logo.filter(|logo| !logo.trim().is_empty()) else {
                return Ok(StreamMessage::Ignored {
                    reason: "success message without logo".into(),
                });
            };
            let index = match wire.index.as_ref() {
                Some(value) => coerce_index(value)?,
                None => return Err("success message without index".into()),
            };
            Ok(StreamMessage::Logo {
                logo: LogoEvent {
                    index,
                    image,
                    status: LogoStatus::Success,
                },
                is_last: wire.is_last.unwrap_or(false),
            })
        }
        Some("aborted") => Ok(StreamMessage::Aborted {
            total_generated: wire.total_generated.unwrap_or(0),
        }),
        Some("error") => Ok(StreamMessage::Failed {
            message: wire
                .message
                .unwrap_or_else(|| "logo generation failed".to_string()),
        }),
        Some(other) => Ok(StreamMessage::Ignored {
            reason: format!("unknown status `{other}`"),
        }),
        None => Ok(StreamMessage::Ignored {
            reason: "message without status".into(),
        }),
    }
}

/// Accepts integral JSON numbers and numeric strings.
fn coerce_index(value: &serde_json::Value) -> Result<u32, String> {
    let parsed = match value {
        serde_json::Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && *f >= 0.0).map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| format!("index is not a non-negative integer: {value}"))
}
