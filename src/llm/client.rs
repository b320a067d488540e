use std::time::Duration;

use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use super::backend::{BackendError, Chunk, GenerationBackend};
use crate::error::{GenerationCause, GenerationFailure};

/// Append-only buffer for one generation call.
#[derive(Debug, Default)]
pub struct RawResponseText {
    buffer: String,
}

impl RawResponseText {
    /// Returns whether the chunk contributed any text.
    pub fn push_chunk(&mut self, chunk: &Chunk) -> bool {
        match chunk.text.as_deref() {
            Some(text) if !text.is_empty() => {
                self.buffer.push_str(text);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Streams a response for `prompt` and concatenates its text.
///
/// `on_progress` receives the total buffered byte count after every chunk that
/// carried text. When `deadline` elapses before end-of-stream the call fails with
/// a timeout and the stream is dropped.
pub async fn generate<B, F>(
    backend: &B,
    prompt: &str,
    deadline: Option<Duration>,
    mut on_progress: F,
) -> Result<String, GenerationFailure>
where
    B: GenerationBackend + ?Sized,
    F: FnMut(usize),
{
    let started = Instant::now();
    let mut raw = RawResponseText::default();
    let mut chunks = backend.stream_chunks(prompt);
    let mut chunk_count = 0usize;

    loop {
        let next = match deadline {
            Some(limit) => match timeout_at(started + limit, chunks.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!(
                        limit_secs = limit.as_secs(),
                        received_bytes = raw.len(),
                        "generation deadline elapsed"
                    );
                    return Err(GenerationFailure {
                        cause: GenerationCause::Timeout(limit),
                        feedback: None,
                        prompt: prompt.to_string(),
                        partial_text: raw.finish(),
                    });
                }
            },
            None => chunks.next().await,
        };

        match next {
            Some(Ok(chunk)) => {
                chunk_count += 1;
                if raw.push_chunk(&chunk) {
                    on_progress(raw.len());
                }
                debug!(chunk_count, received_bytes = raw.len(), "chunk received");
            }
            Some(Err(err)) => {
                warn!(
                    chunk_count,
                    received_bytes = raw.len(),
                    error = ?err,
                    "generation stream failed"
                );
                return Err(failure_from_backend(err, prompt, raw.finish()));
            }
            None => break,
        }
    }

    info!(
        chunk_count,
        received_bytes = raw.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generation stream finished"
    );
    Ok(raw.finish())
}

fn failure_from_backend(err: BackendError, prompt: &str, partial_text: String) -> GenerationFailure {
    let (cause, feedback) = match err {
        BackendError::Transport { message, feedback } => {
            (GenerationCause::Transport(message), feedback)
        }
        BackendError::Blocked { reason, feedback } => (GenerationCause::Blocked(reason), feedback),
    };
    GenerationFailure {
        cause,
        feedback,
        prompt: prompt.to_string(),
        partial_text,
    }
}
