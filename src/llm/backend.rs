use futures::stream::BoxStream;

/// One streamed fragment of a model response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Chunk {
    pub text: Option<String>,
}

impl Chunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    pub fn empty() -> Self {
        Self { text: None }
    }
}

/// Error raised by the backend while the stream is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    Transport {
        message: String,
        feedback: Option<String>,
    },
    Blocked {
        reason: String,
        feedback: Option<String>,
    },
}

impl BackendError {
    pub fn transport(message: impl Into<String>) -> Self {
        BackendError::Transport {
            message: message.into(),
            feedback: None,
        }
    }

    pub fn blocked(reason: impl Into<String>, feedback: Option<String>) -> Self {
        BackendError::Blocked {
            reason: reason.into(),
            feedback,
        }
    }
}

/// Finite, non-restartable sequence of chunks. An `Err` item ends the stream.
pub type ChunkStream<'a> = BoxStream<'a, Result<Chunk, BackendError>>;

pub trait GenerationBackend {
    fn stream_chunks<'a>(&'a self, prompt: &'a str) -> ChunkStream<'a>;
}
