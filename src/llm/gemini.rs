use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use futures::stream::{self, Stream, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::backend::{BackendError, Chunk, ChunkStream, GenerationBackend};
use super::sse::SseDecoder;
use crate::config::Config;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

const JSON_MIME_TYPE: &str = "application/json";
const API_KEY_HEADER: &str = "x-goog-api-key";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Finish reasons that mean the model refused to continue.
const BLOCKING_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
    "IMAGE_SAFETY",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
}

impl<'a> GenerateContentRequest<'a> {
    fn json_only(prompt: &'a str) -> Self {
        Self {
            contents: vec![RequestContent {
                role: "user",
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: JSON_MIME_TYPE,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamedResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
    #[serde(default)]
    safety_ratings: Vec<SafetyRating>,
}

#[derive(Debug, Deserialize)]
struct SafetyRating {
    category: String,
    probability: String,
    #[serde(default)]
    blocked: bool,
}

impl fmt::Display for SafetyRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.category, self.probability)?;
        if self.blocked {
            write!(f, " (blocked)")?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.code, self.status.as_deref()) {
            (Some(code), Some(status)) => write!(f, "{code} {status}: {}", self.message),
            (Some(code), None) => write!(f, "{code}: {}", self.message),
            (None, Some(status)) => write!(f, "{status}: {}", self.message),
            (None, None) => write!(f, "{}", self.message),
        }
    }
}

/// Streaming client for the Gemini `generateContent` API.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
}

impl GeminiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("quizgen/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.api_base, self.model
        )
    }

    /// Lists models to confirm the key is accepted.
    pub async fn healthcheck(&self) -> Result<()> {
        let response = self
            .http
            .get(format!("{}/models", self.api_base))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .context("Failed to reach the Gemini API")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!(
                "Failed to validate API key with Gemini ({status}): {}",
                describe_error_body(&body)
            );
        }
        Ok(())
    }

    async fn open_stream(&self, prompt: &str) -> Result<ChunkStream<'static>, BackendError> {
        info!(model = %self.model, prompt_bytes = prompt.len(), "opening generation stream");
        let response = self
            .http
            .post(self.stream_url())
            .header(API_KEY_HEADER, &self.api_key)
            .json(&GenerateContentRequest::json_only(prompt))
            .send()
            .await
            .map_err(|err| BackendError::transport(format!("Failed to send request: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "generation request rejected");
            return Err(BackendError::transport(format!(
                "API error {status}: {}",
                describe_error_body(&body)
            )));
        }

        Ok(sse_chunks(response.bytes_stream().boxed()).boxed())
    }
}

impl GenerationBackend for GeminiClient {
    fn stream_chunks<'a>(&'a self, prompt: &'a str) -> ChunkStream<'a> {
        stream::once(self.open_stream(prompt)).try_flatten().boxed()
    }
}

fn describe_error_body(body: &str) -> String {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.to_string(),
        Err(_) => body.trim().to_string(),
    }
}

struct SseState<S> {
    bytes: S,
    decoder: SseDecoder,
    pending: VecDeque<Result<Chunk, BackendError>>,
    finished: bool,
}

/// Turns a raw SSE byte stream into chunks. The first error ends the stream.
fn sse_chunks<S, B, E>(bytes: S) -> impl Stream<Item = Result<Chunk, BackendError>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: fmt::Display,
{
    let state = SseState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                if item.is_err() {
                    state.pending.clear();
                    state.finished = true;
                }
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(bytes)) => {
                    for payload in state.decoder.push(bytes.as_ref()) {
                        state.pending.push_back(parse_chunk_payload(&payload));
                    }
                }
                Some(Err(err)) => {
                    state.finished = true;
                    return Some((
                        Err(BackendError::transport(format!("Failed to read chunk: {err}"))),
                        state,
                    ));
                }
                None => {
                    state.finished = true;
                    if let Some(payload) = state.decoder.finish() {
                        state.pending.push_back(parse_chunk_payload(&payload));
                    }
                }
            }
        }
    })
}

fn parse_chunk_payload(payload: &str) -> Result<Chunk, BackendError> {
    let response: StreamedResponse = serde_json::from_str(payload)
        .map_err(|err| BackendError::transport(format!("Malformed chunk from API: {err}")))?;

    if let Some(error) = response.error {
        return Err(BackendError::transport(format!("API error {error}")));
    }

    if let Some(feedback) = &response.prompt_feedback
        && let Some(reason) = &feedback.block_reason
    {
        let mut details = vec![format!("blockReason: {reason}")];
        details.extend(feedback.safety_ratings.iter().map(ToString::to_string));
        return Err(BackendError::blocked(reason, Some(details.join("; "))));
    }

    let Some(candidate) = response.candidates.into_iter().next() else {
        return Ok(Chunk::empty());
    };

    if let Some(reason) = candidate.finish_reason.as_deref() {
        if BLOCKING_FINISH_REASONS.contains(&reason) {
            let mut details = vec![format!("finishReason: {reason}")];
            details.extend(candidate.safety_ratings.iter().map(ToString::to_string));
            return Err(BackendError::blocked(reason, Some(details.join("; "))));
        }
        if reason == "MAX_TOKENS" {
            warn!("model stopped at its output token limit; response may be truncated");
        } else {
            debug!(finish_reason = reason, "candidate finished");
        }
    }

    let text: String = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        Ok(Chunk::empty())
    } else {
        Ok(Chunk::text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn collect(reads: Vec<Result<&'static [u8], io::Error>>) -> Vec<Result<Chunk, BackendError>> {
        tokio::runtime::Runtime::new()
            .unwrap()
            .block_on(sse_chunks(stream::iter(reads)).collect::<Vec<_>>())
    }

    #[test]
    fn request_body_asks_for_json() {
        let body = serde_json::to_value(GenerateContentRequest::json_only("hello")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "contents": [{ "role": "user", "parts": [{ "text": "hello" }] }],
                "generationConfig": { "responseMimeType": "application/json" }
            })
        );
    }

    #[test]
    fn text_parts_are_joined() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"[{\"q"},{"text":"uestion\""}],"role":"model"}}]}"#;
        assert_eq!(
            parse_chunk_payload(payload).unwrap(),
            Chunk::text("[{\"question\"")
        );
    }

    #[test]
    fn usage_only_chunk_has_no_text() {
        let payload = r#"{"usageMetadata":{"promptTokenCount":12,"totalTokenCount":40}}"#;
        assert_eq!(parse_chunk_payload(payload).unwrap(), Chunk::empty());

        let stop_only = r#"{"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(parse_chunk_payload(stop_only).unwrap(), Chunk::empty());
    }

    #[test]
    fn prompt_block_is_reported_with_feedback() {
        let payload = r#"{"promptFeedback":{"blockReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_DANGEROUS_CONTENT","probability":"HIGH","blocked":true}]}}"#;
        assert_eq!(
            parse_chunk_payload(payload).unwrap_err(),
            BackendError::blocked(
                "SAFETY",
                Some(
                    "blockReason: SAFETY; HARM_CATEGORY_DANGEROUS_CONTENT: HIGH (blocked)".into()
                )
            )
        );
    }

    #[test]
    fn safety_finish_reason_is_a_block() {
        let payload = r#"{"candidates":[{"content":{"parts":[{"text":"[{"}]},"finishReason":"SAFETY","safetyRatings":[{"category":"HARM_CATEGORY_HARASSMENT","probability":"MEDIUM"}]}]}"#;
        assert_eq!(
            parse_chunk_payload(payload).unwrap_err(),
            BackendError::blocked(
                "SAFETY",
                Some("finishReason: SAFETY; HARM_CATEGORY_HARASSMENT: MEDIUM".into())
            )
        );
    }

    #[test]
    fn error_payload_is_transport_failure() {
        let payload = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            parse_chunk_payload(payload).unwrap_err(),
            BackendError::transport("API error 429 RESOURCE_EXHAUSTED: Resource has been exhausted")
        );
    }

    #[test]
    fn garbage_payload_is_transport_failure() {
        assert!(matches!(
            parse_chunk_payload("{not json"),
            Err(BackendError::Transport { .. })
        ));
    }

    #[test]
    fn error_bodies_are_summarized() {
        let body = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(
            describe_error_body(body),
            "400 INVALID_ARGUMENT: API key not valid."
        );
        assert_eq!(describe_error_body(" Bad Gateway \n"), "Bad Gateway");
    }

    #[test]
    fn sse_stream_yields_chunks_in_order() {
        let chunks = collect(vec![
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"[\"}]}}]}\r\n\r\n".as_slice()),
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"]\"}]},".as_slice()),
            Ok(b"\"finishReason\":\"STOP\"}]}\r\n\r\n".as_slice()),
        ]);
        assert_eq!(
            chunks,
            vec![Ok(Chunk::text("[")), Ok(Chunk::text("]"))]
        );
    }

    #[test]
    fn read_error_ends_stream() {
        let chunks = collect(vec![
            Ok(b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"[{\\\"question\\\":\\\"Q1\\\"\"}]}}]}\n\n".as_slice()),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")),
            Ok(b"data: {\"candidates\":[]}\n\n".as_slice()),
        ]);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], Ok(Chunk::text("[{\"question\":\"Q1\"")));
        assert_eq!(
            chunks[1],
            Err(BackendError::transport("Failed to read chunk: connection reset"))
        );
    }

    #[test]
    fn events_after_a_block_are_dropped() {
        let chunks = collect(vec![Ok(
            b"data: {\"promptFeedback\":{\"blockReason\":\"OTHER\"}}\n\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"late\"}]}}]}\n\n"
                .as_slice(),
        )]);
        assert_eq!(chunks.len(), 1);
        assert!(matches!(chunks[0], Err(BackendError::Blocked { .. })));
    }
}
