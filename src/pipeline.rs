use std::time::Duration;

use tracing::{info, warn};

use crate::error::QuizError;
use crate::llm::backend::GenerationBackend;
use crate::llm::client::generate;
use crate::llm::prompt::build_prompt_for;
use crate::llm::validate::validate;
use crate::quiz::{QuizItem, QuizRequest};

/// Progress of one request, in the order the stages run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    Building,
    Streaming,
    Received { bytes: usize },
    Validating,
}

/// Builds the prompt, streams the response, and validates it.
pub async fn run_pipeline<B, F>(
    backend: &B,
    request: &QuizRequest,
    deadline: Option<Duration>,
    mut on_event: F,
) -> Result<Vec<QuizItem>, QuizError>
where
    B: GenerationBackend + ?Sized,
    F: FnMut(PipelineEvent),
{
    on_event(PipelineEvent::Building);
    info!(
        topic = request.topic(),
        difficulty = request.difficulty(),
        count = request.count(),
        "generating quiz"
    );
    let prompt = build_prompt_for(request);

    on_event(PipelineEvent::Streaming);
    let raw = generate(backend, &prompt, deadline, |bytes| {
        on_event(PipelineEvent::Received { bytes })
    })
    .await?;

    on_event(PipelineEvent::Validating);
    let items = validate(&raw).inspect_err(|failure| {
        warn!(error = %failure, raw_bytes = raw.len(), "model response rejected");
    })?;

    if items.len() != usize::from(request.count()) {
        info!(
            requested = request.count(),
            returned = items.len(),
            "model returned a different number of questions"
        );
    }
    info!(questions = items.len(), "quiz ready");
    Ok(items)
}
