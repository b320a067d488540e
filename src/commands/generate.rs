use std::io::{self, IsTerminal, Write};

use anyhow::{Context, Result, anyhow};
use tracing::warn;

use crate::config::Config;
use crate::llm::gemini::GeminiClient;
use crate::palette::{Tone, dim};
use crate::pipeline::{PipelineEvent, run_pipeline};
use crate::quiz::{QuizItem, QuizRequest};
use crate::utils::pluralize;

/// Generates one quiz without the TUI and prints it to stdout.
pub async fn run(config: Config, request: QuizRequest, json: bool) -> Result<()> {
    let client = GeminiClient::new(&config)?;
    let show_progress = io::stderr().is_terminal();

    let result = run_pipeline(&client, &request, config.timeout, |event| {
        if show_progress {
            report_progress(&request, event);
        }
    })
    .await;
    if show_progress {
        eprintln!();
    }

    let items = result.map_err(|err| {
        warn!(kind = err.kind().label(), "one-shot generation failed");
        anyhow!(err.diagnostic())
    })?;

    let rendered = if json {
        serde_json::to_string_pretty(&items).context("Failed to serialize questions")?
    } else {
        render_plain(&items, io::stdout().is_terminal())
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}

fn report_progress(request: &QuizRequest, event: PipelineEvent) {
    let status = match event {
        PipelineEvent::Building => return,
        PipelineEvent::Streaming => format!(
            "Generating {} on '{}' (difficulty {}/10)…",
            pluralize("question", usize::from(request.count())),
            request.topic(),
            request.difficulty()
        ),
        PipelineEvent::Received { bytes } => format!("Received {bytes} bytes…"),
        PipelineEvent::Validating => "Checking questions…".to_string(),
    };
    eprint!("\r\x1b[2K{}", dim(status));
}

fn render_plain(items: &[QuizItem], color: bool) -> String {
    let paint = |tone: Tone, text: String| if color { tone.paint(text) } else { text };

    if items.is_empty() {
        return paint(
            Tone::Warning,
            "No questions were generated. Try again with a different topic or difficulty."
                .to_string(),
        );
    }

    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            format!(
                "{} {}\n   {} {}",
                paint(Tone::Accent, format!("Q{}:", idx + 1)),
                item.question,
                paint(Tone::Success, "A:".to_string()),
                item.answer
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
