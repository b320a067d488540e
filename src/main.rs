use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::info;

use quizgen::commands::{generate, key, quiz};
use quizgen::config::Config;
use quizgen::logging;
use quizgen::quiz::{DEFAULT_COUNT, DEFAULT_DIFFICULTY, DEFAULT_TOPIC, QuizRequest};

#[derive(Parser, Debug)]
#[command(
    name = "quizgen",
    version,
    about = "AI-generated quizzes, in your terminal.",
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true,
    disable_help_subcommand = true
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct ModelArgs {
    /// Gemini model to generate with
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,
    /// Give up on a request after this many seconds. 0 waits forever.
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the interactive quiz
    Quiz {
        /// Starting topic for the form
        #[arg(long, default_value = DEFAULT_TOPIC)]
        topic: String,
        /// Starting difficulty, 1 (easiest) to 10 (hardest)
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY, value_parser = clap::value_parser!(u8).range(1..=10))]
        difficulty: u8,
        /// Starting number of questions, 1 to 20
        #[arg(long, default_value_t = DEFAULT_COUNT, value_parser = clap::value_parser!(u8).range(1..=20))]
        count: u8,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Generate one quiz and print it
    Generate {
        /// Topic to ask about
        #[arg(long)]
        topic: String,
        /// Difficulty, 1 (easiest) to 10 (hardest)
        #[arg(long, default_value_t = DEFAULT_DIFFICULTY, value_parser = clap::value_parser!(u8).range(1..=10))]
        difficulty: u8,
        /// Number of questions, 1 to 20
        #[arg(long, default_value_t = DEFAULT_COUNT, value_parser = clap::value_parser!(u8).range(1..=20))]
        count: u8,
        /// Print the validated JSON array instead of numbered text
        #[arg(long, default_value_t = false)]
        json: bool,
        #[command(flatten)]
        model: ModelArgs,
    },
    /// Manage the stored Gemini API key
    Key {
        /// Store an API key in the local auth file. Prompts when no value is given.
        #[arg(long, value_name = "KEY", num_args = 0..=1, conflicts_with = "clear")]
        set: Option<Option<String>>,
        /// Remove the stored API key from the local auth file
        #[arg(long, conflicts_with = "test")]
        clear: bool,
        /// Verify the configured API key by calling the Gemini API
        #[arg(long, conflicts_with = "clear")]
        test: bool,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("{err:#}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    // A missing log file should not stop a quiz.
    if let Ok(path) = logging::init() {
        info!(log = %path.display(), "quizgen started");
    }

    match cli.command {
        Command::Quiz {
            topic,
            difficulty,
            count,
            model,
        } => {
            let config = load_config(model)?;
            quiz::run(config, topic, difficulty, count).await?;
        }
        Command::Generate {
            topic,
            difficulty,
            count,
            json,
            model,
        } => {
            let request = QuizRequest::new(&topic, difficulty, count)?;
            let config = load_config(model)?;
            generate::run(config, request, json).await?;
        }
        Command::Key { set, clear, test } => key::run(set, clear, test).await?,
    }

    Ok(())
}

fn load_config(args: ModelArgs) -> Result<Config> {
    let config = Config::load(args.model, args.timeout)?;
    info!(
        model = %config.model,
        key_source = config.key_source.description(),
        timeout_secs = config.timeout.map(|timeout| timeout.as_secs()),
        "configuration loaded"
    );
    Ok(config)
}
