//! Strava Agent - conversational assistant over Strava activity data
//!
//! A model-driven tool-calling loop implemented as an explicit state
//! machine, with deterministic post-processing of activity listings.

mod config;
mod conversation;
mod db;
mod llm;
mod post_process;
mod router;
mod runtime;
mod session;
mod state_machine;
mod strava;
mod system_prompt;
mod tools;

use clap::Parser;
use config::{AgentConfig, ConfigError};
use db::{DiscardTranscript, TranscriptSink, TranscriptStore};
use llm::{LoggingService, OpenAIService};
use runtime::{ConversationRuntime, RuntimeConfig};
use session::Session;
use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;
use strava::StravaClient;
use tokio::io::{AsyncBufReadExt, BufReader};
use tools::ToolRegistry;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SEPARATOR: &str = "------------------------------";

#[derive(Debug, Parser)]
#[command(name = "strava-agent", version, about = "Ask questions about your Strava activities")]
struct Cli {
    /// Print the controller graph as a Mermaid diagram and exit
    #[arg(long)]
    graph: bool,

    /// Model to use instead of LLM_MODEL
    #[arg(long)]
    model: Option<String>,

    /// Ask a single question and exit; starts an interactive session when omitted
    question: Vec<String>,
}

type AgentSession = Session<LoggingService, ToolRegistry>;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the conversation
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "strava_agent=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if cli.graph {
        println!("{}", state_machine::diagram());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = AgentConfig::from_env()?;
    if let Some(model) = cli.model {
        config.model = model;
    }

    let token = match config.strava.valid_token(chrono::Utc::now().timestamp()) {
        Ok(token) => token.to_string(),
        Err(e) => {
            eprintln!("{e}");
            eprintln!("{}", credentials_hint(&e));
            return Ok(ExitCode::FAILURE);
        }
    };

    let mut session = build_session(&config, token)?;
    tracing::info!(
        session = session.id(),
        model = %config.model,
        endpoint = %config.llm_base_url,
        "Session started"
    );

    if cli.question.is_empty() {
        repl(&mut session).await?;
        tracing::debug!(messages = session.conversation().len(), "Session ended");
        return Ok(ExitCode::SUCCESS);
    }

    let question = cli.question.join(" ");
    println!("User: {question}");
    match session.ask(&question).await {
        Ok(answer) => {
            println!("{SEPARATOR}");
            println!("Agent: {answer}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

fn build_session(config: &AgentConfig, token: String) -> Result<AgentSession, Box<dyn std::error::Error>> {
    let api = StravaClient::new(&config.strava_api_base, token)?;
    let tools = ToolRegistry::strava(Arc::new(api), config.tool_concurrency);
    tracing::debug!(concurrency = tools.concurrency_limit(), "Tool registry ready");

    let model = OpenAIService::new(&config.llm_base_url, config.llm_api_key.clone(), config.model.clone())?;
    let llm = LoggingService::new(Arc::new(model));

    let runtime = ConversationRuntime::new(
        Arc::new(llm),
        Arc::new(tools),
        RuntimeConfig {
            temperature: Some(config.temperature),
            max_tokens: config.max_tokens,
            max_rounds: config.max_rounds,
        },
    );

    let transcript: Arc<dyn TranscriptSink> = match TranscriptStore::open(&config.transcript_path) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::warn!(
                path = %config.transcript_path.display(),
                error = %e,
                "Transcript disabled"
            );
            Arc::new(DiscardTranscript)
        }
    };

    Ok(Session::new(
        system_prompt::system_prompt_for_today(),
        runtime,
        transcript,
    ))
}

fn credentials_hint(error: &ConfigError) -> &'static str {
    match error {
        ConfigError::TokenExpired { .. } => {
            "Refresh the token and update STRAVA_ACCESS_TOKEN and STRAVA_EXPIRES_AT in .env."
        }
        _ => "Set STRAVA_ACCESS_TOKEN (and optionally STRAVA_EXPIRES_AT) in the environment or .env.",
    }
}

async fn repl(session: &mut AgentSession) -> std::io::Result<()> {
    println!("Strava Agent CLI (Type 'quit' to exit)");
    println!("{SEPARATOR}");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("User: ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input.eq_ignore_ascii_case("quit") || input.eq_ignore_ascii_case("exit") {
            break;
        }

        match session.ask(input).await {
            Ok(answer) => println!("Agent: {answer}"),
            Err(e) if e.is_retryable() => println!("Error: {e} (temporary, try again)"),
            Err(e) => println!("Error: {e}"),
        }
        println!("{SEPARATOR}");
    }

    Ok(())
}
