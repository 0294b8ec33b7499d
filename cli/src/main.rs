//! CLI entrypoint for Expert Panel
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use panel_application::{
    PersistOutcome, PersistencePipeline, Responder, RunPanelInput, RunPanelUseCase, TurnHook,
};
use panel_domain::{Roster, Task};
use panel_infrastructure::{
    ChatCompletion, ClientRegistry, ConfigLoader, FileConfig, FileTranscriptSink, JsonlConversationLogger,
    LlmResponder, LlmSpeakerSelection, ValidationScope, build_store,
};
use panel_presentation::{Cli, ConsoleFormatter, OutputFormat, ProgressReporter, SimpleProgress};
use std::io::IsTerminal;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_PREFIX: &str = "expert-panel.log";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        return show_config(&cli);
    }

    let config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;

    let scope = if cli.is_history_command() {
        ValidationScope::History
    } else {
        ValidationScope::Run
    };
    let errors = config.validate(scope);
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        bail!("Invalid configuration ({} problem(s))", errors.len());
    }

    // The guard flushes the file writer on drop; keep it for the whole run
    let _log_guard = init_logging(&cli, &config)?;

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    info!("Starting Expert Panel");

    // === Dependency Injection ===
    let store = build_store(&config.persistence)
        .await
        .context("Failed to open the session store")?;
    let pipeline = Arc::new(PersistencePipeline::for_run(store, &config.run_params()));
    let registry = ClientRegistry::new(config.llm.clone());

    let result = dispatch(&cli, &config, &registry, &pipeline).await;

    registry.close();
    pipeline.close().await;
    result
}

async fn dispatch(
    cli: &Cli,
    config: &FileConfig,
    registry: &ClientRegistry,
    pipeline: &Arc<PersistencePipeline>,
) -> Result<()> {
    if cli.health_check {
        return health_check(registry, pipeline).await;
    }
    if let Some(limit) = cli.sessions {
        return list_sessions(pipeline, limit).await;
    }
    if let Some(session_id) = &cli.replay {
        return replay(pipeline, session_id).await;
    }
    run(cli, config, registry, pipeline).await
}

fn init_logging(cli: &Cli, config: &FileConfig) -> Result<WorkerGuard> {
    let directive = cli.log_filter(&config.logging.level);

    std::fs::create_dir_all(&config.logging.directory).with_context(|| {
        format!(
            "Failed to create log directory {}",
            config.logging.directory.display()
        )
    })?;
    let appender = tracing_appender::rolling::daily(&config.logging.directory, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    // Console gets warnings unless -v was given; the file gets the configured level
    let console_directive = if cli.verbose > 0 { directive.as_str() } else { "warn" };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::try_new(console_directive)?),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_writer(file_writer)
                .with_filter(EnvFilter::try_new(&directive)?),
        )
        .try_init()?;

    Ok(guard)
}

fn show_config(cli: &Cli) -> Result<()> {
    ConfigLoader::print_config_sources(cli.config.as_deref());

    let mut config = ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?;
    config.llm.api_key = config.llm.masked_api_key();
    println!();
    println!("Effective configuration:");
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

async fn health_check(registry: &ClientRegistry, pipeline: &PersistencePipeline) -> Result<()> {
    println!("Configuration: ok");

    let chat = registry.chat().await.context("Chat client")?;
    println!("Chat client: ok ({})", chat.deployment());
    let reasoning = registry.reasoning().await.context("Reasoning client")?;
    println!("Reasoning client: ok ({})", reasoning.deployment());

    if !pipeline.is_enabled() {
        println!("Session store: disabled");
        return Ok(());
    }
    match pipeline.health_check().await {
        PersistOutcome::Persisted(count) => println!("Session store: ok ({} sessions)", count),
        // Store trouble never blocks a run
        PersistOutcome::NotPersisted => {
            warn!("Session store health check failed");
            println!("Session store: unreachable (runs will continue without persistence)");
        }
    }
    Ok(())
}

async fn list_sessions(pipeline: &PersistencePipeline, limit: usize) -> Result<()> {
    if !pipeline.is_enabled() {
        bail!("Session persistence is disabled; set persistence.enabled = true");
    }
    match pipeline.get_sessions(limit).await {
        PersistOutcome::Persisted(sessions) => {
            print!("{}", ConsoleFormatter::session_list(&sessions));
            Ok(())
        }
        PersistOutcome::NotPersisted => bail!("Could not read sessions from the store"),
    }
}

async fn replay(pipeline: &PersistencePipeline, session_id: &str) -> Result<()> {
    if !pipeline.is_enabled() {
        bail!("Session persistence is disabled; set persistence.enabled = true");
    }
    let session = pipeline.get_session(session_id).await.into_option();
    let messages = match pipeline.get_messages(session_id).await {
        PersistOutcome::Persisted(messages) => messages,
        PersistOutcome::NotPersisted => bail!("Could not read messages of {}", session_id),
    };
    if session.is_none() && messages.is_empty() {
        bail!("Session not found: {}", session_id);
    }
    print!("{}", ConsoleFormatter::replay(session.as_ref(), &messages));
    Ok(())
}

fn resolve_task(cli: &Cli, config: &FileConfig) -> Result<Task> {
    let content = if let Some(task) = &cli.task {
        task.clone()
    } else if cli.interactive {
        let stdin = std::io::stdin();
        panel_presentation::read_task(&mut stdin.lock(), &mut std::io::stdout())?
            .context("No task entered")?
    } else {
        config.panel.task_or_default()
    };
    Ok(Task::new(content)?)
}

async fn build_responders(
    registry: &ClientRegistry,
    roster: &Roster,
) -> Result<Vec<Arc<dyn Responder>>> {
    let chat = registry.chat().await.context("Failed to create the chat client")?;
    Ok(roster
        .members()
        .iter()
        .map(|profile| {
            Arc::new(LlmResponder::new(profile.clone(), Arc::clone(&chat))) as Arc<dyn Responder>
        })
        .collect())
}

async fn run(
    cli: &Cli,
    config: &FileConfig,
    registry: &ClientRegistry,
    pipeline: &Arc<PersistencePipeline>,
) -> Result<()> {
    let task = resolve_task(cli, config)?;
    let roster = config.panel.roster()?;

    let responders = build_responders(registry, &roster).await?;
    let reasoning = registry
        .reasoning()
        .await
        .context("Failed to create the reasoning client")?;
    let selection = Arc::new(LlmSpeakerSelection::new(reasoning));

    let params = config.run_params();
    let mut use_case = RunPanelUseCase::new(responders, selection, params.clone())
        .with_persistence(Arc::clone(pipeline))
        .with_selector_prompt(config.panel.selector_prompt())
        .with_policy(config.panel.eligibility_policy(params.allow_repeated_speaker));

    if config.logging.conversation_log
        && let Some(logger) = JsonlConversationLogger::for_run(&config.logging.directory)
    {
        info!("Conversation log: {}", logger.path().display());
        use_case = use_case.with_logger(Arc::new(logger));
    }
    if config.logging.export_transcript {
        use_case = use_case.with_transcript_sink(Arc::new(FileTranscriptSink::new(
            &config.logging.directory,
            config.logging.keep_transcripts,
        )));
    }

    let interactive_output = cli.output != OutputFormat::Json;
    if !cli.quiet && interactive_output {
        let show_spinner = config.output.show_progress && std::io::stderr().is_terminal();
        let hook: Arc<dyn TurnHook> = match cli.output {
            OutputFormat::Full => Arc::new(ProgressReporter::new(show_spinner, true)),
            _ if show_spinner => Arc::new(ProgressReporter::new(true, false)),
            _ => Arc::new(SimpleProgress),
        };
        use_case = use_case.with_hook(hook);
        println!("{}", ConsoleFormatter::run_header(task.content(), &roster.names()));
    }

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("\nInterrupt received, finishing the current turn...");
                cancel.cancel();
            }
        })
    };

    let outcome = use_case
        .execute_with_cancel(RunPanelInput::new(task, roster), &cancel)
        .await;
    ctrl_c.abort();
    let outcome = outcome?;

    match cli.output {
        OutputFormat::Json => println!("{}", ConsoleFormatter::report_json(&outcome)),
        _ => print!("{}", ConsoleFormatter::report(&outcome)),
    }

    if outcome.status.is_failed() {
        bail!("Run failed: {}", outcome.reason().unwrap_or("unknown error"));
    }
    Ok(())
}
