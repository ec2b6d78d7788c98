//! Subcommand implementations.
//!
//! Results go to stdout; progress and diagnostics go through `tracing` to stderr.

use crate::bootstrap::Bootstrap;
use crate::cli::FilesAction;
use crate::config::ConfigError;
use crate::error::CliError;
use rootcause::prelude::{Report, ResultExt};
use roundtable_ai::{CONVERSATION_MODELS, Participant, SINGLE_PROMPT_MODELS, default_models};
use roundtable_archive::FileId;
use roundtable_conversation::{MemoryLoop, TopicContinuation, TurnEngine, render, respond_once};
use roundtable_trigger::SummarizeOnEvent;
use std::sync::Arc;
use tracing::info;

/// Uses the caller's models, or the first `count` of `roster` when none were given.
fn models_or_default(models: Vec<String>, roster: &[&str], count: usize) -> Vec<String> {
    if models.is_empty() {
        default_models(roster, count)
    } else {
        models
    }
}

fn one_participant(
    boot: &Bootstrap,
    model: Option<String>,
    fallback: &str,
) -> Result<Participant, Report<CliError>> {
    boot.participant(0, model.as_deref().unwrap_or(fallback))
}

pub(crate) async fn converse(
    boot: &Bootstrap,
    topic: String,
    rounds: u32,
    models: Vec<String>,
) -> Result<(), Report<CliError>> {
    let models = models_or_default(models, CONVERSATION_MODELS, CONVERSATION_MODELS.len());
    let participants = boot.participants(&models)?;

    let composer = TopicContinuation::new(topic);
    let seed = composer.seed_prompt();
    info!(topic = %composer.topic(), rounds, models = ?models, "starting conversation");

    let engine = TurnEngine::new(participants)
        .context(CliError::InvalidArgument {
            name: "model",
            reason: "at least one model is required".to_string(),
        })?
        .with_composer(composer);

    let transcript = match engine.run_session(&seed, rounds).await {
        Ok(transcript) => transcript,
        Err(aborted) => {
            if !aborted.partial.is_empty() {
                print!("{}", render(&aborted.partial));
            }
            return Err(aborted).context(CliError::Session);
        }
    };

    let log = render(&transcript);
    let created = boot
        .archive()
        .create(&log)
        .await
        .context(CliError::Storage {
            operation: "create",
        })?;

    print!("{log}");
    println!("File created: {} ({})", created.file_id, created.content_ref);
    Ok(())
}

pub(crate) async fn ask(
    boot: &Bootstrap,
    prompt: String,
    model: Option<String>,
) -> Result<(), Report<CliError>> {
    let participant = one_participant(boot, model, SINGLE_PROMPT_MODELS[0])?;
    info!(prompt = %prompt, model = %participant.model(), "asking");

    let transcript = respond_once(&participant, &prompt)
        .await
        .context(CliError::Session)?;

    let log = render(&transcript);
    let created = boot
        .archive()
        .create(&log)
        .await
        .context(CliError::Storage {
            operation: "create",
        })?;

    print!("{log}");
    println!("File created: {} ({})", created.file_id, created.content_ref);
    Ok(())
}

pub(crate) async fn remember(
    boot: &Bootstrap,
    prompt: String,
    memory: Option<FileId>,
    model: Option<String>,
    summarizer: Option<String>,
) -> Result<(), Report<CliError>> {
    let responder = one_participant(boot, model, SINGLE_PROMPT_MODELS[0])?;
    let summarizer = one_participant(boot, summarizer, SINGLE_PROMPT_MODELS[1])?;

    let mut memory_loop = match memory {
        Some(file_id) => MemoryLoop::new(boot.archive(), file_id, responder, summarizer),
        None => {
            let (memory_loop, created) =
                MemoryLoop::initialize(boot.archive(), responder, summarizer)
                    .await
                    .context(CliError::Memory)?;
            println!("Memory file: {} ({})", created.file_id, created.content_ref);
            memory_loop
        }
    };

    let outcome = memory_loop.run(&prompt).await.context(CliError::Memory)?;

    println!("Answer: {}", outcome.answer);
    println!(
        "Log created: {} ({})",
        outcome.log_file.file_id, outcome.log_file.content_ref
    );
    println!(
        "Memory file: {} ({})",
        memory_loop.memory_file(),
        outcome.memory_ref
    );
    println!("Memory:\n{}", outcome.memory);
    Ok(())
}

pub(crate) async fn watch(
    boot: &Bootstrap,
    model: Option<String>,
    gateway: bool,
) -> Result<(), Report<CliError>> {
    let Some(trigger) = boot.notifier() else {
        return Err(ConfigError::Missing { key: "NATS_URL" }).context(CliError::Configuration);
    };

    let participant = one_participant(boot, model, SINGLE_PROMPT_MODELS[0])?;
    let mut flow = SummarizeOnEvent::new(boot.archive(), participant);
    if gateway {
        flow = flow.with_resolver(Arc::new(boot.gateway()?));
    }

    info!(source = %flow.filter().source(), "waiting for the next added file");
    let outcome = flow
        .run_once(trigger.as_ref())
        .await
        .context(CliError::Trigger)?;

    println!(
        "Listened: file {} ({})",
        outcome.notification.event.file_id,
        outcome.notification.content_ref()
    );
    println!("Summarised Response: {}", outcome.summary);
    println!(
        "File created: {} ({})",
        outcome.created.file_id, outcome.created.content_ref
    );
    Ok(())
}

pub(crate) async fn files(boot: &Bootstrap, action: FilesAction) -> Result<(), Report<CliError>> {
    let archive = boot.archive();

    match action {
        FilesAction::Create { content } => {
            let created = archive.create(&content).await.context(CliError::Storage {
                operation: "create",
            })?;
            println!("File created: {} ({})", created.file_id, created.content_ref);
        }
        FilesAction::Read { file_id } => {
            let content = archive.read(file_id).await.context(CliError::Storage {
                operation: "read",
            })?;
            println!("{content}");
        }
        FilesAction::Update { file_id, content } => {
            let content_ref = archive
                .update(file_id, &content)
                .await
                .context(CliError::Storage {
                    operation: "update",
                })?;
            println!("File updated: {file_id} ({content_ref})");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_models_win() {
        assert_eq!(
            models_or_default(vec!["a".to_string()], CONVERSATION_MODELS, 2),
            vec!["a"]
        );
        assert_eq!(
            models_or_default(Vec::new(), CONVERSATION_MODELS, 2),
            vec!["smollm:360m", "qwen3:0.6b"]
        );
    }
}
