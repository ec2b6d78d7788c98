//! Memory-augmented prompt/response loop.
//!
//! One participant answers one prompt; a second participant folds the
//! answered exchange into a persisted memory blob. The update replaces the
//! blob with `old + separator + summary`. Nothing guards the read-then-write
//! pair, so concurrent loops on the same memory file are last-writer-wins.

use crate::engine::respond_once;
use crate::error::MemoryError;
use crate::render::render;
use crate::turn::Transcript;
use roundtable_ai::Participant;
use roundtable_archive::{ArchiveSink, ContentRef, CreatedFile, FileId};
use std::fmt;
use std::sync::Arc;
use tracing::{info, instrument};

/// Content of a freshly created memory file.
pub const MEMORY_SEED: &str = "# Agent Memory";

/// Inserted between the existing memory and each new summary.
pub const MEMORY_SEPARATOR: &str = "\n\n";

/// Where a memory loop run currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MemoryState {
    #[default]
    Idle,
    MemoryLoaded,
    TurnExecuted,
    MemoryUpdated,
}

impl fmt::Display for MemoryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "loading memory"),
            Self::MemoryLoaded => write!(f, "answering the prompt"),
            Self::TurnExecuted => write!(f, "updating memory"),
            Self::MemoryUpdated => write!(f, "re-reading memory"),
        }
    }
}

/// Builds the prompt handed to the summarizing participant.
#[must_use]
pub fn summary_prompt(memory: &str, log: &str) -> String {
    if memory.is_empty() {
        format!("Summarise the conversation: {log}")
    } else {
        format!("Existing memory:\n{memory}\n\nSummarise the conversation: {log}")
    }
}

/// What one pass of the loop produced.
#[derive(Debug, Clone, PartialEq)]
pub struct MemoryOutcome {
    /// The responder's answer.
    pub answer: String,
    /// The single answered turn.
    pub transcript: Transcript,
    /// The archived rendering of `transcript`.
    pub log_file: CreatedFile,
    /// The summarizer's output.
    pub summary: String,
    /// Content reference of the updated memory.
    pub memory_ref: ContentRef,
    /// The memory as read back after the update.
    pub memory: String,
}

/// A prompt/response loop that accumulates summaries in a memory file.
pub struct MemoryLoop {
    archive: Arc<dyn ArchiveSink>,
    memory: FileId,
    responder: Participant,
    summarizer: Participant,
    state: MemoryState,
}

impl fmt::Debug for MemoryLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryLoop")
            .field("source", &self.archive.source_id())
            .field("memory", &self.memory)
            .field("responder", &self.responder)
            .field("summarizer", &self.summarizer)
            .field("state", &self.state)
            .finish()
    }
}

impl MemoryLoop {
    /// Creates a loop over an existing memory file.
    #[must_use]
    pub fn new(
        archive: Arc<dyn ArchiveSink>,
        memory: FileId,
        responder: Participant,
        summarizer: Participant,
    ) -> Self {
        Self {
            archive,
            memory,
            responder,
            summarizer,
            state: MemoryState::Idle,
        }
    }

    /// Creates a new memory file holding [`MEMORY_SEED`] and a loop over it.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the memory file cannot be created.
    pub async fn initialize(
        archive: Arc<dyn ArchiveSink>,
        responder: Participant,
        summarizer: Participant,
    ) -> Result<(Self, CreatedFile), MemoryError> {
        let created = archive
            .create(MEMORY_SEED)
            .await
            .map_err(|source| MemoryError::Storage {
                stage: MemoryState::Idle,
                source,
            })?;
        info!(file_id = %created.file_id, content_ref = %created.content_ref, "memory file created");

        let this = Self::new(archive, created.file_id, responder, summarizer);
        Ok((this, created))
    }

    /// The memory file this loop reads and updates.
    #[must_use]
    pub fn memory_file(&self) -> FileId {
        self.memory
    }

    /// Current state. `Idle` between runs.
    #[must_use]
    pub fn state(&self) -> MemoryState {
        self.state
    }

    /// Answers `prompt` and folds the exchange into memory.
    ///
    /// # Errors
    ///
    /// Fails fast on the first storage or participant failure; the error
    /// names the stage it happened in. The loop is `Idle` again afterwards.
    #[instrument(skip(self, prompt), fields(memory = %self.memory))]
    pub async fn run(&mut self, prompt: &str) -> Result<MemoryOutcome, MemoryError> {
        let result = self.step(prompt).await;
        self.state = MemoryState::Idle;
        result
    }

    async fn step(&mut self, prompt: &str) -> Result<MemoryOutcome, MemoryError> {
        let memory = self.read_memory().await?;
        self.state = MemoryState::MemoryLoaded;

        let transcript = respond_once(&self.responder, prompt)
            .await
            .map_err(|aborted| MemoryError::Session {
                stage: self.state,
                source: aborted.error,
            })?;
        let answer = transcript
            .last()
            .map(|turn| turn.output_text.clone())
            .unwrap_or_default();
        self.state = MemoryState::TurnExecuted;

        let log = render(&transcript);
        let log_file = self.archive.create(&log).await.map_err(|source| MemoryError::Storage {
            stage: self.state,
            source,
        })?;
        info!(file_id = %log_file.file_id, "conversation log archived");

        let summary = self
            .summarizer
            .respond(&summary_prompt(&memory, &log))
            .await
            .map_err(|source| MemoryError::Participant {
                stage: self.state,
                source,
            })?;

        let merged = format!("{memory}{MEMORY_SEPARATOR}{summary}");
        let memory_ref = self
            .archive
            .update(self.memory, &merged)
            .await
            .map_err(|source| MemoryError::Storage {
                stage: self.state,
                source,
            })?;
        self.state = MemoryState::MemoryUpdated;
        info!(content_ref = %memory_ref, "memory updated");

        let memory = self.read_memory().await?;

        Ok(MemoryOutcome {
            answer,
            transcript,
            log_file,
            summary,
            memory_ref,
            memory,
        })
    }

    async fn read_memory(&self) -> Result<String, MemoryError> {
        self.archive
            .read(self.memory)
            .await
            .map_err(|source| MemoryError::Storage {
                stage: self.state,
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SessionError;
    use roundtable_ai::{LlmError, ParticipantError, ScriptedBackend};
    use roundtable_archive::{InMemoryArchive, StorageError};

    fn participants(answer: &str, summary: &str) -> (Participant, Arc<ScriptedBackend>) {
        let summarizer = Arc::new(ScriptedBackend::replies("smollm:360m", [summary]));
        (
            Participant::seated(
                0,
                Arc::new(ScriptedBackend::replies("qwen3:0.6b", [answer])),
            ),
            summarizer,
        )
    }

    #[test]
    fn summary_prompt_includes_existing_memory() {
        assert_eq!(summary_prompt("", "LOG"), "Summarise the conversation: LOG");
        assert_eq!(
            summary_prompt("# Agent Memory", "LOG"),
            "Existing memory:\n# Agent Memory\n\nSummarise the conversation: LOG"
        );
    }

    #[tokio::test]
    async fn empty_memory_gains_separator_and_summary() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let memory = archive.create("").await.unwrap().file_id;
        let (responder, summarizer) = participants("soup-recipe", "S");

        let mut memory_loop = MemoryLoop::new(
            archive.clone(),
            memory,
            responder,
            Participant::seated(1, summarizer.clone()),
        );
        let outcome = memory_loop.run("How to make tomato soup?").await.unwrap();

        assert_eq!(outcome.answer, "soup-recipe");
        assert_eq!(outcome.summary, "S");
        assert_eq!(outcome.memory, "\n\nS");
        assert_eq!(archive.read(memory).await.unwrap(), "\n\nS");
        assert_eq!(outcome.memory_ref, ContentRef::for_content("\n\nS"));
        assert_eq!(memory_loop.state(), MemoryState::Idle);

        // The summarizer saw the rendered one-turn log.
        let log = archive.read(outcome.log_file.file_id).await.unwrap();
        assert!(log.contains("Model 1 (qwen3:0.6b): soup-recipe"));
        assert_eq!(
            summarizer.prompts(),
            vec![format!("Summarise the conversation: {log}")]
        );
    }

    #[tokio::test]
    async fn initialize_seeds_memory_file() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let (responder, summarizer) = participants("answer", "summary");

        let (mut memory_loop, created) =
            MemoryLoop::initialize(archive.clone(), responder, Participant::seated(1, summarizer))
                .await
                .unwrap();
        assert_eq!(created.content_ref, ContentRef::for_content(MEMORY_SEED));
        assert_eq!(memory_loop.memory_file(), created.file_id);

        let outcome = memory_loop.run("q").await.unwrap();
        assert_eq!(outcome.memory, "# Agent Memory\n\nsummary");
        // Memory file plus one archived log.
        assert_eq!(archive.file_count(), 2);
    }

    #[tokio::test]
    async fn responder_failure_leaves_memory_untouched() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let memory = archive.create(MEMORY_SEED).await.unwrap().file_id;
        let responder = Participant::seated(
            0,
            Arc::new(ScriptedBackend::failing("qwen3:0.6b", LlmError::Timeout)),
        );
        let summarizer = Arc::new(ScriptedBackend::echo("smollm:360m"));

        let mut memory_loop = MemoryLoop::new(
            archive.clone(),
            memory,
            responder,
            Participant::seated(1, summarizer.clone()),
        );
        let err = memory_loop.run("q").await.unwrap_err();

        assert_eq!(err.stage(), MemoryState::MemoryLoaded);
        assert!(matches!(
            err,
            MemoryError::Session {
                source: SessionError::ParticipantFailed {
                    source: ParticipantError::BackendUnavailable { .. },
                    ..
                },
                ..
            }
        ));
        assert_eq!(summarizer.calls(), 0);
        assert_eq!(archive.read(memory).await.unwrap(), MEMORY_SEED);
        assert_eq!(memory_loop.state(), MemoryState::Idle);
    }

    #[tokio::test]
    async fn missing_memory_file_fails_before_any_call() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let responder_backend = Arc::new(ScriptedBackend::echo("qwen3:0.6b"));

        let mut memory_loop = MemoryLoop::new(
            archive,
            FileId::new(9),
            Participant::seated(0, responder_backend.clone()),
            Participant::seated(1, Arc::new(ScriptedBackend::echo("smollm:360m"))),
        );
        let err = memory_loop.run("q").await.unwrap_err();

        assert_eq!(
            err,
            MemoryError::Storage {
                stage: MemoryState::Idle,
                source: StorageError::NotFound {
                    file_id: FileId::new(9)
                },
            }
        );
        assert_eq!(responder_backend.calls(), 0);
    }

    #[tokio::test]
    async fn rejected_update_reports_stage() {
        let archive = Arc::new(InMemoryArchive::new("portal"));
        let memory = archive.create(MEMORY_SEED).await.unwrap().file_id;
        archive.fail_writes(true);
        let (responder, summarizer) = participants("a", "s");

        let mut memory_loop =
            MemoryLoop::new(archive, memory, responder, Participant::seated(1, summarizer));
        let err = memory_loop.run("q").await.unwrap_err();

        assert_eq!(err.stage(), MemoryState::TurnExecuted);
        assert!(matches!(err, MemoryError::Storage { .. }));
    }
}
