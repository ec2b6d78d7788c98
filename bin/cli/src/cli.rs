use clap::{Parser, Subcommand};
use roundtable_archive::FileId;

/// Topic discussed when `converse` is given none.
pub(crate) const DEFAULT_TOPIC: &str = "why is sky blue?";

/// Prompt answered when `ask` or `remember` is given none.
pub(crate) const DEFAULT_PROMPT: &str = "How to make tomato soup?";

#[derive(Debug, Parser)]
#[command(name = "roundtable")]
#[command(about = "Turn-taking conversations between local models, archived as content-addressed files.")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Run a round-robin discussion between models and archive its log.
    Converse {
        /// Topic to discuss.
        #[arg(long, default_value = DEFAULT_TOPIC)]
        topic: String,

        /// Number of full rounds.
        #[arg(long, default_value_t = 3)]
        rounds: u32,

        /// Models in seating order (repeatable; default: smollm:360m, qwen3:0.6b).
        #[arg(long = "model")]
        models: Vec<String>,
    },
    /// Answer one prompt with one model and archive the exchange.
    Ask {
        /// Prompt to answer.
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,

        /// Answering model (default: qwen3:0.6b).
        #[arg(long)]
        model: Option<String>,
    },
    /// Answer one prompt and fold a summary of the exchange into a memory file.
    Remember {
        /// Prompt to answer.
        #[arg(long, default_value = DEFAULT_PROMPT)]
        prompt: String,

        /// Existing memory file; a new one is created when omitted.
        #[arg(long)]
        memory: Option<FileId>,

        /// Answering model (default: qwen3:0.6b).
        #[arg(long)]
        model: Option<String>,

        /// Summarizing model (default: smollm:360m).
        #[arg(long)]
        summarizer: Option<String>,
    },
    /// Wait for the next file added to the archive, summarize it and archive the summary.
    Watch {
        /// Summarizing model (default: qwen3:0.6b).
        #[arg(long)]
        model: Option<String>,

        /// Fetch the announced content through PINATA_GATEWAY instead of the archive.
        #[arg(long)]
        gateway: bool,
    },
    /// Create, read or update archive files directly.
    Files {
        #[command(subcommand)]
        action: FilesAction,
    },
}

#[derive(Debug, Subcommand)]
pub(crate) enum FilesAction {
    /// Store new content and print its file id and content reference.
    Create { content: String },
    /// Print the current content of a file.
    Read { file_id: FileId },
    /// Replace a file's content and print the new content reference.
    Update { file_id: FileId, content: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn converse_defaults() {
        let cli = Cli::try_parse_from(["roundtable", "converse"]).unwrap();
        match cli.command {
            Command::Converse {
                topic,
                rounds,
                models,
            } => {
                assert_eq!(topic, DEFAULT_TOPIC);
                assert_eq!(rounds, 3);
                assert!(models.is_empty());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn repeated_models_keep_order() {
        let cli = Cli::try_parse_from([
            "roundtable",
            "converse",
            "--model",
            "b",
            "--model",
            "a",
            "--rounds",
            "0",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Converse { ref models, rounds: 0, .. } if models == &["b", "a"]
        ));
    }

    #[test]
    fn remember_parses_memory_handle() {
        let cli = Cli::try_parse_from(["roundtable", "remember", "--memory", "4"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Remember { memory: Some(id), .. } if id == FileId::new(4)
        ));
        assert!(Cli::try_parse_from(["roundtable", "remember", "--memory", "x"]).is_err());
    }

    #[test]
    fn files_update_takes_id_and_content() {
        let cli =
            Cli::try_parse_from(["roundtable", "files", "update", "0", "Hello World 2"]).unwrap();
        match cli.command {
            Command::Files {
                action: FilesAction::Update { file_id, content },
            } => {
                assert_eq!(file_id, FileId::new(0));
                assert_eq!(content, "Hello World 2");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
