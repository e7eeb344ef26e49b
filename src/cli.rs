use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "docent")]
#[command(about = "Answer questions from your PDFs and web pages", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to the TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Chat against the existing collection without rebuilding it
    #[arg(long, global = true)]
    pub skip_index: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Rebuild the collection from the configured sources and print a report
    Index,

    /// Answer one question against the existing collection (indexes first
    /// when the store is in-memory)
    Ask {
        /// The question to answer
        question: String,
    },

    /// Index, then start an interactive chat (default)
    Chat,
}

impl Cli {
    #[must_use]
    pub fn subcommand(&self) -> Command {
        self.command.clone().unwrap_or(Command::Chat)
    }

    /// Whether ingestion runs before the command.
    ///
    /// An in-memory store starts empty in every process, so `ask` indexes
    /// first there, like `chat`.
    ///
    /// # Errors
    ///
    /// `ask --skip-index` against an in-memory store could only ever answer
    /// from an empty collection.
    pub fn should_index(&self, in_memory_store: bool) -> anyhow::Result<bool> {
        match self.subcommand() {
            Command::Index => Ok(true),
            Command::Chat => Ok(!self.skip_index),
            Command::Ask { .. } if !in_memory_store => Ok(false),
            Command::Ask { .. } if self.skip_index => anyhow::bail!(
                "--skip-index with an in-memory store leaves nothing to search; \
                 drop the flag or set store.in_memory = false"
            ),
            Command::Ask { .. } => Ok(true),
        }
    }

    /// `--config`, then `DOCENT_CONFIG`, then `config/default.toml`.
    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        if let Some(path) = &self.config {
            return path.clone();
        }
        if let Ok(path) = std::env::var("DOCENT_CONFIG") {
            return PathBuf::from(path);
        }
        PathBuf::from("config/default.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_defaults_to_chat() {
        let cli = Cli::try_parse_from(["docent"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Chat);
        assert!(!cli.skip_index);
    }

    #[test]
    fn ask_takes_question() {
        let cli = Cli::try_parse_from(["docent", "ask", "what is attention?"]).unwrap();
        assert_eq!(
            cli.subcommand(),
            Command::Ask {
                question: "what is attention?".into()
            }
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "docent",
            "chat",
            "--skip-index",
            "--config",
            "custom.toml",
            "--log-file",
            "docent.log",
        ])
        .unwrap();
        assert!(cli.skip_index);
        assert_eq!(cli.config_path(), PathBuf::from("custom.toml"));
        assert_eq!(cli.log_file, Some(PathBuf::from("docent.log")));
    }

    #[test]
    fn default_config_path() {
        let cli = Cli::try_parse_from(["docent", "index"]).unwrap();
        assert_eq!(cli.subcommand(), Command::Index);
        if std::env::var_os("DOCENT_CONFIG").is_none() {
            assert_eq!(cli.config_path(), PathBuf::from("config/default.toml"));
        }
    }

    fn should_index(args: &[&str], in_memory_store: bool) -> bool {
        let mut argv = vec!["docent"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv)
            .unwrap()
            .should_index(in_memory_store)
            .unwrap()
    }

    #[test]
    fn index_and_chat_ingest_unless_skipped() {
        for in_memory in [false, true] {
            assert!(should_index(&["index"], in_memory));
            assert!(should_index(&["index", "--skip-index"], in_memory));
            assert!(should_index(&[], in_memory));
            assert!(!should_index(&["chat", "--skip-index"], in_memory));
        }
    }

    #[test]
    fn ask_reuses_persistent_collection() {
        assert!(!should_index(&["ask", "q"], false));
        assert!(!should_index(&["ask", "q", "--skip-index"], false));
    }

    #[test]
    fn ask_indexes_first_with_in_memory_store() {
        assert!(should_index(&["ask", "q"], true));
    }

    #[test]
    fn ask_skip_index_with_in_memory_store_is_rejected() {
        let cli = Cli::try_parse_from(["docent", "ask", "q", "--skip-index"]).unwrap();
        let err = cli.should_index(true).unwrap_err();
        assert!(err.to_string().contains("in-memory store"));
    }
}
