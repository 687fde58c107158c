use std::path::PathBuf;

use clap::{Parser, Subcommand};
use counter_logging::LogDestination;

use crate::settings::Settings;

#[derive(Debug, Parser)]
#[command(name = "wordcount", version, about = "Count word frequencies across strings, files and URLs")]
pub struct Cli {
    /// RON settings file (defaults to ./wordcount.ron when present).
    #[arg(long, global = true, env = "WORDCOUNT_CONFIG")]
    pub config: Option<PathBuf>,

    /// JSON file holding the running totals.
    #[arg(long, global = true, conflicts_with = "memory")]
    pub store: Option<PathBuf>,

    /// Keep totals in memory for this run only.
    #[arg(long, global = true)]
    pub memory: bool,

    /// Log level: off, error, warn, info, debug or trace.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Also write logs to ./wordcount.log.
    #[arg(long, global = true)]
    pub log_file: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Count the words of one or more inputs and merge them into the totals.
    Count {
        /// How every INPUT is interpreted: string, file or url.
        #[arg(short, long, default_value = "string")]
        kind: String,

        /// Bytes read per file chunk.
        #[arg(long)]
        chunk_size: Option<usize>,

        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Print the running total of one word.
    Stats { word: String },
    /// Print the most frequent words.
    Top {
        #[arg(short, default_value_t = 10)]
        n: usize,
    },
    /// Check that the totals store is reachable.
    Health,
}

impl Cli {
    /// Applies command-line overrides on top of file settings.
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if self.memory {
            settings.store_path = None;
        } else if let Some(store) = &self.store {
            settings.store_path = Some(store.clone());
        }
        if let Some(level) = &self.log_level {
            settings.log.level = level.clone();
        }
        if self.log_file {
            settings.log.destination = match settings.log.destination {
                LogDestination::Terminal | LogDestination::Both => LogDestination::Both,
                LogDestination::File | LogDestination::Off => LogDestination::File,
            };
        }
        if let Command::Count {
            chunk_size: Some(size),
            ..
        } = &self.command
        {
            settings.chunk_size = *size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_accepts_multiple_inputs() {
        let cli = Cli::parse_from(["wordcount", "count", "--kind", "file", "a.txt", "b.txt"]);
        match cli.command {
            Command::Count { kind, inputs, .. } => {
                assert_eq!(kind, "file");
                assert_eq!(inputs, vec!["a.txt", "b.txt"]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn count_requires_an_input() {
        assert!(Cli::try_parse_from(["wordcount", "count"]).is_err());
    }

    #[test]
    fn store_and_memory_conflict() {
        assert!(Cli::try_parse_from(["wordcount", "--memory", "--store", "x.json", "health"]).is_err());
    }

    #[test]
    fn overrides_replace_file_settings() {
        let cli = Cli::parse_from([
            "wordcount",
            "--store",
            "totals.json",
            "--log-level",
            "debug",
            "count",
            "--chunk-size",
            "16",
            "hello",
        ]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);

        assert_eq!(settings.store_path, Some(PathBuf::from("totals.json")));
        assert_eq!(settings.log.level, "debug");
        assert_eq!(settings.chunk_size, 16);
    }

    #[test]
    fn memory_flag_drops_store_path() {
        let cli = Cli::parse_from(["wordcount", "--memory", "top", "-n", "3"]);
        let mut settings = Settings::default();
        cli.apply_overrides(&mut settings);
        assert_eq!(settings.store_path, None);
        assert!(matches!(cli.command, Command::Top { n: 3 }));
    }
}
