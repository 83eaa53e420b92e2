use clap::{Args, Parser, Subcommand};

use crate::config::{Config, DEFAULT_OFFLOAD_THRESHOLD, DEFAULT_PREVIEW_CEILING, DEFAULT_STRIP_PREFIX};
use crate::provider::{AttachmentLayout, DEFAULT_INDEX_PATTERN, DEFAULT_PAYLOAD_PATTERN};

#[derive(Parser, Debug)]
#[command(name = "tarpeek")]
#[command(version)]
#[command(about = "Browse and fetch files inside local or remote tar archives", long_about = None)]
#[command(after_help = "Examples:\n  \
  tarpeek index run.tar                         print the path -> [offset, size] index\n  \
  tarpeek tree https://example.com/run.tar      list attachments of a remote container\n  \
  tarpeek cat --direct https://x/a.tar a/b.txt  fetch one file from a remote tar")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub options: Options,

    /// Verbose logging (-vv => trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode, errors only
    #[arg(short = 'q', global = true)]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the file index as JSON
    Index {
        /// Archive path or HTTP URL
        #[arg(value_name = "SOURCE")]
        source: String,
    },

    /// Print the attachment tree
    Tree {
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one attachment to stdout
    Cat {
        #[arg(value_name = "SOURCE")]
        source: String,

        /// Path of the attachment as listed in the index
        #[arg(value_name = "PATH")]
        path: String,
    },

    /// Run the preview pipeline for one attachment
    Preview {
        #[arg(value_name = "SOURCE")]
        source: String,

        #[arg(value_name = "PATH")]
        path: String,
    },
}

#[derive(Args, Debug)]
pub struct Options {
    /// Treat a remote SOURCE as the attachments tar itself, not a container
    #[arg(long, global = true)]
    pub direct: bool,

    /// Prefix removed from paths in the tree
    #[arg(long, global = true, value_name = "PREFIX", default_value = DEFAULT_STRIP_PREFIX)]
    pub strip_prefix: String,

    /// Largest attachment to preview, in bytes
    #[arg(long, global = true, value_name = "BYTES", default_value_t = DEFAULT_PREVIEW_CEILING)]
    pub preview_ceiling: u64,

    /// Index archives larger than this on a worker thread, in bytes
    #[arg(long, global = true, value_name = "BYTES", default_value_t = DEFAULT_OFFLOAD_THRESHOLD)]
    pub offload_threshold: u64,

    /// Regex selecting the sidecar index inside a container
    #[arg(long, global = true, value_name = "REGEX")]
    pub index_pattern: Option<String>,

    /// Regex selecting the attachments tar inside a container
    #[arg(long, global = true, value_name = "REGEX")]
    pub payload_pattern: Option<String>,
}

impl Cli {
    pub fn source(&self) -> &str {
        match &self.command {
            Command::Index { source }
            | Command::Tree { source, .. }
            | Command::Cat { source, .. }
            | Command::Preview { source, .. } => source,
        }
    }

    pub fn is_http_url(&self) -> bool {
        let source = self.source();
        source.starts_with("http://") || source.starts_with("https://")
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet || matches!(self.command, Command::Cat { .. })
    }

    /// Build the runtime configuration, applying flag overrides.
    pub fn config(&self) -> Result<Config, regex::Error> {
        let defaults = Config::default();
        let layout = match (&self.options.index_pattern, &self.options.payload_pattern) {
            (None, None) => defaults.layout,
            (index, payload) => AttachmentLayout::new(
                index.as_deref().unwrap_or(DEFAULT_INDEX_PATTERN),
                payload.as_deref().unwrap_or(DEFAULT_PAYLOAD_PATTERN),
            )?,
        };

        Ok(Config {
            preview_ceiling: self.options.preview_ceiling,
            offload_threshold: self.options.offload_threshold,
            strip_prefix: self.options.strip_prefix.clone(),
            layout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommand_with_global_flags() {
        let cli = Cli::parse_from([
            "tarpeek",
            "cat",
            "https://x/y.tar",
            "attachments/a.txt",
            "--direct",
            "--strip-prefix",
            "",
        ]);
        assert!(cli.is_http_url());
        assert!(cli.options.direct);
        assert!(cli.is_quiet());
        assert_eq!(cli.config().unwrap().strip_prefix, "");
    }

    #[test]
    fn defaults_match_config() {
        let cli = Cli::parse_from(["tarpeek", "tree", "run.tar"]);
        let config = cli.config().unwrap();
        assert!(!cli.is_http_url());
        assert_eq!(config.preview_ceiling, DEFAULT_PREVIEW_CEILING);
        assert_eq!(config.strip_prefix, DEFAULT_STRIP_PREFIX);
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let cli = Cli::parse_from(["tarpeek", "index", "run.tar", "--index-pattern", "("]);
        assert!(cli.config().is_err());
    }
}
