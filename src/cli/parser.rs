//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros. Most knobs come
//! from environment variables (see [`crate::config`]); flags here cover
//! the common overrides.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// siftd: chunk-first web search platform core.
///
/// Three long-running services share one binary: the document-processing
/// pipeline, the priority-queued indexer, and the query service.
#[derive(Parser, Debug)]
#[command(name = "siftd")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the document-processing pipeline.
    ///
    /// Reads raw crawler files, processes them on a worker pool, and
    /// writes grouped JSONL files into the indexer's fresh directory.
    Pipeline {
        /// Process the current files once and exit, instead of
        /// re-scanning on an interval.
        #[arg(long)]
        once: bool,

        /// Directory holding raw crawler output.
        #[arg(long, env = "RAW_DATA_DIR")]
        raw_dir: Option<PathBuf>,

        /// Directory to write pipeline output into.
        #[arg(long, env = "PIPELINE_OUTPUT_DIR")]
        output_dir: Option<PathBuf>,
    },

    /// Run the indexer service.
    ///
    /// Scans the fresh and backlog queue directories and commits records
    /// to the index store in bulk until interrupted.
    Indexer,

    /// Run the query service HTTP server.
    Serve {
        /// Bind host.
        #[arg(long, env = "BACKEND_HOST")]
        host: Option<String>,

        /// Bind port.
        #[arg(long, env = "BACKEND_PORT")]
        port: Option<u16>,
    },

    /// Create index templates, daily indices, aliases, and the retention
    /// policy, then exit.
    InitIndices,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_pipeline_flags() {
        let cli = Cli::parse_from(["siftd", "pipeline", "--once", "--raw-dir", "/tmp/raw"]);
        match cli.command {
            Commands::Pipeline { once, raw_dir, .. } => {
                assert!(once);
                assert_eq!(raw_dir, Some(PathBuf::from("/tmp/raw")));
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn test_serve_port_flag() {
        let cli = Cli::parse_from(["siftd", "serve", "--port", "9000"]);
        match cli.command {
            Commands::Serve { port, .. } => assert_eq!(port, Some(9000)),
            _ => panic!("wrong command parsed"),
        }
    }
}
