//! Command-line interface

use clap::{Parser, Subcommand};

/// Default pause between scheduled runs.
pub const DEFAULT_INTERVAL_SECS: u64 = 60;

/// Scrutiny ETL - ingest external feeds into Scrutiny
#[derive(Parser, Debug)]
#[command(name = "scrutiny-etl")]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available jobs
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest Hacker News top stories and their comments
    News {
        /// Run a single pass and exit
        #[arg(long)]
        once: bool,

        /// Seconds between scheduled passes
        #[arg(long, env = "ETL_INTERVAL_SECS", default_value_t = DEFAULT_INTERVAL_SECS)]
        interval_secs: u64,
    },
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_news_defaults() {
        let cli = Cli::try_parse_from(["scrutiny-etl", "news"]).unwrap();
        assert!(!cli.verbose);
        let Commands::News {
            once,
            interval_secs,
        } = cli.command;
        assert!(!once);
        assert_eq!(interval_secs, DEFAULT_INTERVAL_SECS);
    }

    #[test]
    fn test_news_once_verbose() {
        let cli = Cli::try_parse_from(["scrutiny-etl", "news", "--once", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::News { once: true, .. }));
    }

    #[test]
    fn test_subcommand_required() {
        assert!(Cli::try_parse_from(["scrutiny-etl"]).is_err());
    }
}
