use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use jobdesk::models::{JobStatus, JobType, SourceKind};

/// jobdesk - browse, filter and operate on processing jobs
#[derive(Parser, Debug)]
#[command(name = "jobdesk")]
#[command(version)]
#[command(about = "Terminal front-end for the jobs API", long_about = None)]
pub struct Cli {
    /// Configuration file path (defaults to the platform config directory)
    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// API base URL, overriding the configuration
    #[arg(long = "api-url", global = true, env = "JOBDESK_API_URL")]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List jobs with optional filters
    List(ListArgs),

    /// Show a single job
    Show {
        id: String,

        /// Keep polling while the job is pending or running
        #[arg(short = 'w', long = "watch")]
        watch: bool,
    },

    /// Create a new job
    Create(CreateArgs),

    /// Start a pending job
    Start { id: String },

    /// Cancel a running job
    Cancel { id: String },

    /// Retry a failed job
    Retry { id: String },

    /// Delete a job
    Delete {
        id: String,

        /// Skip the confirmation prompt
        #[arg(short = 'y', long = "yes")]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Raw query string, e.g. "status=failed&page=2". Overrides the filter flags.
    #[arg(long = "query", conflicts_with_all = ["search", "status", "job_type", "project", "page"])]
    pub query: Option<String>,

    /// Free-text search
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,

    #[arg(long = "status")]
    pub status: Option<JobStatus>,

    #[arg(short = 't', long = "type")]
    pub job_type: Option<JobType>,

    /// Project id
    #[arg(short = 'p', long = "project")]
    pub project: Option<String>,

    /// 1-indexed page number
    #[arg(long = "page")]
    pub page: Option<u32>,

    /// Print the view model as JSON
    #[arg(long = "json")]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Job name
    #[arg(short = 'n', long = "name")]
    pub name: String,

    #[arg(short = 't', long = "type", default_value = "parse")]
    pub job_type: JobType,

    /// Project id
    #[arg(short = 'p', long = "project")]
    pub project: String,

    /// Where the document comes from
    #[arg(long = "source", value_enum, default_value_t = SourceArg::Upload)]
    pub source: SourceArg,

    /// Document id, URL or S3 path, depending on --source
    #[arg(long = "from")]
    pub from: String,

    /// Skip text extraction
    #[arg(long = "no-extract-text")]
    pub no_extract_text: bool,

    /// Generate a summary
    #[arg(long = "summary")]
    pub summary: bool,

    /// Skip language detection
    #[arg(long = "no-detect-language")]
    pub no_detect_language: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceArg {
    Upload,
    Url,
    S3,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Upload => SourceKind::Upload,
            SourceArg::Url => SourceKind::Url,
            SourceArg::S3 => SourceKind::S3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_filters() {
        let cli = Cli::try_parse_from([
            "jobdesk", "list", "--status", "failed", "--type", "ocr", "--page", "2",
        ]);
        // "ocr" is not a job type.
        assert!(cli.is_err());

        let cli = Cli::try_parse_from([
            "jobdesk", "list", "--status", "failed", "--type", "extract", "--page", "2",
        ])
        .unwrap();
        match cli.command {
            Command::List(args) => {
                assert_eq!(args.status, Some(JobStatus::Failed));
                assert_eq!(args.job_type, Some(JobType::Extract));
                assert_eq!(args.page, Some(2));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_query_conflicts_with_flags() {
        let cli = Cli::try_parse_from(["jobdesk", "list", "--query", "page=2", "--page", "3"]);
        assert!(cli.is_err());
    }

    #[test]
    fn test_parse_delete_and_globals() {
        let cli = Cli::try_parse_from([
            "jobdesk", "delete", "j-1", "--yes", "--verbose", "--api-url", "http://api:9000",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.api_url.as_deref(), Some("http://api:9000"));
        match cli.command {
            Command::Delete { id, yes } => {
                assert_eq!(id, "j-1");
                assert!(yes);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
