use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cli3")]
#[command(about = "Terminal client for the cli3 reporting service")]
#[command(version)]
#[command(after_help = "Examples:
  cli3 tree                                 # Browse the query folders
  cli3 describe 42                          # Show a query's parameters
  cli3 run 42 -p REGION=North               # Run a query with a parameter
  cli3 run 42 --filter STATUS=open --sort AMOUNT:desc
  cli3 run 42 --save sales.json             # Keep the result as a document
  cli3 open sales.json --format csv         # Reopen a saved document
  cli3 nci show regions --search Nor        # Look up a reference table
  cli3 config set server reports.example    # Change the server

Environment Variables:
  CLI3_SERVER, CLI3_PORT, CLI3_SCHEMA   Connection settings
  CLI3_USERNAME, CLI3_PASSWORD          Login credentials
  RUST_LOG                              Log filter (overrides -v)")]
pub struct Cli {
    /// Increase log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Custom configuration directory path
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Server host or URL
    #[arg(long, global = true)]
    pub server: Option<String>,

    /// Server port
    #[arg(long, global = true)]
    pub port: Option<String>,

    /// Schema the queries live in
    #[arg(long, global = true)]
    pub schema: Option<String>,

    /// Login name
    #[arg(short, long, global = true)]
    pub username: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the folder tree of queries
    Tree,
    /// Show a query's kind, input parameters and sub-queries
    Describe {
        /// Query id
        id: String,
    },
    /// Run a query and show the result
    Run(RunArgs),
    /// Open a saved document
    Open(OpenArgs),
    /// Reference tables (NCI) loaded at login
    Nci {
        #[command(subcommand)]
        command: NciCommands,
    },
    /// Configuration management (show, set)
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug)]
#[command(after_help = "Examples:
  cli3 run 42
  cli3 run 42 -p REGION=North -p YEAR=2024
  cli3 run 42 --filter REGION=North --filter CLOSED=
  cli3 run 42 --sort AMOUNT:desc --format json
  cli3 run 42 --save ~/reports/sales.json")]
pub struct RunArgs {
    /// Query id
    pub id: String,

    /// Parameter value as NAME=VALUE (can be repeated)
    #[arg(short, long = "param", action = clap::ArgAction::Append, help_heading = "Execution Options")]
    pub params: Vec<String>,

    /// Save the result as a document
    #[arg(long, help_heading = "Execution Options")]
    pub save: Option<PathBuf>,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Saved document
    pub file: PathBuf,

    /// Log in first so reference-table labels are translated
    #[arg(long)]
    pub login: bool,

    #[command(flatten)]
    pub view: ViewArgs,
}

#[derive(Args, Debug, Default)]
pub struct ViewArgs {
    /// Keep rows where COLUMN equals VALUE; an empty VALUE keeps blank cells (can be repeated)
    #[arg(long, action = clap::ArgAction::Append, help_heading = "View Options")]
    pub filter: Vec<String>,

    /// Sort by COLUMN, ascending unless suffixed with :desc
    #[arg(long, help_heading = "View Options")]
    pub sort: Option<String>,

    /// Output format: table, json, or csv
    #[arg(short, long, default_value = "table", help_heading = "Output Options")]
    pub format: String,

    /// Maximum number of rows to print
    #[arg(long, help_heading = "Output Options")]
    pub limit: Option<usize>,

    /// Plain output without colors
    #[arg(long, help_heading = "Output Options")]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum NciCommands {
    /// List the reference tables and their sizes
    List,
    /// Show rows of one reference table
    #[command(after_help = "Examples:
  cli3 nci show regions
  cli3 nci show regions --search Nor --limit 5")]
    Show {
        /// Table name
        name: String,
        /// Only rows whose code or label contains TEXT
        #[arg(long)]
        search: Option<String>,
        /// Maximum number of rows
        #[arg(long, default_value = "50")]
        limit: usize,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Set one configuration value
    #[command(after_help = "Keys: server, port, schema, username, cache_dir, timeout_seconds

Examples:
  cli3 config set server reports.example
  cli3 config set port 8080
  cli3 config set username alice")]
    Set {
        /// Configuration key
        key: String,
        /// New value
        value: String,
    },
}
