use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "fastlite")]
#[command(author, version, about = "SQLite data access with pooled connections")]
pub struct Cli {
    /// Path to pool config file (JSON)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Time the fast query path against the command facade
    Bench {
        /// Connection string, e.g. "Data Source=app.db"
        #[arg(short, long, default_value = "Data Source=:memory:")]
        data_source: String,

        /// Executions per path
        #[arg(short = 'n', long, default_value = "100000")]
        count: u32,
    },

    /// Run SQL on a pooled connection and print the results
    Exec {
        /// Connection string, e.g. "Data Source=app.db"
        #[arg(short, long, default_value = "Data Source=:memory:")]
        data_source: String,

        /// SQL text; may hold several statements
        #[arg(required = true)]
        sql: String,
    },

    /// Show the effective pragma settings of a pooled connection
    Pragmas {
        /// Connection string, e.g. "Data Source=app.db"
        #[arg(short, long, default_value = "Data Source=:memory:")]
        data_source: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a pool config file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
