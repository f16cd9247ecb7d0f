//! Command line argument parsing for the searchcore CLI using clap.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::postings::Operator;
use crate::query::SortOrder;

/// searchcore - query evaluation over federated full-text indices
#[derive(Parser, Debug, Clone)]
#[command(name = "searchcore")]
#[command(about = "Evaluate queries against one or more full-text indices")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct SearchcoreArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl SearchcoreArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1,
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Search one index, or several as a virtual index
    Search(SearchArgs),

    /// Show index statistics and resolve terms
    #[command(name = "inspect-index")]
    InspectIndex(InspectIndexArgs),
}

/// Arguments for searching
#[derive(Parser, Debug, Clone)]
pub struct SearchArgs {
    /// Index files (JSON). More than one forms a virtual index, searched in
    /// the order given.
    #[arg(value_name = "INDEX_FILE", required = true, num_args = 1..)]
    pub index_files: Vec<PathBuf>,

    /// Parsed query file (JSON)
    #[arg(long, value_name = "QUERY_FILE", conflicts_with = "text")]
    pub query_file: Option<PathBuf>,

    /// Plain query words, combined with --operator
    #[arg(short, long)]
    pub text: Option<String>,

    /// Operator joining the words of --text
    #[arg(long, default_value = "and")]
    pub operator: WordOperator,

    /// Name of the virtual index
    #[arg(long, default_value = "virtual")]
    pub name: String,

    /// Sort field (relevance, rank, date, none or an item field)
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Sort order
    #[arg(long)]
    pub order: Option<OrderArg>,

    /// Sort order every index declares for the --sort field
    #[arg(long)]
    pub declared_order: Option<OrderArg>,

    /// Allow the search to stop before every index is searched
    #[arg(long)]
    pub early_completion: bool,

    /// Positive feedback text
    #[arg(long)]
    pub like: Option<String>,

    /// Negative feedback text
    #[arg(long)]
    pub unlike: Option<String>,

    /// Query language
    #[arg(long, default_value = "")]
    pub language: String,

    /// First result to return, 0-based
    #[arg(long, default_value = "0")]
    pub start: usize,

    /// Last result to return, inclusive
    #[arg(long, default_value = "9")]
    pub end: usize,

    /// Search configuration file (JSON)
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Search member indices in parallel
    #[arg(long)]
    pub parallel: bool,

    /// Skip indices that fail to open
    #[arg(long)]
    pub ignore_open_errors: bool,

    /// Print the search report
    #[arg(long)]
    pub report: bool,
}

/// Arguments for index inspection
#[derive(Parser, Debug, Clone)]
pub struct InspectIndexArgs {
    /// Index file (JSON)
    #[arg(value_name = "INDEX_FILE")]
    pub index_file: PathBuf,

    /// Terms to resolve against the index
    #[arg(short, long, value_delimiter = ',')]
    pub terms: Vec<String>,
}

/// Operators available for plain query words
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordOperator {
    And,
    Or,
    Adj,
    Near,
}

impl From<WordOperator> for Operator {
    fn from(op: WordOperator) -> Self {
        match op {
            WordOperator::And => Operator::And,
            WordOperator::Or => Operator::Or,
            WordOperator::Adj => Operator::Adj,
            WordOperator::Near => Operator::Near,
        }
    }
}

/// Sort orders
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderArg {
    Asc,
    Desc,
}

impl From<OrderArg> for SortOrder {
    fn from(order: OrderArg) -> Self {
        match order {
            OrderArg::Asc => SortOrder::Ascending,
            OrderArg::Desc => SortOrder::Descending,
        }
    }
}

/// Output formats
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
