//! Output formatting for CLI commands.

use serde::Serialize;

use crate::cli::args::{OutputFormat, SearchcoreArgs};
use crate::error::Result;
use crate::index::IndexStats;
use crate::search::SearchResponse;

/// Human-readable rendering of a command result.
pub trait HumanOutput {
    fn print_human(&self, args: &SearchcoreArgs);
}

/// Result structure for search operations.
#[derive(Debug, Serialize)]
pub struct SearchOutput {
    #[serde(flatten)]
    pub response: SearchResponse,
    pub duration_ms: u64,
    /// Report text, present when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_text: Option<String>,
}

impl SearchOutput {
    pub fn new(response: SearchResponse, include_report: bool) -> Self {
        let report_text = include_report.then(|| response.report_text().to_string());
        SearchOutput {
            duration_ms: response.elapsed.as_millis() as u64,
            response,
            report_text,
        }
    }
}

impl HumanOutput for SearchOutput {
    fn print_human(&self, _args: &SearchcoreArgs) {
        let response = &self.response;
        println!("Search Results:");
        println!("═══════════════");

        for (i, hit) in response.hits.iter().enumerate() {
            println!();
            println!(
                "Result {}: {} ({})",
                response.start_index + i + 1,
                hit.key,
                hit.sort_key
            );
            println!("─────────────");
            if !hit.title.is_empty() {
                println!("title: {}", hit.title);
            }
            println!("index: {}", hit.index_name);
            println!("rank: {}", hit.rank);
            if let Some(date) = hit.date {
                println!("date: {date}");
            }
            if let Some(language) = &hit.language {
                println!("language: {language}");
            }
        }

        println!();
        if response.estimated {
            println!("Total results: ~{} (estimated)", response.total_results);
        } else {
            println!("Total results: {}", response.total_results);
        }
        println!("Sort: {}", response.sort_type.name());
        println!("Search time: {}ms", self.duration_ms);

        if let Some(report) = self.report_text.as_deref().filter(|r| !r.is_empty()) {
            println!();
            println!("Report:");
            println!("───────");
            print!("{report}");
        }
    }
}

/// One resolved term of an inspection.
#[derive(Debug, Serialize)]
pub struct TermSummary {
    pub term: String,
    pub term_type: String,
    pub documents: u32,
    pub postings: u32,
}

/// Index statistics and term resolutions.
#[derive(Debug, Serialize)]
pub struct IndexSummary {
    pub name: String,
    pub stats: IndexStats,
    pub average_term_count: f32,
    pub language: Option<String>,
    pub stemmer: Option<String>,
    pub stop_list: Option<String>,
    pub default_unfielded_fields: Vec<String>,
    pub terms: Vec<TermSummary>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub report: String,
}

impl HumanOutput for IndexSummary {
    fn print_human(&self, _args: &SearchcoreArgs) {
        println!("Index Statistics:");
        println!("════════════════");
        println!("Name: {}", self.name);
        println!("Total documents: {}", self.stats.document_count);
        println!("Total terms: {}", self.stats.total_term_count);
        println!("Unique terms: {}", self.stats.unique_term_count);
        println!("Average document length: {:.2}", self.average_term_count);
        if let Some(language) = &self.language {
            println!("Language: {language}");
        }
        if let Some(stemmer) = &self.stemmer {
            println!("Stemmer: {stemmer}");
        }
        if let Some(stop_list) = &self.stop_list {
            println!("Stop list: {stop_list}");
        }
        if !self.default_unfielded_fields.is_empty() {
            println!("Unfielded fields: {}", self.default_unfielded_fields.join(", "));
        }

        if !self.terms.is_empty() {
            println!();
            println!("Terms:");
            println!("──────");
            for term in &self.terms {
                println!(
                    "  {} [{}]: {} documents, {} postings",
                    term.term, term.term_type, term.documents, term.postings
                );
            }
        }
        if !self.report.is_empty() {
            println!();
            print!("{}", self.report);
        }
    }
}

/// Output a result in the specified format.
pub fn output_result<T>(message: &str, result: &T, args: &SearchcoreArgs) -> Result<()>
where
    T: Serialize + HumanOutput,
{
    match args.output_format {
        OutputFormat::Human => {
            if args.verbosity() > 1 {
                println!("{message}");
                println!();
            }
            result.print_human(args);
            Ok(())
        }
        OutputFormat::Json => output_json(result, args),
    }
}

fn output_json<T: Serialize>(result: &T, args: &SearchcoreArgs) -> Result<()> {
    let json = if args.pretty {
        serde_json::to_string_pretty(result)?
    } else {
        serde_json::to_string(result)?
    };

    println!("{json}");
    Ok(())
}
