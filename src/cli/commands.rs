//! Command implementations for the searchcore CLI.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use unicode_segmentation::UnicodeSegmentation;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::index::{
    DeclaredSortOrder, IndexInfo, MemoryCatalog, MemberSpec, MemoryIndex, VirtualIndexSpec,
};
use crate::postings::{DocIdBounds, Operator};
use crate::query::{ParsedQuery, SortField, SortSpec, Term, TermClusterNode};
use crate::search::{ResolveOptions, SearchContext, SearchRequest, Searcher, TermResolver};

/// Execute a CLI command.
pub fn execute_command(args: SearchcoreArgs) -> Result<()> {
    match &args.command {
        Command::Search(search_args) => search(search_args, &args),
        Command::InspectIndex(inspect_args) => inspect_index(inspect_args, &args),
    }
}

fn search(args: &SearchArgs, cli_args: &SearchcoreArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SearchConfig::from_json_file(path)?,
        None => SearchConfig::default(),
    };
    if args.parallel {
        config = config.with_parallel_federation(true);
    }

    let query = build_query(args)?;
    let spec = open_indices(args, &query)?;
    info!(
        "searching '{}' ({} indices) for '{}'",
        spec.name(),
        spec.len(),
        query.normalized_text
    );

    let mut request = SearchRequest::new(query)
        .with_language(args.language.clone())
        .with_window(args.start, args.end);
    request.positive_feedback = args.like.clone();
    request.negative_feedback = args.unlike.clone();

    let searcher = Searcher::new(config)?;
    let response = searcher.search(&spec, &request)?;

    output_result(
        "Search completed",
        &SearchOutput::new(response, args.report),
        cli_args,
    )
}

/// Read the query file, or build a query from plain words.
fn build_query(args: &SearchArgs) -> Result<ParsedQuery> {
    let mut query = match (&args.query_file, &args.text) {
        (Some(path), _) => load_query(path)?,
        (None, Some(text)) => word_query(text, args.operator.into()),
        (None, None) => ParsedQuery::default(),
    };

    if let Some(field) = &args.sort {
        let field = SortField::from_name(field);
        query.sort = match args.order {
            Some(order) => SortSpec::new(field, order.into()),
            None => SortSpec { field, order: None },
        };
    } else if let Some(order) = args.order {
        query.sort.order = Some(order.into());
    }
    query.modifiers.early_completion |= args.early_completion;
    query.modifiers.return_report |= args.report;
    Ok(query)
}

fn load_query(path: &Path) -> Result<ParsedQuery> {
    debug!("loading query from {}", path.display());
    let text = fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| {
        SearchError::query(format!("invalid query file '{}': {e}", path.display()))
    })
}

fn word_query(text: &str, operator: Operator) -> ParsedQuery {
    let words: Vec<&str> = text.unicode_words().collect();
    let tree = match words.as_slice() {
        [] => return ParsedQuery::default(),
        [word] => TermClusterNode::Term(Term::new(*word)),
        _ => TermClusterNode::cluster(operator, words.iter().map(|w| Term::new(*w))),
    };
    let separator = format!(" {} ", format!("{operator:?}").to_uppercase());
    ParsedQuery::from_tree(tree, words.join(&separator))
}

/// Load every index file; more than one file forms a virtual index.
fn open_indices(args: &SearchArgs, query: &ParsedQuery) -> Result<VirtualIndexSpec> {
    if let [path] = args.index_files.as_slice() {
        let index = MemoryIndex::from_json_file(path)?;
        return Ok(VirtualIndexSpec::physical(Arc::new(index)));
    }

    let declared = args
        .declared_order
        .map(|order| DeclaredSortOrder::new(query.sort.field.name(), order.into()));

    let mut catalog = MemoryCatalog::new();
    let mut members = Vec::with_capacity(args.index_files.len());
    for path in &args.index_files {
        let name = match MemoryIndex::from_json_file(path) {
            Ok(index) => catalog.insert(index).name().to_string(),
            // the catalog reports the failure when the member is opened
            Err(e) if args.ignore_open_errors => {
                debug!("failed to load {}: {e}", path.display());
                path.display().to_string()
            }
            Err(e) => return Err(e),
        };
        let member = MemberSpec::new(name);
        members.push(match &declared {
            Some(declared) => member.with_declared_sort(declared.clone()),
            None => member,
        });
    }

    VirtualIndexSpec::open(args.name.clone(), &members, &catalog, args.ignore_open_errors)
}

fn inspect_index(args: &InspectIndexArgs, cli_args: &SearchcoreArgs) -> Result<()> {
    let index = MemoryIndex::from_json_file(&args.index_file)?;
    let config = SearchConfig::default();
    let mut ctx = SearchContext::new(&config, None, "");
    let resolver = TermResolver::new(&index, ResolveOptions::default());

    let mut terms = Vec::with_capacity(args.terms.len());
    for text in &args.terms {
        let postings = resolver.resolve(&mut ctx, &Term::new(text.as_str()), DocIdBounds::UNBOUNDED)?;
        terms.push(TermSummary {
            term: text.clone(),
            term_type: format!("{:?}", postings.term_type).to_lowercase(),
            documents: postings.document_count,
            postings: postings.term_count,
        });
    }

    let stats = index.stats();
    let summary = IndexSummary {
        name: index.name().to_string(),
        stats,
        average_term_count: stats.average_term_count(),
        language: index.language().map(str::to_string),
        stemmer: index.stemmer_name().map(str::to_string),
        stop_list: index.stop_list_name().map(str::to_string),
        default_unfielded_fields: index.default_unfielded_fields(),
        terms,
        report: ctx.report.into_string(),
    };
    output_result("Index inspected", &summary, cli_args)
}
