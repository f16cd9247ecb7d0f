//! End-to-end searches over in-memory indices.

use std::sync::Arc;

use chrono::NaiveDate;
use searchcore::index::{IndexOpener, MemberSpec, MemoryCatalog};
use searchcore::prelude::*;
use searchcore::query::{FilterGroup, FilterPredicate, QueryModifiers};
use tempfile::TempDir;

fn library() -> Result<MemoryIndex> {
    let day = |d| {
        NaiveDate::from_ymd_opt(2023, 6, d)
            .and_then(|date| date.and_hms_opt(12, 0, 0))
            .ok_or_else(|| SearchError::other("bad date"))
    };
    MemoryIndexBuilder::new("library")
        .stop_words(["of", "the"])
        .documents([
            MemoryDocument::new("cards")
                .with_title("House of Cards")
                .with_field("body", "the house of cards fell down")
                .with_rank(5)
                .with_date(day(1)?),
            MemoryDocument::new("house")
                .with_title("A House")
                .with_field("body", "a small house by the river")
                .with_rank(2)
                .with_date(day(2)?),
            MemoryDocument::new("river")
                .with_title("River Walk")
                .with_field("body", "walking along the river with cards")
                .with_rank(9)
                .with_date(day(3)?),
        ])
        .build()
}

fn phrase(words: &[&str]) -> TermClusterNode {
    TermClusterNode::cluster(Operator::Adj, words.iter().map(|w| Term::new(*w)))
}

#[test]
fn test_phrase_with_stop_word() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let searcher = Searcher::new(SearchConfig::default())?;

    let query = ParsedQuery::from_tree(phrase(&["house", "of", "cards"]), "\"house of cards\"");
    let response = searcher.search(&spec, &SearchRequest::new(query))?;

    assert_eq!(response.total_results, 1);
    assert_eq!(response.hits[0].key, "cards");
    assert_eq!(response.hits[0].title, "House of Cards");
    Ok(())
}

#[test]
fn test_strict_and_relaxed_modes() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let tree = TermClusterNode::cluster(Operator::And, [Term::new("house"), Term::new("zebra")]);

    let strict = Searcher::new(SearchConfig::default())?;
    let mut query = ParsedQuery::from_tree(tree.clone(), "house AND zebra");
    query.modifiers.return_report = true;
    let response = strict.search(&spec, &SearchRequest::new(query.clone()))?;
    assert_eq!(response.total_results, 0);
    assert!(response.report.as_deref().unwrap_or_default().contains("zebra"));

    let relaxed = Searcher::new(SearchConfig::default().with_operation_mode(OperationMode::Relaxed))?;
    let response = relaxed.search(&spec, &SearchRequest::new(query))?;
    assert_eq!(response.total_results, 2);
    Ok(())
}

#[test]
fn test_relaxed_chain_without_overlap_is_empty() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let relaxed = Searcher::new(SearchConfig::default().with_operation_mode(OperationMode::Relaxed))?;

    let tree = TermClusterNode::cluster(
        Operator::And,
        [Term::new("fell"), Term::new("small"), Term::new("zebra")],
    );
    let query = ParsedQuery::from_tree(tree, "fell AND small AND zebra");
    let response = relaxed.search(&spec, &SearchRequest::new(query))?;
    assert_eq!(response.total_results, 0);

    let tree = TermClusterNode::cluster(
        Operator::And,
        [Term::new("fell"), Term::new("zebra"), Term::new("cards")],
    );
    let query = ParsedQuery::from_tree(tree, "fell AND zebra AND cards");
    let response = relaxed.search(&spec, &SearchRequest::new(query))?;
    assert_eq!(response.hits.len(), 1);
    assert_eq!(response.hits[0].key, "cards");
    Ok(())
}

#[test]
fn test_rank_sort_and_pagination() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let searcher = Searcher::new(SearchConfig::default())?;
    let tree = TermClusterNode::cluster(Operator::Or, [Term::new("house"), Term::new("river")]);
    let query = ParsedQuery::from_tree(tree, "house OR river")
        .with_sort(SortSpec::new(SortField::Rank, SortOrder::Descending));

    let page = |start, end| -> Result<Vec<String>> {
        let request = SearchRequest::new(query.clone()).with_window(start, end);
        Ok(searcher
            .search(&spec, &request)?
            .hits
            .into_iter()
            .map(|h| h.key)
            .collect())
    };

    assert_eq!(page(0, 9)?, vec!["river", "cards", "house"]);
    assert_eq!(page(1, 1)?, vec!["cards"]);
    assert!(page(5, 9)?.is_empty());
    Ok(())
}

#[test]
fn test_feedback_reorders_without_removing() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let searcher = Searcher::new(SearchConfig::default())?;
    let query = ParsedQuery::from_tree(Term::new("cards").into(), "cards");

    let request = SearchRequest::new(query.clone()).with_negative_feedback("house fell down");
    let response = searcher.search(&spec, &request)?;
    let keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(keys, vec!["river", "cards"]);
    assert!(response.hits.iter().all(|h| h.sort_key.compare(&SortKey::Float(0.0)).is_gt()));

    let request = SearchRequest::new(query).with_positive_feedback("house fell down");
    let response = searcher.search(&spec, &request)?;
    assert_eq!(response.hits[0].key, "cards");
    Ok(())
}

#[test]
fn test_feedback_only_query() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let searcher = Searcher::new(SearchConfig::default())?;
    let request = SearchRequest::new(ParsedQuery::default()).with_positive_feedback("river");
    let response = searcher.search(&spec, &request)?;
    assert_eq!(response.total_results, 2);
    Ok(())
}

#[test]
fn test_inclusion_and_exclusion_filters() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let searcher = Searcher::new(SearchConfig::default())?;
    let tree = TermClusterNode::cluster(Operator::Or, [Term::new("house"), Term::new("cards")]);
    let mut query = ParsedQuery::from_tree(tree, "house OR cards");
    query.inclusion_filters = vec![FilterGroup(vec![FilterPredicate::Query(
        Term::new("river").into(),
    )])];
    query.exclusion_filters = vec![FilterPredicate::DocumentKeys(vec!["river".into()])];

    let response = searcher.search(&spec, &SearchRequest::new(query))?;
    let keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
    assert_eq!(keys, vec!["house"]);
    Ok(())
}

#[test]
fn test_virtual_index_from_catalog() -> Result<()> {
    let mut catalog = MemoryCatalog::new();
    catalog.insert(library()?);
    catalog.insert(
        MemoryIndexBuilder::new("annex")
            .document(MemoryDocument::new("cards").with_field("body", "a deck of cards"))
            .build()?,
    );
    assert!(catalog.open("missing").is_err());

    let members = [
        MemberSpec::new("library"),
        MemberSpec::new("missing"),
        MemberSpec::new("annex"),
    ];
    assert!(VirtualIndexSpec::open("shelf", &members, &catalog, false).is_err());

    let spec = VirtualIndexSpec::open("shelf", &members, &catalog, true)?;
    assert_eq!(spec.len(), 2);

    let mut query = ParsedQuery::from_tree(Term::new("cards").into(), "cards");
    query.modifiers = QueryModifiers {
        return_report: true,
        ..Default::default()
    };
    let response = Searcher::new(SearchConfig::default())?.search(&spec, &SearchRequest::new(query))?;

    assert_eq!(response.total_results, 3);
    let mut keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["annex/cards", "library/cards", "library/river"]);
    assert!(response.report.unwrap_or_default().contains("missing"));
    Ok(())
}

#[test]
fn test_shared_cache_across_searchers() -> Result<()> {
    let spec = VirtualIndexSpec::physical(Arc::new(library()?));
    let first = Searcher::new(SearchConfig::default())?;
    let cache = first.cache().cloned();
    let second = Searcher::new(SearchConfig::default())?.with_cache(cache);

    let query = ParsedQuery::from_tree(Term::new("river").into(), "river");
    let a = first.search(&spec, &SearchRequest::new(query.clone()))?;
    let b = second.search(&spec, &SearchRequest::new(query))?;

    assert_eq!(a.hits, b.hits);
    let stats = first.cache().map(|c| c.stats()).unwrap_or_default();
    assert_eq!(stats.query_hits, 1);
    assert_eq!(stats.query_misses, 1);
    Ok(())
}

#[test]
fn test_index_from_json_file() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("index.json");
    std::fs::write(
        &path,
        r#"{
            "name": "notes",
            "documents": [
                {"key": "n1", "fields": {"body": "remember the milk"}},
                {"key": "n2", "fields": {"body": "remember the eggs"}}
            ]
        }"#,
    )?;

    let spec = VirtualIndexSpec::physical(Arc::new(MemoryIndex::from_json_file(&path)?));
    let query = ParsedQuery::from_tree(Term::new("remember").into(), "remember");
    let response = Searcher::new(SearchConfig::default())?.search(&spec, &SearchRequest::new(query))?;
    assert_eq!(response.total_results, 2);
    assert_eq!(response.hits[0].index_name, "notes");
    Ok(())
}
