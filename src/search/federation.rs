//! Federation controller: searches the members of a virtual index and
//! assembles one response.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::cache::{CachedQuery, QueryCacheKey, SearchCache};
use crate::config::SearchConfig;
use crate::error::{Result, SearchError};
use crate::index::{ItemType, MetadataSelector, SearchIndex, VirtualIndexSpec};
use crate::postings::DocIdBounds;
use crate::query::{ParsedQuery, SortField, SortOrder, SortSpec};
use crate::report::SearchReport;
use crate::search::evaluator::QueryEvaluator;
use crate::search::feedback::feedback_weights;
use crate::search::filter::build_filters;
use crate::search::ranker::{assemble, sort_results, splice, RankInput, RankedResults, ShortResult};
use crate::search::resolver::{ResolveOptions, TermResolver};
use crate::search::response::{DocumentHit, SearchResponse};
use crate::search::sort_key::{ResolvedSort, SortKey, SortType};
use crate::search::SearchContext;

/// One search request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchRequest {
    /// Language of the query text; empty for the index default.
    pub language: String,
    pub query: ParsedQuery,
    pub positive_feedback: Option<String>,
    pub negative_feedback: Option<String>,
    /// First result of the window, 0-based.
    pub start_index: usize,
    /// Last result of the window, inclusive.
    pub end_index: usize,
}

impl SearchRequest {
    /// Request for the first ten results of `query`.
    pub fn new(query: ParsedQuery) -> Self {
        SearchRequest {
            query,
            end_index: 9,
            ..Default::default()
        }
    }

    pub fn with_language<S: Into<String>>(mut self, language: S) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_window(mut self, start_index: usize, end_index: usize) -> Self {
        self.start_index = start_index;
        self.end_index = end_index;
        self
    }

    pub fn with_positive_feedback<S: Into<String>>(mut self, text: S) -> Self {
        self.positive_feedback = Some(text.into());
        self
    }

    pub fn with_negative_feedback<S: Into<String>>(mut self, text: S) -> Self {
        self.negative_feedback = Some(text.into());
        self
    }

    pub fn has_feedback(&self) -> bool {
        let present = |text: &Option<String>| text.as_deref().is_some_and(|t| !t.trim().is_empty());
        present(&self.positive_feedback) || present(&self.negative_feedback)
    }

    /// No terms, no feedback, no restrictions and no filters.
    pub fn is_empty(&self) -> bool {
        self.query.tree.is_none()
            && !self.has_feedback()
            && self.query.restrictions.is_empty()
            && !self.query.has_filters()
    }
}

/// Merged results of all searched members.
#[derive(Debug)]
struct Federated {
    results: Vec<ShortResult>,
    total_results: usize,
    max_sort_key: Option<SortKey>,
    estimated: bool,
}

/// Executes search requests against virtual indices.
#[derive(Debug)]
pub struct Searcher {
    config: SearchConfig,
    cache: Option<Arc<SearchCache>>,
    pool: Option<ThreadPool>,
}

impl Searcher {
    /// Create a searcher. A cache is created when either cache capacity is
    /// non-zero; a worker pool when parallel federation is enabled.
    pub fn new(config: SearchConfig) -> Result<Self> {
        config.validate()?;

        let cache = (config.term_cache_capacity > 0 || config.query_cache_capacity > 0)
            .then(|| Arc::new(SearchCache::from_config(&config)));

        let pool = if config.parallel_federation {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.effective_thread_pool_size())
                .thread_name(|i| format!("searchcore-federation-{i}"))
                .build()
                .map_err(|e| SearchError::internal(format!("Failed to create thread pool: {e}")))?;
            Some(pool)
        } else {
            None
        };

        Ok(Searcher {
            config,
            cache,
            pool,
        })
    }

    /// Replace the cache, e.g. to share one across searchers.
    pub fn with_cache(mut self, cache: Option<Arc<SearchCache>>) -> Self {
        self.cache = cache;
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn cache(&self) -> Option<&Arc<SearchCache>> {
        self.cache.as_ref()
    }

    /// Search `spec` and return the requested window.
    pub fn search(&self, spec: &VirtualIndexSpec, request: &SearchRequest) -> Result<SearchResponse> {
        let started = Instant::now();
        let query = &request.query;
        let attach_report = query.modifiers.return_report;

        let mut report = SearchReport::new();
        for warning in spec.warnings() {
            report.append(warning);
        }

        if request.is_empty() {
            report.append("Empty query: no terms, feedback or restrictions");
            let mut response = SearchResponse::new(
                Vec::new(),
                0,
                request.start_index,
                request.end_index,
                SortType::NoSort,
            );
            response.elapsed = started.elapsed();
            return Ok(response.with_report(report.into_string(), attach_report));
        }

        if query.modifiers.debug {
            if let Some(full) = &query.full_normalized_text {
                report.append(format!("Full normalized query: {full}"));
            }
        }

        let sort = resolve_sort(spec, &query.sort, &mut report);
        let key = QueryCacheKey {
            index: spec.name().to_string(),
            language: request.language.clone(),
            normalized_text: query.normalized_text.clone(),
            positive_feedback: request.positive_feedback.clone(),
            negative_feedback: request.negative_feedback.clone(),
            sort_type: sort.sort_type,
        };

        let federated = match self.cache.as_ref().and_then(|cache| cache.get_query(&key)) {
            Some(hit) => {
                debug!("query cache hit for '{}' on '{}'", query.normalized_text, spec.name());
                report.replay(&hit.fragment);
                Federated {
                    results: hit.results,
                    total_results: hit.total_results,
                    max_sort_key: hit.max_sort_key,
                    estimated: false,
                }
            }
            None => {
                let start = report.offset();
                let federated = self.federate(spec, request, &sort, &mut report, started)?;
                // estimated results only cover the window they were gathered for
                if let (Some(cache), false) = (&self.cache, federated.estimated) {
                    cache.put_query(
                        key,
                        CachedQuery {
                            results: federated.results.clone(),
                            total_results: federated.total_results,
                            max_sort_key: federated.max_sort_key.clone(),
                            fragment: report.fragment_since(start),
                        },
                    );
                }
                federated
            }
        };

        let Federated {
            mut results,
            total_results,
            max_sort_key,
            estimated,
        } = federated;
        if query.modifiers.suppress_results {
            results.clear();
        }
        let window = splice(results, request.start_index, request.end_index);
        let hits = hydrate(spec, window)?;

        info!(
            "searched '{}': {} results{}, {} returned in {:?}",
            spec.name(),
            total_results,
            if estimated { " (estimated)" } else { "" },
            hits.len(),
            started.elapsed()
        );

        let mut response = SearchResponse::new(
            hits,
            total_results,
            request.start_index,
            request.end_index,
            sort.sort_type,
        );
        response.estimated = estimated;
        response.max_sort_key = max_sort_key;
        response.elapsed = started.elapsed();
        Ok(response.with_report(report.into_string(), attach_report))
    }

    fn federate(
        &self,
        spec: &VirtualIndexSpec,
        request: &SearchRequest,
        sort: &ResolvedSort,
        report: &mut SearchReport,
        started: Instant,
    ) -> Result<Federated> {
        let walk = self.early_completion(spec, &request.query, sort, report);
        let order: Vec<usize> = match walk {
            Some(true) => (0..spec.len()).rev().collect(),
            _ => (0..spec.len()).collect(),
        };

        let mut federated = Federated {
            results: Vec::new(),
            total_results: 0,
            max_sort_key: None,
            estimated: false,
        };

        let mut failure = None;
        let mut succeeded = 0usize;
        match &self.pool {
            Some(pool) if order.len() > 1 => {
                self.check_timeout(started)?;
                for (member, (outcome, member_report)) in
                    self.search_parallel(pool, spec, &order, request, sort)
                {
                    report.absorb(member_report);
                    if let Some(ranked) = member_outcome(spec, member, outcome, report, &mut failure)? {
                        absorb(&mut federated, ranked);
                        succeeded += 1;
                    }
                }
            }
            _ => {
                let mut searched_documents = 0u64;
                for (step, &member) in order.iter().enumerate() {
                    self.check_timeout(started)?;
                    let (outcome, member_report) = self.search_member(spec, member, request, sort);
                    report.absorb(member_report);
                    let Some(ranked) = member_outcome(spec, member, outcome, report, &mut failure)?
                    else {
                        continue;
                    };
                    absorb(&mut federated, ranked);
                    succeeded += 1;
                    searched_documents += spec.members()[member].index.stats().document_count as u64;

                    let remaining = order.len() - step - 1;
                    if walk.is_some() && federated.total_results > request.end_index && remaining > 0 {
                        let all_documents: u64 = spec
                            .members()
                            .iter()
                            .map(|m| m.index.stats().document_count as u64)
                            .sum();
                        let estimate =
                            estimate_total(federated.total_results, searched_documents, all_documents);
                        let message = format!(
                            "Early completion after {} of {} indices: searched {searched_documents} of {all_documents} documents, {} results extrapolated to {estimate}",
                            step + 1,
                            order.len(),
                            federated.total_results
                        );
                        warn!("{message}");
                        report.append(message);
                        federated.total_results = estimate;
                        federated.estimated = true;
                        break;
                    }
                }
            }
        }

        if let (0, Some(e)) = (succeeded, failure) {
            return Err(e);
        }
        sort_results(&mut federated.results, sort.sort_type);
        Ok(federated)
    }

    /// Search members on the worker pool. Outcomes come back in member order.
    fn search_parallel(
        &self,
        pool: &ThreadPool,
        spec: &VirtualIndexSpec,
        order: &[usize],
        request: &SearchRequest,
        sort: &ResolvedSort,
    ) -> Vec<(usize, (Result<RankedResults>, SearchReport))> {
        let (tx, rx) = crossbeam_channel::unbounded();
        pool.scope(|scope| {
            for &member in order {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = self.search_member(spec, member, request, sort);
                    let _ = tx.send((member, outcome));
                });
            }
        });
        drop(tx);

        let mut outcomes: Vec<_> = rx.iter().collect();
        outcomes.sort_by_key(|(member, _)| *member);
        outcomes
    }

    fn search_member(
        &self,
        spec: &VirtualIndexSpec,
        member: usize,
        request: &SearchRequest,
        sort: &ResolvedSort,
    ) -> (Result<RankedResults>, SearchReport) {
        let index = spec.members()[member].index.as_ref();
        let mut ctx = SearchContext::new(&self.config, self.cache.as_deref(), &request.language);
        if spec.is_virtual() {
            ctx.report.set_index(index.name());
        }
        let outcome = self.rank_member(&mut ctx, index, member, request, sort);
        (outcome, ctx.report)
    }

    fn rank_member(
        &self,
        ctx: &mut SearchContext<'_>,
        index: &dyn SearchIndex,
        member: usize,
        request: &SearchRequest,
        sort: &ResolvedSort,
    ) -> Result<RankedResults> {
        let query = &request.query;
        let resolver = TermResolver::new(index, ResolveOptions::from_query(query, &self.config));
        let evaluator = QueryEvaluator::new(&resolver);

        let postings = match &query.tree {
            Some(tree) => Some(evaluator.evaluate(ctx, tree, DocIdBounds::UNBOUNDED)?),
            None => None,
        };
        let weights = if request.has_feedback() {
            feedback_weights(
                &evaluator,
                ctx,
                request.positive_feedback.as_deref(),
                request.negative_feedback.as_deref(),
            )?
        } else {
            None
        };
        let filters = build_filters(&evaluator, ctx, query)?;

        let ranked = assemble(
            index,
            member,
            RankInput {
                postings,
                weights,
                document_table: query.is_restriction_only() && !request.has_feedback(),
                filters,
                restrictions: &query.restrictions,
                sort,
                normalization: self.config.weight_normalization,
            },
        )?;
        debug!("{} results in '{}'", ranked.total_results, index.name());
        Ok(ranked)
    }

    /// Walk direction if early completion applies: `Some(true)` walks the
    /// members in reverse.
    ///
    /// Every member must declare the requested field with one common order;
    /// the walk is reversed when that order is opposite to the requested one.
    fn early_completion(
        &self,
        spec: &VirtualIndexSpec,
        query: &ParsedQuery,
        sort: &ResolvedSort,
        report: &mut SearchReport,
    ) -> Option<bool> {
        if spec.len() < 2 || !query.modifiers.early_completion {
            return None;
        }
        if self.pool.is_some() {
            report.append("Early completion is not available with parallel federation");
            return None;
        }
        if sort.sort_type == SortType::NoSort {
            return Some(false);
        }

        let mut declared_order: Option<SortOrder> = None;
        for member in spec.members() {
            let declared = member
                .declared_sort
                .as_ref()
                .filter(|declared| declared.field == sort.field.name())?;
            match declared_order {
                None => declared_order = Some(declared.order),
                Some(order) if order != declared.order => {
                    report.append(format!(
                        "Indices declare conflicting '{}' sort orders, early completion disabled",
                        declared.field
                    ));
                    return None;
                }
                Some(_) => {}
            }
        }
        declared_order.map(|order| order != sort.order)
    }

    fn check_timeout(&self, started: Instant) -> Result<()> {
        match self.config.search_timeout {
            Some(timeout) if started.elapsed() >= timeout => Err(SearchError::timeout(format!(
                "search exceeded {timeout:?}"
            ))),
            _ => Ok(()),
        }
    }
}

/// A failed member of a multi-member virtual index is reported and skipped.
/// Timeouts and single-index failures end the request.
fn member_outcome(
    spec: &VirtualIndexSpec,
    member: usize,
    outcome: Result<RankedResults>,
    report: &mut SearchReport,
    failure: &mut Option<SearchError>,
) -> Result<Option<RankedResults>> {
    match outcome {
        Ok(ranked) => Ok(Some(ranked)),
        Err(e) if spec.len() > 1 && !matches!(e, SearchError::Timeout(_)) => {
            let message = format!(
                "Search of index '{}' failed, skipping it: {e}",
                spec.members()[member].index.name()
            );
            warn!("{message}");
            report.append(message);
            *failure = Some(e);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

fn absorb(federated: &mut Federated, ranked: RankedResults) {
    federated.total_results += ranked.total_results;
    if let Some(key) = &ranked.max_sort_key {
        federated.max_sort_key = SortKey::max_of(federated.max_sort_key.take(), key);
    }
    federated.results.extend(ranked.results);
}

/// `partial × all / searched`, rounded.
pub fn estimate_total(partial: usize, searched_documents: u64, all_documents: u64) -> usize {
    if searched_documents == 0 {
        return partial;
    }
    (partial as f64 * all_documents as f64 / searched_documents as f64).round() as usize
}

/// Sort type for the whole federated query. A missing or inconsistent item
/// field falls back to descending relevance.
fn resolve_sort(spec: &VirtualIndexSpec, sort: &SortSpec, report: &mut SearchReport) -> ResolvedSort {
    let order = sort.effective_order();
    let pick = |ascending: SortType, descending: SortType| match order {
        SortOrder::Ascending => ascending,
        SortOrder::Descending => descending,
    };

    let sort_type = match &sort.field {
        SortField::Default | SortField::Relevance => pick(SortType::FloatAsc, SortType::FloatDesc),
        SortField::Rank => pick(SortType::UIntAsc, SortType::UIntDesc),
        SortField::Date => pick(SortType::ULongAsc, SortType::ULongDesc),
        SortField::NoSort => return ResolvedSort::no_sort(),
        SortField::Item(name) => {
            let types: Vec<Option<ItemType>> =
                spec.members().iter().map(|m| m.index.item_type(name)).collect();
            match types.first().copied().flatten() {
                Some(item_type) if types.iter().all(|t| *t == Some(item_type)) => match item_type {
                    ItemType::Number => pick(SortType::DoubleAsc, SortType::DoubleDesc),
                    ItemType::Text => pick(SortType::TextAsc, SortType::TextDesc),
                },
                _ => {
                    let message = format!(
                        "Sort field '{name}' is missing or inconsistent across indices, sorting by relevance"
                    );
                    warn!("{message}");
                    report.append(message);
                    return ResolvedSort::relevance();
                }
            }
        }
    };

    ResolvedSort {
        field: sort.field.clone(),
        order,
        sort_type,
    }
}

fn hydrate(spec: &VirtualIndexSpec, window: Vec<ShortResult>) -> Result<Vec<DocumentHit>> {
    let selector = MetadataSelector::all();
    window
        .into_iter()
        .map(|result| {
            let member = spec.members().get(result.member).ok_or_else(|| {
                SearchError::internal(format!(
                    "result refers to member {} of '{}'",
                    result.member,
                    spec.name()
                ))
            })?;
            let index = member.index.as_ref();
            let metadata = index.document(result.document_id, &selector)?;
            Ok(DocumentHit {
                index_name: index.name().to_string(),
                document_id: result.document_id,
                key: spec.qualify_key(index, &metadata.key),
                title: metadata.title,
                rank: metadata.rank,
                term_count: metadata.term_count,
                date: metadata.date,
                language: metadata.language,
                sort_key: result.sort_key,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;
    use crate::index::{
        DeclaredSortOrder, DocumentMetadata, DocumentStore, FieldId, FieldOptions, IndexInfo,
        IndexStats, ItemValue, MatchMode, MemoryDocument, MemoryIndex, MemoryIndexBuilder,
        PostingsStore, TermDictionary, TermEntry, VirtualIndexMember,
    };
    use crate::postings::{DocumentId, PostingsList};
    use crate::query::{QueryModifiers, Term};
    use crate::util::Bitmap;

    fn date(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
            + chrono::Duration::days(day as i64)
    }

    /// `documents` documents, `matching` of them containing "needle", dated
    /// newest first starting at `newest`.
    fn index(name: &str, documents: u32, matching: u32, newest: u32) -> MemoryIndex {
        MemoryIndexBuilder::new(name)
            .item("price", ItemType::Number)
            .documents((0..documents).map(|i| {
                let text = if i < matching { "needle hay" } else { "hay" };
                MemoryDocument::new(format!("d{i}"))
                    .with_title(format!("{name} {i}"))
                    .with_field("body", text)
                    .with_rank(i)
                    .with_date(date(newest - i))
                    .with_item("price", ItemValue::Number(i as f64))
            }))
            .build()
            .unwrap()
    }

    fn virtual_spec(members: Vec<(MemoryIndex, Option<DeclaredSortOrder>)>) -> VirtualIndexSpec {
        let members = members
            .into_iter()
            .map(|(index, declared_sort)| VirtualIndexMember {
                index: Arc::new(index),
                declared_sort,
            })
            .collect();
        VirtualIndexSpec::from_members("all", members).unwrap()
    }

    fn needle_query(sort: SortSpec, early_completion: bool) -> ParsedQuery {
        ParsedQuery::from_tree(Term::new("needle").into(), "needle")
            .with_sort(sort)
            .with_modifiers(QueryModifiers {
                early_completion,
                return_report: true,
                ..Default::default()
            })
    }

    fn searcher() -> Searcher {
        Searcher::new(SearchConfig::default()).unwrap()
    }

    #[test]
    fn test_physical_search() {
        let spec = VirtualIndexSpec::physical(Arc::new(index("news", 5, 3, 10)));
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Rank, SortOrder::Descending), false));
        let response = searcher().search(&spec, &request).unwrap();
        assert_eq!(response.total_results, 3);
        assert_eq!(response.sort_type, SortType::UIntDesc);
        let keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["d2", "d1", "d0"]);
        assert_eq!(response.max_sort_key, Some(SortKey::UInt(2)));
    }

    #[test]
    fn test_virtual_keys_and_global_sort() {
        let spec = virtual_spec(vec![(index("a", 3, 3, 10), None), (index("b", 3, 3, 20), None)]);
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Date, SortOrder::Descending), false))
            .with_window(0, 3);
        let response = searcher().search(&spec, &request).unwrap();
        assert_eq!(response.total_results, 6);
        let keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["b/d0", "b/d1", "b/d2", "a/d0"]);
        assert!(!response.estimated);
    }

    #[test]
    fn test_early_completion_estimate() {
        let declared = Some(DeclaredSortOrder::new("date", SortOrder::Descending));
        let spec = virtual_spec(vec![
            (index("recent", 10, 10, 100), declared.clone()),
            (index("archive", 30, 30, 50), declared),
        ]);
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Date, SortOrder::Descending), true))
            .with_window(0, 4);
        let response = searcher().search(&spec, &request).unwrap();
        assert!(response.estimated);
        assert_eq!(response.total_results, 40);
        assert_eq!(response.hits.len(), 5);
        assert!(response.hits.iter().all(|h| h.index_name == "recent"));
        assert!(response.report_text().contains("Early completion"));
        assert_eq!(estimate_total(12, 10, 40), 48);
        assert_eq!(estimate_total(12, 0, 40), 12);
    }

    #[test]
    fn test_reversed_walk_for_opposite_order() {
        let declared = Some(DeclaredSortOrder::new("date", SortOrder::Ascending));
        let spec = virtual_spec(vec![
            (index("old", 5, 5, 10), declared.clone()),
            (index("new", 5, 5, 50), declared),
        ]);
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Date, SortOrder::Descending), true))
            .with_window(0, 1);
        let response = searcher().search(&spec, &request).unwrap();
        assert!(response.estimated);
        assert_eq!(response.hits[0].key, "new/d0");
    }

    #[test]
    fn test_exhaustive_total_is_exact() {
        let spec = virtual_spec(vec![(index("a", 10, 4, 10), None), (index("b", 30, 7, 50), None)]);
        let request = SearchRequest::new(needle_query(SortSpec::default(), true)).with_window(0, 2);
        let response = searcher().search(&spec, &request).unwrap();
        assert!(!response.estimated);
        assert_eq!(response.total_results, 11);
    }

    #[test]
    fn test_conflicting_declared_orders_disable_early_completion() {
        let spec = virtual_spec(vec![
            (index("a", 5, 5, 10), Some(DeclaredSortOrder::new("date", SortOrder::Ascending))),
            (index("b", 5, 5, 50), Some(DeclaredSortOrder::new("date", SortOrder::Descending))),
        ]);
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Date, SortOrder::Descending), true))
            .with_window(0, 1);
        let response = searcher().search(&spec, &request).unwrap();
        assert!(!response.estimated);
        assert_eq!(response.total_results, 10);
        assert!(response.report_text().contains("conflicting"));
    }

    #[test]
    fn test_missing_item_field_falls_back_to_relevance() {
        let plain = MemoryIndexBuilder::new("plain")
            .document(MemoryDocument::new("x").with_field("body", "needle"))
            .build()
            .unwrap();
        let spec = virtual_spec(vec![(index("a", 2, 2, 10), None), (plain, None)]);
        let sort = SortSpec::new(SortField::Item("price".into()), SortOrder::Ascending);
        let response = searcher().search(&spec, &SearchRequest::new(needle_query(sort, false))).unwrap();
        assert_eq!(response.sort_type, SortType::FloatDesc);
        assert!(response.report.unwrap().contains("'price'"));

        let spec = VirtualIndexSpec::physical(Arc::new(index("a", 3, 3, 10)));
        let sort = SortSpec::new(SortField::Item("price".into()), SortOrder::Descending);
        let response = searcher().search(&spec, &SearchRequest::new(needle_query(sort, false))).unwrap();
        assert_eq!(response.sort_type, SortType::DoubleDesc);
        assert_eq!(response.hits[0].key, "d2");
    }

    #[test]
    fn test_query_cache_round_trip() {
        let spec = VirtualIndexSpec::physical(Arc::new(index("news", 8, 6, 10)));
        let searcher = searcher();
        let request = SearchRequest::new(needle_query(SortSpec::default(), false)).with_window(0, 2);
        let first = searcher.search(&spec, &request).unwrap();
        let second = searcher.search(&spec, &request.clone().with_window(3, 5)).unwrap();
        let again = searcher.search(&spec, &request).unwrap();

        assert_eq!(searcher.cache().unwrap().stats().query_hits, 2);
        assert_eq!(first.hits, again.hits);
        assert_eq!(first.total_results, second.total_results);
        assert_eq!(first.max_sort_key, again.max_sort_key);
        assert_eq!(first.report_text(), again.report_text());
        assert_eq!(second.hits.len(), 3);
    }

    #[test]
    fn test_empty_query_and_suppressed_results() {
        let spec = VirtualIndexSpec::physical(Arc::new(index("news", 3, 3, 10)));
        let searcher = searcher();

        let mut empty = ParsedQuery::default();
        empty.modifiers.return_report = true;
        let response = searcher.search(&spec, &SearchRequest::new(empty)).unwrap();
        assert_eq!(response.total_results, 0);
        assert!(response.report.unwrap().contains("Empty query"));

        let mut query = needle_query(SortSpec::default(), false);
        query.modifiers.suppress_results = true;
        let response = searcher.search(&spec, &SearchRequest::new(query)).unwrap();
        assert!(response.hits.is_empty());
        assert_eq!(response.total_results, 3);
    }

    #[test]
    fn test_restriction_only_query_scans_document_table() {
        let spec = VirtualIndexSpec::physical(Arc::new(index("news", 4, 1, 10)));
        let mut query = ParsedQuery::default().with_sort(SortSpec::new(SortField::Rank, SortOrder::Ascending));
        query.exclusion_filters.push(crate::query::FilterPredicate::DocumentKeys(vec!["d0".into()]));
        let response = searcher().search(&spec, &SearchRequest::new(query)).unwrap();
        let keys: Vec<&str> = response.hits.iter().map(|h| h.key.as_str()).collect();
        assert_eq!(keys, vec!["d1", "d2", "d3"]);
    }

    /// Delegates to a memory index; every dictionary lookup fails.
    #[derive(Debug)]
    struct BrokenIndex(MemoryIndex);

    impl TermDictionary for BrokenIndex {
        fn lookup_terms(
            &self,
            _text: &str,
            _fields: Option<&Bitmap>,
            _mode: MatchMode,
        ) -> Result<Vec<TermEntry>> {
            Err(SearchError::dictionary("dictionary file is corrupt"))
        }
    }

    impl PostingsStore for BrokenIndex {
        fn postings(
            &self,
            entry: &TermEntry,
            fields: Option<&Bitmap>,
            bounds: DocIdBounds,
        ) -> Result<PostingsList> {
            self.0.postings(entry, fields, bounds)
        }
    }

    impl DocumentStore for BrokenIndex {
        fn document(
            &self,
            document_id: DocumentId,
            selector: &MetadataSelector,
        ) -> Result<DocumentMetadata> {
            self.0.document(document_id, selector)
        }

        fn document_id_for_key(&self, key: &str) -> Result<Option<DocumentId>> {
            self.0.document_id_for_key(key)
        }
    }

    impl IndexInfo for BrokenIndex {
        fn name(&self) -> &str {
            "broken"
        }

        fn stats(&self) -> IndexStats {
            self.0.stats()
        }

        fn field_id(&self, name: &str) -> Option<FieldId> {
            self.0.field_id(name)
        }

        fn field_options(&self, field_id: FieldId) -> Option<FieldOptions> {
            self.0.field_options(field_id)
        }

        fn default_unfielded_fields(&self) -> Vec<String> {
            self.0.default_unfielded_fields()
        }

        fn stemming_enabled(&self) -> bool {
            false
        }

        fn stem(&self, _term: &str) -> Option<String> {
            None
        }

        fn item_type(&self, name: &str) -> Option<ItemType> {
            self.0.item_type(name)
        }
    }

    #[test]
    fn test_failed_member_is_skipped() {
        let members = vec![
            VirtualIndexMember {
                index: Arc::new(BrokenIndex(index("a", 3, 3, 10))),
                declared_sort: None,
            },
            VirtualIndexMember {
                index: Arc::new(index("b", 3, 2, 10)),
                declared_sort: None,
            },
        ];
        let spec = VirtualIndexSpec::from_members("all", members).unwrap();
        let request = SearchRequest::new(needle_query(SortSpec::default(), false));
        let response = searcher().search(&spec, &request).unwrap();
        assert_eq!(response.total_results, 2);
        assert!(response.report_text().contains("'broken' failed"));

        let spec = VirtualIndexSpec::from_members(
            "all",
            vec![
                VirtualIndexMember {
                    index: Arc::new(BrokenIndex(index("a", 3, 3, 10))),
                    declared_sort: None,
                },
                VirtualIndexMember {
                    index: Arc::new(BrokenIndex(index("b", 3, 3, 10))),
                    declared_sort: None,
                },
            ],
        )
        .unwrap();
        assert!(matches!(
            searcher().search(&spec, &request),
            Err(SearchError::Dictionary(_))
        ));

        let spec = VirtualIndexSpec::physical(Arc::new(BrokenIndex(index("a", 3, 3, 10))));
        assert!(searcher().search(&spec, &request).is_err());
    }

    #[test]
    fn test_timeout() {
        let spec = VirtualIndexSpec::physical(Arc::new(index("news", 3, 3, 10)));
        let searcher = Searcher::new(SearchConfig::default().with_search_timeout(Duration::ZERO)).unwrap();
        let result = searcher.search(&spec, &SearchRequest::new(needle_query(SortSpec::default(), false)));
        assert!(matches!(result, Err(SearchError::Timeout(_))));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let build = || virtual_spec(vec![(index("a", 6, 4, 10), None), (index("b", 6, 5, 30), None)]);
        let request = SearchRequest::new(needle_query(SortSpec::new(SortField::Date, SortOrder::Ascending), true))
            .with_window(0, 20);

        let sequential = searcher().search(&build(), &request).unwrap();
        let parallel = Searcher::new(
            SearchConfig::default()
                .with_parallel_federation(true)
                .with_cache_capacity(0, 0),
        )
        .unwrap();
        assert!(parallel.cache().is_none());
        let parallel = parallel.search(&build(), &request).unwrap();

        assert_eq!(sequential.total_results, 9);
        assert_eq!(sequential.hits, parallel.hits);
        assert!(parallel.report_text().contains("not available with parallel federation"));
    }
}
