//! Candidate ranking, sorting and pagination.

use serde::{Deserialize, Serialize};

use crate::config::WeightNormalization;
use crate::error::Result;
use crate::index::{DocumentMetadata, ItemValue, MetadataSelector, SearchIndex};
use crate::postings::{DocumentId, PostingsList};
use crate::query::{Restrictions, SortField};
use crate::search::feedback::WeightArray;
use crate::search::filter::DocumentFilters;
use crate::search::sort_key::{pack_date, ResolvedSort, SortKey, SortType};

/// Minimal per-document record produced before hydration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortResult {
    pub document_id: DocumentId,
    /// Position of the owning index among the searched members.
    pub member: usize,
    pub sort_key: SortKey,
}

/// One index's ranked candidates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RankedResults {
    pub results: Vec<ShortResult>,
    pub total_results: usize,
    pub max_sort_key: Option<SortKey>,
}

/// Everything the ranker consumes for one index.
#[derive(Debug)]
pub struct RankInput<'q> {
    pub postings: Option<PostingsList>,
    pub weights: Option<WeightArray>,
    /// Iterate every document of the index.
    pub document_table: bool,
    pub filters: DocumentFilters,
    pub restrictions: &'q Restrictions,
    pub sort: &'q ResolvedSort,
    pub normalization: WeightNormalization,
}

/// Rank the candidates of one index and sort them.
pub fn assemble(index: &dyn SearchIndex, member: usize, input: RankInput<'_>) -> Result<RankedResults> {
    let candidates = candidates(index, &input);
    let candidates: Vec<(DocumentId, f32)> = candidates
        .into_iter()
        .filter(|(id, _)| input.filters.admits(*id))
        .collect();
    if candidates.is_empty() {
        return Ok(RankedResults::default());
    }

    let selector = selector(&input);
    let stats = index.stats();
    let average_term_count = stats.average_term_count();
    let languages: Vec<String> = input
        .restrictions
        .languages
        .iter()
        .map(|l| canonical_language(l))
        .collect();

    let mut ranked = RankedResults::default();
    ranked.results.reserve(candidates.len());

    for (document_id, base_weight) in candidates {
        let metadata = if selector.is_empty() {
            DocumentMetadata {
                document_id,
                ..Default::default()
            }
        } else {
            index.document(document_id, &selector)?
        };

        if !passes_dates(&metadata, input.restrictions) || !passes_languages(&metadata, &languages) {
            continue;
        }

        let weight = match &input.weights {
            Some(weights) => weights.apply(document_id, base_weight),
            None => base_weight,
        };
        let sort_key = sort_key(&metadata, input.sort, || {
            input
                .normalization
                .apply(weight, metadata.term_count, average_term_count)
        });

        ranked.max_sort_key = SortKey::max_of(ranked.max_sort_key.take(), &sort_key);
        ranked.results.push(ShortResult {
            document_id,
            member,
            sort_key,
        });
    }

    ranked.total_results = ranked.results.len();
    sort_results(&mut ranked.results, input.sort.sort_type);
    Ok(ranked)
}

/// Candidate documents with their term weights. Postings bound the set
/// whenever present.
fn candidates(index: &dyn SearchIndex, input: &RankInput<'_>) -> Vec<(DocumentId, f32)> {
    if let Some(postings) = &input.postings {
        return postings.document_weights();
    }
    if let Some(weights) = &input.weights {
        return weights.documents().map(|id| (id, 0.0)).collect();
    }
    if input.document_table {
        return (1..=index.stats().document_count).map(|id| (id, 0.0)).collect();
    }
    Vec::new()
}

fn selector(input: &RankInput<'_>) -> MetadataSelector {
    let mut selector = MetadataSelector {
        date: !input.restrictions.dates.is_empty(),
        language: !input.restrictions.languages.is_empty(),
        ..Default::default()
    };
    match &input.sort.field {
        SortField::Rank => selector.rank = true,
        SortField::Date => selector.date = true,
        SortField::Item(name) => selector.item = Some(name.clone()),
        _ if input.sort.is_relevance() => {
            selector.term_count = input.normalization != WeightNormalization::Raw;
        }
        _ => {}
    }
    selector
}

fn sort_key<F>(metadata: &DocumentMetadata, sort: &ResolvedSort, weight: F) -> SortKey
where
    F: FnOnce() -> f32,
{
    match sort.sort_type {
        SortType::FloatAsc | SortType::FloatDesc => SortKey::Float(weight()),
        SortType::UIntAsc | SortType::UIntDesc => SortKey::UInt(metadata.rank),
        SortType::ULongAsc | SortType::ULongDesc => {
            SortKey::ULong(metadata.date.map_or(0, pack_date))
        }
        SortType::DoubleAsc | SortType::DoubleDesc => match &metadata.item {
            Some(ItemValue::Number(n)) => SortKey::Double(*n),
            _ => SortKey::Double(0.0),
        },
        SortType::TextAsc | SortType::TextDesc => match &metadata.item {
            Some(ItemValue::Text(t)) => SortKey::Text(t.clone()),
            Some(ItemValue::Number(n)) => SortKey::Text(n.to_string()),
            None => SortKey::Text(String::new()),
        },
        SortType::NoSort => SortKey::None,
    }
}

fn passes_dates(metadata: &DocumentMetadata, restrictions: &Restrictions) -> bool {
    if restrictions.dates.is_empty() {
        return true;
    }
    match metadata.date {
        Some(date) => restrictions.dates.iter().all(|r| r.accepts(date)),
        None => false,
    }
}

fn passes_languages(metadata: &DocumentMetadata, languages: &[String]) -> bool {
    if languages.is_empty() {
        return true;
    }
    let Some(language) = metadata.language.as_deref() else {
        return false;
    };
    let language = canonical_language(language);
    languages.iter().any(|wanted| {
        language == *wanted
            || (language.starts_with(wanted.as_str())
                && language.as_bytes().get(wanted.len()) == Some(&b'-'))
    })
}

/// Lower case with `-` separators, so `en_US` and `en-us` compare equal.
pub fn canonical_language(language: &str) -> String {
    language.trim().to_lowercase().replace('_', "-")
}

/// Stable sort; ties keep member then document order. `NoSort` keeps the
/// incoming order.
pub fn sort_results(results: &mut [ShortResult], sort_type: SortType) {
    if sort_type == SortType::NoSort {
        return;
    }
    results.sort_by(|a, b| {
        sort_type
            .compare(&a.sort_key, &b.sort_key)
            .then(a.member.cmp(&b.member))
            .then(a.document_id.cmp(&b.document_id))
    });
}

/// Inclusive window `[start, end]`, clamped to the results.
pub fn splice<T>(mut results: Vec<T>, start: usize, end: usize) -> Vec<T> {
    if start >= results.len() || end < start {
        return Vec::new();
    }
    let end = end.min(results.len() - 1);
    results.truncate(end + 1);
    results.drain(..start);
    results
}
