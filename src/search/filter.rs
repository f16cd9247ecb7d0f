//! Inclusion and exclusion filters.

use crate::error::Result;
use crate::postings::DocIdBounds;
use crate::query::{FilterGroup, FilterPredicate, ParsedQuery};
use crate::search::evaluator::QueryEvaluator;
use crate::search::SearchContext;
use crate::util::Bitmap;

/// Document bitmaps built from the query's filter specs for one index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentFilters {
    /// A document set here is dropped.
    pub exclude: Option<Bitmap>,
    /// When present, only documents set here are kept.
    pub include: Option<Bitmap>,
}

impl DocumentFilters {
    /// Whether `document_id` passes both filters.
    pub fn admits(&self, document_id: u32) -> bool {
        if self.exclude.as_ref().is_some_and(|b| b.contains(document_id)) {
            return false;
        }
        self.include.as_ref().is_none_or(|b| b.contains(document_id))
    }

    pub fn is_empty(&self) -> bool {
        self.exclude.is_none() && self.include.is_none()
    }
}

/// Build the filters of `query` against the evaluator's index.
///
/// Exclusion predicates are OR-combined. Inclusion predicates are OR-combined
/// within a group and the groups AND-combined.
pub fn build_filters(
    evaluator: &QueryEvaluator<'_, '_>,
    ctx: &mut SearchContext<'_>,
    query: &ParsedQuery,
) -> Result<DocumentFilters> {
    let mut filters = DocumentFilters::default();

    for predicate in &query.exclusion_filters {
        let bitmap = predicate_bitmap(evaluator, ctx, predicate)?;
        match filters.exclude.as_mut() {
            Some(exclude) => exclude.union_with(&bitmap),
            None => filters.exclude = Some(bitmap),
        }
    }

    for group in &query.inclusion_filters {
        let bitmap = group_bitmap(evaluator, ctx, group)?;
        match filters.include.as_mut() {
            Some(include) => include.intersect_with(&bitmap),
            None => filters.include = Some(bitmap),
        }
    }

    Ok(filters)
}

fn group_bitmap(
    evaluator: &QueryEvaluator<'_, '_>,
    ctx: &mut SearchContext<'_>,
    group: &FilterGroup,
) -> Result<Bitmap> {
    let document_count = evaluator.resolver().index().stats().document_count;
    let mut bitmap = Bitmap::new(document_count);
    for predicate in &group.0 {
        bitmap.union_with(&predicate_bitmap(evaluator, ctx, predicate)?);
    }
    Ok(bitmap)
}

fn predicate_bitmap(
    evaluator: &QueryEvaluator<'_, '_>,
    ctx: &mut SearchContext<'_>,
    predicate: &FilterPredicate,
) -> Result<Bitmap> {
    let index = evaluator.resolver().index();
    let document_count = index.stats().document_count;
    match predicate {
        FilterPredicate::DocumentIds(ids) => {
            let (known, unknown): (Vec<u32>, Vec<u32>) = ids
                .iter()
                .copied()
                .partition(|id| (1..=document_count).contains(id));
            if !unknown.is_empty() {
                ctx.report.append(format!(
                    "Ignored {} filter document IDs outside 1..={document_count}",
                    unknown.len()
                ));
            }
            Ok(Bitmap::from_ids(document_count, known))
        }
        FilterPredicate::DocumentKeys(keys) => {
            let mut bitmap = Bitmap::new(document_count);
            for key in keys {
                match index.document_id_for_key(key)? {
                    Some(id) => bitmap.set(id),
                    None => ctx.report.append(format!("Filter key '{key}' is not in the index")),
                }
            }
            Ok(bitmap)
        }
        FilterPredicate::Query(tree) => {
            let postings = evaluator.evaluate(ctx, tree, DocIdBounds::UNBOUNDED)?;
            Ok(Bitmap::from_ids(document_count, postings.document_ids()))
        }
    }
}
