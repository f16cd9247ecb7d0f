//! Relevance feedback.
//!
//! Feedback text is tokenized into an implicit OR query, evaluated like any
//! other query, and collapsed into per-document weight deltas.

use unicode_segmentation::UnicodeSegmentation;

use crate::error::Result;
use crate::postings::{DocIdBounds, DocumentId, Operator};
use crate::query::{Term, TermClusterNode};
use crate::search::evaluator::QueryEvaluator;
use crate::search::SearchContext;
use crate::util::Bitmap;

/// Dense per-document feedback deltas, indexed by document ID.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightArray {
    weights: Vec<f32>,
    touched: Bitmap,
}

impl WeightArray {
    pub fn new(document_count: u32) -> Self {
        WeightArray {
            weights: vec![0.0; document_count as usize + 1],
            touched: Bitmap::new(document_count),
        }
    }

    /// Add `delta` to a document's weight.
    pub fn add(&mut self, document_id: DocumentId, delta: f32) {
        let index = document_id as usize;
        if index >= self.weights.len() {
            self.weights.resize(index + 1, 0.0);
        }
        self.weights[index] += delta;
        self.touched.set(document_id);
    }

    /// Raw delta of a document.
    pub fn delta(&self, document_id: DocumentId) -> f32 {
        self.weights.get(document_id as usize).copied().unwrap_or(0.0)
    }

    /// Weight of a document after feedback. Non-positive totals of documents
    /// touched by feedback become `f32::EPSILON`, so feedback reorders but
    /// never removes.
    pub fn apply(&self, document_id: DocumentId, weight: f32) -> f32 {
        if !self.touched.contains(document_id) {
            return weight;
        }
        let total = weight + self.delta(document_id);
        if total <= 0.0 { f32::EPSILON } else { total }
    }

    /// Documents touched by feedback, ascending.
    pub fn documents(&self) -> impl Iterator<Item = DocumentId> + '_ {
        self.touched.ids()
    }

    pub fn is_empty(&self) -> bool {
        self.touched.is_empty()
    }
}

/// Terms of a feedback text as an OR cluster.
pub fn feedback_tree(text: &str) -> Option<TermClusterNode> {
    let terms: Vec<Term> = text.unicode_words().map(Term::new).collect();
    match terms.len() {
        0 => None,
        1 => terms.into_iter().next().map(TermClusterNode::Term),
        _ => Some(TermClusterNode::cluster(Operator::Or, terms)),
    }
}

/// Weight deltas from positive and negative feedback, or `None` when neither
/// matches any document.
pub fn feedback_weights(
    evaluator: &QueryEvaluator<'_, '_>,
    ctx: &mut SearchContext<'_>,
    positive: Option<&str>,
    negative: Option<&str>,
) -> Result<Option<WeightArray>> {
    let document_count = evaluator.resolver().index().stats().document_count;
    let mut weights = WeightArray::new(document_count);

    for (text, sign) in [(positive, 1.0f32), (negative, -1.0f32)] {
        let Some(tree) = text.and_then(feedback_tree) else {
            continue;
        };
        let postings = evaluator.evaluate(ctx, &tree, DocIdBounds::UNBOUNDED)?;
        for (document_id, weight) in postings.document_weights() {
            weights.add(document_id, sign * weight);
        }
    }

    if weights.is_empty() {
        ctx.report.append("Feedback did not match any documents");
        return Ok(None);
    }
    Ok(Some(weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchConfig;
    use crate::index::{MemoryDocument, MemoryIndexBuilder};
    use crate::search::resolver::{ResolveOptions, TermResolver};

    #[test]
    fn test_floor_is_epsilon() {
        let mut weights = WeightArray::new(3);
        weights.add(2, -5.0);
        assert_eq!(weights.apply(2, 1.0), f32::EPSILON);
        assert_eq!(weights.apply(1, 1.0), 1.0);
        weights.add(3, 0.5);
        assert_eq!(weights.apply(3, 1.0), 1.5);
        assert_eq!(weights.documents().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_feedback_tree() {
        assert!(feedback_tree("  ").is_none());
        assert_eq!(feedback_tree("fox").map(|t| t.term_count()), Some(1));
        assert_eq!(feedback_tree("quick, brown fox").map(|t| t.term_count()), Some(3));
    }

    #[test]
    fn test_positive_and_negative_feedback() {
        let index = MemoryIndexBuilder::new("docs")
            .documents([
                MemoryDocument::new("a").with_field("body", "red apple"),
                MemoryDocument::new("b").with_field("body", "green apple"),
            ])
            .build()
            .unwrap();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());
        let evaluator = QueryEvaluator::new(&resolver);

        let weights = feedback_weights(&evaluator, &mut ctx, Some("red"), Some("green"))
            .unwrap()
            .unwrap();
        assert!(weights.delta(1) > 0.0);
        assert!(weights.delta(2) < 0.0);

        let none = feedback_weights(&evaluator, &mut ctx, Some("banana"), None).unwrap();
        assert!(none.is_none());
    }
}
