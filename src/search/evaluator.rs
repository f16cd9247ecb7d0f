//! Evaluation of a term-cluster tree into one postings list.

use log::debug;

use crate::error::Result;
use crate::postings::{merge, should_short_circuit, DocIdBounds, MergeParams, Operator, PostingsList};
use crate::query::{TermCluster, TermClusterNode};
use crate::search::resolver::TermResolver;
use crate::search::SearchContext;

/// Folds each cluster's children left to right with the cluster operator.
#[derive(Debug)]
pub struct QueryEvaluator<'r, 'a> {
    resolver: &'r TermResolver<'a>,
}

impl<'r, 'a> QueryEvaluator<'r, 'a> {
    pub fn new(resolver: &'r TermResolver<'a>) -> Self {
        QueryEvaluator { resolver }
    }

    pub fn resolver(&self) -> &'r TermResolver<'a> {
        self.resolver
    }

    /// Evaluate `node` with term resolution limited to `bounds`.
    pub fn evaluate(
        &self,
        ctx: &mut SearchContext<'_>,
        node: &TermClusterNode,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        match node {
            TermClusterNode::Term(term) => self.resolver.resolve(ctx, term, bounds),
            TermClusterNode::Cluster(cluster) => self.evaluate_cluster(ctx, cluster, bounds),
        }
    }

    fn evaluate_cluster(
        &self,
        ctx: &mut SearchContext<'_>,
        cluster: &TermCluster,
        bounds: DocIdBounds,
    ) -> Result<PostingsList> {
        let Some((first, rest)) = cluster.children.split_first() else {
            return Ok(PostingsList::default().with_absent(true));
        };

        let operator = cluster.operator;
        let base_distance = match operator {
            Operator::Adj if cluster.distance == 0 => 1,
            Operator::Near if cluster.distance == 0 => ctx.config.near_default_distance as i32,
            _ => cluster.distance,
        };
        let params = MergeParams::new(operator, self.resolver.options().mode)
            .with_distance(base_distance)
            .with_order_sensitive(cluster.order_sensitive);

        let mut accumulator = self.evaluate(ctx, first, bounds)?;
        let mut distance = base_distance;

        for child in rest {
            if should_short_circuit(&accumulator, true, &params) {
                self.note_short_circuit(ctx, operator);
                return Ok(PostingsList::empty(accumulator.term_type).with_required(accumulator.required));
            }

            let child_bounds = if operator.is_restrictive() {
                narrow(bounds, accumulator.document_bounds())
            } else {
                bounds
            };
            let operand = self.evaluate(ctx, child, child_bounds)?;

            if operator.is_positional() && operand.is_stop() {
                // the stop term keeps its position: widen the gap and carry on
                distance += distance.signum();
                continue;
            }
            if should_short_circuit(&operand, false, &params) {
                self.note_short_circuit(ctx, operator);
                return Ok(PostingsList::empty(operand.term_type)
                    .with_required(accumulator.required || operand.required));
            }

            accumulator = merge(accumulator, operand, &params.with_distance(distance));
            distance = base_distance;
        }

        Ok(accumulator)
    }

    fn note_short_circuit(&self, ctx: &mut SearchContext<'_>, operator: Operator) {
        debug!("{operator:?} chain short-circuited on an empty operand");
        ctx.report.append(format!(
            "Search terminated early: a {} operand has no documents",
            format!("{operator:?}").to_uppercase()
        ));
    }
}

/// Intersection of the caller's bounds with the accumulator's document range.
fn narrow(bounds: DocIdBounds, accumulated: Option<DocIdBounds>) -> DocIdBounds {
    match accumulated {
        Some(range) => DocIdBounds::new(bounds.start.max(range.start), bounds.end.min(range.end)),
        None => bounds,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{OperationMode, SearchConfig};
    use crate::index::{MemoryDocument, MemoryIndex, MemoryIndexBuilder};
    use crate::query::Term;
    use crate::search::resolver::ResolveOptions;

    fn index() -> MemoryIndex {
        MemoryIndexBuilder::new("docs")
            .stop_words(["the", "of"])
            .documents([
                MemoryDocument::new("1").with_field("body", "the quick brown fox"),
                MemoryDocument::new("2").with_field("body", "brown quick fox"),
                MemoryDocument::new("3").with_field("body", "house of cards"),
                MemoryDocument::new("4").with_field("body", "cards in the house"),
            ])
            .build()
            .unwrap()
    }

    fn run(index: &MemoryIndex, mode: OperationMode, node: TermClusterNode) -> (Vec<u32>, String) {
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let options = ResolveOptions {
            mode,
            ..Default::default()
        };
        let resolver = TermResolver::new(index, options);
        let evaluator = QueryEvaluator::new(&resolver);
        let postings = evaluator
            .evaluate(&mut ctx, &node, DocIdBounds::UNBOUNDED)
            .unwrap();
        (postings.document_ids(), ctx.report.into_string())
    }

    fn terms(words: &[&str]) -> Vec<Term> {
        words.iter().map(|w| Term::new(*w)).collect()
    }

    #[test]
    fn test_and_or() {
        let index = index();
        let and = TermClusterNode::cluster(Operator::And, terms(&["quick", "fox"]));
        assert_eq!(run(&index, OperationMode::Strict, and).0, vec![1, 2]);

        let or = TermClusterNode::cluster(Operator::Or, terms(&["fox", "cards"]));
        assert_eq!(run(&index, OperationMode::Strict, or).0, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_adj_skips_stop_terms() {
        let index = index();
        let adj = TermClusterNode::cluster(Operator::Adj, terms(&["house", "of", "cards"]));
        assert_eq!(run(&index, OperationMode::Strict, adj).0, vec![3]);

        let adj = TermClusterNode::cluster(Operator::Adj, terms(&["quick", "brown"]));
        assert_eq!(run(&index, OperationMode::Strict, adj).0, vec![1]);
    }

    #[test]
    fn test_near_default_distance() {
        let index = index();
        let near = TermClusterNode::cluster(Operator::Near, terms(&["cards", "house"]));
        assert_eq!(run(&index, OperationMode::Strict, near).0, vec![3, 4]);
    }

    #[test]
    fn test_strict_and_relaxed() {
        let index = index();
        let and = TermClusterNode::cluster(Operator::And, terms(&["fox", "zebra"]));
        let (ids, report) = run(&index, OperationMode::Strict, and.clone());
        assert!(ids.is_empty());
        assert!(report.contains("Search terminated early"));

        assert_eq!(run(&index, OperationMode::Relaxed, and).0, vec![1, 2]);

        let required = TermClusterNode::Cluster(TermCluster::new(
            Operator::And,
            vec![
                Term::new("fox").into(),
                Term::new("zebra").with_required(true).into(),
            ],
        ));
        assert!(run(&index, OperationMode::Relaxed, required).0.is_empty());
    }

    #[test]
    fn test_relaxed_chain_keeps_disjoint_intersection_empty() {
        let index = index();
        let chain = TermClusterNode::cluster(Operator::And, terms(&["fox", "cards", "house"]));
        assert!(run(&index, OperationMode::Relaxed, chain).0.is_empty());

        // the right operand is empty only inside the accumulator's bounds
        let bounded = TermClusterNode::cluster(Operator::And, terms(&["cards", "fox"]));
        assert!(run(&index, OperationMode::Relaxed, bounded).0.is_empty());

        let skipped = TermClusterNode::cluster(Operator::And, terms(&["fox", "zebra", "quick"]));
        assert_eq!(run(&index, OperationMode::Relaxed, skipped).0, vec![1, 2]);
    }

    #[test]
    fn test_short_circuit_carries_required_flags() {
        let index = index();
        let config = SearchConfig::default();
        let mut ctx = SearchContext::new(&config, None, "en");
        let resolver = TermResolver::new(&index, ResolveOptions::default());
        let evaluator = QueryEvaluator::new(&resolver);

        let tree = TermClusterNode::cluster(Operator::And, terms(&["fox", "zebra"]));
        let postings = evaluator
            .evaluate(&mut ctx, &tree, DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!(postings.is_empty());
        assert!(!postings.required);

        let tree = TermClusterNode::Cluster(TermCluster::new(
            Operator::And,
            vec![
                Term::new("fox").with_required(true).into(),
                Term::new("zebra").into(),
            ],
        ));
        let postings = evaluator
            .evaluate(&mut ctx, &tree, DocIdBounds::UNBOUNDED)
            .unwrap();
        assert!(postings.required);
    }

    #[test]
    fn test_nested_clusters() {
        let index = index();
        let tree = TermClusterNode::Cluster(TermCluster::new(
            Operator::Not,
            vec![
                TermClusterNode::cluster(Operator::Or, terms(&["fox", "cards"])),
                Term::new("house").into(),
            ],
        ));
        assert_eq!(run(&index, OperationMode::Strict, tree).0, vec![1, 2]);
    }

    #[test]
    fn test_narrow_bounds() {
        let narrowed = narrow(DocIdBounds::new(2, 10), Some(DocIdBounds::new(4, 20)));
        assert_eq!(narrowed, DocIdBounds::new(4, 10));
        assert_eq!(narrow(DocIdBounds::UNBOUNDED, None), DocIdBounds::UNBOUNDED);
    }
}
