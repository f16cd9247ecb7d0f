//! Term-cluster tree.

use serde::{Deserialize, Serialize};

use crate::postings::Operator;
use crate::query::term::Term;

/// A node of the parsed query tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TermClusterNode {
    Term(Term),
    Cluster(TermCluster),
}

/// Children combined left to right with a single operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermCluster {
    pub operator: Operator,
    pub children: Vec<TermClusterNode>,
    /// Proximity distance; 0 means the operator's default. For NEAR the sign
    /// gives the search direction.
    #[serde(default)]
    pub distance: i32,
    /// NEAR only: whether term order matters within the window.
    #[serde(default)]
    pub order_sensitive: bool,
}

impl TermCluster {
    pub fn new(operator: Operator, children: Vec<TermClusterNode>) -> Self {
        TermCluster {
            operator,
            children,
            distance: 0,
            order_sensitive: false,
        }
    }

    pub fn with_distance(mut self, distance: i32) -> Self {
        self.distance = distance;
        self
    }

    pub fn with_order_sensitive(mut self, order_sensitive: bool) -> Self {
        self.order_sensitive = order_sensitive;
        self
    }
}

impl TermClusterNode {
    /// Build a cluster node from terms.
    pub fn cluster<I>(operator: Operator, terms: I) -> Self
    where
        I: IntoIterator<Item = Term>,
    {
        TermClusterNode::Cluster(TermCluster::new(
            operator,
            terms.into_iter().map(TermClusterNode::Term).collect(),
        ))
    }

    /// All terms in the subtree, left to right.
    pub fn terms(&self) -> Vec<&Term> {
        let mut terms = Vec::new();
        self.collect_terms(&mut terms);
        terms
    }

    fn collect_terms<'a>(&'a self, out: &mut Vec<&'a Term>) {
        match self {
            TermClusterNode::Term(term) => out.push(term),
            TermClusterNode::Cluster(cluster) => {
                for child in &cluster.children {
                    child.collect_terms(out);
                }
            }
        }
    }

    pub fn term_count(&self) -> usize {
        match self {
            TermClusterNode::Term(_) => 1,
            TermClusterNode::Cluster(cluster) => {
                cluster.children.iter().map(TermClusterNode::term_count).sum()
            }
        }
    }
}

impl From<Term> for TermClusterNode {
    fn from(term: Term) -> Self {
        TermClusterNode::Term(term)
    }
}

impl From<TermCluster> for TermClusterNode {
    fn from(cluster: TermCluster) -> Self {
        TermClusterNode::Cluster(cluster)
    }
}
