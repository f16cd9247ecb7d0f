//! Parsed query structures consumed by the evaluator.
//!
//! The query parser is an external collaborator; these types are the shape of
//! its output. They derive serde so parsed queries can be stored or passed
//! in as JSON. The evaluator only ever borrows them.

pub mod cluster;
pub mod parsed;
pub mod term;

pub use self::cluster::{TermCluster, TermClusterNode};
pub use self::parsed::{
    DateRestriction, FilterGroup, FilterPredicate, ParsedQuery, QueryModifiers, Restrictions,
    SortField, SortOrder, SortSpec,
};
pub use self::term::{ExpansionFunction, RangeComparison, Term, WILDCARD_FIELD};
pub use crate::postings::Operator;
