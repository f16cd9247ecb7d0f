//! Boolean and proximity merging of postings lists.
//!
//! Every merge consumes both operands and returns a new list. Set operators
//! work on document runs: all postings of a surviving document are kept, so
//! weights add up when the ranker collapses a run. ADJ and NEAR compare term
//! positions inside documents present in both operands.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::config::OperationMode;
use crate::postings::list::{Posting, PostingsList, TermType};

/// Boolean and proximity operators of a term cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
    Ior,
    Xor,
    Not,
    Adj,
    Near,
}

impl Operator {
    /// Operators whose result is bounded by the left operand's documents.
    pub fn is_restrictive(self) -> bool {
        matches!(
            self,
            Operator::And | Operator::Not | Operator::Adj | Operator::Near
        )
    }

    /// Operators that compare term positions.
    pub fn is_positional(self) -> bool {
        matches!(self, Operator::Adj | Operator::Near)
    }
}

/// Parameters of one merge step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergeParams {
    pub operator: Operator,
    pub mode: OperationMode,
    /// ADJ: exact positional gap. NEAR: window size, the sign giving the
    /// direction of the right operand relative to the left one.
    pub distance: i32,
    /// NEAR only: the right operand must lie in `distance`'s direction.
    pub order_sensitive: bool,
}

impl MergeParams {
    pub fn new(operator: Operator, mode: OperationMode) -> Self {
        MergeParams {
            operator,
            mode,
            distance: 1,
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

/// Whether an empty `operand` of a restrictive chain empties the whole chain.
///
/// Strict mode short-circuits on any empty non-stop operand. Relaxed mode
/// skips an empty operand only when its term is absent from the dictionary
/// and not required; a list that is empty because of its bounds or an
/// earlier merge still empties the chain. For NOT only the left operand
/// (the accumulator) can short-circuit; an empty subtrahend is a no-op.
pub fn should_short_circuit(operand: &PostingsList, is_left: bool, params: &MergeParams) -> bool {
    if !params.operator.is_restrictive() || !operand.is_empty() || operand.is_stop() {
        return false;
    }
    if params.operator == Operator::Not && !is_left {
        return false;
    }
    match params.mode {
        OperationMode::Strict => true,
        OperationMode::Relaxed => operand.required || !operand.absent,
    }
}

/// Merge `left` and `right` with the given operator.
pub fn merge(left: PostingsList, right: PostingsList, params: &MergeParams) -> PostingsList {
    let operator = params.operator;

    if operator.is_restrictive() && operator != Operator::Not {
        // stop terms never restrict the chain
        if right.is_stop() {
            return left;
        }
        if left.is_stop() {
            return right;
        }
        if left.is_empty() || right.is_empty() {
            if should_short_circuit(&left, true, params) || should_short_circuit(&right, false, params)
            {
                return empty_like(&left, &right);
            }
            // relaxed: the absent, non-required side is skipped
            return if left.is_empty() { right } else { left };
        }
    }

    let required = if operator.is_restrictive() {
        left.required || right.required
    } else {
        left.required && right.required
    };
    let absent = !operator.is_restrictive() && left.absent && right.absent;
    let term_type = merged_type(&left, &right);

    let postings = match operator {
        Operator::And => intersect(left.postings(), right.postings()),
        Operator::Or | Operator::Ior => union(left.postings(), right.postings()),
        Operator::Xor => symmetric_difference(left.postings(), right.postings()),
        Operator::Not => difference(left.postings(), right.postings()),
        Operator::Adj => adjacent(left.postings(), right.postings(), params.distance.unsigned_abs()),
        Operator::Near => near(
            left.postings(),
            right.postings(),
            params.distance,
            params.order_sensitive,
        ),
    };

    PostingsList::from_sorted(term_type, postings)
        .with_required(required)
        .with_absent(absent)
}

fn empty_like(left: &PostingsList, right: &PostingsList) -> PostingsList {
    PostingsList::empty(merged_type(left, right)).with_required(left.required || right.required)
}

fn merged_type(left: &PostingsList, right: &PostingsList) -> TermType {
    if left.term_type == right.term_type {
        left.term_type
    } else {
        TermType::Regular
    }
}

/// Split off the run of postings for the first document in `postings`.
fn next_run(postings: &[Posting]) -> (&[Posting], &[Posting]) {
    let document_id = postings[0].document_id;
    let len = postings
        .iter()
        .position(|p| p.document_id != document_id)
        .unwrap_or(postings.len());
    postings.split_at(len)
}

/// Merge two runs of the same document by position.
fn merge_runs(a: &[Posting], b: &[Posting], out: &mut Vec<Posting>) {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].term_position.cmp(&b[j].term_position) {
            Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                let mut posting = a[i];
                posting.weight = posting.weight.max(b[j].weight);
                out.push(posting);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
}

/// Walk both lists run by run, handing matching and unmatched runs to the
/// callbacks together with the output state.
fn walk_runs<'a, S, B, L, R>(
    mut left: &'a [Posting],
    mut right: &'a [Posting],
    state: &mut S,
    mut both: B,
    mut left_only: L,
    mut right_only: R,
) where
    B: FnMut(&mut S, &'a [Posting], &'a [Posting]),
    L: FnMut(&mut S, &'a [Posting]),
    R: FnMut(&mut S, &'a [Posting]),
{
    while !left.is_empty() && !right.is_empty() {
        let (l_run, l_rest) = next_run(left);
        let (r_run, r_rest) = next_run(right);
        match l_run[0].document_id.cmp(&r_run[0].document_id) {
            Ordering::Less => {
                left_only(state, l_run);
                left = l_rest;
            }
            Ordering::Greater => {
                right_only(state, r_run);
                right = r_rest;
            }
            Ordering::Equal => {
                both(state, l_run, r_run);
                left = l_rest;
                right = r_rest;
            }
        }
    }
    while !left.is_empty() {
        let (run, rest) = next_run(left);
        left_only(state, run);
        left = rest;
    }
    while !right.is_empty() {
        let (run, rest) = next_run(right);
        right_only(state, run);
        right = rest;
    }
}

fn keep(out: &mut Vec<Posting>, run: &[Posting]) {
    out.extend_from_slice(run);
}

fn skip(_: &mut Vec<Posting>, _: &[Posting]) {}

fn intersect(left: &[Posting], right: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(left.len().min(right.len()));
    walk_runs(left, right, &mut out, |out, l, r| merge_runs(l, r, out), skip, skip);
    out
}

fn union(left: &[Posting], right: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    walk_runs(left, right, &mut out, |out, l, r| merge_runs(l, r, out), keep, keep);
    out
}

fn symmetric_difference(left: &[Posting], right: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::new();
    walk_runs(left, right, &mut out, |_, _, _| {}, keep, keep);
    out
}

fn difference(left: &[Posting], right: &[Posting]) -> Vec<Posting> {
    let mut out = Vec::with_capacity(left.len());
    walk_runs(left, right, &mut out, |_, _, _| {}, keep, skip);
    out
}

/// Right-operand occurrences exactly `distance` positions after a left
/// occurrence. The output carries the right positions so chains continue
/// from the last matched term.
fn adjacent(left: &[Posting], right: &[Posting], distance: u32) -> Vec<Posting> {
    let mut out = Vec::new();
    walk_runs(
        left,
        right,
        &mut out,
        |out: &mut Vec<Posting>, l_run: &[Posting], r_run: &[Posting]| {
            for r in r_run {
                let Some(wanted) = r.term_position.checked_sub(distance) else {
                    continue;
                };
                if let Ok(index) = l_run.binary_search_by(|l| l.term_position.cmp(&wanted)) {
                    out.push(Posting::new(
                        r.document_id,
                        r.term_position,
                        l_run[index].weight + r.weight,
                    ));
                }
            }
        },
        skip,
        skip,
    );
    out
}

/// Occurrences of both operands lying within `|distance|` positions of each
/// other. With `order_sensitive`, the right occurrence must lie after the
/// left one for a positive distance and before it for a negative one.
fn near(left: &[Posting], right: &[Posting], distance: i32, order_sensitive: bool) -> Vec<Posting> {
    let window = distance.unsigned_abs() as i64;
    let forward = distance >= 0;
    let mut out = Vec::new();
    walk_runs(
        left,
        right,
        &mut out,
        |out: &mut Vec<Posting>, l_run: &[Posting], r_run: &[Posting]| {
            let mut l_hit = vec![false; l_run.len()];
            let mut r_hit = vec![false; r_run.len()];
            for (i, l) in l_run.iter().enumerate() {
                for (j, r) in r_run.iter().enumerate() {
                    let gap = r.term_position as i64 - l.term_position as i64;
                    if gap == 0 || gap.abs() > window {
                        continue;
                    }
                    if order_sensitive && (gap > 0) != forward {
                        continue;
                    }
                    l_hit[i] = true;
                    r_hit[j] = true;
                }
            }
            let l_kept = keep_hits(l_run, &l_hit);
            let r_kept = keep_hits(r_run, &r_hit);
            merge_runs(&l_kept, &r_kept, out);
        },
        skip,
        skip,
    );
    out
}

fn keep_hits(run: &[Posting], hits: &[bool]) -> Vec<Posting> {
    run.iter()
        .zip(hits)
        .filter(|(_, hit)| **hit)
        .map(|(p, _)| *p)
        .collect()
}
