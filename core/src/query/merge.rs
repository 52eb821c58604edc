//! Linear merges over result lists sorted by ascending document id.

use super::QueryResult;
use std::cmp::Ordering;

/// Documents present in both lists. The left result is kept and collects the right one's terms.
pub fn intersect(left: Vec<QueryResult>, right: Vec<QueryResult>) -> Vec<QueryResult> {
    let mut merged = Vec::with_capacity(left.len().min(right.len()));
    let mut right = right.into_iter().peekable();
    for mut l in left {
        while right.next_if(|r| r.document_id < l.document_id).is_some() {}
        if let Some(r) = right.next_if(|r| r.document_id == l.document_id) {
            l.add_matching_terms(&r.matching_terms);
            merged.push(l);
        }
    }
    merged
}

/// Documents present in either list; a document found on both sides appears once.
pub fn union(left: Vec<QueryResult>, right: Vec<QueryResult>) -> Vec<QueryResult> {
    let mut merged = Vec::with_capacity(left.len() + right.len());
    let mut left = left.into_iter().peekable();
    let mut right = right.into_iter().peekable();
    loop {
        let order = match (left.peek(), right.peek()) {
            (Some(l), Some(r)) => l.document_id.cmp(&r.document_id),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => break,
        };
        match order {
            Ordering::Less => merged.extend(left.next()),
            Ordering::Greater => merged.extend(right.next()),
            Ordering::Equal => {
                if let (Some(mut l), Some(r)) = (left.next(), right.next()) {
                    l.add_matching_terms(&r.matching_terms);
                    merged.push(l);
                }
            }
        }
    }
    merged
}

/// Documents where some right position directly follows a left position.
///
/// Only the right positions that continue the phrase are kept, so chaining this
/// merge word by word demands full adjacency.
pub fn positional_merge(left: Vec<QueryResult>, right: Vec<QueryResult>) -> Vec<QueryResult> {
    let mut merged = Vec::new();
    let mut right = right.into_iter().peekable();
    for l in left {
        while right.next_if(|r| r.document_id < l.document_id).is_some() {}
        let Some(mut r) = right.next_if(|r| r.document_id == l.document_id) else {
            continue;
        };
        let positions = following_positions(&l.posting.positions, &r.posting.positions);
        if positions.is_empty() {
            continue;
        }
        r.posting.tftd = positions.len() as u32;
        r.posting.positions = positions;
        let mut terms = l.matching_terms;
        for term in r.matching_terms.drain(..) {
            if !terms.contains(&term) {
                terms.push(term);
            }
        }
        r.matching_terms = terms;
        merged.push(r);
    }
    merged
}

/// Positions `p` of `right` such that `p - 1` is in `left`; both inputs ascending.
fn following_positions(left: &[u32], right: &[u32]) -> Vec<u32> {
    let mut kept = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < left.len() && j < right.len() {
        let wanted = left[i] as u64 + 1;
        match (right[j] as u64).cmp(&wanted) {
            Ordering::Less => j += 1,
            Ordering::Greater => i += 1,
            Ordering::Equal => {
                kept.push(right[j]);
                i += 1;
                j += 1;
            }
        }
    }
    kept
}
