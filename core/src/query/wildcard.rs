use super::merge::union;
use super::{QueryContext, QueryResult};
use crate::gram::GramIndex;
use crate::vocabulary::VocabularyElement;
use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;

/// Anchored regex equivalent of a `*` pattern.
fn pattern_regex(pattern: &str) -> Option<Regex> {
    let body = pattern.split('*').map(regex::escape).collect::<Vec<_>>().join(".*");
    Regex::new(&format!("^{body}$")).ok()
}

/// Vocabulary elements whose surface form matches `pattern`, sorted by type.
///
/// The gram intersection only guarantees that every gram occurs somewhere, so
/// `retired` is a candidate for `red*`; candidates are checked against the pattern itself.
pub fn expand(gram_index: &GramIndex, pattern: &str) -> Vec<VocabularyElement> {
    let Some(candidates) = gram_index.matching_candidates_for(pattern) else {
        return Vec::new();
    };
    let Some(re) = pattern_regex(pattern) else {
        return Vec::new();
    };
    candidates.into_iter().filter(|c| re.is_match(&c.type_)).collect()
}

/// Candidate types grouped under the stem they share, by ascending stem.
pub fn stems_of(candidates: &[VocabularyElement]) -> BTreeMap<&str, Vec<&str>> {
    let mut stems: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for candidate in candidates {
        stems.entry(candidate.stem.as_str()).or_default().push(candidate.type_.as_str());
    }
    stems
}

pub(super) fn evaluate(ctx: &QueryContext<'_>, pattern: &str) -> Result<Option<Vec<QueryResult>>> {
    let candidates = expand(ctx.index.gram_index(), pattern);
    let mut results = Vec::new();
    for (stem, types) in stems_of(&candidates) {
        let Some(postings) = ctx.index.postings(stem, false)? else {
            continue;
        };
        let hits = postings
            .into_iter()
            .map(|posting| {
                let mut hit = QueryResult::new(posting, types[0]);
                hit.add_matching_terms(&types[1..]);
                hit
            })
            .collect();
        results = union(results, hits);
    }
    Ok(if results.is_empty() { None } else { Some(results) })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gram_index(types: &[(&str, &str)]) -> GramIndex {
        let mut index = GramIndex::new();
        for (t, s) in types {
            index.register_grams_for(&VocabularyElement::new(*t, *s));
        }
        index
    }

    #[test]
    fn false_gram_matches_are_filtered() {
        let index = gram_index(&[("redeem", "redeem"), ("retired", "retir"), ("red", "red")]);
        let types: Vec<String> = expand(&index, "red*").into_iter().map(|e| e.type_).collect();
        assert_eq!(types, vec!["red", "redeem"]);
    }

    #[test]
    fn inner_wildcards() {
        let index = gram_index(&[("whale", "whale"), ("while", "while"), ("whole", "whole"), ("wheel", "wheel")]);
        let types: Vec<String> = expand(&index, "wh*le").into_iter().map(|e| e.type_).collect();
        assert_eq!(types, vec!["whale", "while", "whole"]);
        assert!(expand(&index, "q*").is_empty());
    }

    #[test]
    fn stems_group_types() {
        let candidates =
            vec![VocabularyElement::new("whales", "whale"), VocabularyElement::new("whale", "whale"), VocabularyElement::new("wharf", "wharf")];
        let stems = stems_of(&candidates);
        assert_eq!(stems["whale"], vec!["whales", "whale"]);
        assert_eq!(stems.len(), 2);
    }
}
