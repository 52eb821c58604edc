use crate::gram::GramIndex;
use regex::{NoExpand, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A replacement proposed for a query word that matched nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpellingSuggestion {
    pub misspelled: String,
    pub suggested: String,
    pub edit_distance: usize,
}

impl SpellingSuggestion {
    /// Rewrite `query`, replacing whole-word occurrences of the misspelled word (any case).
    pub fn apply_to(&self, query: &str) -> String {
        let pattern = format!(r"(?i)\b{}\b", regex::escape(&self.misspelled));
        match Regex::new(&pattern) {
            Ok(re) => re.replace_all(query, NoExpand(&self.suggested)).into_owned(),
            Err(_) => query.to_string(),
        }
    }
}

/// Jaccard coefficient of the character sets of `a` and `b`.
pub fn jaccard(a: &str, b: &str) -> f64 {
    let a: HashSet<char> = a.chars().collect();
    let b: HashSet<char> = b.chars().collect();
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// Levenshtein distance counted in characters.
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Gram-based candidate lookup, Jaccard pre-filter, then minimum edit distance.
#[derive(Debug, Clone, Copy)]
pub struct SpellingSuggester {
    threshold: f64,
}

impl Default for SpellingSuggester {
    fn default() -> Self {
        Self { threshold: 0.6 }
    }
}

impl SpellingSuggester {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Closest known surface form, or `None`. Never returns `term` itself; candidates at or
    /// below the Jaccard threshold are ignored and the first one found wins distance ties.
    pub fn suggest(&self, term: &str, gram_index: &GramIndex) -> Option<SpellingSuggestion> {
        let mut best: Option<SpellingSuggestion> = None;
        for candidate in gram_index.similar_candidates_for(term)? {
            if candidate.type_ == term || jaccard(term, &candidate.type_) <= self.threshold {
                continue;
            }
            let distance = edit_distance(term, &candidate.type_);
            if best.as_ref().map_or(true, |b| distance < b.edit_distance) {
                best = Some(SpellingSuggestion {
                    misspelled: term.to_string(),
                    suggested: candidate.type_,
                    edit_distance: distance,
                });
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::VocabularyElement;

    #[test]
    fn distances() {
        assert_eq!(edit_distance("kitten", "sitting"), 3);
        assert_eq!(edit_distance("", "abc"), 3);
        assert_eq!(edit_distance("whale", "whale"), 0);
        assert_eq!(edit_distance("héllo", "hello"), 1);
        assert_eq!(jaccard("whale", "whale"), 1.0);
        assert_eq!(jaccard("ab", "cd"), 0.0);
        assert_eq!(jaccard("", ""), 0.0);
    }

    #[test]
    fn suggests_closest_similar_type() {
        let mut grams = GramIndex::new();
        for (t, s) in [("whale", "whale"), ("while", "while"), ("whales", "whale"), ("ship", "ship")] {
            grams.register_grams_for(&VocabularyElement::new(t, s));
        }
        let suggester = SpellingSuggester::default();
        let suggestion = suggester.suggest("whalle", &grams).unwrap();
        assert_eq!(suggestion.suggested, "whale");
        assert_eq!(suggestion.edit_distance, 1);
        assert!(suggester.suggest("whale", &grams).map_or(true, |s| s.suggested != "whale"));
        assert!(suggester.suggest("xyzzy", &grams).is_none());
    }

    #[test]
    fn low_jaccard_candidates_are_dropped() {
        let mut grams = GramIndex::new();
        grams.register_grams_for(&VocabularyElement::new("shipping", "ship"));
        // "ship" and "shipping" share {s,h,i,p} out of {s,h,i,p,n,g}: 0.66
        assert!(SpellingSuggester::new(0.6).suggest("ship", &grams).is_some());
        assert!(SpellingSuggester::new(0.7).suggest("ship", &grams).is_none());
    }

    #[test]
    fn apply_replaces_whole_words() {
        let suggestion =
            SpellingSuggestion { misspelled: "whle".into(), suggested: "whale".into(), edit_distance: 1 };
        assert_eq!(suggestion.apply_to("Whle ships + whle"), "whale ships + whale");
        assert_eq!(suggestion.apply_to("awhle"), "awhle");
    }
}
