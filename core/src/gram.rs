use crate::vocabulary::VocabularyElement;
use std::collections::{HashMap, HashSet};

const MAX_GRAM_LENGTH: usize = 3;
const BOUNDARY: char = '$';
const BOUNDARY_GRAM: &str = "$";
const WILDCARD: char = '*';

/// Maps `$`-delimited character k-grams (k ≤ 3) to the vocabulary elements containing them.
#[derive(Debug, Default, Clone)]
pub struct GramIndex {
    map: HashMap<String, HashSet<VocabularyElement>>,
}

fn wrap(term: &str) -> Vec<char> {
    let mut chars = Vec::with_capacity(term.len() + 2);
    chars.push(BOUNDARY);
    chars.extend(term.chars());
    chars.push(BOUNDARY);
    chars
}

/// Sliding windows of `min(3, len)` characters over `chars`.
fn window_grams(chars: &[char]) -> Vec<String> {
    let k = chars.len().min(MAX_GRAM_LENGTH);
    if k == 0 {
        return Vec::new();
    }
    chars.windows(k).map(|w| w.iter().collect()).collect()
}

impl GramIndex {
    pub fn new() -> Self { Self::default() }

    pub fn from_map(map: HashMap<String, HashSet<VocabularyElement>>) -> Self {
        Self { map }
    }

    pub fn len(&self) -> usize { self.map.len() }

    pub fn is_empty(&self) -> bool { self.map.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HashSet<VocabularyElement>)> {
        self.map.iter()
    }

    pub fn elements_for(&self, gram: &str) -> Option<&HashSet<VocabularyElement>> {
        self.map.get(gram)
    }

    pub(crate) fn insert(&mut self, gram: String, element: VocabularyElement) {
        self.map.entry(gram).or_default().insert(element);
    }

    /// Register every gram of length 3, 2 and 1 starting at each character of `$type$`.
    ///
    /// Overlapping lengths are kept on purpose; only the bare `$` is skipped.
    pub fn register_grams_for(&mut self, element: &VocabularyElement) {
        let wrapped = wrap(&element.type_);
        let len = wrapped.len();
        for i in 0..len {
            let mut size = len.min(MAX_GRAM_LENGTH);
            while size > 0 {
                if i + size <= len {
                    let gram: String = wrapped[i..i + size].iter().collect();
                    if gram != BOUNDARY_GRAM {
                        self.insert(gram, element.clone());
                    }
                }
                size -= 1;
            }
        }
    }

    /// Grams a wildcard term must contain: `$term$` split on `*`, each piece windowed.
    pub fn matching_grams_for(term: &str) -> Vec<String> {
        let wrapped: String = wrap(term).into_iter().collect();
        let mut grams = Vec::new();
        for sub_term in wrapped.split(WILDCARD) {
            if sub_term.is_empty() || sub_term == BOUNDARY_GRAM {
                continue;
            }
            let chars: Vec<char> = sub_term.chars().collect();
            grams.extend(window_grams(&chars));
        }
        grams
    }

    /// Elements containing every gram of a wildcard term, sorted by type.
    pub fn matching_candidates_for(&self, term: &str) -> Option<Vec<VocabularyElement>> {
        let grams = Self::matching_grams_for(term);
        let (first, rest) = grams.split_first()?;
        let mut candidates: HashSet<VocabularyElement> = self.map.get(first)?.clone();
        for gram in rest {
            let elements = self.map.get(gram)?;
            candidates.retain(|c| elements.contains(c));
            if candidates.is_empty() {
                return None;
            }
        }
        Some(sorted(candidates))
    }

    /// Elements sharing at least one gram with the whole term, sorted by type.
    pub fn similar_candidates_for(&self, term: &str) -> Option<Vec<VocabularyElement>> {
        let mut candidates = HashSet::new();
        for gram in window_grams(&wrap(term)) {
            if let Some(elements) = self.map.get(&gram) {
                candidates.extend(elements.iter().cloned());
            }
        }
        if candidates.is_empty() { None } else { Some(sorted(candidates)) }
    }
}

fn sorted(set: HashSet<VocabularyElement>) -> Vec<VocabularyElement> {
    let mut elements: Vec<VocabularyElement> = set.into_iter().collect();
    elements.sort_by(|a, b| a.type_.cmp(&b.type_));
    elements
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(types: &[(&str, &str)]) -> GramIndex {
        let mut index = GramIndex::new();
        for (t, s) in types {
            index.register_grams_for(&VocabularyElement::new(*t, *s));
        }
        index
    }

    #[test]
    fn registers_twenty_two_grams_for_abricot() {
        let index = index_of(&[("abricot", "abricot")]);
        assert_eq!(index.len(), 22);
        for gram in [
            "a", "b", "r", "i", "c", "o", "t", "$a", "ab", "br", "ri", "ic", "co", "ot", "t$", "$ab", "abr", "bri",
            "ric", "ico", "cot", "ot$",
        ] {
            assert!(index.elements_for(gram).is_some(), "missing gram {gram}");
        }
        assert!(index.elements_for("$").is_none());
        let cot = index.elements_for("cot").unwrap();
        assert!(cot.contains(&VocabularyElement::new("abricot", "abricot")));
    }

    #[test]
    fn matching_grams_for_wildcards() {
        let mut grams = GramIndex::matching_grams_for("red*");
        grams.sort();
        assert_eq!(grams, vec!["$re", "red"]);

        let mut grams = GramIndex::matching_grams_for("*red");
        grams.sort();
        assert_eq!(grams, vec!["ed$", "red"]);

        let mut grams = GramIndex::matching_grams_for("re*ve");
        grams.sort();
        assert_eq!(grams, vec!["$re", "ve$"]);

        let grams = GramIndex::matching_grams_for("red*a*d");
        assert_eq!(grams, vec!["$re", "red", "a", "d$"]);
    }

    #[test]
    fn matching_candidates_intersect() {
        let index = index_of(&[("reading", "read"), ("redeem", "redeem"), ("ready", "readi")]);
        let candidates = index.matching_candidates_for("re*d*").unwrap();
        let types: Vec<&str> = candidates.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, vec!["reading", "ready", "redeem"]);

        let only = index.matching_candidates_for("red*").unwrap();
        assert_eq!(only.len(), 1);
        assert_eq!(only[0].stem, "redeem");

        assert!(index.matching_candidates_for("xyz*").is_none());
        assert!(index.matching_candidates_for("**").is_none());
    }

    #[test]
    fn similar_candidates_union() {
        let index = index_of(&[("whale", "whale"), ("while", "while"), ("ship", "ship")]);
        let similar = index.similar_candidates_for("whele").unwrap();
        let types: Vec<&str> = similar.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, vec!["whale", "while"]);
        assert!(index.similar_candidates_for("zzz").is_none());
    }
}
