use crate::gram::GramIndex;
use crate::posting::Posting;
use crate::vocabulary::VocabularyElement;
use crate::{DocId, Error, Result};
use std::collections::{HashMap, HashSet};

/// Read access shared by the in-memory and the on-disk index.
pub trait Index: Send + Sync {
    /// Postings of `stem` ordered by document id, or `None` for an unknown stem.
    fn postings(&self, stem: &str, with_positions: bool) -> Result<Option<Vec<Posting>>>;

    /// All stems, sorted.
    fn vocabulary(&self) -> Result<Vec<String>>;

    /// Euclidean length of the document's wdt vector.
    fn document_weight(&self, document_id: DocId) -> Result<f64>;

    fn corpus_size(&self) -> usize;

    fn gram_index(&self) -> &GramIndex;
}

/// Positional inverted index built in memory while the corpus is ingested.
///
/// Documents must be added in non-decreasing id order: `add_term` only looks at the
/// last posting of a term, so an out-of-order id silently breaks the ascending
/// invariant of the posting list.
#[derive(Default)]
pub struct InMemoryIndex {
    map: HashMap<String, Vec<Posting>>,
    types: HashSet<VocabularyElement>,
    gram_index: GramIndex,
    weights: Vec<f64>,
}

impl InMemoryIndex {
    pub fn new() -> Self { Self::default() }

    /// Wrap ready-made posting lists, e.g. test fixtures; weights are computed for `num_docs`.
    pub fn from_postings(map: HashMap<String, Vec<Posting>>, num_docs: usize) -> Self {
        let mut index = Self { map, ..Self::default() };
        index.compute_weights(num_docs);
        index
    }

    pub fn add_term(&mut self, stem: &str, document_id: DocId, position: u32) {
        if !self.map.contains_key(stem) {
            self.map.insert(stem.to_string(), Vec::new());
        }
        if let Some(postings) = self.map.get_mut(stem) {
            match postings.last_mut() {
                Some(last) if last.document_id == document_id => last.add_position(position),
                _ => postings.push(Posting::with_position(document_id, stem, position)),
            }
        }
    }

    /// Remember a surface form for the gram phase.
    pub fn record_type(&mut self, type_: &str, stem: &str) {
        // first stem seen for a surface form wins
        self.types.insert(VocabularyElement::new(type_, stem));
    }

    pub fn type_count(&self) -> usize { self.types.len() }

    pub fn types(&self) -> impl Iterator<Item = &VocabularyElement> {
        self.types.iter()
    }

    /// Register grams for every recorded type. Needs the complete type set, so it runs
    /// once ingestion is over; `on_type(registered, total)` fires after each type.
    pub fn register_grams<F: FnMut(usize, usize)>(&mut self, mut on_type: F) {
        let mut elements: Vec<&VocabularyElement> = self.types.iter().collect();
        elements.sort_by(|a, b| a.type_.cmp(&b.type_));
        let total = elements.len();
        for (i, element) in elements.into_iter().enumerate() {
            self.gram_index.register_grams_for(element);
            on_type(i + 1, total);
        }
    }

    /// Set every posting's wdt and derive the per-document weights `sqrt(Σ wdt²)`.
    pub fn compute_weights(&mut self, num_docs: usize) {
        let mut weights = vec![0.0f64; num_docs];
        for postings in self.map.values_mut() {
            for posting in postings.iter_mut() {
                posting.wdt = posting.calculate_wdt();
                let slot = (posting.document_id as usize).checked_sub(1);
                if let Some(w) = slot.and_then(|i| weights.get_mut(i)) {
                    *w += posting.wdt * posting.wdt;
                }
            }
        }
        for w in weights.iter_mut() {
            *w = w.sqrt();
        }
        self.weights = weights;
    }

    pub fn weights(&self) -> &[f64] { &self.weights }

    pub fn postings_for(&self, stem: &str) -> Option<&[Posting]> {
        self.map.get(stem).map(Vec::as_slice)
    }

    pub fn sorted_vocabulary(&self) -> Vec<String> {
        let mut terms: Vec<String> = self.map.keys().cloned().collect();
        terms.sort();
        terms
    }

    pub fn term_count(&self) -> usize { self.map.len() }
}

impl Index for InMemoryIndex {
    fn postings(&self, stem: &str, _with_positions: bool) -> Result<Option<Vec<Posting>>> {
        Ok(self.postings_for(stem).map(<[Posting]>::to_vec))
    }

    fn vocabulary(&self) -> Result<Vec<String>> {
        Ok(self.sorted_vocabulary())
    }

    fn document_weight(&self, document_id: DocId) -> Result<f64> {
        document_id
            .checked_sub(1)
            .and_then(|i| self.weights.get(i as usize))
            .copied()
            .ok_or_else(|| Error::InvalidIndex(format!("no weight for document {document_id}")))
    }

    fn corpus_size(&self) -> usize { self.weights.len() }

    fn gram_index(&self) -> &GramIndex { &self.gram_index }
}
