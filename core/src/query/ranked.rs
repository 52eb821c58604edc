use super::wildcard::{expand, stems_of};
use super::{QueryContext, QueryResult};
use crate::posting::Posting;
use crate::spelling::{SpellingSuggester, SpellingSuggestion};
use crate::tokenizer::query_words;
use crate::{DocId, Error, Result};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};

/// Bag-of-words query scored with TF-IDF.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedQuery {
    words: Vec<String>,
}

/// Top documents of a ranked query plus what the scorer saw on the way.
#[derive(Debug, Clone, Default)]
pub struct RankedOutcome {
    /// Best first; ties by ascending document id.
    pub results: Vec<QueryResult>,
    /// Documents that received a non-zero score before the cut to `k`.
    pub accumulators: usize,
    pub suggestions: Vec<SpellingSuggestion>,
}

struct Accumulator {
    score: f64,
    posting: Posting,
    terms: Vec<String>,
}

/// Heap entry ordered by score, then by lower document id.
struct Scored(QueryResult);

impl Ord for Scored {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .score
            .total_cmp(&other.0.score)
            .then_with(|| other.0.document_id.cmp(&self.0.document_id))
    }
}

impl PartialOrd for Scored {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Scored {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Scored {}

impl RankedQuery {
    /// Split into words the way documents are tokenized; `+` and quotes carry no meaning here.
    pub fn parse(text: &str) -> Result<Self> {
        let words = query_words(text);
        if words.is_empty() {
            return Err(Error::Parse(format!("no searchable words in {text:?}")));
        }
        Ok(Self { words })
    }

    pub fn words(&self) -> &[String] { &self.words }

    /// Stems a word stands for, each with the surface form reported for it.
    fn stems_for(&self, ctx: &QueryContext<'_>, word: &str) -> Vec<(String, String)> {
        if !word.contains('*') {
            return vec![(ctx.stemmer.stem(word), word.to_string())];
        }
        let candidates = expand(ctx.index.gram_index(), word);
        stems_of(&candidates)
            .into_iter()
            .map(|(stem, types)| (stem.to_string(), types[0].to_string()))
            .collect()
    }

    /// Score every document holding a query word and keep the `k` best.
    ///
    /// Plain words without postings are run through `suggester`; wildcard words are not.
    pub fn evaluate(
        &self,
        ctx: &QueryContext<'_>,
        k: usize,
        suggester: &SpellingSuggester,
    ) -> Result<RankedOutcome> {
        let n = ctx.index.corpus_size() as f64;
        let mut accumulators: HashMap<DocId, Accumulator> = HashMap::new();
        let mut suggestions = Vec::new();

        for word in &self.words {
            let mut found = false;
            for (stem, surface) in self.stems_for(ctx, word) {
                let postings = match ctx.index.postings(&stem, false)? {
                    Some(postings) if !postings.is_empty() => postings,
                    _ => continue,
                };
                found = true;
                let wqt = (1.0 + n / postings.len() as f64).ln();
                for posting in postings {
                    let contribution = posting.wdt * wqt;
                    let acc = accumulators.entry(posting.document_id).or_insert_with(|| Accumulator {
                        score: 0.0,
                        posting,
                        terms: Vec::new(),
                    });
                    acc.score += contribution;
                    if !acc.terms.contains(&surface) {
                        acc.terms.push(surface.clone());
                    }
                }
            }
            if !found && !word.contains('*') {
                suggestions.extend(suggester.suggest(word, ctx.index.gram_index()));
            }
        }

        let nonzero = accumulators.values().filter(|a| a.score > 0.0).count();
        let mut heap = BinaryHeap::with_capacity(k.saturating_add(1).min(accumulators.len() + 1));
        if k > 0 {
            for (document_id, acc) in accumulators {
                let length = ctx.index.document_weight(document_id)?;
                let mut result = QueryResult::new(acc.posting, String::new());
                result.matching_terms = acc.terms;
                result.score = if length > 0.0 { acc.score / length } else { 0.0 };
                heap.push(Reverse(Scored(result)));
                if heap.len() > k {
                    heap.pop();
                }
            }
        }
        let results = heap.into_sorted_vec().into_iter().map(|Reverse(Scored(r))| r).collect();
        Ok(RankedOutcome { results, accumulators: nonzero, suggestions })
    }
}
