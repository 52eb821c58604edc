use crate::persist::DocMeta;
use crate::posting::Posting;
use crate::DocId;

/// One matching document.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    pub document_id: DocId,
    /// Posting that produced the match; for phrases it holds the positions of the last word.
    pub posting: Posting,
    /// Surface words that matched, in first-seen order, without duplicates.
    pub matching_terms: Vec<String>,
    /// Ranked score, 0 for boolean queries.
    pub score: f64,
    /// Attached by the engine once evaluation is over.
    pub document: Option<DocMeta>,
}

impl QueryResult {
    pub fn new(posting: Posting, term: impl Into<String>) -> Self {
        Self {
            document_id: posting.document_id,
            posting,
            matching_terms: vec![term.into()],
            score: 0.0,
            document: None,
        }
    }

    pub fn add_matching_term(&mut self, term: &str) {
        if !self.matching_terms.iter().any(|t| t == term) {
            self.matching_terms.push(term.to_string());
        }
    }

    pub fn add_matching_terms<S: AsRef<str>>(&mut self, terms: &[S]) {
        for term in terms {
            self.add_matching_term(term.as_ref());
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.title.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_terms_are_deduplicated_in_order() {
        let mut result = QueryResult::new(Posting::with_position(4, "whale", 0), "whales");
        result.add_matching_terms(&["ship", "whales", "sea", "ship"]);
        assert_eq!(result.matching_terms, vec!["whales", "ship", "sea"]);
        assert_eq!(result.document_id, 4);
        assert!(result.title().is_none());
    }
}
