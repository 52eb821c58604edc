use crate::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Tunables shared by the build pipeline and the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Number of documents returned by a ranked query.
    pub top_k: usize,
    /// Minimum Jaccard coefficient (exclusive) a spelling candidate must reach.
    pub jaccard_threshold: f64,
    /// Drop English stopwords while tokenizing. Positions keep their slots.
    pub remove_stopwords: bool,
    /// Result cap applied per query by the measurement harness.
    pub measure_max_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { top_k: 10, jaccard_threshold: 0.6, remove_stopwords: false, measure_max_results: 50 }
    }
}

impl SearchConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SearchConfig = serde_json::from_str(r#"{ "top_k": 25 }"#).unwrap();
        assert_eq!(config.top_k, 25);
        assert_eq!(config.jaccard_threshold, 0.6);
        assert!(!config.remove_stopwords);
    }

    #[test]
    fn top_k_never_zero() {
        assert_eq!(SearchConfig::default().with_top_k(0).top_k, 1);
    }
}
