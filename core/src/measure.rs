use crate::engine::{Engine, SearchMode};
use crate::query::QueryResult;
use crate::{DocId, Error, Result};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

/// Figures gathered over one run of a query file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Measurement {
    pub mode: SearchMode,
    pub total_queries: usize,
    /// Seconds spent evaluating all queries.
    pub total_time: f64,
    pub mean_response_time: f64,
    /// Queries per second.
    pub throughput: f64,
    pub mean_average_precision: Option<f64>,
    pub mean_accumulators: Option<f64>,
}

/// Runs a fixed query set against an engine and scores the answers against known relevant documents.
pub struct MeasureKit<'a> {
    engine: &'a Engine,
    queries: Vec<String>,
    relevant: Vec<HashSet<DocId>>,
    max_results: usize,
}

/// One line of whitespace-separated document numbers.
fn parse_relevant(line: &str, number: usize) -> Result<HashSet<DocId>> {
    line.split_whitespace()
        .map(|id| {
            id.parse::<DocId>()
                .map_err(|_| Error::Parse(format!("relevance line {number}: {id:?} is not a document number")))
        })
        .collect()
}

/// Number a result is judged by: the numeric file stem of its path, else its id.
fn judged_id(hit: &QueryResult) -> DocId {
    hit.document
        .as_ref()
        .and_then(|d| d.path.as_deref())
        .and_then(|p| Path::new(p).file_stem())
        .and_then(|s| s.to_str())
        .and_then(|s| s.parse().ok())
        .unwrap_or(hit.document_id)
}

/// Mean of the precision values at each relevant hit, over all relevant documents.
pub fn average_precision(ranked: &[DocId], relevant: &HashSet<DocId>) -> f64 {
    if relevant.is_empty() {
        return 0.0;
    }
    let mut found = 0usize;
    let mut sum = 0.0;
    for (rank, id) in ranked.iter().enumerate() {
        if relevant.contains(id) {
            found += 1;
            sum += found as f64 / (rank + 1) as f64;
        }
    }
    sum / relevant.len() as f64
}

impl<'a> MeasureKit<'a> {
    pub fn new(engine: &'a Engine, queries: Vec<String>, relevant: Vec<HashSet<DocId>>) -> Result<Self> {
        if queries.len() != relevant.len() {
            return Err(Error::Parse(format!(
                "{} queries but {} relevance lines",
                queries.len(),
                relevant.len()
            )));
        }
        let max_results = engine.config().measure_max_results;
        Ok(Self { engine, queries, relevant, max_results })
    }

    /// Read one query per line from `queries` and the matching relevant ids from `qrel`.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(engine: &'a Engine, queries: P, qrel: Q) -> Result<Self> {
        let queries: Vec<String> = fs::read_to_string(queries)?.lines().map(str::to_string).collect();
        let relevant = fs::read_to_string(qrel)?
            .lines()
            .enumerate()
            .map(|(i, line)| parse_relevant(line, i + 1))
            .collect::<Result<Vec<_>>>()?;
        Self::new(engine, queries, relevant)
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results.max(1);
        self
    }

    pub fn run(&self, mode: SearchMode) -> Result<Measurement> {
        let mut total_time = 0.0;
        let mut precision_sum = 0.0;
        let mut accumulator_sum = 0usize;
        for (query, relevant) in self.queries.iter().zip(&self.relevant) {
            let started = Instant::now();
            let results = self.engine.evaluate_top(query, mode, self.max_results)?;
            total_time += started.elapsed().as_secs_f64();

            let ranked: Vec<DocId> = results.hits.iter().map(judged_id).collect();
            precision_sum += average_precision(&ranked, relevant);
            accumulator_sum += results.accumulators;
        }

        let total_queries = self.queries.len();
        let per_query = |sum: f64| if total_queries == 0 { 0.0 } else { sum / total_queries as f64 };
        let ranked = mode == SearchMode::Ranked;
        let measurement = Measurement {
            mode,
            total_queries,
            total_time,
            mean_response_time: per_query(total_time),
            throughput: if total_time > 0.0 { total_queries as f64 / total_time } else { 0.0 },
            mean_average_precision: ranked.then(|| per_query(precision_sum)),
            mean_accumulators: ranked.then(|| per_query(accumulator_sum as f64)),
        };
        info!(
            %mode,
            total_queries,
            mean_response_time = measurement.mean_response_time,
            map = ?measurement.mean_average_precision,
            "measurement finished"
        );
        Ok(measurement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::DocMeta;
    use crate::posting::Posting;

    #[test]
    fn precision_averages_over_relevant_set() {
        let relevant: HashSet<DocId> = [1, 3, 9].into_iter().collect();
        // hits at rank 1 and 3: (1/1 + 2/3) / 3
        let ap = average_precision(&[1, 2, 3, 4], &relevant);
        assert!((ap - (1.0 + 2.0 / 3.0) / 3.0).abs() < 1e-12);
        assert_eq!(average_precision(&[1], &HashSet::new()), 0.0);
    }

    #[test]
    fn judged_by_file_stem() {
        let mut hit = QueryResult::new(Posting::new(2, "whale"), "whale");
        assert_eq!(judged_id(&hit), 2);
        hit.document = Some(DocMeta { document_id: 2, title: "x".into(), path: Some("docs/17.json".into()) });
        assert_eq!(judged_id(&hit), 17);
        hit.document = Some(DocMeta { document_id: 2, title: "x".into(), path: Some("moby.txt".into()) });
        assert_eq!(judged_id(&hit), 2);
    }

    #[test]
    fn relevance_lines_must_be_numbers() {
        assert_eq!(parse_relevant("3 1  2", 1).unwrap().len(), 3);
        assert!(parse_relevant("3 x", 4).unwrap_err().is_parse());
    }
}
