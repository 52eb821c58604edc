//! Query nodes and their evaluation over any [`Index`].

pub mod merge;
pub mod parser;
pub mod ranked;
mod result;
pub mod wildcard;

pub use ranked::{RankedOutcome, RankedQuery};
pub use result::QueryResult;

use crate::index::Index;
use crate::tokenizer::Stemmer;
use crate::Result;
use merge::{intersect, positional_merge, union};

/// What a query needs to run: the index to read and the stemmer the index was built with.
#[derive(Clone, Copy)]
pub struct QueryContext<'a> {
    pub index: &'a dyn Index,
    pub stemmer: &'a dyn Stemmer,
}

/// A boolean query. Words are stored normalized and are stemmed at evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(String),
    Phrase(Vec<String>),
    Wildcard(String),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Query {
    pub fn parse(text: &str) -> Result<Self> {
        parser::parse(text)
    }

    /// Matching documents by ascending id, or `None` when a required part matched nothing.
    pub fn evaluate(&self, ctx: &QueryContext<'_>) -> Result<Option<Vec<QueryResult>>> {
        match self {
            Query::Term(word) => {
                let stem = ctx.stemmer.stem(word);
                Ok(ctx
                    .index
                    .postings(&stem, false)?
                    .map(|postings| postings.into_iter().map(|p| QueryResult::new(p, word.as_str())).collect()))
            }
            Query::Phrase(words) => {
                let mut merged: Option<Vec<QueryResult>> = None;
                for word in words {
                    let stem = ctx.stemmer.stem(word);
                    let Some(postings) = ctx.index.postings(&stem, true)? else {
                        return Ok(None);
                    };
                    let hits = postings.into_iter().map(|p| QueryResult::new(p, word.as_str())).collect();
                    merged = Some(match merged {
                        None => hits,
                        Some(left) => positional_merge(left, hits),
                    });
                }
                Ok(merged)
            }
            Query::Wildcard(pattern) => wildcard::evaluate(ctx, pattern),
            Query::And(children) => {
                let mut merged: Option<Vec<QueryResult>> = None;
                for child in children {
                    let Some(results) = child.evaluate(ctx)? else {
                        return Ok(None);
                    };
                    merged = Some(match merged {
                        None => results,
                        Some(left) => intersect(left, results),
                    });
                }
                Ok(merged)
            }
            Query::Or(children) => {
                let mut merged = Vec::new();
                for child in children {
                    if let Some(results) = child.evaluate(ctx)? {
                        merged = union(merged, results);
                    }
                }
                Ok(Some(merged))
            }
        }
    }
}
