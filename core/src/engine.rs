use crate::config::SearchConfig;
use crate::corpus::{read_document, DocumentSource, DocumentText};
use crate::disk::{DiskIndex, IndexWriter};
use crate::index::{Index, InMemoryIndex};
use crate::persist::{load_docs, DocMeta, IndexPaths, MetaFile};
use crate::query::{Query, QueryContext, QueryResult, RankedQuery};
use crate::spelling::{SpellingSuggester, SpellingSuggestion};
use crate::tokenizer::{query_words, tokenize, Stemmer};
use crate::{DocId, Error, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Boolean,
    Ranked,
}

impl FromStr for SearchMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "boolean" | "bool" => Ok(SearchMode::Boolean),
            "ranked" | "rank" => Ok(SearchMode::Ranked),
            other => Err(Error::Parse(format!("unknown search mode {other:?}"))),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Boolean => write!(f, "boolean"),
            SearchMode::Ranked => write!(f, "ranked"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    pub hits: Vec<QueryResult>,
    /// Documents that got a non-zero score; always 0 in boolean mode.
    pub accumulators: usize,
    /// Corrections proposed while this query ran. They are also added to the engine's pool.
    pub suggestions: Vec<SpellingSuggestion>,
}

/// Checkpoints reported while an index is built.
#[derive(Debug, Clone, PartialEq)]
pub enum Progress {
    IndexingStarted { total: usize },
    DocumentIndexed { document_id: DocId, indexed: usize, total: usize },
    DocumentSkipped { document_id: DocId, reason: String },
    GramsStarted { total: usize },
    TypeRegistered { registered: usize, total: usize },
    Finished,
}

/// A build running on its own thread.
pub struct BuildHandle {
    pub progress: Receiver<Progress>,
    handle: JoinHandle<Result<Engine>>,
}

impl BuildHandle {
    /// Wait for the build to finish. Progress events not yet received stay in `progress`.
    pub fn join(self) -> Result<Engine> {
        self.handle.join().map_err(|_| Error::Internal("index build thread panicked".into()))?
    }
}

enum Environment {
    Memory(InMemoryIndex),
    Disk(DiskIndex),
}

impl Environment {
    fn index(&self) -> &dyn Index {
        match self {
            Environment::Memory(index) => index,
            Environment::Disk(index) => index,
        }
    }
}

/// Oldest pooled suggestions are dropped beyond this many.
const SUGGESTION_POOL_LIMIT: usize = 256;

/// One search session: an index, the stemmer it was built with, and document metadata.
pub struct Engine {
    environment: Environment,
    stemmer: Box<dyn Stemmer>,
    documents: Vec<DocMeta>,
    corpus_root: Option<PathBuf>,
    config: SearchConfig,
    suggester: SpellingSuggester,
    suggestions: Mutex<Vec<SpellingSuggestion>>,
}

impl Engine {
    fn new(
        environment: Environment,
        stemmer: Box<dyn Stemmer>,
        documents: Vec<DocMeta>,
        corpus_root: Option<PathBuf>,
        config: SearchConfig,
    ) -> Self {
        let suggester = SpellingSuggester::new(config.jaccard_threshold);
        Self { environment, stemmer, documents, corpus_root, config, suggester, suggestions: Mutex::new(Vec::new()) }
    }

    /// Index every document of `source` in memory.
    ///
    /// Runs in two phases: postings for all documents, then grams for all surface
    /// forms. A document that cannot be read is skipped; it keeps its id and a zero weight.
    pub fn build<S, F>(source: &S, stemmer: Box<dyn Stemmer>, config: SearchConfig, mut observer: F) -> Result<Self>
    where
        S: DocumentSource + ?Sized,
        F: FnMut(Progress),
    {
        let mut documents = source.documents().to_vec();
        for (i, doc) in documents.iter().enumerate() {
            if doc.document_id as usize != i + 1 {
                return Err(Error::InvalidIndex(format!(
                    "document ids must be dense from 1, found {} at slot {}",
                    doc.document_id,
                    i + 1
                )));
            }
        }
        let total = documents.len();
        info!(total, "indexing started");
        observer(Progress::IndexingStarted { total });

        let mut index = InMemoryIndex::new();
        let mut skipped = 0usize;
        for (i, doc) in documents.iter_mut().enumerate() {
            let document_id = doc.document_id;
            let text = match source.content(document_id) {
                Ok(text) => text,
                Err(e) => {
                    skipped += 1;
                    warn!(document_id, error = %e, "skipping document");
                    observer(Progress::DocumentSkipped { document_id, reason: e.to_string() });
                    continue;
                }
            };
            if let Some(title) = text.title.filter(|t| !t.trim().is_empty()) {
                doc.title = title;
            }
            for token in tokenize(&text.body, config.remove_stopwords) {
                let stem = stemmer.stem(&token.surface);
                if stem.is_empty() {
                    continue;
                }
                index.add_term(&stem, document_id, token.position);
                index.record_type(&token.surface, &stem);
            }
            observer(Progress::DocumentIndexed { document_id, indexed: i + 1, total });
        }
        index.compute_weights(total);
        info!(num_docs = total, skipped, num_terms = index.term_count(), "ingested documents");

        let types = index.type_count();
        observer(Progress::GramsStarted { total: types });
        index.register_grams(|registered, total| observer(Progress::TypeRegistered { registered, total }));
        info!(num_types = types, num_grams = index.gram_index().len(), "grams registered");
        observer(Progress::Finished);

        Ok(Self::new(Environment::Memory(index), stemmer, documents, None, config))
    }

    /// [`Engine::build`] on a worker thread, reporting progress over a channel.
    pub fn spawn_build<S>(source: S, stemmer: Box<dyn Stemmer>, config: SearchConfig) -> BuildHandle
    where
        S: DocumentSource + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || {
            Engine::build(&source, stemmer, config, |progress| {
                // the receiver may be gone; the build still completes
                let _ = tx.send(progress);
            })
        });
        BuildHandle { progress: rx, handle }
    }

    /// Open the index previously written under `<corpus_root>/index/`.
    pub fn open<P: AsRef<Path>>(corpus_root: P, stemmer: Box<dyn Stemmer>, config: SearchConfig) -> Result<Self> {
        let index = DiskIndex::open(corpus_root.as_ref())?;
        let documents = load_docs(index.paths())?;
        if documents.len() != index.corpus_size() {
            return Err(Error::corrupt(
                "docs.bin",
                format!("{} documents for an index of {}", documents.len(), index.corpus_size()),
            ));
        }
        let root = index.paths().corpus_root.clone();
        Ok(Self::new(Environment::Disk(index), stemmer, documents, Some(root), config))
    }

    /// Persist an in-memory index under `<corpus_root>/index/`.
    pub fn write<P: AsRef<Path>>(&mut self, corpus_root: P) -> Result<MetaFile> {
        let Environment::Memory(index) = &self.environment else {
            return Err(Error::InvalidIndex("index is already on disk".into()));
        };
        let paths = IndexPaths::new(corpus_root);
        let meta = IndexWriter::new(paths.clone()).write(index, &self.documents)?;
        self.corpus_root = Some(paths.corpus_root);
        Ok(meta)
    }

    /// Release on-disk file handles. A no-op for an in-memory index.
    pub fn close(&self) {
        if let Environment::Disk(index) = &self.environment {
            index.close();
        }
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self.environment, Environment::Disk(_))
    }

    pub fn index(&self) -> &dyn Index {
        self.environment.index()
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    fn context(&self) -> QueryContext<'_> {
        QueryContext { index: self.environment.index(), stemmer: self.stemmer.as_ref() }
    }

    /// Run a query. Boolean mode returns every match, ranked mode the configured top k.
    ///
    /// Suggestions from ranked queries are also added to the pool drained by
    /// [`take_suggestions`](Self::take_suggestions).
    pub fn evaluate(&self, text: &str, mode: SearchMode) -> Result<SearchResults> {
        let results = self.search(text, mode, None)?;
        if !results.suggestions.is_empty() {
            let mut pool = self.suggestions.lock();
            pool.extend(results.suggestions.iter().cloned());
            let excess = pool.len().saturating_sub(SUGGESTION_POOL_LIMIT);
            pool.drain(..excess);
        }
        Ok(results)
    }

    /// Run a query and keep at most `k` hits in either mode.
    ///
    /// Suggestions are only returned with the results, never pooled.
    pub fn evaluate_top(&self, text: &str, mode: SearchMode, k: usize) -> Result<SearchResults> {
        self.search(text, mode, Some(k))
    }

    fn search(&self, text: &str, mode: SearchMode, limit: Option<usize>) -> Result<SearchResults> {
        let ctx = self.context();
        let mut results = match mode {
            SearchMode::Boolean => {
                let query = Query::parse(text)?;
                let mut hits = query.evaluate(&ctx)?.unwrap_or_default();
                if let Some(k) = limit {
                    hits.truncate(k);
                }
                SearchResults { hits, ..SearchResults::default() }
            }
            SearchMode::Ranked => {
                let query = RankedQuery::parse(text)?;
                let k = limit.unwrap_or(self.config.top_k);
                let outcome = query.evaluate(&ctx, k, &self.suggester)?;
                SearchResults {
                    hits: outcome.results,
                    accumulators: outcome.accumulators,
                    suggestions: outcome.suggestions,
                }
            }
        };
        for hit in results.hits.iter_mut() {
            hit.document = self.document(hit.document_id).cloned();
        }
        debug!(query = text, %mode, hits = results.hits.len(), "query evaluated");
        Ok(results)
    }

    pub fn vocabulary(&self) -> Result<Vec<String>> {
        self.environment.index().vocabulary()
    }

    pub fn suggest_correction(&self, term: &str) -> Option<SpellingSuggestion> {
        let words = query_words(term);
        let [word] = words.as_slice() else {
            return None;
        };
        self.suggester.suggest(word, self.environment.index().gram_index())
    }

    /// Drain the suggestions collected by ranked queries.
    pub fn take_suggestions(&self) -> Vec<SpellingSuggestion> {
        std::mem::take(&mut *self.suggestions.lock())
    }

    pub fn document(&self, document_id: DocId) -> Option<&DocMeta> {
        document_id.checked_sub(1).and_then(|i| self.documents.get(i as usize))
    }

    pub fn documents(&self) -> &[DocMeta] { &self.documents }

    /// Re-read a document from the corpus directory, when the engine knows where that is.
    pub fn document_text(&self, document_id: DocId) -> Result<Option<DocumentText>> {
        let (Some(root), Some(doc)) = (&self.corpus_root, self.document(document_id)) else {
            return Ok(None);
        };
        match &doc.path {
            Some(path) => read_document(&root.join(path)).map(Some),
            None => Ok(None),
        }
    }
}
