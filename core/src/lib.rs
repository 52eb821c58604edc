pub mod config;
pub mod corpus;
pub mod disk;
pub mod engine;
pub mod error;
pub mod gram;
pub mod index;
pub mod measure;
pub mod persist;
pub mod posting;
pub mod query;
pub mod spelling;
pub mod tokenizer;
pub mod vocabulary;

pub use config::SearchConfig;
pub use corpus::{DirectoryCorpus, DocumentSource, DocumentText, MemorySource};
pub use disk::{DiskIndex, IndexWriter};
pub use engine::{BuildHandle, Engine, Progress, SearchMode, SearchResults};
pub use error::{Error, Result};
pub use gram::GramIndex;
pub use index::{Index, InMemoryIndex};
pub use measure::{MeasureKit, Measurement};
pub use persist::{DocMeta, IndexPaths, MetaFile};
pub use posting::Posting;
pub use query::{Query, QueryContext, QueryResult, RankedQuery};
pub use spelling::{SpellingSuggester, SpellingSuggestion};
pub use tokenizer::{PorterStemmer, Stemmer};
pub use vocabulary::VocabularyElement;

pub type DocId = u32;
