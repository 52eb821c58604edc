use crate::persist::{DocMeta, INDEX_DIRECTORY};
use crate::{DocId, Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Text of one document as handed to the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentText {
    /// Title found inside the document, if its format carries one.
    pub title: Option<String>,
    pub body: String,
}

/// A numbered set of documents. Ids are dense, starting at 1, in `documents()` order.
pub trait DocumentSource: Send {
    fn documents(&self) -> &[DocMeta];

    fn content(&self, document_id: DocId) -> Result<DocumentText>;
}

#[derive(Deserialize)]
struct JsonDocument {
    body: String,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn format_of(path: &Path) -> Option<Format> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("txt") => Some(Format::Text),
        Some("json") => Some(Format::Json),
        _ => None,
    }
}

/// `.txt` and `.json` files under a directory, numbered in path order.
///
/// The `index/` directory an index is written to is never part of the corpus.
pub struct DirectoryCorpus {
    root: PathBuf,
    documents: Vec<DocMeta>,
}

impl DirectoryCorpus {
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("corpus directory {} not found", root.display()),
            )));
        }
        let index_dir = root.join(INDEX_DIRECTORY);
        let mut files = Vec::new();
        for entry in WalkDir::new(&root).into_iter().filter_entry(|e| e.path() != index_dir.as_path()) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable corpus entry");
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            if format_of(path).is_none() {
                debug!(path = %path.display(), "skipping file with unknown extension");
                continue;
            }
            if let Ok(relative) = path.strip_prefix(&root) {
                files.push(relative.to_path_buf());
            }
        }
        files.sort();

        let documents = files
            .into_iter()
            .enumerate()
            .map(|(i, relative)| DocMeta {
                document_id: i as DocId + 1,
                title: relative
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                path: Some(relative.to_string_lossy().replace('\\', "/")),
            })
            .collect::<Vec<_>>();
        debug!(root = %root.display(), documents = documents.len(), "corpus enumerated");
        Ok(Self { root, documents })
    }

    pub fn root(&self) -> &Path { &self.root }

    pub fn len(&self) -> usize { self.documents.len() }

    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
}

impl DocumentSource for DirectoryCorpus {
    fn documents(&self) -> &[DocMeta] { &self.documents }

    fn content(&self, document_id: DocId) -> Result<DocumentText> {
        let doc = document_id
            .checked_sub(1)
            .and_then(|i| self.documents.get(i as usize))
            .ok_or_else(|| Error::Document { document_id, reason: "unknown document".into() })?;
        let relative = doc.path.as_deref().unwrap_or_default();
        read_document(&self.root.join(relative))
            .map_err(|e| Error::Document { document_id, reason: e.to_string() })
    }
}

/// Read a corpus file: plain text is the body as is, JSON needs a `body` and may have a `title`.
pub fn read_document(path: &Path) -> Result<DocumentText> {
    let format = format_of(path).ok_or_else(|| {
        Error::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("unsupported document {}", path.display()),
        ))
    })?;
    let raw = fs::read_to_string(path)?;
    match format {
        Format::Text => Ok(DocumentText { title: None, body: raw }),
        Format::Json => {
            let doc: JsonDocument = serde_json::from_str(&raw)?;
            Ok(DocumentText { title: doc.title, body: doc.body })
        }
    }
}

/// Documents held in memory, numbered in insertion order.
#[derive(Default)]
pub struct MemorySource {
    documents: Vec<DocMeta>,
    bodies: Vec<String>,
}

impl MemorySource {
    pub fn new() -> Self { Self::default() }

    pub fn push(&mut self, title: impl Into<String>, body: impl Into<String>) -> DocId {
        let document_id = self.documents.len() as DocId + 1;
        self.documents.push(DocMeta { document_id, title: title.into(), path: None });
        self.bodies.push(body.into());
        document_id
    }

    pub fn from_bodies<I, S>(bodies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut source = Self::new();
        for body in bodies {
            let title = format!("Document {}", source.documents.len() + 1);
            source.push(title, body);
        }
        source
    }
}

impl DocumentSource for MemorySource {
    fn documents(&self) -> &[DocMeta] { &self.documents }

    fn content(&self, document_id: DocId) -> Result<DocumentText> {
        document_id
            .checked_sub(1)
            .and_then(|i| self.bodies.get(i as usize))
            .map(|body| DocumentText { title: None, body: body.clone() })
            .ok_or_else(|| Error::Document { document_id, reason: "unknown document".into() })
    }
}
