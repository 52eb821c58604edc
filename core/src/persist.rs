use crate::{DocId, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

pub const INDEX_DIRECTORY: &str = "index";
pub const FORMAT_VERSION: u32 = 1;
/// Width in bytes of dft, document ids, tftd and position gaps.
pub const POSTINGS_WIDTH: u32 = 4;
/// Width in bytes of every file offset.
pub const OFFSETS_WIDTH: u32 = 8;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaFile {
    pub num_docs: u32,
    pub num_terms: u32,
    pub created_at: String,
    pub version: u32,
    pub postings_width: u32,
    pub offsets_width: u32,
}

impl MetaFile {
    pub fn new(num_docs: u32, num_terms: u32, created_at: String) -> Self {
        Self {
            num_docs,
            num_terms,
            created_at,
            version: FORMAT_VERSION,
            postings_width: POSTINGS_WIDTH,
            offsets_width: OFFSETS_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocMeta {
    pub document_id: DocId,
    pub title: String,
    /// Path of the source file relative to the corpus root, when the document came from disk.
    pub path: Option<String>,
}

/// File locations of an on-disk index rooted at `<corpus>/index/`.
#[derive(Debug, Clone)]
pub struct IndexPaths {
    pub corpus_root: PathBuf,
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(corpus_root: P) -> Self {
        let corpus_root = corpus_root.as_ref().to_path_buf();
        Self { root: corpus_root.join(INDEX_DIRECTORY), corpus_root }
    }
    pub fn vocabulary(&self) -> PathBuf { self.root.join("vocab.bin") }
    pub fn postings(&self) -> PathBuf { self.root.join("postings.bin") }
    pub fn table(&self) -> PathBuf { self.root.join("vocab_table.bin") }
    pub fn weights(&self) -> PathBuf { self.root.join("weights.bin") }
    pub fn types(&self) -> PathBuf { self.root.join("types.bin") }
    pub fn grams(&self) -> PathBuf { self.root.join("grams.bin") }
    pub fn docs(&self) -> PathBuf { self.root.join("docs.bin") }
    pub fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn save_docs(paths: &IndexPaths, docs: &[DocMeta]) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.docs())?;
    let bytes = bincode::serialize(docs)?;
    f.write_all(&bytes)?;
    Ok(())
}

pub fn load_docs(paths: &IndexPaths) -> Result<Vec<DocMeta>> {
    let mut f = File::open(paths.docs())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let docs = bincode::deserialize(&buf)?;
    Ok(docs)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<()> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

/// Load `meta.json` and check that the index was written with the widths this build reads.
pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    if meta.version != FORMAT_VERSION {
        return Err(Error::InvalidIndex(format!("unsupported index version {}", meta.version)));
    }
    if meta.postings_width != POSTINGS_WIDTH || meta.offsets_width != OFFSETS_WIDTH {
        return Err(Error::InvalidIndex(format!(
            "index written with widths ({}, {}), expected ({POSTINGS_WIDTH}, {OFFSETS_WIDTH})",
            meta.postings_width, meta.offsets_width
        )));
    }
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn meta_rejects_other_widths() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let mut meta = MetaFile::new(3, 10, "2024-01-01T00:00:00Z".into());
        save_meta(&paths, &meta).unwrap();
        assert_eq!(load_meta(&paths).unwrap(), meta);

        meta.postings_width = 8;
        save_meta(&paths, &meta).unwrap();
        assert!(matches!(load_meta(&paths), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn docs_survive_reload() {
        let dir = tempdir().unwrap();
        let paths = IndexPaths::new(dir.path());
        let docs = vec![
            DocMeta { document_id: 1, title: "Moby Dick".into(), path: Some("1.txt".into()) },
            DocMeta { document_id: 2, title: "Untitled".into(), path: None },
        ];
        save_docs(&paths, &docs).unwrap();
        assert_eq!(load_docs(&paths).unwrap(), docs);
        assert!(paths.docs().starts_with(dir.path().join("index")));
    }
}
