use super::binary_file::BinaryReader;
use super::TABLE_ENTRY_SIZE;
use crate::gram::GramIndex;
use crate::index::Index;
use crate::persist::{load_meta, IndexPaths, MetaFile};
use crate::posting::{decode_gaps, Posting};
use crate::vocabulary::VocabularyElement;
use crate::{DocId, Error, Result};
use byteorder::{LittleEndian, ReadBytesExt};
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::fs;
use std::io::{self, Cursor, ErrorKind, Read};
use std::path::Path;
use tracing::{debug, info};

struct DiskFiles {
    postings: BinaryReader,
    vocabulary: BinaryReader,
    table: BinaryReader,
    weights: BinaryReader,
}

/// Read-only index backed by the files an [`IndexWriter`](super::IndexWriter) produced.
///
/// Terms are found by binary search over `vocab_table.bin`; posting lists are read
/// on demand. The gram map is small and loaded whole at open time.
pub struct DiskIndex {
    paths: IndexPaths,
    meta: MetaFile,
    gram_index: GramIndex,
    files: Mutex<Option<DiskFiles>>,
}

impl DiskIndex {
    /// Open the index stored under `<corpus_root>/index/`.
    pub fn open<P: AsRef<Path>>(corpus_root: P) -> Result<Self> {
        let paths = IndexPaths::new(corpus_root);
        let meta = load_meta(&paths).map_err(|e| match e {
            Error::Io(io) if io.kind() == ErrorKind::NotFound => {
                Error::InvalidIndex(format!("no index found at {}", paths.root.display()))
            }
            other => other,
        })?;
        let files = DiskFiles {
            postings: BinaryReader::open(&paths.postings())?,
            vocabulary: BinaryReader::open(&paths.vocabulary())?,
            table: BinaryReader::open(&paths.table())?,
            weights: BinaryReader::open(&paths.weights())?,
        };
        if files.table.size() % TABLE_ENTRY_SIZE != 0 {
            return Err(Error::corrupt(files.table.name(), "size is not a multiple of the entry size"));
        }
        if files.table.size() / TABLE_ENTRY_SIZE != meta.num_terms as u64 {
            return Err(Error::corrupt(
                files.table.name(),
                format!("{} entries for {} terms", files.table.size() / TABLE_ENTRY_SIZE, meta.num_terms),
            ));
        }
        if files.weights.size() != meta.num_docs as u64 * 8 {
            return Err(Error::corrupt(
                files.weights.name(),
                format!("{} bytes for {} documents", files.weights.size(), meta.num_docs),
            ));
        }
        let gram_index = read_gram_index(&paths)?;
        info!(
            num_docs = meta.num_docs,
            num_terms = meta.num_terms,
            num_grams = gram_index.len(),
            path = %paths.root.display(),
            "index opened"
        );
        Ok(Self { paths, meta, gram_index, files: Mutex::new(Some(files)) })
    }

    pub fn meta(&self) -> &MetaFile { &self.meta }

    pub fn paths(&self) -> &IndexPaths { &self.paths }

    /// Release the file handles. Lookups afterwards fail with [`Error::InvalidIndex`].
    pub fn close(&self) {
        if self.files.lock().take().is_some() {
            debug!(path = %self.paths.root.display(), "index closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.files.lock().is_none()
    }

    /// Postings-file offset of `term`, or `None` when it is not in the vocabulary.
    pub fn find_term(&self, term: &str) -> Result<Option<u64>> {
        self.with_files(|files| files.find_term(term))
    }

    fn with_files<T>(&self, f: impl FnOnce(&mut DiskFiles) -> Result<T>) -> Result<T> {
        let mut guard = self.files.lock();
        let files = guard
            .as_mut()
            .ok_or_else(|| Error::InvalidIndex(format!("index at {} is closed", self.paths.root.display())))?;
        f(files)
    }
}

impl DiskFiles {
    fn entries(&self) -> u64 {
        self.table.size() / TABLE_ENTRY_SIZE
    }

    fn find_term(&mut self, target: &str) -> Result<Option<u64>> {
        let entries = self.entries();
        let (mut low, mut high) = (0u64, entries);
        while low < high {
            let middle = low + (high - low) / 2;
            let (term, postings_offset) = self.entry(middle, entries)?;
            match term.as_str().cmp(target) {
                Ordering::Equal => return Ok(Some(postings_offset)),
                Ordering::Greater => high = middle,
                Ordering::Less => low = middle + 1,
            }
        }
        Ok(None)
    }

    /// Term text and postings offset of table entry `i`.
    fn entry(&mut self, i: u64, entries: u64) -> Result<(String, u64)> {
        self.table.seek(i * TABLE_ENTRY_SIZE)?;
        let vocab_offset = self.table.read_u64()?;
        let postings_offset = self.table.read_u64()?;
        let end = if i + 1 < entries { self.table.read_u64()? } else { self.vocabulary.size() };
        if end < vocab_offset {
            return Err(Error::corrupt(self.table.name(), format!("vocabulary offsets decrease at entry {i}")));
        }
        if end > self.vocabulary.size() {
            return Err(Error::corrupt(self.table.name(), format!("entry {i} points outside vocab.bin")));
        }
        let bytes = self.vocabulary.read_exact_at(vocab_offset, (end - vocab_offset) as usize)?;
        let term = String::from_utf8(bytes)
            .map_err(|_| Error::corrupt(self.vocabulary.name(), format!("entry {i} is not valid UTF-8")))?;
        Ok((term, postings_offset))
    }

    fn read_postings(&mut self, offset: u64, term: &str, with_positions: bool) -> Result<Vec<Posting>> {
        self.postings.seek(offset)?;
        let dft = self.postings.read_u32()?;
        let mut postings = Vec::with_capacity(dft.min(1 << 16) as usize);
        for _ in 0..dft {
            let mut posting = Posting::new(self.postings.read_u32()?, term);
            posting.wdt = self.postings.read_f64()?;
            posting.tftd = self.postings.read_u32()?;
            if with_positions {
                let gaps = (0..posting.tftd).map(|_| self.postings.read_u32()).collect::<Result<Vec<_>>>()?;
                posting.positions = decode_gaps(&gaps).ok_or_else(|| {
                    Error::corrupt(self.postings.name(), format!("positions of {term:?} are not increasing"))
                })?;
            } else {
                self.postings.skip(posting.tftd as u64 * 4)?;
            }
            postings.push(posting);
        }
        Ok(postings)
    }

    fn read_vocabulary(&mut self) -> Result<Vec<String>> {
        let table = self.table.read_to_end_at(0)?;
        let vocabulary = self.vocabulary.read_to_end_at(0)?;
        let offsets: Vec<u64> = table
            .chunks_exact(TABLE_ENTRY_SIZE as usize)
            .map(|entry| Cursor::new(entry).read_u64::<LittleEndian>())
            .collect::<io::Result<_>>()?;

        let mut terms = Vec::with_capacity(offsets.len());
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(vocabulary.len() as u64);
            let bytes = vocabulary
                .get(start as usize..end as usize)
                .ok_or_else(|| Error::corrupt(self.table.name(), format!("entry {i} points outside vocab.bin")))?;
            let term = std::str::from_utf8(bytes)
                .map_err(|_| Error::corrupt(self.vocabulary.name(), format!("entry {i} is not valid UTF-8")))?;
            terms.push(term.to_string());
        }
        Ok(terms)
    }

    fn read_weight(&mut self, document_id: DocId) -> Result<f64> {
        let slot = (document_id as u64).checked_sub(1).map(|i| i * 8).filter(|&o| o < self.weights.size());
        let offset = slot.ok_or_else(|| Error::InvalidIndex(format!("no weight for document {document_id}")))?;
        self.weights.seek(offset)?;
        self.weights.read_f64()
    }
}

impl Index for DiskIndex {
    fn postings(&self, stem: &str, with_positions: bool) -> Result<Option<Vec<Posting>>> {
        self.with_files(|files| match files.find_term(stem)? {
            Some(offset) => files.read_postings(offset, stem, with_positions).map(Some),
            None => Ok(None),
        })
    }

    fn vocabulary(&self) -> Result<Vec<String>> {
        self.with_files(DiskFiles::read_vocabulary)
    }

    fn document_weight(&self, document_id: DocId) -> Result<f64> {
        self.with_files(|files| files.read_weight(document_id))
    }

    fn corpus_size(&self) -> usize { self.meta.num_docs as usize }

    fn gram_index(&self) -> &GramIndex { &self.gram_index }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => Error::InvalidIndex(format!("missing index file {}", path.display())),
        _ => Error::Io(e),
    })
}

fn slice_str(data: &[u8], offset: u64, len: u32, file: &str) -> Result<String> {
    let start = offset as usize;
    let bytes = start
        .checked_add(len as usize)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| Error::corrupt(file, format!("span {offset}+{len} outside file")))?;
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| Error::corrupt(file, format!("span {offset}+{len} is not valid UTF-8")))
}

/// Rebuild the gram map from `grams.bin`, resolving stems in `vocab.bin` and types in `types.bin`.
fn read_gram_index(paths: &IndexPaths) -> Result<GramIndex> {
    let grams = read_file(&paths.grams())?;
    let vocabulary = read_file(&paths.vocabulary())?;
    let types = read_file(&paths.types())?;
    let eof = |_: io::Error| Error::corrupt("grams.bin", "unexpected end of file");

    let mut index = GramIndex::new();
    let mut cursor = Cursor::new(grams.as_slice());
    while (cursor.position() as usize) < grams.len() {
        let gram_len = cursor.read_u32::<LittleEndian>().map_err(eof)?;
        if gram_len as u64 > grams.len() as u64 - cursor.position() {
            return Err(Error::corrupt("grams.bin", format!("gram of {gram_len} bytes past end of file")));
        }
        let mut gram = vec![0u8; gram_len as usize];
        cursor.read_exact(&mut gram).map_err(eof)?;
        let gram = String::from_utf8(gram).map_err(|_| Error::corrupt("grams.bin", "gram is not valid UTF-8"))?;
        let count = cursor.read_u32::<LittleEndian>().map_err(eof)?;
        for _ in 0..count {
            let stem_offset = cursor.read_u64::<LittleEndian>().map_err(eof)?;
            let stem_len = cursor.read_u32::<LittleEndian>().map_err(eof)?;
            let type_offset = cursor.read_u64::<LittleEndian>().map_err(eof)?;
            let type_len = cursor.read_u32::<LittleEndian>().map_err(eof)?;
            let stem = slice_str(&vocabulary, stem_offset, stem_len, "vocab.bin")?;
            let type_ = slice_str(&types, type_offset, type_len, "types.bin")?;
            index.insert(gram.clone(), VocabularyElement::new(type_, stem));
        }
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::IndexWriter;
    use crate::index::InMemoryIndex;
    use crate::persist::DocMeta;
    use tempfile::tempdir;

    fn docs(n: u32) -> Vec<DocMeta> {
        (1..=n).map(|id| DocMeta { document_id: id, title: format!("doc {id}"), path: None }).collect()
    }

    fn write(dir: &Path, index: &mut InMemoryIndex, n: u32) {
        index.compute_weights(n as usize);
        index.register_grams(|_, _| {});
        IndexWriter::new(IndexPaths::new(dir)).write(index, &docs(n)).unwrap();
    }

    #[test]
    fn empty_table_finds_nothing() {
        let dir = tempdir().unwrap();
        write(dir.path(), &mut InMemoryIndex::new(), 0);
        let index = DiskIndex::open(dir.path()).unwrap();
        assert_eq!(index.find_term("anything").unwrap(), None);
        assert!(index.vocabulary().unwrap().is_empty());
        assert!(index.gram_index().is_empty());
    }

    #[test]
    fn single_entry_table() {
        let dir = tempdir().unwrap();
        let mut memory = InMemoryIndex::new();
        memory.add_term("whale", 1, 0);
        memory.record_type("whale", "whale");
        write(dir.path(), &mut memory, 1);

        let index = DiskIndex::open(dir.path()).unwrap();
        assert_eq!(index.find_term("whale").unwrap(), Some(0));
        assert_eq!(index.find_term("a").unwrap(), None);
        assert_eq!(index.find_term("zebra").unwrap(), None);
        assert_eq!(index.vocabulary().unwrap(), vec!["whale"]);
    }

    #[test]
    fn postings_with_and_without_positions() {
        let dir = tempdir().unwrap();
        let mut memory = InMemoryIndex::new();
        for (term, doc, pos) in [("sea", 1, 0), ("whale", 1, 1), ("whale", 1, 4), ("sea", 2, 2), ("ship", 2, 3)] {
            memory.add_term(term, doc, pos);
        }
        write(dir.path(), &mut memory, 2);

        let index = DiskIndex::open(dir.path()).unwrap();
        let full = index.postings("whale", true).unwrap().unwrap();
        assert_eq!(full.len(), 1);
        assert_eq!(full[0].positions, vec![1, 4]);
        assert_eq!(full[0].tftd, 2);

        let bare = index.postings("sea", false).unwrap().unwrap();
        assert_eq!(bare.iter().map(|p| p.document_id).collect::<Vec<_>>(), vec![1, 2]);
        assert!(bare.iter().all(|p| p.positions.is_empty() && p.tftd == 1 && p.wdt == 1.0));
        assert!(index.postings("kraken", true).unwrap().is_none());

        let expected = ((1.0 + 2f64.ln()).powi(2) + 1.0).sqrt();
        assert!((index.document_weight(1).unwrap() - expected).abs() < 1e-12);
        assert!(index.document_weight(3).is_err());
    }

    #[test]
    fn closed_index_rejects_lookups() {
        let dir = tempdir().unwrap();
        let mut memory = InMemoryIndex::new();
        memory.add_term("whale", 1, 0);
        write(dir.path(), &mut memory, 1);

        let index = DiskIndex::open(dir.path()).unwrap();
        index.close();
        assert!(index.is_closed());
        assert!(matches!(index.postings("whale", true), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn missing_index_is_invalid() {
        let dir = tempdir().unwrap();
        assert!(matches!(DiskIndex::open(dir.path()), Err(Error::InvalidIndex(_))));
    }

    #[test]
    fn truncated_postings_are_corrupt() {
        let dir = tempdir().unwrap();
        let mut memory = InMemoryIndex::new();
        memory.add_term("whale", 1, 0);
        memory.add_term("whale", 1, 7);
        write(dir.path(), &mut memory, 1);

        let paths = IndexPaths::new(dir.path());
        let bytes = fs::read(paths.postings()).unwrap();
        fs::write(paths.postings(), &bytes[..bytes.len() - 2]).unwrap();

        let index = DiskIndex::open(dir.path()).unwrap();
        assert!(matches!(index.postings("whale", true), Err(Error::Corrupt { .. })));
    }
}
