use super::binary_file::BinaryWriter;
use crate::gram::GramIndex;
use crate::index::{Index, InMemoryIndex};
use crate::persist::{save_docs, save_meta, DocMeta, IndexPaths, MetaFile};
use crate::posting::{encode_gaps, Posting};
use crate::{Error, Result};
use byteorder::{LittleEndian, WriteBytesExt};
use std::collections::{HashMap, HashSet};
use std::fs::create_dir_all;
use std::io;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{debug, info};

/// Offset and byte length of a string inside `vocab.bin` or `types.bin`.
type Span = (u64, u32);

/// Serializes an [`InMemoryIndex`] into the binary files under `<corpus>/index/`.
pub struct IndexWriter {
    paths: IndexPaths,
}

impl IndexWriter {
    pub fn new(paths: IndexPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &IndexPaths { &self.paths }

    /// Write every index file and return the metadata that was stored in `meta.json`.
    ///
    /// `docs` must be numbered densely from 1, one entry per weight.
    pub fn write(&self, index: &InMemoryIndex, docs: &[DocMeta]) -> Result<MetaFile> {
        for (i, doc) in docs.iter().enumerate() {
            if doc.document_id as usize != i + 1 {
                return Err(Error::InvalidIndex(format!(
                    "document ids must be dense from 1, found {} at slot {}",
                    doc.document_id,
                    i + 1
                )));
            }
        }
        if index.weights().len() != docs.len() {
            return Err(Error::InvalidIndex(format!(
                "{} document weights for {} documents",
                index.weights().len(),
                docs.len()
            )));
        }
        create_dir_all(&self.paths.root)?;

        let vocabulary = index.sorted_vocabulary();
        let (term_offsets, stems) = self.write_vocabulary(index, &vocabulary)?;
        let types = self.write_types(index)?;
        let postings_offsets = self.write_postings(index, &vocabulary)?;
        self.write_table(&term_offsets, &postings_offsets)?;
        self.write_weights(index.weights())?;
        self.write_grams(index.gram_index(), &stems, &types)?;
        save_docs(&self.paths, docs)?;

        let created_at = OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default();
        let meta = MetaFile::new(docs.len() as u32, vocabulary.len() as u32, created_at);
        save_meta(&self.paths, &meta)?;
        info!(
            num_docs = meta.num_docs,
            num_terms = meta.num_terms,
            num_grams = index.gram_index().len(),
            path = %self.paths.root.display(),
            "index written"
        );
        Ok(meta)
    }

    /// `vocab.bin`: stems that only the gram map references come first, then every
    /// vocabulary term in sorted order, so a term's length is always the distance to
    /// the next table entry (or to the end of the file for the last one).
    fn write_vocabulary(
        &self,
        index: &InMemoryIndex,
        vocabulary: &[String],
    ) -> Result<(Vec<u64>, HashMap<String, Span>)> {
        let terms: HashSet<&str> = vocabulary.iter().map(String::as_str).collect();
        let mut extra: Vec<&str> = index
            .types()
            .map(|e| e.stem.as_str())
            .filter(|stem| !terms.contains(stem))
            .collect();
        extra.sort_unstable();
        extra.dedup();

        let mut file = BinaryWriter::create(&self.paths.vocabulary())?;
        let mut stems = HashMap::with_capacity(vocabulary.len() + extra.len());
        for stem in extra {
            let offset = file.write(stem.as_bytes())?;
            stems.insert(stem.to_string(), (offset, stem.len() as u32));
        }
        let mut term_offsets = Vec::with_capacity(vocabulary.len());
        for term in vocabulary {
            let offset = file.write(term.as_bytes())?;
            stems.insert(term.clone(), (offset, term.len() as u32));
            term_offsets.push(offset);
        }
        file.finish()?;
        debug!(terms = term_offsets.len(), "vocabulary written");
        Ok((term_offsets, stems))
    }

    fn write_types(&self, index: &InMemoryIndex) -> Result<HashMap<String, Span>> {
        let mut types: Vec<&str> = index.types().map(|e| e.type_.as_str()).collect();
        types.sort_unstable();
        let mut file = BinaryWriter::create(&self.paths.types())?;
        let mut spans = HashMap::with_capacity(types.len());
        for type_ in types {
            let offset = file.write(type_.as_bytes())?;
            spans.insert(type_.to_string(), (offset, type_.len() as u32));
        }
        file.finish()?;
        Ok(spans)
    }

    fn write_postings(&self, index: &InMemoryIndex, vocabulary: &[String]) -> Result<Vec<u64>> {
        let mut file = BinaryWriter::create(&self.paths.postings())?;
        for term in vocabulary {
            let postings = index.postings_for(term).unwrap_or_default();
            file.write(&encode_postings(postings)?)?;
        }
        file.finish()
    }

    fn write_table(&self, term_offsets: &[u64], postings_offsets: &[u64]) -> Result<()> {
        let mut data = Vec::with_capacity(term_offsets.len() * super::TABLE_ENTRY_SIZE as usize);
        for (vocab_offset, postings_offset) in term_offsets.iter().zip(postings_offsets) {
            data.write_u64::<LittleEndian>(*vocab_offset)?;
            data.write_u64::<LittleEndian>(*postings_offset)?;
        }
        let mut file = BinaryWriter::create(&self.paths.table())?;
        file.write(&data)?;
        file.finish()?;
        Ok(())
    }

    fn write_weights(&self, weights: &[f64]) -> Result<()> {
        let mut data = Vec::with_capacity(weights.len() * 8);
        for weight in weights {
            data.write_f64::<LittleEndian>(*weight)?;
        }
        let mut file = BinaryWriter::create(&self.paths.weights())?;
        file.write(&data)?;
        file.finish()?;
        Ok(())
    }

    /// `grams.bin`: per gram, sorted by gram, its UTF-8 bytes and the
    /// `(stem, type)` spans of every element holding it.
    fn write_grams(
        &self,
        grams: &GramIndex,
        stems: &HashMap<String, Span>,
        types: &HashMap<String, Span>,
    ) -> Result<()> {
        let mut entries: Vec<_> = grams.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut file = BinaryWriter::create(&self.paths.grams())?;
        for (gram, elements) in entries {
            let mut elements: Vec<_> = elements.iter().collect();
            elements.sort_by(|a, b| a.type_.cmp(&b.type_));

            let mut data = Vec::new();
            data.write_u32::<LittleEndian>(gram.len() as u32)?;
            data.extend_from_slice(gram.as_bytes());
            data.write_u32::<LittleEndian>(elements.len() as u32)?;
            for element in elements {
                let (stem_offset, stem_len) = span_of(stems, &element.stem, "stem")?;
                let (type_offset, type_len) = span_of(types, &element.type_, "type")?;
                data.write_u64::<LittleEndian>(stem_offset)?;
                data.write_u32::<LittleEndian>(stem_len)?;
                data.write_u64::<LittleEndian>(type_offset)?;
                data.write_u32::<LittleEndian>(type_len)?;
            }
            file.write(&data)?;
        }
        file.finish()?;
        Ok(())
    }
}

fn span_of(spans: &HashMap<String, Span>, key: &str, what: &str) -> Result<Span> {
    spans
        .get(key)
        .copied()
        .ok_or_else(|| Error::Internal(format!("gram element {what} {key:?} was not written")))
}

/// `dft`, then per posting `id, wdt, tftd` followed by `tftd` position gaps.
fn encode_postings(postings: &[Posting]) -> io::Result<Vec<u8>> {
    let mut data = Vec::new();
    data.write_u32::<LittleEndian>(postings.len() as u32)?;
    for posting in postings {
        data.write_u32::<LittleEndian>(posting.document_id)?;
        data.write_f64::<LittleEndian>(posting.calculate_wdt())?;
        data.write_u32::<LittleEndian>(posting.positions.len() as u32)?;
        for gap in encode_gaps(&posting.positions) {
            data.write_u32::<LittleEndian>(gap)?;
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::Cursor;

    #[test]
    fn postings_layout() {
        let mut posting = Posting::with_position(2, "whale", 3);
        posting.add_position(10);
        let data = encode_postings(&[Posting::with_position(1, "whale", 0), posting]).unwrap();

        let mut cursor = Cursor::new(data);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 1);
        assert_eq!(cursor.read_f64::<LittleEndian>().unwrap(), 1.0);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 1);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 0);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
        assert!((cursor.read_f64::<LittleEndian>().unwrap() - (1.0 + 2f64.ln())).abs() < 1e-12);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 2);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 3);
        assert_eq!(cursor.read_u32::<LittleEndian>().unwrap(), 7);
        assert!(cursor.read_u32::<LittleEndian>().is_err());
    }

    #[test]
    fn rejects_sparse_document_ids() {
        let dir = tempfile::tempdir().unwrap();
        let writer = IndexWriter::new(IndexPaths::new(dir.path()));
        let mut index = InMemoryIndex::new();
        index.add_term("whale", 1, 0);
        index.compute_weights(2);
        let docs = vec![
            DocMeta { document_id: 1, title: "a".into(), path: None },
            DocMeta { document_id: 3, title: "b".into(), path: None },
        ];
        assert!(matches!(writer.write(&index, &docs), Err(Error::InvalidIndex(_))));
    }
}
