use quarry::index::{Index, InMemoryIndex};
use quarry::persist::{load_meta, DocMeta, IndexPaths};
use quarry::{DiskIndex, Error, IndexWriter, VocabularyElement};
use std::fs;
use tempfile::tempdir;

/// abricot, benedict and the over three documents.
fn fixture() -> (InMemoryIndex, Vec<DocMeta>) {
    let mut index = InMemoryIndex::new();
    let occurrences = [
        ("abricot", 1, 0),
        ("the", 1, 1),
        ("abricot", 1, 4),
        ("benedict", 2, 0),
        ("the", 2, 1),
        ("the", 2, 5),
        ("abricot", 3, 2),
        ("benedict", 3, 3),
        ("the", 3, 7),
    ];
    for (term, doc, pos) in occurrences {
        index.add_term(term, doc, pos);
    }
    index.record_type("abricots", "abricot");
    index.record_type("abricot", "abricot");
    index.record_type("benedict", "benedict");
    index.record_type("the", "the");
    index.compute_weights(3);
    index.register_grams(|_, _| {});
    let docs = (1..=3).map(|id| DocMeta { document_id: id, title: format!("doc {id}"), path: None }).collect();
    (index, docs)
}

#[test]
fn postings_survive_the_disk() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    let meta = IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();
    assert_eq!(meta.num_docs, 3);
    assert_eq!(meta.num_terms, 3);
    assert_eq!(load_meta(&IndexPaths::new(dir.path())).unwrap(), meta);

    let disk = DiskIndex::open(dir.path()).unwrap();
    for term in memory.sorted_vocabulary() {
        let expected: Vec<(u32, Vec<u32>)> =
            memory.postings_for(&term).unwrap().iter().map(|p| (p.document_id, p.positions.clone())).collect();
        let actual: Vec<(u32, Vec<u32>)> = disk
            .postings(&term, true)
            .unwrap()
            .unwrap()
            .into_iter()
            .map(|p| (p.document_id, p.positions))
            .collect();
        assert_eq!(actual, expected, "postings of {term}");
    }
    assert_eq!(disk.vocabulary().unwrap(), vec!["abricot", "benedict", "the"]);
    for id in 1..=3 {
        assert!((disk.document_weight(id).unwrap() - memory.document_weight(id).unwrap()).abs() < 1e-12);
    }
    assert_eq!(disk.corpus_size(), 3);
}

#[test]
fn gram_map_is_rebuilt() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();

    let disk = DiskIndex::open(dir.path()).unwrap();
    assert_eq!(disk.gram_index().len(), memory.gram_index().len());
    let cot = disk.gram_index().elements_for("cot").unwrap();
    let mut types: Vec<&str> = cot.iter().map(|e| e.type_.as_str()).collect();
    types.sort();
    assert_eq!(types, vec!["abricot", "abricots"]);
    let plural = cot.get(&VocabularyElement::new("abricots", "")).unwrap();
    assert_eq!(plural.stem, "abricot");
}

#[test]
fn table_size_is_checked_on_open() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();

    let paths = IndexPaths::new(dir.path());
    let mut table = fs::read(paths.table()).unwrap();
    table.pop();
    fs::write(paths.table(), table).unwrap();
    assert!(matches!(DiskIndex::open(dir.path()), Err(Error::Corrupt { .. })));
}

#[test]
fn invalid_utf8_in_vocabulary_is_corruption() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();

    let paths = IndexPaths::new(dir.path());
    let mut vocab = fs::read(paths.vocabulary()).unwrap();
    let at = vocab.len() - "benedictthe".len();
    vocab[at] = 0xff;
    fs::write(paths.vocabulary(), vocab).unwrap();

    // gram elements resolve their stems through vocab.bin while the index opens
    assert!(matches!(DiskIndex::open(dir.path()), Err(Error::Corrupt { .. })));
}

#[test]
fn empty_corpus_round_trips() {
    let dir = tempdir().unwrap();
    let mut memory = InMemoryIndex::new();
    memory.compute_weights(0);
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &[]).unwrap();

    let disk = DiskIndex::open(dir.path()).unwrap();
    assert!(disk.postings("anything", true).unwrap().is_none());
    assert!(disk.vocabulary().unwrap().is_empty());
    assert_eq!(disk.corpus_size(), 0);
}

#[test]
fn table_offset_past_vocabulary_is_corruption() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();

    // vocab offset of the third entry, which bounds the length of the second
    let paths = IndexPaths::new(dir.path());
    let mut table = fs::read(paths.table()).unwrap();
    table[32..40].copy_from_slice(&(1u64 << 40).to_le_bytes());
    fs::write(paths.table(), table).unwrap();

    let disk = DiskIndex::open(dir.path()).unwrap();
    assert!(matches!(disk.postings("abricot", true), Err(Error::Corrupt { .. })));
    assert!(matches!(disk.postings("benedict", false), Err(Error::Corrupt { .. })));
    assert!(matches!(disk.vocabulary(), Err(Error::Corrupt { .. })));
}

#[test]
fn oversized_gram_length_is_corruption() {
    let dir = tempdir().unwrap();
    let (memory, docs) = fixture();
    IndexWriter::new(IndexPaths::new(dir.path())).write(&memory, &docs).unwrap();

    let paths = IndexPaths::new(dir.path());
    let mut grams = fs::read(paths.grams()).unwrap();
    grams[0..4].copy_from_slice(&u32::MAX.to_le_bytes());
    fs::write(paths.grams(), grams).unwrap();

    assert!(matches!(DiskIndex::open(dir.path()), Err(Error::Corrupt { .. })));
}
