use std::hash::{Hash, Hasher};

/// A surface form seen in the corpus together with its stem.
///
/// Equality and hashing look at `type_` only, so a set keeps one element per
/// surface form even when two elements disagree on the stem.
#[derive(Debug, Clone)]
pub struct VocabularyElement {
    pub type_: String,
    pub stem: String,
}

impl VocabularyElement {
    pub fn new(type_: impl Into<String>, stem: impl Into<String>) -> Self {
        Self { type_: type_.into(), stem: stem.into() }
    }
}

impl PartialEq for VocabularyElement {
    fn eq(&self, other: &Self) -> bool {
        self.type_ == other.type_
    }
}

impl Eq for VocabularyElement {}

impl Hash for VocabularyElement {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_.hash(state);
    }
}
