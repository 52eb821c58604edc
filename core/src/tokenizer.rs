use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer as SnowballStemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*").expect("valid regex");
    static ref QUERY_RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}*][\p{L}\p{N}_'*]*").expect("valid regex");
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Reduces a normalized word to the form stored in the inverted index.
pub trait Stemmer: Send + Sync {
    fn stem(&self, word: &str) -> String;
}

/// English Snowball (Porter 2) stemmer.
pub struct PorterStemmer {
    inner: SnowballStemmer,
}

impl Default for PorterStemmer {
    fn default() -> Self {
        Self { inner: SnowballStemmer::create(Algorithm::English) }
    }
}

impl Stemmer for PorterStemmer {
    fn stem(&self, word: &str) -> String {
        self.inner.stem(word).into_owned()
    }
}

/// A surface form (the "type") and its offset among the words of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub surface: String,
    pub position: u32,
}

fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Tokenize text into surface forms with positions, using NFKC normalization and lowercase.
///
/// Positions count every word matched in the text, so removing stopwords leaves
/// holes instead of shifting the following words.
pub fn tokenize(text: &str, remove_stopwords: bool) -> Vec<Token> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for (pos, mat) in RE.find_iter(&normalized).enumerate() {
        let token = mat.as_str();
        if remove_stopwords && is_stopword(token) { continue; }
        tokens.push(Token { surface: token.to_string(), position: pos as u32 });
    }
    tokens
}

/// Split a query literal into words exactly where [`tokenize`] splits document text.
///
/// `*` counts as a word character so wildcard patterns stay whole.
pub fn query_words(literal: &str) -> Vec<String> {
    let normalized = literal.nfkc().collect::<String>().to_lowercase();
    QUERY_RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}
