//! Boolean query grammar.
//!
//! ```text
//! query    := subquery ('+' subquery)*
//! subquery := literal (' ' literal)*
//! literal  := '"' word (' ' word)* '"' | word
//! ```
//! A word containing `*` is a wildcard. A word the tokenizer would split, such as
//! `white-whale`, reads as the phrase of its pieces.

use super::Query;
use crate::tokenizer::query_words;
use crate::{Error, Result};

#[derive(Debug, PartialEq)]
enum Token {
    Plus,
    Word(String),
    Phrase(String),
}

fn lex(text: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '+' => tokens.push(Token::Plus),
            '"' => {
                let mut phrase = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    phrase.push(c);
                }
                if !closed {
                    return Err(Error::Parse(format!("unterminated phrase in {text:?}")));
                }
                tokens.push(Token::Phrase(phrase));
            }
            c if c.is_whitespace() => {}
            c => {
                let mut word = String::from(c);
                while let Some(next) = chars.next_if(|n| !n.is_whitespace() && *n != '+' && *n != '"') {
                    word.push(next);
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

fn single(word: String) -> Query {
    if word.contains('*') {
        Query::Wildcard(word)
    } else {
        Query::Term(word)
    }
}

fn literal(token: Token) -> Result<Option<Query>> {
    match token {
        Token::Word(word) => {
            let mut words = query_words(&word);
            match words.len() {
                0 => Ok(None),
                1 => Ok(Some(single(words.remove(0)))),
                _ if words.iter().any(|w| w.contains('*')) => {
                    Ok(Some(Query::And(words.into_iter().map(single).collect())))
                }
                _ => Ok(Some(Query::Phrase(words))),
            }
        }
        Token::Phrase(phrase) => {
            let words = query_words(&phrase);
            if words.is_empty() {
                return Err(Error::Parse("empty phrase".into()));
            }
            Ok(Some(Query::Phrase(words)))
        }
        Token::Plus => Err(Error::Internal("'+' is not a literal".into())),
    }
}

fn subquery(tokens: Vec<Token>) -> Result<Query> {
    let mut literals = Vec::with_capacity(tokens.len());
    for token in tokens {
        literals.extend(literal(token)?);
    }
    match literals.len() {
        0 => Err(Error::Parse("empty subquery".into())),
        1 => Ok(literals.remove(0)),
        _ => Ok(Query::And(literals)),
    }
}

/// Parse a boolean query. One literal is returned bare, one subquery without an `Or`.
pub fn parse(text: &str) -> Result<Query> {
    if text.trim().is_empty() {
        return Err(Error::Parse("empty query".into()));
    }
    let mut groups = vec![Vec::new()];
    for token in lex(text)? {
        match token {
            Token::Plus => groups.push(Vec::new()),
            other => {
                if let Some(group) = groups.last_mut() {
                    group.push(other);
                }
            }
        }
    }
    let mut subqueries = groups.into_iter().map(subquery).collect::<Result<Vec<_>>>()?;
    if subqueries.len() == 1 {
        Ok(subqueries.remove(0))
    } else {
        Ok(Query::Or(subqueries))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn term(word: &str) -> Query {
        Query::Term(word.into())
    }

    #[test]
    fn single_literals_are_bare() {
        assert_eq!(parse("whale").unwrap(), term("whale"));
        assert_eq!(parse("wh*e").unwrap(), Query::Wildcard("wh*e".into()));
        assert_eq!(parse("\"white whale\"").unwrap(), Query::Phrase(vec!["white".into(), "whale".into()]));
    }

    #[test]
    fn spaces_and_plus() {
        assert_eq!(parse("whale ships").unwrap(), Query::And(vec![term("whale"), term("ships")]));
        assert_eq!(parse("whale + ships").unwrap(), Query::Or(vec![term("whale"), term("ships")]));
        assert_eq!(
            parse("whale + boat cruise").unwrap(),
            Query::Or(vec![term("whale"), Query::And(vec![term("boat"), term("cruise")])])
        );
    }

    #[test]
    fn mixed_subquery() {
        let query = parse("whale + \"is here\" an* sees").unwrap();
        let Query::Or(parts) = query else { panic!("expected Or") };
        assert_eq!(parts.len(), 2);
        assert_eq!(
            parts[1],
            Query::And(vec![
                Query::Phrase(vec!["is".into(), "here".into()]),
                Query::Wildcard("an*".into()),
                term("sees"),
            ])
        );
    }

    #[test]
    fn words_are_normalized() {
        assert_eq!(parse("Whale,").unwrap(), term("whale"));
        assert_eq!(parse("whale+ship").unwrap(), Query::Or(vec![term("whale"), term("ship")]));
    }

    #[test]
    fn split_words_become_phrases() {
        let white_whale = Query::Phrase(vec!["white".into(), "whale".into()]);
        assert_eq!(parse("white-whale").unwrap(), white_whale);
        assert_eq!(parse("\"White-Whale\"").unwrap(), white_whale);
        assert_eq!(
            parse("sea white-whale").unwrap(),
            Query::And(vec![term("sea"), white_whale.clone()])
        );
        assert_eq!(
            parse("wh*-ship").unwrap(),
            Query::And(vec![Query::Wildcard("wh*".into()), term("ship")])
        );
    }

    #[test]
    fn malformed_queries() {
        for bad in ["", "   ", "\"white whale", "\"\"", "whale +", "+ whale", "!!!"] {
            assert!(parse(bad).unwrap_err().is_parse(), "{bad:?} should not parse");
        }
    }
}
