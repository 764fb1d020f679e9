//! Lexer for LDF files using logos
//!
//! Keywords are not separate tokens: LDF section and statement names are
//! ordinary identifiers and the parser matches on their text.

use logos::Logos;
use std::ops::Range;

/// Token types for LDF syntax
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*[^*]*\*+(?:[^/*][^*]*\*+)*/")]
pub enum Token<'src> {
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice())]
    Ident(&'src str),

    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice())]
    #[regex(r"-?[0-9]+(\.[0-9]+)?([eE][-+]?[0-9]+)?", |lex| lex.slice())]
    Number(&'src str),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        &s[1..s.len()-1]  // Strip quotes
    })]
    Str(&'src str),

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(";")]
    Semi,
    #[token(":")]
    Colon,
    #[token(",")]
    Comma,
    #[token("=")]
    Eq,
    #[token("%")]
    Percent,
}

impl<'src> Token<'src> {
    /// Short human-readable form for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(s) => format!("identifier '{}'", s),
            Token::Number(s) => format!("number {}", s),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::LBrace => "'{'".to_string(),
            Token::RBrace => "'}'".to_string(),
            Token::Semi => "';'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
            Token::Eq => "'='".to_string(),
            Token::Percent => "'%'".to_string(),
        }
    }
}

/// A token with its byte span; `None` marks text the lexer did not recognise
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<'src> {
    pub token: Option<Token<'src>>,
    pub span: Range<usize>,
}

/// Tokenize an entire source string
///
/// Unrecognised characters are kept as `None` tokens so sections the parser
/// treats as opaque can still be skipped over.
pub fn tokenize(source: &str) -> Vec<Spanned<'_>> {
    Token::lexer(source)
        .spanned()
        .map(|(token, span)| Spanned {
            token: token.ok(),
            span,
        })
        .collect()
}

/// 1-based line number of a byte offset
pub fn line_of(source: &str, offset: usize) -> usize {
    let end = offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
