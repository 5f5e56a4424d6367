//! Lexer for template bodies using logos
//!
//! Template text is mostly opaque target-language source. The only syntax is
//! the slot marker: `{{ name }}`, `{{#block name}}` and `{{/block}}`. Every
//! `{{` starts a marker; one that does not form a valid marker lexes as
//! [`Marker::Malformed`] so the parser can report it with its span.

use logos::{Lexer, Logos};

use crate::error::Span;
use crate::ids::is_identifier;

/// The contents of a `{{ ... }}` marker
#[derive(Debug, Clone, PartialEq)]
pub enum Marker {
    /// `{{ name }}`
    Slot(String),
    /// `{{#block name}}`
    BlockOpen(String),
    /// `{{/block}}`
    BlockClose,
    /// Anything else between `{{` and `}}`, or an unterminated `{{`
    Malformed(String),
}

#[derive(Logos, Debug, Clone, PartialEq)]
pub enum Token {
    #[token("{{", marker)]
    Marker(Marker),

    /// A lone `{`, which is ordinary text in every target language
    #[token("{")]
    Brace,

    #[token("\n")]
    Newline,

    #[regex(r"[^{\n]+", |lex| lex.slice().to_string())]
    Text(String),
}

/// Scan to the closing `}}` on the same line and classify the marker
fn marker(lex: &mut Lexer<Token>) -> Marker {
    let rest = lex.remainder();
    let line_end = rest.find('\n').unwrap_or(rest.len());

    match rest[..line_end].find("}}") {
        Some(close) => {
            let inner = rest[..close].trim().to_string();
            lex.bump(close + 2);
            classify(&inner)
        }
        None => {
            let inner = rest[..line_end].to_string();
            lex.bump(line_end);
            Marker::Malformed(format!("{} (unterminated)", inner.trim()))
        }
    }
}

fn classify(inner: &str) -> Marker {
    if inner == "/block" {
        return Marker::BlockClose;
    }
    if let Some(name) = inner.strip_prefix("#block") {
        let name = name.trim();
        return if name.len() < inner.len() - "#block".len() && is_identifier(name) {
            Marker::BlockOpen(name.to_string())
        } else {
            Marker::Malformed(inner.to_string())
        };
    }
    if is_identifier(inner) {
        Marker::Slot(inner.to_string())
    } else {
        Marker::Malformed(inner.to_string())
    }
}

/// Lex template text into tokens with byte spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}
