//! Template body parser using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::TemplateSyntaxError;
use crate::template::lexer::{Marker, Token};
use crate::template::text::{Segment, Spanned};

/// Parse template text into raw segments (not yet normalized)
pub fn parse(input: &str) -> Result<Vec<Segment>, Vec<TemplateSyntaxError>> {
    let len = input.len();

    let token_iter = crate::template::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    segments_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn segments_parser<'a, I>() -> impl Parser<'a, I, Vec<Segment>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let text = select! {
        Token::Text(s) => s,
        Token::Brace => "{".to_string(),
        Token::Newline => "\n".to_string(),
    }
    .map(Segment::Text);

    let slot = select! {
        Token::Marker(Marker::Slot(name)) => name,
    }
    .map_with(|name, e| Segment::Slot(Spanned::new(name, span_range(&e.span()))));

    let malformed = select! {
        Token::Marker(Marker::Malformed(inner)) => inner,
    }
    .try_map(|inner, span: SimpleSpan| {
        Err::<Segment, _>(Rich::custom(
            span,
            format!("malformed marker '{}': expected '{{{{ name }}}}', '{{{{#block name}}}}' or '{{{{/block}}}}'", inner),
        ))
    });

    let inline = choice((text, slot, malformed));

    let block_open = select! {
        Token::Marker(Marker::BlockOpen(name)) => name,
    }
    .map_with(|name, e| Spanned::new(name, span_range(&e.span())));

    let block_close = select! {
        Token::Marker(Marker::BlockClose) => (),
    };

    let block = block_open
        .then(inline.clone().repeated().collect::<Vec<_>>())
        .then_ignore(block_close)
        .map(|(name, body)| Segment::Block {
            name,
            indent: String::new(),
            standalone: false,
            body,
        });

    choice((block, inline))
        .repeated()
        .collect::<Vec<_>>()
        .then_ignore(end())
}
