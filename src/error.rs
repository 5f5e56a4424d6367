//! Syntax errors in template bodies

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

use crate::template::lexer::{Marker, Token};

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateSyntaxError {
    #[error("Syntax error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl TemplateSyntaxError {
    pub fn span(&self) -> &Span {
        match self {
            TemplateSyntaxError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        match self {
            TemplateSyntaxError::Syntax {
                span,
                message,
                expected,
            } => {
                let expected_str = if expected.is_empty() {
                    String::new()
                } else {
                    format!("\nExpected: {}", expected.join(", "))
                };

                let written = Report::build(ReportKind::Error, filename, span.start)
                    .with_message(message)
                    .with_label(
                        Label::new((filename, span.clone()))
                            .with_message(format!("{}{}", message, expected_str))
                            .with_color(Color::Red),
                    )
                    .finish()
                    .write((filename, Source::from(source)), &mut buf);
                if written.is_err() {
                    return self.to_string();
                }
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, Token>> for TemplateSyntaxError {
    fn from(err: chumsky::error::Rich<'a, Token>) -> Self {
        use chumsky::error::RichReason;

        let message = match err.reason() {
            RichReason::ExpectedFound { found, .. } => match found.as_deref() {
                Some(Token::Marker(Marker::BlockClose)) => {
                    "'{{/block}}' without a matching '{{#block ...}}'".to_string()
                }
                Some(Token::Marker(Marker::BlockOpen(name))) => {
                    format!("block '{}' opened inside another block", name)
                }
                Some(tok) => format!("Unexpected {}", format_token(tok)),
                None => "Unexpected end of template".to_string(),
            },
            RichReason::Custom(msg) => msg.to_string(),
        };

        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of template".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        TemplateSyntaxError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &Token) -> String {
    match tok {
        Token::Marker(Marker::Slot(name)) => format!("slot '{{{{ {} }}}}'", name),
        Token::Marker(Marker::BlockOpen(name)) => format!("'{{{{#block {}}}}}'", name),
        Token::Marker(Marker::BlockClose) => "'{{/block}}'".to_string(),
        Token::Marker(Marker::Malformed(inner)) => format!("malformed marker '{}'", inner),
        Token::Brace => "'{'".to_string(),
        Token::Newline => "end of line".to_string(),
        Token::Text(s) => format!("text {:?}", s),
    }
}

/// Join template syntax errors into one line
pub fn format_syntax_errors(errors: &[TemplateSyntaxError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_includes_source_line() {
        let err = TemplateSyntaxError::Syntax {
            span: 9..18,
            message: "malformed marker 'Bad Name'".to_string(),
            expected: vec![],
        };
        let rendered = err.format("contract {{Bad Name}}", "escrow.toml");
        assert!(rendered.contains("malformed marker 'Bad Name'"));
        assert!(rendered.contains("escrow.toml"));
    }

    #[test]
    fn test_format_token() {
        assert_eq!(
            format_token(&Token::Marker(Marker::Slot("payer".to_string()))),
            "slot '{{ payer }}'"
        );
        assert_eq!(
            format_token(&Token::Marker(Marker::BlockOpen("x".to_string()))),
            "'{{#block x}}'"
        );
    }
}
