//! Parsed template text
//!
//! A [`TemplateText`] is a template body split into literal text, scalar
//! slot references and block regions. Standalone block markers (alone on
//! their line) are normalized at parse time so that rendering never leaves
//! blank marker lines behind.

use serde::{Deserialize, Serialize};

use crate::error::{Span, TemplateSyntaxError};

use super::grammar;

/// Template node with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Whether a slot takes one value or a list of statements
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    Scalar,
    Block,
}

impl std::fmt::Display for SlotKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlotKind::Scalar => write!(f, "scalar"),
            SlotKind::Block => write!(f, "block"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    /// `{{ name }}`
    Slot(Spanned<String>),
    /// `{{#block name}}` ... `{{/block}}`
    Block {
        name: Spanned<String>,
        /// Leading whitespace of the marker line, for standalone blocks
        indent: String,
        standalone: bool,
        /// Default content, rendered before any appended statements
        body: Vec<Segment>,
    },
}

/// A parsed template body
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateText {
    source: String,
    segments: Vec<Segment>,
}

impl TemplateText {
    pub fn parse(source: impl Into<String>) -> Result<Self, Vec<TemplateSyntaxError>> {
        let source = source.into();
        let segments = normalize(grammar::parse(&source)?);
        Ok(Self { source, segments })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Every slot reference with the kind it is used as, in source order
    pub fn references(&self) -> Vec<(&Spanned<String>, SlotKind)> {
        let mut refs = Vec::new();
        collect_references(&self.segments, &mut refs);
        refs
    }

    /// True if the text contains no block regions
    pub fn is_inline_only(&self) -> bool {
        !self
            .segments
            .iter()
            .any(|s| matches!(s, Segment::Block { .. }))
    }
}

fn collect_references<'a>(segments: &'a [Segment], refs: &mut Vec<(&'a Spanned<String>, SlotKind)>) {
    for segment in segments {
        match segment {
            Segment::Text(_) => {}
            Segment::Slot(name) => refs.push((name, SlotKind::Scalar)),
            Segment::Block { name, body, .. } => {
                refs.push((name, SlotKind::Block));
                collect_references(body, refs);
            }
        }
    }
}

fn normalize(segments: Vec<Segment>) -> Vec<Segment> {
    let mut segments = coalesce(segments);
    for i in 0..segments.len() {
        if matches!(segments[i], Segment::Block { .. }) {
            mark_standalone(&mut segments, i);
        }
    }
    segments.retain(|s| !matches!(s, Segment::Text(t) if t.is_empty()));
    segments
}

/// Merge adjacent text segments, also inside block bodies
fn coalesce(segments: Vec<Segment>) -> Vec<Segment> {
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let (Some(Segment::Text(prev)), Segment::Text(next)) = (out.last_mut(), &segment) {
            prev.push_str(next);
            continue;
        }
        match segment {
            Segment::Block {
                name,
                indent,
                standalone,
                body,
            } => out.push(Segment::Block {
                name,
                indent,
                standalone,
                body: coalesce(body),
            }),
            other => out.push(other),
        }
    }
    out
}

fn is_blank(s: &str) -> bool {
    s.chars().all(|c| c == ' ' || c == '\t')
}

/// Length of a leading `[ \t]*\n`, if present
fn leading_line_break(s: &str) -> Option<usize> {
    let newline = s.find('\n')?;
    is_blank(&s[..newline]).then_some(newline + 1)
}

/// Detect a block whose open and close markers each sit alone on their
/// line, then strip those lines and record the indent.
fn mark_standalone(segments: &mut [Segment], index: usize) {
    // The open marker must start its line
    let indent = match index.checked_sub(1).map(|i| &segments[i]) {
        None => Some(String::new()),
        Some(Segment::Text(prev)) => match prev.rfind('\n') {
            Some(nl) if is_blank(&prev[nl + 1..]) => Some(prev[nl + 1..].to_string()),
            None if index == 1 && is_blank(prev) => Some(prev.clone()),
            _ => None,
        },
        Some(_) => None,
    };
    let Some(indent) = indent else {
        return;
    };

    // The close marker must end its line
    match segments.get(index + 1) {
        None => {}
        Some(Segment::Text(next)) if next.is_empty() || is_blank(next) => {}
        Some(Segment::Text(next)) if leading_line_break(next).is_some() => {}
        Some(_) => return,
    }

    let Segment::Block { body, .. } = &segments[index] else {
        return;
    };
    let body_ok = match (body.first(), body.last()) {
        (Some(Segment::Text(first)), Some(Segment::Text(last))) => {
            leading_line_break(first).is_some()
                && last.rfind('\n').is_some_and(|nl| is_blank(&last[nl + 1..]))
        }
        _ => false,
    };
    if !body_ok {
        return;
    }

    if let Segment::Block {
        indent: block_indent,
        standalone,
        body,
        ..
    } = &mut segments[index]
    {
        if let Some(Segment::Text(last)) = body.last_mut() {
            if let Some(nl) = last.rfind('\n') {
                last.truncate(nl + 1);
            }
        }
        if let Some(Segment::Text(first)) = body.first_mut() {
            if let Some(cut) = leading_line_break(first) {
                first.drain(..cut);
            }
        }
        body.retain(|s| !matches!(s, Segment::Text(t) if t.is_empty()));
        *block_indent = indent.clone();
        *standalone = true;
    }

    if index > 0 {
        if let Segment::Text(prev) = &mut segments[index - 1] {
            let keep = prev.len() - indent.len();
            prev.truncate(keep);
        }
    }
    if let Some(Segment::Text(next)) = segments.get_mut(index + 1) {
        match leading_line_break(next) {
            Some(cut) => {
                next.drain(..cut);
            }
            None => next.clear(),
        }
    }
}
