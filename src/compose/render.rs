//! Substitute a fill map into template text

use crate::template::{ResolvedTemplate, Segment, TemplateText};

use super::error::CompositionError;
use super::fill::{Fill, FillMap};

/// Render one body. The fill map must already be verified against the
/// template.
pub(crate) fn render(
    text: &TemplateText,
    fills: &FillMap,
    template: &ResolvedTemplate,
) -> Result<String, CompositionError> {
    let mut out = String::with_capacity(text.source().len() * 2);
    render_segments(text.segments(), fills, template, &mut out)?;
    Ok(out)
}

fn render_segments(
    segments: &[Segment],
    fills: &FillMap,
    template: &ResolvedTemplate,
    out: &mut String,
) -> Result<(), CompositionError> {
    for segment in segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Slot(name) => out.push_str(scalar(fills, &name.node)?),
            Segment::Block {
                name,
                indent,
                standalone,
                body,
            } => {
                let statements = block(fills, &name.node)?;

                let mut base = String::new();
                render_segments(body, fills, template, &mut base)?;

                let extension = match template.extension(&name.node) {
                    Some(text) => {
                        let mut rendered = String::new();
                        render_segments(text.segments(), fills, template, &mut rendered)?;
                        Some(rendered)
                    }
                    None => None,
                };

                if *standalone {
                    out.push_str(&base);
                    if let Some(extension) = &extension {
                        let extension = extension.strip_suffix('\n').unwrap_or(extension);
                        for line in extension.split('\n') {
                            push_line(out, indent, line);
                        }
                    }
                    for statement in statements {
                        for line in statement.split('\n') {
                            push_line(out, indent, line);
                        }
                    }
                } else {
                    let mut pieces: Vec<&str> = Vec::new();
                    for piece in std::iter::once(base.as_str())
                        .chain(extension.as_deref())
                        .chain(statements.iter().map(String::as_str))
                    {
                        let piece = piece.trim();
                        if !piece.is_empty() {
                            pieces.push(piece);
                        }
                    }
                    out.push_str(&pieces.join(" "));
                }
            }
        }
    }
    Ok(())
}

fn push_line(out: &mut String, indent: &str, line: &str) {
    if !line.trim().is_empty() {
        out.push_str(indent);
        out.push_str(line);
    }
    out.push('\n');
}

fn scalar<'f>(fills: &'f FillMap, slot: &str) -> Result<&'f str, CompositionError> {
    match fills.get(slot) {
        Some(Fill::Scalar(value)) => Ok(value),
        Some(fill) => Err(CompositionError::KindMismatch {
            slot: slot.to_string(),
            declared: crate::template::SlotKind::Scalar,
            filled: fill.kind(),
        }),
        None => Err(CompositionError::incomplete(slot)),
    }
}

fn block<'f>(fills: &'f FillMap, slot: &str) -> Result<&'f [String], CompositionError> {
    match fills.get(slot) {
        Some(Fill::Block(lines)) => Ok(lines),
        Some(fill) => Err(CompositionError::KindMismatch {
            slot: slot.to_string(),
            declared: crate::template::SlotKind::Block,
            filled: fill.kind(),
        }),
        None => Err(CompositionError::incomplete(slot)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::ArtifactRole;
    use crate::template::{Template, TemplateLibrary, TemplateOverride};
    use pretty_assertions::assert_eq;

    const BASE: &str = r#"
[template]
name = "escrow"
version = "1.0.0"

[slots]
jurisdiction = "scalar"
contract_type = "scalar"
legal_requirements = "scalar"
checks = "block"
tags = "block"

[bodies]
primary = '''
// {{ contract_type }} {{ jurisdiction }}
string[] reqs = {{ legal_requirements }};
function verify() public {
    {{#block checks}}
    base();
    {{/block}}
}
// tags: {{#block tags}}{{/block}}
'''
deploy = "// {{ contract_type }} {{ jurisdiction }} {{ legal_requirements }}\n"
test = "// {{ contract_type }} {{ jurisdiction }} {{ legal_requirements }}\n"
"#;

    const OVERRIDE: &str = r#"
[override]
contract_type = "escrow"
jurisdiction = "india"
version = "1.0.0"

[blocks]
checks = '''
// {{ jurisdiction }} extension
extension();
'''
"#;

    fn resolved(jurisdiction: &str) -> ResolvedTemplate {
        let mut library = TemplateLibrary::new();
        library
            .register(Template::from_str(BASE, "base").expect("Should load"))
            .expect("Should register");
        library
            .register_override(TemplateOverride::from_str(OVERRIDE, "override").expect("Should load"))
            .expect("Should register");
        library.resolve("escrow", jurisdiction).expect("Should resolve")
    }

    fn fills(jurisdiction: &str) -> FillMap {
        let mut fills = FillMap::new();
        fills.scalar("jurisdiction", jurisdiction).expect("fill");
        fills.scalar("contract_type", "escrow").expect("fill");
        fills.scalar("legal_requirements", "[\"kyc\"]").expect("fill");
        fills
            .block("checks", vec!["generated();".to_string(), String::new(), "if (x) {\n    y();\n}".to_string()])
            .expect("fill");
        fills
            .block("tags", vec!["a".to_string(), "b".to_string()])
            .expect("fill");
        fills
    }

    #[test]
    fn test_render_base_then_override_then_generated() {
        let template = resolved("india");
        let rendered = render(template.body(ArtifactRole::Primary), &fills("india"), &template)
            .expect("Should render");
        assert_eq!(
            rendered,
            "// escrow india\n\
             string[] reqs = [\"kyc\"];\n\
             function verify() public {\n    \
             base();\n    \
             // india extension\n    \
             extension();\n    \
             generated();\n\
             \n    \
             if (x) {\n        \
             y();\n    \
             }\n\
             }\n\
             // tags: a b\n"
        );
    }

    #[test]
    fn test_render_without_override() {
        let template = resolved("eu");
        let rendered = render(template.body(ArtifactRole::Primary), &fills("eu"), &template)
            .expect("Should render");
        assert!(rendered.contains("    base();\n    generated();\n"));
        assert!(!rendered.contains("extension"));
    }

    #[test]
    fn test_missing_fill_is_incomplete() {
        let template = resolved("eu");
        let mut partial = FillMap::new();
        partial.scalar("contract_type", "escrow").expect("fill");
        let err = render(template.body(ArtifactRole::Primary), &partial, &template)
            .expect_err("Should fail");
        assert_eq!(err, CompositionError::incomplete("jurisdiction"));
    }
}
