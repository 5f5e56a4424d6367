//! Identifier rules shared by rule sources, definitions and templates

/// Normalize a jurisdiction or contract-type id (trimmed, lower-case)
pub fn normalize_id(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Check that `s` is a lower-case identifier: `[a-z_][a-z0-9_]*`
///
/// Every id that ends up verbatim in generated source must pass this check,
/// so it can be embedded in string literals and constant names unescaped.
pub fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_lowercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// `delivery_confirmed` -> `DeliveryConfirmed`
pub fn pascal_case(id: &str) -> String {
    id.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `dispute_resolution_days` -> `DISPUTE_RESOLUTION_DAYS`
pub fn constant_case(id: &str) -> String {
    id.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}
