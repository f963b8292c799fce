//! Identifier conversion for generated code: schema names -> Rust idents.

/// Convert a single identifier from camelCase/PascalCase to snake_case.
/// e.g. "albumId" -> "album_id", "createdAt" -> "created_at", "HTTPCode" -> "http_code"
pub fn to_snake_case(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_uppercase() {
            let prev = i.checked_sub(1).map(|p| chars[p]);
            let next = chars.get(i + 1).copied();
            let boundary = match prev {
                Some(p) if p.is_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_uppercase() => next.map(|n| n.is_lowercase()).unwrap_or(false),
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

const STRICT_KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do", "dyn",
    "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in", "let", "loop",
    "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref", "return", "static",
    "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized", "use", "virtual",
    "where", "while", "yield",
];

/// Keywords that cannot be raw identifiers.
const RESERVED_PATH_KEYWORDS: &[&str] = &["self", "Self", "super", "crate"];

/// Escape an identifier so it is valid Rust: `type` -> `r#type`, `self` -> `self_`.
pub fn rust_ident(name: &str) -> String {
    if RESERVED_PATH_KEYWORDS.contains(&name) {
        format!("{}_", name)
    } else if STRICT_KEYWORDS.contains(&name) {
        format!("r#{}", name)
    } else {
        name.to_string()
    }
}

/// snake_case then escaped, for struct fields.
pub fn rust_field_ident(name: &str) -> String {
    rust_ident(&to_snake_case(name))
}
