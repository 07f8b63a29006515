//! Schema identifiers to target-language identifiers.
//!
//! YANG names are kebab-case and may contain dots; generated names are
//! PascalCase for types, camelCase for members and lowercase for package
//! segments. Reserved words and names starting with a digit are escaped so
//! every result is a legal identifier.

const RESERVED: &[&str] = &[
    "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class", "const",
    "continue", "default", "do", "double", "else", "enum", "extends", "false", "final", "finally",
    "float", "for", "goto", "if", "implements", "import", "instanceof", "int", "interface", "long",
    "native", "new", "null", "package", "private", "protected", "public", "return", "short",
    "static", "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
    "transient", "true", "try", "var", "void", "volatile", "while",
];

/// Prefix for names that would otherwise start with a digit.
const DIGIT_PREFIX: &str = "Yang";

/// Whether `word` is reserved in the target language.
pub fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

/// Whether `name` is a legal, non-reserved identifier.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (unicode_ident::is_xid_start(first) || first == '_' || first == '$')
        && chars.all(|c| unicode_ident::is_xid_continue(c) || c == '$')
        && !is_reserved(name)
}

fn words(name: &str) -> impl Iterator<Item = &str> {
    name.split(|c: char| !unicode_ident::is_xid_continue(c) || c == '_')
        .filter(|w| !w.is_empty())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn escape_digit(mut out: String, prefix: &str) -> String {
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert_str(0, prefix);
    }
    out
}

/// `base-color` → `BaseColor`
pub fn class_name(name: &str) -> String {
    let out: String = words(name).map(capitalize).collect();
    let out = escape_digit(out, DIGIT_PREFIX);
    if out.is_empty() {
        DIGIT_PREFIX.to_string()
    } else {
        out
    }
}

/// `admin-status` → `adminStatus`; reserved words gain a trailing `_`.
pub fn member_name(name: &str) -> String {
    let mut out = String::new();
    for (i, word) in words(name).enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    let mut out = escape_digit(out, "yang");
    if out.is_empty() {
        out.push_str("yang");
    }
    if is_reserved(&out) {
        out.push('_');
    }
    out
}

/// `ietf-interfaces` → `ietfinterfaces`
pub fn package_segment(name: &str) -> String {
    let mut out: String = words(name).map(str::to_lowercase).collect();
    out = escape_digit(out, "yang");
    if out.is_empty() {
        out.push_str("yang");
    }
    if is_reserved(&out) {
        out.push('_');
    }
    out
}
