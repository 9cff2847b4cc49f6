use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;

/// Runs of ASCII alphanumerics, or a literal `+` which is spelled out.
static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z0-9]+|\+").expect("static regex"));

/// Lower-to-upper case transitions inside a word, e.g. `dashStyle`.
static HUMP: Lazy<Regex> = Lazy::new(|| Regex::new(r"([a-z0-9])([A-Z])").expect("static regex"));

static RESERVED: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "assert", "async", "await", "boolean", "break", "byte", "case", "catch", "char",
        "class", "const", "continue", "default", "delete", "do", "double", "else", "enum", "export",
        "extends", "false", "final", "finally", "float", "for", "function", "goto", "if", "implements",
        "import", "in", "instanceof", "int", "interface", "let", "long", "native", "new", "null",
        "package", "private", "protected", "public", "return", "short", "static", "strictfp", "super",
        "switch", "synchronized", "this", "throw", "throws", "transient", "true", "try", "typeof",
        "var", "void", "volatile", "while", "yield",
    ]
    .into_iter()
    .collect()
});

/// PascalCase type name. `+` becomes `Plus`, a name made only of `-` becomes
/// `Minus`, a leading digit gets a `_` prefix.
pub fn type_name(raw: &str) -> String {
    let mut out = String::new();
    for word in words(raw) {
        out.push_str(&capitalize_first(word));
    }
    if out.is_empty() {
        out.push_str(if raw.contains('-') { "Minus" } else { "Anonymous" });
    }
    guard_leading_digit(out)
}

/// camelCase member identifier. Reserved words get a trailing `_`.
pub fn member_name(raw: &str) -> String {
    let mut out = String::new();
    for (index, word) in words(raw).enumerate() {
        if index == 0 {
            out.push_str(&decapitalize(word));
        } else {
            out.push_str(&capitalize_first(word));
        }
    }
    if out.is_empty() {
        out.push_str(if raw.contains('-') { "minus" } else { "value" });
    }
    let mut out = guard_leading_digit(out);
    if RESERVED.contains(out.as_str()) {
        out.push('_');
    }
    out
}

/// UPPER_SNAKE_CASE enum constant, e.g. `Dash-Style` → `DASH_STYLE`.
pub fn enum_constant(literal: &str) -> String {
    let parts: Vec<String> = words(literal)
        .map(|word| HUMP.replace_all(word, "${1}_${2}").to_ascii_uppercase())
        .collect();
    let out = parts.join("_");
    let out = if out.is_empty() {
        if literal.contains('-') { "MINUS".to_owned() } else { "EMPTY".to_owned() }
    } else {
        out
    };
    guard_leading_digit(out)
}

/// Makes identifiers unique in order of appearance: the second `name` becomes
/// `name2`, the third `name3`.
pub fn dedupe<I>(idents: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    let idents: Vec<String> = idents.into_iter().collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut out = Vec::with_capacity(idents.len());
    for ident in idents {
        let mut candidate = ident.clone();
        let mut counter = 2usize;
        while !taken.insert(candidate.clone()) {
            candidate = format!("{ident}{counter}");
            counter += 1;
        }
        out.push(candidate);
    }
    out
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn words(raw: &str) -> impl Iterator<Item = &str> {
    WORD.find_iter(raw)
        .map(|m| if m.as_str() == "+" { "Plus" } else { m.as_str() })
}

fn capitalize_first(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn decapitalize(word: &str) -> String {
    if word.chars().all(|c| !c.is_ascii_lowercase()) {
        return word.to_ascii_lowercase();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn guard_leading_digit(ident: String) -> String {
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{ident}")
    } else {
        ident
    }
}
