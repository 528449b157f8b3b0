//! Input normalisation and format checks for labels, secrets and codes.

use std::sync::LazyLock;

use regex::Regex;

static LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9_-]{2,32}$").expect("static regex"));

static BASE32_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z2-7]+=*$").expect("static regex"));

static CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{6}$").expect("static regex"));

/// Trim and lowercase a user-supplied label.
pub fn normalize_label(input: &str) -> String {
    input.trim().to_lowercase()
}

/// Labels are 2-32 chars of `a-z`, `0-9`, `_` or `-`.
pub fn is_valid_label(label: &str) -> bool {
    LABEL_RE.is_match(label)
}

/// Uppercase a secret and drop whitespace and dashes, so grouped forms
/// like `jbsw y3dp-ehpk 3pxp` are accepted.
pub fn normalize_secret(input: &str) -> String {
    input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .flat_map(char::to_uppercase)
        .collect()
}

/// Cheap shape check before handing a secret to the code generator.
pub fn is_likely_base32(secret: &str) -> bool {
    BASE32_RE.is_match(secret)
}

pub fn is_valid_code_format(code: &str) -> bool {
    CODE_RE.is_match(code.trim())
}
