//! Label normalization and numeric helpers shared by the pipeline stages.

/// Lookup key for a free-text label: trimmed, inner whitespace runs collapsed
/// to one space, lower-cased.
pub fn label_key<T: AsRef<str>>(text: T) -> String {
    let mut key = String::with_capacity(text.as_ref().len());
    for word in text.as_ref().split_whitespace() {
        if !key.is_empty() {
            key.push(' ');
        }
        key.extend(word.chars().flat_map(char::to_lowercase));
    }
    key
}

/// Round to two decimals, half away from zero.
pub fn round_2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Read a boolean cell written as `1/0`, `true/false` or `yes/no`.
pub fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "1.0" | "true" | "yes" | "y" => Some(true),
        "0" | "0.0" | "false" | "no" | "n" => Some(false),
        _ => None,
    }
}
