/// Trim and collapse every run of whitespace (including NBSP) to one space.
pub fn normalize(text: &str) -> String {
    text.replace('\u{a0}', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Language-aware normalization. Skolt Sami (`sms`) text arrives with
/// apostrophe and prime look-alikes that must be folded to the modifier letters.
pub fn normalize_for(language: &str, text: &str) -> String {
    let base = normalize(text);
    if language != "sms" {
        return base;
    }
    base.chars()
        .map(|c| match c {
            '\u{2019}' | '\u{0027}' => '\u{02BC}',
            '\u{2032}' | '\u{00B4}' | '\u{0301}' => '\u{02B9}',
            other => other,
        })
        .collect()
}
