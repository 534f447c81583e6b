/// Reserved label for a field with no usable label text.
pub const UNNAMED_FIELD: &str = "unnamed field";

/// Labels that carry no information about the question being asked.
const GENERIC_LABELS: &[&str] = &[
    UNNAMED_FIELD,
    "select",
    "select one",
    "select an option",
    "please select",
    "choose",
    "choose one",
    "option",
    "field",
    "input",
    "answer",
    "type here",
    "search",
];

/// Whole-label boilerplate that means "no label".
const BOILERPLATE_LABELS: &[&str] = &[
    "select one",
    "select an option",
    "please select",
    "select...",
    "select",
    "choose one",
    "choose...",
    "required",
    "optional",
    "*",
];

/// Inline markers stripped from otherwise useful labels.
const BOILERPLATE_MARKERS: &[&str] = &["(required)", "(optional)", "required field", "*"];

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Turn raw label text into a usable label, or `None` if nothing remains.
pub fn clean_label(raw: &str) -> Option<String> {
    let mut text = collapse_whitespace(raw);

    for marker in BOILERPLATE_MARKERS {
        text = remove_case_insensitive(&text, marker);
    }

    let mut text = collapse_whitespace(&text);
    for suffix in [" required", " optional"] {
        let cut = text.len().saturating_sub(suffix.len());
        if cut > 0 && text.is_char_boundary(cut) && text[cut..].eq_ignore_ascii_case(suffix) {
            text.truncate(cut);
        }
    }

    let text = text
        .trim()
        .trim_end_matches(':')
        .trim()
        .to_string();

    if text.is_empty() {
        return None;
    }

    let lower = text.to_lowercase();
    if BOILERPLATE_LABELS.contains(&lower.as_str()) {
        return None;
    }

    Some(text)
}

fn remove_case_insensitive(text: &str, needle: &str) -> String {
    let lower = text.to_lowercase();
    let needle = needle.to_lowercase();
    if needle.is_empty() || lower.len() != text.len() {
        // Byte offsets are only safe when lowercasing kept the length.
        return text.replace(needle.as_str(), " ");
    }

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(pos) = lower[cursor..].find(&needle) {
        out.push_str(&text[cursor..cursor + pos]);
        out.push(' ');
        cursor += pos + needle.len();
    }
    out.push_str(&text[cursor..]);
    out
}

/// `first_name`, `firstName`, `applicant[first-name]` → `First Name`.
pub fn title_case_name(name: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;

    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }

    words
        .iter()
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lowercase, alphanumeric words separated by single spaces.
pub fn normalize_key(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_generic_label(label: &str) -> bool {
    let key = normalize_key(label);
    key.is_empty() || GENERIC_LABELS.iter().any(|g| normalize_key(g) == key)
}

/// Whole-word phrase containment on normalised text.
pub fn contains_phrase(haystack: &str, phrase: &str) -> bool {
    let hay = format!(" {} ", normalize_key(haystack));
    let needle = normalize_key(phrase);
    !needle.is_empty() && hay.contains(&format!(" {} ", needle))
}

pub fn text_fingerprint(text: &str) -> String {
    use sha1::{Digest, Sha1};

    let mut hasher = Sha1::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
