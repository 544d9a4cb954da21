//! English pluralization for derived table names.
//!
//! Rules are suffix-anchored and case-insensitive, so applying them to a
//! whole `snake_case` name only ever changes its last segment.

use regex::Regex;
use std::sync::OnceLock;

const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
];

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
];

/// Ordered (pattern, replacement) pairs; the first matching rule wins.
const RULES: &[(&str, &str)] = &[
    (r"(?i)(quiz)$", "${1}zes"),
    (r"(?i)^(ox)$", "${1}en"),
    (r"(?i)([ml])ouse$", "${1}ice"),
    (r"(?i)(matr|vert|ind)(?:ix|ex)$", "${1}ices"),
    (r"(?i)(x|ch|ss|sh)$", "${1}es"),
    (r"(?i)([^aeiouy]|qu)y$", "${1}ies"),
    (r"(?i)(hive)$", "${1}s"),
    (r"(?i)(?:([^f])fe|([lr])f)$", "${1}${2}ves"),
    (r"(?i)sis$", "ses"),
    (r"(?i)([ti])um$", "${1}a"),
    (r"(?i)(buffal|tomat)o$", "${1}oes"),
    (r"(?i)(bu)s$", "${1}ses"),
    (r"(?i)(alias|status)$", "${1}es"),
    (r"(?i)(octop|vir)us$", "${1}i"),
    (r"(?i)(ax|test)is$", "${1}es"),
    (r"(?i)s$", "s"),
    (r"(?i)$", "s"),
];

struct Inflections {
    uncountable: Vec<Regex>,
    irregular: Vec<(Regex, &'static str)>,
    rules: Vec<(Regex, &'static str)>,
}

fn segment_suffix(word: &str) -> Regex {
    Regex::new(&format!(r"(?i)(?:^|_)({})$", regex::escape(word)))
        .expect("invalid inflection pattern")
}

fn inflections() -> &'static Inflections {
    static INFLECTIONS: OnceLock<Inflections> = OnceLock::new();
    INFLECTIONS.get_or_init(|| Inflections {
        uncountable: UNCOUNTABLE.iter().map(|w| segment_suffix(w)).collect(),
        irregular: IRREGULAR
            .iter()
            .map(|(singular, plural)| (segment_suffix(singular), *plural))
            .collect(),
        rules: RULES
            .iter()
            .map(|(pattern, replacement)| {
                (
                    Regex::new(pattern).expect("invalid inflection pattern"),
                    *replacement,
                )
            })
            .collect(),
    })
}

/// Pluralize the last segment of `word`.
pub fn pluralize(word: &str) -> String {
    let inflections = inflections();

    if inflections.uncountable.iter().any(|re| re.is_match(word)) {
        return word.to_string();
    }

    for (re, plural) in &inflections.irregular {
        if let Some(found) = re.captures(word).and_then(|caps| caps.get(1)) {
            // Keep the first letter as written, take the rest from the plural form.
            let first = &word[found.start()..];
            let first_len = first.chars().next().map_or(0, char::len_utf8);
            return format!(
                "{}{}{}",
                &word[..found.start()],
                &first[..first_len],
                &plural[1..]
            );
        }
    }

    for (re, replacement) in &inflections.rules {
        if re.is_match(word) {
            return re.replace(word, *replacement).into_owned();
        }
    }

    word.to_string()
}
