//! Table-name derivation for model types.
//!
//! This module provides:
//! - `table_name`: camel-case class name to pluralized snake_case table name
//! - `pluralize`: the English inflection rules used for the last segment
//! - `TableNameRegistry`: per-type memoization of derived names

pub mod inflect;
pub mod registry;

pub use inflect::pluralize;
pub use registry::TableNameRegistry;

/// Derive a table name from a class name, e.g. `UserAccount` -> `user_accounts`.
///
/// Every maximal run of ASCII uppercase letters that is immediately followed by
/// an ASCII lowercase letter or digit is replaced by `_` + the run lowercased,
/// with the run's last letter split off by another `_` when the run is longer
/// than one letter. Uppercase runs not followed by lowercase/digit are left as
/// they are. The leading `_` is stripped, the result pluralized and lowercased.
///
/// An empty name yields an empty table name; a name without uppercase letters
/// is only pluralized.
pub fn table_name(class_name: &str) -> String {
    if class_name.is_empty() {
        return String::new();
    }

    let split = split_camel_case(class_name);
    pluralize(split.trim_start_matches('_')).to_lowercase()
}

fn split_camel_case(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 8);
    let mut i = 0;

    while i < chars.len() {
        if !chars[i].is_ascii_uppercase() {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let mut end = i;
        while end < chars.len() && chars[end].is_ascii_uppercase() {
            end += 1;
        }

        let followed_by_word = chars
            .get(end)
            .is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());

        let run: String = chars[i..end].iter().collect();
        if !followed_by_word {
            out.push_str(&run);
        } else if run.len() > 1 {
            let (head, last) = run.split_at(run.len() - 1);
            out.push('_');
            out.push_str(&head.to_ascii_lowercase());
            out.push('_');
            out.push_str(&last.to_ascii_lowercase());
        } else {
            out.push('_');
            out.push_str(&run.to_ascii_lowercase());
        }
        i = end;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_word() {
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("Category"), "categories");
    }

    #[test]
    fn test_multi_word_camel_case() {
        assert_eq!(table_name("UserAccount"), "user_accounts");
        assert_eq!(table_name("OrderLineItem"), "order_line_items");
        assert_eq!(table_name("SalesPerson"), "sales_people");
    }

    #[test]
    fn test_leading_acronym() {
        // The run "HTTPS" precedes "erver", so its last letter starts the next word.
        assert_eq!(table_name("HTTPServer"), "http_servers");
        assert_eq!(table_name("APIKey"), "api_keys");
    }

    #[test]
    fn test_internal_acronym() {
        assert_eq!(table_name("UserHTTPSession"), "user_http_sessions");
        assert_eq!(table_name("MyURLMap"), "my_url_maps");
    }

    #[test]
    fn test_trailing_acronym_is_not_split() {
        assert_eq!(table_name("ServerHTTP"), "serverhttps");
        assert_eq!(table_name("UserID"), "userids");
    }

    #[test]
    fn test_digits_adjacent_to_letters() {
        assert_eq!(table_name("Base64Encoder"), "base64_encoders");
        assert_eq!(table_name("V2Token"), "v2_tokens");
        assert_eq!(table_name("OAuth2Client"), "o_auth2_clients");
        assert_eq!(table_name("S3Bucket"), "s3_buckets");
    }

    #[test]
    fn test_uppercase_run_before_digit() {
        assert_eq!(table_name("AB1"), "a_b1s");
    }

    #[test]
    fn test_lowercase_and_empty_names() {
        assert_eq!(table_name("user"), "users");
        assert_eq!(table_name(""), "");
    }

    #[test]
    fn test_underscores_in_name_survive() {
        assert_eq!(table_name("Legacy_Record"), "legacy__records");
    }
}
