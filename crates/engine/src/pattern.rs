// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A small glob matcher for the exclude/include file-path filters: `*`
//! (any run of characters), `?` (any single character), matched
//! whole-string, case-insensitively, after separator normalization. Two
//! tokens don't justify a crate dependency.

/// Replace `/` with `\` and lowercase, so `C:/x/y.TXT` and `c:\x\y.txt`
/// compare equal to a pattern written with either separator.
fn normalize(s: &str) -> String {
    s.replace('/', "\\").to_lowercase()
}

/// Whole-string match of `text` against `pattern`, both normalized first.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern = normalize(pattern);
    let text = normalize(text);
    match_bytes(pattern.as_bytes(), text.as_bytes())
}

fn match_bytes(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.first() {
        None => text.is_empty(),
        Some(b'*') => {
            match_bytes(&pattern[1..], text)
                || (!text.is_empty() && match_bytes(pattern, &text[1..]))
        }
        Some(b'?') => !text.is_empty() && match_bytes(&pattern[1..], &text[1..]),
        Some(&c) => text.first() == Some(&c) && match_bytes(&pattern[1..], &text[1..]),
    }
}

/// `true` if any pattern in `patterns` matches `text`.
pub fn any_match(patterns: &[String], text: &str) -> bool {
    patterns.iter().any(|p| glob_match(p, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[yare::parameterized(
        star_prefix_and_suffix   = { "*\\Temp\\*", "c:\\users\\u\\temp\\a.txt", true },
        star_suffix_match        = { "*.txt", "a.txt", true },
        star_suffix_mismatch     = { "*.txt", "a.doc", false },
        question_mark_one_char   = { "a?c", "abc", true },
        question_mark_needs_char = { "a?c", "ac", false },
        question_mark_not_two    = { "a?c", "abbc", false },
        case_and_separator       = { "*\\X\\*.txt", "C:/x/y.TXT", true },
        whole_string_not_substr  = { "b", "abc", false },
        star_allows_substr       = { "*b*", "abc", true },
    )]
    fn glob_match_cases(pattern: &str, text: &str, expected: bool) {
        assert_eq!(glob_match(pattern, text), expected);
    }
}
