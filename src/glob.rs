//! Glob-style pattern matching for the interactive search.

use regex::RegexBuilder;

/// Match `pattern` against `text`.
///
/// `*` matches any run of characters, `?` matches a single character, and
/// every regex metacharacter in the pattern matches itself. Matching is
/// case-insensitive and unanchored, so `readme*` matches `README` as well as
/// `old-readme.txt`.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut regex_pattern = String::with_capacity(pattern.len() * 2);
    for c in pattern.chars() {
        match c {
            '*' => regex_pattern.push_str(".*"),
            '?' => regex_pattern.push('.'),
            '.' | '(' | ')' | '[' | ']' | '{' | '}' | '+' | '^' | '$' | '|' | '\\' => {
                regex_pattern.push('\\');
                regex_pattern.push(c);
            }
            _ => regex_pattern.push(c),
        }
    }

    match RegexBuilder::new(&regex_pattern).case_insensitive(true).build() {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    }
}
