//! Text anonymization
//!
//! Replaces whole-word occurrences of a detected character name with
//! `{{char}}` and of a detected user name with `{{user}}`. Text already
//! inside a placeholder is never rewritten, so anonymizing twice is the same
//! as anonymizing once even when a name collides with a placeholder word.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Placeholder substituted for the character name
pub const CHAR_PLACEHOLDER: &str = "{{char}}";

/// Placeholder substituted for the user name
pub const USER_PLACEHOLDER: &str = "{{user}}";

static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(?:char|user)\}\}").expect("placeholder pattern is valid"));

/// Anonymize `text`, substituting the character name first, then the user name
///
/// Empty names are skipped. Matching is case-sensitive and respects word
/// boundaries, so "Ann" inside "Anna" is left alone.
pub fn anonymize(text: &str, char_name: &str, user_name: &str) -> String {
    let mut out = text.to_string();
    if let Some(re) = whole_word(char_name) {
        out = replace_outside_placeholders(&out, &re, CHAR_PLACEHOLDER);
    }
    if let Some(re) = whole_word(user_name) {
        out = replace_outside_placeholders(&out, &re, USER_PLACEHOLDER);
    }
    out
}

fn whole_word(name: &str) -> Option<Regex> {
    if name.is_empty() {
        return None;
    }
    match Regex::new(&format!(r"\b{}\b", regex::escape(name))) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(name = %name, error = %e, "Skipping anonymization for unmatchable name");
            None
        }
    }
}

fn replace_outside_placeholders(text: &str, re: &Regex, placeholder: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for token in PLACEHOLDER_PATTERN.find_iter(text) {
        out.push_str(&re.replace_all(&text[last..token.start()], placeholder));
        out.push_str(token.as_str());
        last = token.end();
    }
    out.push_str(&re.replace_all(&text[last..], placeholder));
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replaces_both_names() {
        let out = anonymize("Bob greets Alice. Alice waves at Bob.", "Bob", "Alice");
        assert_eq!(out, "{{char}} greets {{user}}. {{user}} waves at {{char}}.");
    }

    #[test]
    fn test_whole_word_only() {
        assert_eq!(anonymize("Anna met Ann.", "Ann", ""), "Anna met {{char}}.");
    }

    #[test]
    fn test_case_sensitive() {
        assert_eq!(anonymize("bob and Bob", "Bob", ""), "bob and {{char}}");
    }

    #[test]
    fn test_empty_names_are_noop() {
        let text = "Nothing to see here.";
        assert_eq!(anonymize(text, "", ""), text);
    }

    #[test]
    fn test_regex_metacharacters_in_name() {
        assert_eq!(anonymize("Hi Mr.X, bye Mr.Xy", "Mr.X", ""), "Hi {{char}}, bye Mr.Xy");
    }

    #[test]
    fn test_idempotent() {
        let once = anonymize("Bob sees Alice and Bobby.", "Bob", "Alice");
        let twice = anonymize(&once, "Bob", "Alice");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_idempotent_when_name_collides_with_placeholder() {
        let once = anonymize("char meets user", "char", "user");
        assert_eq!(once, "{{char}} meets {{user}}");
        assert_eq!(anonymize(&once, "char", "user"), once);
    }

    #[test]
    fn test_character_name_wins_over_same_user_name() {
        assert_eq!(anonymize("Sam", "Sam", "Sam"), "{{char}}");
    }
}
