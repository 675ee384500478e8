// src/core/naming.rs

use crate::constants::is_prefix_char;

/// Derives the binding name implied by a symbol id: leading prefix characters
/// are stripped and separator hyphens fold the next character to upper case,
/// so `--skip-duplicates` becomes `skipDuplicates`.
pub fn inferred_binding_name(id: &str) -> String {
    let mut name = String::with_capacity(id.len());
    let mut chars = id.chars().skip_while(|&c| is_prefix_char(c)).peekable();

    if let Some(first) = chars.next() {
        name.extend(first.to_lowercase());
    }

    let mut upper_next = false;
    for c in chars {
        if c == '-' {
            upper_next = true;
            continue;
        }
        if upper_next {
            name.extend(c.to_uppercase());
            upper_next = false;
        } else {
            name.push(c);
        }
    }

    name
}

/// Normalizes an identifier for separator- and case-insensitive comparison:
/// only alphanumeric characters survive, lower-cased. `--skip-duplicates`,
/// `skipDuplicates`, and `/Skip-Duplicates` all normalize identically.
pub fn normalized_key(id: &str) -> String {
    id.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

// MARK: --- UNIT TESTS ---

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inferred_name_strips_prefix_and_camel_cases() {
        assert_eq!(inferred_binding_name("--skip-duplicates"), "skipDuplicates");
        assert_eq!(inferred_binding_name("-v"), "v");
        assert_eq!(inferred_binding_name("/Force"), "force");
        assert_eq!(inferred_binding_name("root"), "root");
        assert_eq!(inferred_binding_name("--a-b-c"), "aBC");
    }

    #[test]
    fn test_normalized_keys_equate_spelling_variants() {
        assert_eq!(normalized_key("--skip-duplicates"), normalized_key("skipDuplicates"));
        assert_eq!(normalized_key("/Skip-Duplicates"), normalized_key("--skip-duplicates"));
        assert_ne!(normalized_key("--count"), normalized_key("--count2"));
    }
}
