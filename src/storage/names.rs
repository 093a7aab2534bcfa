//! Storage key normalization.

use regex::Regex;
use std::sync::OnceLock;

fn non_word_run() -> &'static Regex {
    static NON_WORD_RUN: OnceLock<Regex> = OnceLock::new();
    NON_WORD_RUN.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_]+").expect("static pattern"))
}

/// Normalize a folder/file name used as a storage key.
///
/// Lowercase, whitespace to `_`, then every run of characters outside
/// `[a-zA-Z0-9_]` collapses to a single `_`. Idempotent.
pub fn normalize_name(name: &str) -> String {
    let lowered: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .collect();
    non_word_run().replace_all(&lowered, "_").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_example() {
        assert_eq!(normalize_name("My Folder!!1"), "my_folder_1");
    }

    #[test]
    fn test_normalize_keeps_valid_names() {
        assert_eq!(normalize_name("model_v2"), "model_v2");
        assert_eq!(normalize_name(""), "");
    }

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize_name("a.b-c/d"), "a_b_c_d");
        assert_eq!(normalize_name("tab\there"), "tab_here");
        assert_eq!(normalize_name("Données 2024"), "donn_es_2024");
    }

    #[test]
    fn test_normalize_idempotent() {
        for name in ["My Folder!!1", "  spaced  out ", "Ünïcödé/π", "x^y", "already_ok"] {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once, "not idempotent for {:?}", name);
        }
    }
}
