use regex::Regex;
use std::sync::LazyLock;

pub const MAX_FILENAME_CHARS: usize = 200;

static RESERVED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[<>:"/\\|?*]"#).expect("valid reserved character regex"));

/// Map a title to something every common filesystem accepts as a file name.
///
/// Reserved characters are removed, the result is cut to
/// [`MAX_FILENAME_CHARS`] characters and then stripped of leading and trailing
/// dots and spaces. Trimming last keeps the function idempotent.
pub fn sanitize(name: &str) -> String {
    let stripped = RESERVED_RE.replace_all(name, "");
    let truncated: String = stripped.chars().take(MAX_FILENAME_CHARS).collect();
    truncated.trim_matches(|c| c == '.' || c == ' ').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "",
        "plain title",
        "AC/DC - Back In Black (Official Video)",
        "What? Why: \"because\" <yes> | no * maybe \\ ok",
        "...leading dots and spaces   ",
        " . . ",
        "ends with a dot.",
        "日本語のタイトル / テスト",
        "????",
    ];

    #[test]
    fn removes_reserved_characters() {
        assert_eq!(sanitize("AC/DC: Live?"), "ACDC Live");
        assert_eq!(sanitize(r#"a<b>c:d"e/f\g|h?i*j"#), "abcdefghij");
    }

    #[test]
    fn trims_dots_and_spaces() {
        assert_eq!(sanitize("  ..My Song..  "), "My Song");
        assert_eq!(sanitize(" . . "), "");
        assert_eq!(sanitize("inner.dots stay"), "inner.dots stay");
    }

    #[test]
    fn truncates_to_character_count() {
        let long = "é".repeat(250);
        let out = sanitize(&long);
        assert_eq!(out.chars().count(), MAX_FILENAME_CHARS);
        assert!(out.len() > MAX_FILENAME_CHARS);
    }

    #[test]
    fn truncation_never_leaves_trailing_space() {
        let input = format!("{} tail", "a".repeat(MAX_FILENAME_CHARS - 1));
        let out = sanitize(&input);
        assert_eq!(out, "a".repeat(MAX_FILENAME_CHARS - 1));
    }

    #[test]
    fn output_properties_hold_for_samples() {
        let long = format!("{}:{}", "x".repeat(150), "y. ".repeat(60));
        let samples = SAMPLES.iter().copied().chain([long.as_str()]);

        for input in samples {
            let out = sanitize(input);
            assert!(
                !out.contains(['<', '>', ':', '"', '/', '\\', '|', '?', '*']),
                "reserved character left in {out:?}"
            );
            assert!(out.chars().count() <= MAX_FILENAME_CHARS);
            assert!(!out.starts_with(['.', ' ']) && !out.ends_with(['.', ' ']));
            assert_eq!(sanitize(&out), out, "not idempotent for {input:?}");
        }
    }
}
