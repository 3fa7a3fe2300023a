//! SP-002: Manifest extraction and stripping.
//!
//! A manifest is a leading metadata block delimited by `0o ---` and `--- o0`
//! sentinel lines. Body lines are `key: value`, split on the first colon.
//! A missing or malformed manifest is never an error: it yields an empty or
//! partial mapping and callers fall back to their defaults.

use super::types::{BuildMode, KEY_ARTIFACT_NAME, KEY_BUILD_MODE, KEY_SHEBANG, MANIFEST_END, MANIFEST_START};
use indexmap::IndexMap;
use serde::Serialize;

/// Ordered key/value metadata parsed from a manifest block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Manifest {
    entries: IndexMap<String, String>,
}

impl Manifest {
    /// Parse the first manifest block in `text`.
    ///
    /// Collection starts at the start sentinel and scanning stops for good at
    /// the first end sentinel, even one that precedes any start sentinel.
    pub fn parse(text: &str) -> Self {
        let mut manifest = Manifest::default();
        let mut inside = false;

        for line in text.lines() {
            let trimmed = line.trim();
            if trimmed == MANIFEST_START {
                inside = true;
                continue;
            }
            if trimmed == MANIFEST_END {
                break;
            }
            if !inside {
                continue;
            }
            if let Some((key, value)) = line.split_once(':') {
                manifest.insert(key.trim(), value.trim());
            }
        }

        manifest
    }

    /// Insert a key, overwriting any earlier value in place.
    pub fn insert(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Interpreter line, without the `#!` prefix. Empty values count as unset.
    pub fn shebang(&self) -> Option<&str> {
        self.get(KEY_SHEBANG).filter(|s| !s.is_empty())
    }

    pub fn artifact_name(&self) -> Option<&str> {
        self.get(KEY_ARTIFACT_NAME).filter(|s| !s.is_empty())
    }

    /// Declared build mode. Unknown values are logged and ignored.
    pub fn build_mode(&self) -> Option<BuildMode> {
        let raw = self.get(KEY_BUILD_MODE).filter(|s| !s.is_empty())?;
        match raw.parse() {
            Ok(mode) => Some(mode),
            Err(e) => {
                tracing::warn!("ignoring manifest {}: {}", KEY_BUILD_MODE, e);
                None
            }
        }
    }
}

/// Remove every manifest block from `text`, sentinel lines included.
///
/// All other lines keep their original terminators and order. An unclosed
/// block swallows everything to end of input. Stripping already-stripped
/// text is a no-op.
pub fn strip(text: &str) -> String {
    body_lines(text).map(|(_, line)| line).collect()
}

/// Lines outside any manifest block, paired with their 1-based line number
/// in `text`. Each line keeps its terminator. Only `\n` ends a line; a lone
/// `\r` is ordinary text.
pub fn body_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut inside = false;
    text.split_inclusive('\n')
        .enumerate()
        .filter_map(move |(idx, line)| {
            let trimmed = line.trim();
            if trimmed == MANIFEST_START {
                inside = true;
                return None;
            }
            if trimmed == MANIFEST_END {
                inside = false;
                return None;
            }
            (!inside).then_some((idx + 1, line))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EXAMPLE: &str = "0o ---\nshebang: /usr/bin/env node\nartifact-name: out.js\n--- o0\ncode\n";

    #[test]
    fn test_sp002_parse_example() {
        let m = Manifest::parse(EXAMPLE);
        let pairs: Vec<_> = m.iter().collect();
        assert_eq!(
            pairs,
            vec![("shebang", "/usr/bin/env node"), ("artifact-name", "out.js")]
        );
        assert_eq!(m.shebang(), Some("/usr/bin/env node"));
        assert_eq!(m.artifact_name(), Some("out.js"));
    }

    #[test]
    fn test_sp002_strip_example() {
        assert_eq!(strip(EXAMPLE), "code\n");
    }

    #[test]
    fn test_sp002_no_manifest_is_empty() {
        let m = Manifest::parse("print('hi')\nx: 1\n");
        assert!(m.is_empty());
    }

    #[test]
    fn test_sp002_first_colon_splits() {
        let m = Manifest::parse("0o ---\nshebang: /usr/bin/env -S deno run\nurl:  http://x:80/y \n--- o0\n");
        assert_eq!(m.get("url"), Some("http://x:80/y"));
    }

    #[test]
    fn test_sp002_duplicate_key_overwrites_in_place() {
        let m = Manifest::parse("0o ---\na: 1\nb: 2\na: 3\n--- o0\n");
        let pairs: Vec<_> = m.iter().collect();
        assert_eq!(pairs, vec![("a", "3"), ("b", "2")]);
    }

    #[test]
    fn test_sp002_lines_without_colon_ignored() {
        let m = Manifest::parse("0o ---\njust text\n\nk: v\n--- o0\n");
        assert_eq!(m.len(), 1);
        assert_eq!(m.get("k"), Some("v"));
    }

    #[test]
    fn test_sp002_unclosed_manifest_reads_to_eof() {
        let m = Manifest::parse("0o ---\na: 1\nb: 2\n");
        assert_eq!(m.len(), 2);
        assert_eq!(strip("keep\n0o ---\na: 1\nb: 2\n"), "keep\n");
    }

    #[test]
    fn test_sp002_scanning_stops_at_first_end() {
        let text = "0o ---\na: 1\n--- o0\n0o ---\nb: 2\n--- o0\n";
        let m = Manifest::parse(text);
        assert_eq!(m.get("a"), Some("1"));
        assert_eq!(m.get("b"), None);
    }

    #[test]
    fn test_sp002_end_before_start_yields_empty() {
        let m = Manifest::parse("--- o0\n0o ---\na: 1\n--- o0\n");
        assert!(m.is_empty());
    }

    #[test]
    fn test_sp002_sentinels_match_trimmed() {
        let text = "  0o ---  \n k : v \n\t--- o0\nbody\n";
        assert_eq!(Manifest::parse(text).get("k"), Some("v"));
        assert_eq!(strip(text), "body\n");
    }

    #[test]
    fn test_sp002_strip_preserves_crlf() {
        let text = "0o ---\r\nk: v\r\n--- o0\r\nline one\r\nline two";
        assert_eq!(strip(text), "line one\r\nline two");
    }

    #[test]
    fn test_sp002_lone_cr_is_not_a_line_break() {
        let lines: Vec<_> = body_lines("a\rb\nc\n").collect();
        assert_eq!(lines, vec![(1, "a\rb\n"), (2, "c\n")]);
        // A sentinel followed by a lone CR shares its line with the next text
        assert_eq!(strip("0o ---\rkeep\n"), "0o ---\rkeep\n");
    }

    #[test]
    fn test_sp002_strip_keeps_surrounding_lines() {
        let text = "before\n0o ---\nk: v\n--- o0\nafter\n";
        assert_eq!(strip(text), "before\nafter\n");
    }

    #[test]
    fn test_sp002_body_lines_keep_original_numbers() {
        let lines: Vec<_> = body_lines("0o ---\nk: v\n--- o0\nfirst\nsecond\n").collect();
        assert_eq!(lines, vec![(4, "first\n"), (5, "second\n")]);
    }

    #[test]
    fn test_sp002_build_mode_accessor() {
        let m = Manifest::parse("0o ---\nbuild-mode: run\n--- o0\n");
        assert_eq!(m.build_mode(), Some(BuildMode::Run));
        let m = Manifest::parse("0o ---\nbuild-mode: turbo\n--- o0\n");
        assert_eq!(m.build_mode(), None);
        assert!(Manifest::default().build_mode().is_none());
    }

    #[test]
    fn test_sp002_empty_values_are_unset() {
        let m = Manifest::parse("0o ---\nshebang:\nartifact-name:   \n--- o0\n");
        assert_eq!(m.len(), 2);
        assert_eq!(m.shebang(), None);
        assert_eq!(m.artifact_name(), None);
    }

    #[test]
    fn test_sp002_serializes_as_flat_object() {
        let m = Manifest::parse(EXAMPLE);
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(
            json,
            r#"{"shebang":"/usr/bin/env node","artifact-name":"out.js"}"#
        );
    }

    proptest! {
        #[test]
        fn prop_sp002_strip_idempotent(lines in proptest::collection::vec(
            prop_oneof![
                Just("0o ---".to_string()),
                Just("--- o0".to_string()),
                Just("key: value".to_string()),
                "[a-z #:]{0,12}",
            ],
            0..16,
        )) {
            let text = lines.join("\n");
            let once = strip(&text);
            prop_assert_eq!(strip(&once), once);
        }
    }
}
