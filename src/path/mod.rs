//! Hierarchical path handling: canonicalization of `/`-separated
//! addressing strings and reversible escaping of names that collide
//! with separators or reserved prefixes.

use crate::{StoreError, StoreResult};

/// Separator between path segments.
pub const SEPARATOR: char = '/';

/// Splits a raw path into canonical segments.
///
/// Repeated separators collapse, `.` segments are dropped, and a
/// leading separator (absolute form) is accepted but not recorded; all
/// resolution is relative to the store root. An input with no segments
/// left is rejected. Each surviving segment is escaped so it is safe as
/// a literal container name.
pub fn resolve(raw: &str) -> StoreResult<Vec<String>> {
    let segments: Vec<String> = raw
        .split(SEPARATOR)
        .filter(|s| !s.is_empty() && *s != ".")
        .map(escape_name)
        .collect();
    if segments.is_empty() {
        return Err(StoreError::Path(format!(
            "path {raw:?} resolves to no segments"
        )));
    }
    Ok(segments)
}

/// Like [`resolve`] but for a pre-split segment sequence. Segments are
/// taken literally (no separator splitting) and escaped individually.
pub fn resolve_segments(segments: &[&str]) -> StoreResult<Vec<String>> {
    if segments.is_empty() {
        return Err(StoreError::Path("empty segment sequence".into()));
    }
    for s in segments {
        if s.is_empty() {
            return Err(StoreError::Path("empty path segment".into()));
        }
    }
    Ok(segments.iter().map(|s| escape_name(s)).collect())
}

/// Escapes a name for use as a literal container or attribute name.
///
/// Backslashes double, NUL becomes `\x00`, the separator becomes
/// `\x2f`, and each period in a leading run of periods becomes `\x2e`
/// so escaped names can never look like relative-path markers. The
/// transformation is reversed exactly by [`unescape_name`].
pub fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut leading_periods = true;
    for ch in name.chars() {
        if ch != '.' {
            leading_periods = false;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\0' => out.push_str("\\x00"),
            SEPARATOR => out.push_str("\\x2f"),
            '.' if leading_periods => out.push_str("\\x2e"),
            _ => out.push(ch),
        }
    }
    out
}

/// Reverses [`escape_name`]. Escape sequences not produced by the
/// escaper pass through untouched, so unescaping is total.
pub fn unescape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.peek() {
            Some('\\') => {
                chars.next();
                out.push('\\');
            }
            Some('x') => {
                let rest: String = chars.clone().take(3).collect();
                match rest.as_str() {
                    "x00" => {
                        out.push('\0');
                        chars.nth(2);
                    }
                    "x2f" => {
                        out.push(SEPARATOR);
                        chars.nth(2);
                    }
                    "x2e" => {
                        out.push('.');
                        chars.nth(2);
                    }
                    _ => out.push('\\'),
                }
            }
            _ => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    /// Canonicalization collapses separators and drops `.` segments.
    #[test]
    fn test_resolve_canonicalization() {
        assert_eq!(resolve("/a//b/./c").unwrap(), vec!["a", "b", "c"]);
        assert_eq!(resolve("a/b").unwrap(), vec!["a", "b"]);
        assert_eq!(resolve("/abc").unwrap(), vec!["abc"]);
    }

    /// Paths with nothing left after canonicalization are invalid.
    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve(""), Err(StoreError::Path(_))));
        assert!(matches!(resolve("///"), Err(StoreError::Path(_))));
        assert!(matches!(resolve("/./."), Err(StoreError::Path(_))));
    }

    /// Pre-split segments are taken literally, including ones holding a
    /// separator character.
    #[test]
    fn test_resolve_segments() {
        let segs = resolve_segments(&["a/b", "c"]).unwrap();
        assert_eq!(segs, vec!["a\\x2fb", "c"]);
        assert!(resolve_segments(&[]).is_err());
        assert!(resolve_segments(&["a", ""]).is_err());
    }

    /// Reserved characters escape to their fixed sequences.
    #[test]
    fn test_escape_reserved() {
        assert_eq!(escape_name("a/b"), "a\\x2fb");
        assert_eq!(escape_name("a\\b"), "a\\\\b");
        assert_eq!(escape_name("a\0b"), "a\\x00b");
        assert_eq!(escape_name("..a."), "\\x2e\\x2ea.");
        assert_eq!(escape_name("a.b"), "a.b");
        assert_eq!(escape_name(""), "");
    }

    /// Strings that already look like escape sequences survive a full
    /// escape/unescape cycle.
    #[test]
    fn test_escape_of_escape_marker() {
        let tricky = "\\x2f.\\x2e\\\\";
        assert_eq!(unescape_name(&escape_name(tricky)), tricky);
    }

    /// Unknown backslash sequences pass through unescaping untouched.
    #[test]
    fn test_unescape_unknown_sequences() {
        assert_eq!(unescape_name("a\\x99b"), "a\\x99b");
        assert_eq!(unescape_name("a\\"), "a\\");
        assert_eq!(unescape_name("a\\x2"), "a\\x2");
    }

    proptest! {
        /// unescape(escape(s)) == s for arbitrary strings.
        #[test]
        fn prop_escape_bijection(s in "\\PC*") {
            prop_assert_eq!(unescape_name(&escape_name(&s)), s);
        }

        /// The same holds for strings built from the troublesome
        /// alphabet only.
        #[test]
        fn prop_escape_bijection_reserved(s in "[./\\\\x0e2]*") {
            prop_assert_eq!(unescape_name(&escape_name(&s)), s);
        }

        /// Escaped names never contain a bare separator.
        #[test]
        fn prop_escaped_has_no_separator(s in "\\PC*") {
            prop_assert!(!escape_name(&s).contains(SEPARATOR));
        }
    }
}
