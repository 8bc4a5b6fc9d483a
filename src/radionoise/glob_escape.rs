/// Characters a glob matcher would otherwise read as pattern syntax.
pub const GLOB_METACHARACTERS: [char; 7] = ['[', ']', '{', '}', '*', '?', '\\'];

/// Backslash-escape every glob metacharacter in a raw path segment.
///
/// Apply exactly once per segment: escaping an already escaped string
/// escapes the backslashes again.
pub fn escape_glob(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for ch in segment.chars() {
        if GLOB_METACHARACTERS.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_glob;
    use globset::GlobBuilder;

    fn literal_glob(raw: &str) -> globset::GlobMatcher {
        GlobBuilder::new(&escape_glob(raw))
            .literal_separator(true)
            .backslash_escape(true)
            .build()
            .expect("escaped pattern compiles")
            .compile_matcher()
    }

    #[test]
    fn plain_names_pass_through() {
        assert_eq!(escape_glob("Show - 01.mkv"), "Show - 01.mkv");
        assert_eq!(escape_glob(""), "");
    }

    #[test]
    fn every_metacharacter_is_escaped() {
        assert_eq!(
            escape_glob(r"[Group] Show {v2} *?\"),
            r"\[Group\] Show \{v2\} \*\?\\"
        );
    }

    #[test]
    fn escaped_pattern_matches_only_the_literal_name() {
        let name = "[SubGroup] Show - 01 [1080p].mkv";
        let glob = literal_glob(name);
        assert!(glob.is_match(name));
        assert!(!glob.is_match("S Show - 01 1.mkv"));
        assert!(!glob.is_match("u Show - 01 p.mkv"));
    }

    #[test]
    fn escaped_wildcards_do_not_expand() {
        let glob = literal_glob("Show*?.mkv");
        assert!(glob.is_match("Show*?.mkv"));
        assert!(!glob.is_match("Show - 01.mkv"));
        assert!(!glob.is_match("ShowXY.mkv"));
    }

    #[test]
    fn escaped_braces_do_not_alternate() {
        let glob = literal_glob("{a,b}.mkv");
        assert!(glob.is_match("{a,b}.mkv"));
        assert!(!glob.is_match("a.mkv"));
    }

    #[test]
    fn escaping_twice_double_escapes() {
        let once = escape_glob("*");
        assert_eq!(escape_glob(&once), r"\\\*");
        assert!(escape_glob(&once).len() > once.len());
    }
}
