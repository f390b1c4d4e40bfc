//! Wildcard matching for virtual paths.
//!
//! The dialect is a small glob:
//!
//! - `*` matches any run of characters. Once the pattern has passed a directory separator, a lone
//!   `*` stays inside the current directory; `**` (or a `*` before any separator) may cross into
//!   subdirectories.
//! - `?` matches one character that isn't a separator.
//! - `/` and `\` are interchangeable and match a run of one or more separators.
//! - Everything else compares case-insensitively.
//!
//! There is no escape syntax since `\` is a separator.

use std::collections::HashSet;

/// Returns whether `candidate` is matched by `pattern`.
pub fn matches(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.chars().collect::<Vec<_>>();
    let candidate = candidate.chars().collect::<Vec<_>>();

    Matcher {
        max_depth: pattern.len(),
        failed: HashSet::new(),
    }
    .match_from(&pattern, &candidate, false, 0)
}

/// Returns whether `pattern` uses any wildcard syntax.
pub fn is_literal(pattern: &str) -> bool {
    !pattern.contains(['*', '?'])
}

#[inline]
fn is_separator(c: char) -> bool {
    c == '/' || c == '\\'
}

#[inline]
fn eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}

fn skip_separators(input: &[char]) -> &[char] {
    let count = input.iter().take_while(|c| is_separator(**c)).count();
    &input[count..]
}

struct Matcher {
    max_depth: usize,

    /// `(pattern left, candidate left, seen_dir)` states already known not to match. Keeps
    /// patterns with many stars from revisiting the same suffix pairs.
    failed: HashSet<(usize, usize, bool)>,
}

impl Matcher {
    /// Each recursive call consumes at least one `*` from the pattern, so `depth` stays below
    /// `max_depth` (the pattern length).
    fn match_from(
        &mut self,
        mut pattern: &[char],
        mut candidate: &[char],
        mut seen_dir: bool,
        depth: usize,
    ) -> bool {
        if depth > self.max_depth {
            return false;
        }

        loop {
            match pattern {
                [] => {
                    return match candidate {
                        [] => true,
                        [last] => is_separator(*last),
                        _ => false,
                    };
                }
                [sep, rest @ ..] if is_separator(*sep) => match candidate {
                    // Pattern ends in a separator exactly where the candidate ends.
                    [] => return skip_separators(rest).is_empty(),
                    [c, ..] if is_separator(*c) => {
                        pattern = skip_separators(rest);
                        candidate = skip_separators(candidate);
                        seen_dir = true;
                    }
                    _ => return false,
                },
                ['*', ..] => {
                    let stars = pattern.iter().take_while(|c| **c == '*').count();
                    let rest = &pattern[stars..];
                    let crosses_dirs = !seen_dir || stars > 1;

                    if rest.is_empty() {
                        return true;
                    }

                    let mut suffix = candidate;
                    loop {
                        let state = (rest.len(), suffix.len(), seen_dir);

                        if !self.failed.contains(&state) {
                            if self.match_from(rest, suffix, seen_dir, depth + 1) {
                                return true;
                            }

                            self.failed.insert(state);
                        }

                        match suffix {
                            [] => return false,
                            [c, ..] if is_separator(*c) && !crosses_dirs => return false,
                            [_, tail @ ..] => suffix = tail,
                        }
                    }
                }
                ['?', rest @ ..] => match candidate {
                    [c, tail @ ..] if !is_separator(*c) => {
                        pattern = rest;
                        candidate = tail;
                    }
                    _ => return false,
                },
                [p, rest @ ..] => match candidate {
                    [c, tail @ ..] if eq_ignore_case(*p, *c) => {
                        pattern = rest;
                        candidate = tail;
                    }
                    _ => return false,
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::{is_literal, matches};

    #[test]
    fn literal_paths_match_themselves() {
        for path in [
            "",
            "regulation.bin",
            "data/models/hud.txd",
            r"data\models\hud.txd",
            "data/",
            "ünïcode/päth.dat",
        ] {
            assert!(matches(path, path), "{path:?} should match itself");
            assert!(
                matches(path, &format!("{}/", path)),
                "{path:?} should match itself with a trailing separator"
            );
        }
    }

    #[test]
    fn single_star_stays_in_its_directory() {
        assert!(matches("models/*.txd", "models/hud.txd"));
        assert!(!matches("models/*.txd", "models/sub/hud.txd"));
        assert!(matches("models/**/*.txd", "models/sub/hud.txd"));
        assert!(matches("models/**/*.txd", "models/a/b/hud.txd"));
    }

    #[test]
    fn leading_star_crosses_directories() {
        assert!(matches("*.txd", "hud.txd"));
        assert!(matches("*.txd", "models/sub/hud.txd"));
        assert!(!matches("*.txd", "models/hud.dff"));
    }

    #[test]
    fn trailing_star_matches_everything_left() {
        assert!(matches("models/*", "models/hud.txd"));
        assert!(matches("models/*", "models/sub/hud.txd"));
        assert!(matches("models/*", "models/"));
        assert!(!matches("models/*", "anim/ped.ifp"));
    }

    #[test]
    fn consecutive_stars_collapse() {
        assert!(matches("a/***b", "a/x/y/b"));
        assert!(matches("***", "anything/at/all"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert!(matches("Models/HUD.TXD", "models/hud.txd"));
        assert!(matches("models/hud.txd", "MODELS/HUD.TXD"));
        assert!(matches("ÄBC", "äbc"));
    }

    #[test]
    fn question_mark_never_matches_a_separator() {
        assert!(!matches("a?b", "a/b"));
        assert!(!matches("a?b", r"a\b"));
        assert!(matches("a?b", "axb"));
        assert!(!matches("a?", "a"));
    }

    #[test]
    fn separators_are_interchangeable_and_collapse() {
        assert!(matches("data/models/hud.txd", r"data\models\hud.txd"));
        assert!(matches(r"data\models", "data//models"));
        assert!(matches("data/", "data"));
        assert!(!matches("data/models", "data"));
        assert!(!matches("data/models", "datamodels"));
    }

    #[test]
    fn mismatches_fail() {
        assert!(!matches("hud.txd", "hud.txd.bak"));
        assert!(!matches("hud.txd", "hud.tx"));
        assert!(!matches("hud.txd", "hud.txd//x"));
        assert!(!matches("", "x"));
    }

    #[test]
    fn pathological_patterns_terminate() {
        let pattern = "*a".repeat(32);
        let candidate = "a".repeat(31);

        assert!(!matches(&pattern, &candidate));
    }

    #[test]
    fn literals_are_detected() {
        assert!(is_literal("data/hud.txd"));
        assert!(!is_literal("data/*.txd"));
        assert!(!is_literal("data/hu?.txd"));
    }

    #[test]
    fn backslash_before_a_star_is_a_separator() {
        assert!(matches(r"models\*.txd", "models/hud.txd"));
        assert!(matches(r"models\*.txd", r"models\hud.txd"));
        assert!(!matches(r"models\*.txd", "models*.txd"));
        assert!(!matches(r"models\*.txd", "models/sub/hud.txd"));
    }

    mod properties {
        use proptest::prelude::*;

        use super::matches;

        fn arb_path(segment: &'static str) -> impl Strategy<Value = String> {
            (
                any::<bool>(),
                prop::collection::vec(segment, 1..5),
                prop::sample::select(vec!["/", "\\", "//"]),
            )
                .prop_map(|(leading, segments, separator)| {
                    let path = segments.join(separator);

                    if leading { format!("{separator}{path}") } else { path }
                })
        }

        fn arb_literal_path() -> impl Strategy<Value = String> {
            arb_path("[a-zA-Z0-9_. -]{1,8}|[äöüßé]{1,3}")
        }

        proptest! {
            #[test]
            fn literal_paths_match_themselves(path in arb_literal_path()) {
                prop_assert!(matches(&path, &path));
                let with_slash = format!("{path}/");
                let with_backslash = format!("{path}\\");
                prop_assert!(matches(&path, &with_slash));
                prop_assert!(matches(&path, &with_backslash));
            }

            #[test]
            fn ascii_case_never_matters(path in arb_path("[a-zA-Z0-9_.-]{1,8}")) {
                prop_assert!(matches(&path.to_ascii_uppercase(), &path.to_ascii_lowercase()));
            }

            #[test]
            fn literal_paths_reject_extensions(path in arb_literal_path(), extra in "[a-z]{1,4}") {
                let extended = format!("{path}{extra}");
                prop_assert!(!matches(&path, &extended));
            }
        }
    }
}
