// jpm-common/src/dependency/resolver.rs

use tracing::trace;

const RANGE_ALTERNATIVE_SEPARATOR: &str = "||";
const COMPATIBILITY_MARKER: char = '^';

/// Picks one concrete version out of a version range string.
///
/// This is not a range evaluator. The range is split on `||`, the last
/// alternative wins, and a leading `^` is stripped from it. Anything else in
/// the clause (`~`, `>=`, `x` wildcards) is passed through untouched.
pub fn resolve_version(range: &str) -> String {
    let last_clause = range
        .rsplit(RANGE_ALTERNATIVE_SEPARATOR)
        .next()
        .map(str::trim)
        .unwrap_or_default();

    let version = last_clause
        .strip_prefix(COMPATIBILITY_MARKER)
        .unwrap_or(last_clause)
        .trim()
        .to_string();

    trace!("Resolved range '{}' to version '{}'", range, version);
    version
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_caret() {
        assert_eq!(resolve_version("^1.3.0"), "1.3.0");
        assert_eq!(resolve_version("1.3.0"), "1.3.0");
    }

    #[test]
    fn last_alternative_wins() {
        assert_eq!(resolve_version("^1.0.0 || ^2.0.0"), "2.0.0");
        assert_eq!(resolve_version("^2.0.0||^1.0.0"), "1.0.0");
        assert_eq!(resolve_version("1.0.0 || 1.1.0 || ^3.2.1"), "3.2.1");
    }

    #[test]
    fn only_the_leading_marker_is_stripped() {
        assert_eq!(resolve_version("~1.2.3"), "~1.2.3");
        assert_eq!(resolve_version("^^1.0.0"), "^1.0.0");
        assert_eq!(resolve_version(" ^ 4.0.0 "), "4.0.0");
    }

    #[test]
    fn trailing_separator_yields_empty_clause() {
        assert_eq!(resolve_version("^1.0.0 ||"), "");
        assert_eq!(resolve_version("^1.0.0 || ^1.2.0 ||  ^1.4.0"), "1.4.0");
    }

    #[test]
    fn empty_range_yields_empty_version() {
        assert_eq!(resolve_version(""), "");
    }
}
