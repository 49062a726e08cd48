//! Route priority scoring.
//!
//! Overlapping dynamic patterns need a deterministic, intuitive order at
//! match time: literal segments above parameterized ones at each depth,
//! catch-alls last. The score is an empirically tuned heuristic carried over
//! from the original generator; the arithmetic below is load-bearing for
//! ordering and must not be "improved".
//!
//! Per `/`-separated segment, the score starts at the first character's code
//! capped at 90, then:
//!
//! - −10 when the segment starts with a parameter marker (`:`)
//! - −10 when it contains a parameter marker anywhere
//! - +5 for a parenthesized custom pattern group
//! - +3 when a non-parameter segment has a following path separator
//! - −3 for a trailing `?`, `+` or `*` quantifier
//! - −10 for a `(.*)` catch-all group
//! - +1 per literal hyphen
//!
//! The route total is `100 × segment count + Σ segment scores`; routes sort
//! descending, ties broken by insertion order.

/// First-character score cap.
const CHAR_CODE_CAP: u32 = 90;

/// Weight of one path segment in the total.
const SEGMENT_WEIGHT: i64 = 100;

/// Computes the priority of a route path pattern.
pub fn resolve_priority(path: &str) -> i64 {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let trailing_slash = path.ends_with('/');
    let count = segments.len();

    let sum: i64 = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let has_following_separator = index + 1 < count || trailing_slash;
            segment_score(segment, has_following_separator)
        })
        .sum();

    SEGMENT_WEIGHT * count as i64 + sum
}

fn segment_score(segment: &str, has_following_separator: bool) -> i64 {
    let first = segment.chars().next().map(|c| c as u32).unwrap_or(0);
    let mut score = first.min(CHAR_CODE_CAP) as i64;

    let is_parameter = segment.contains(':');

    if segment.starts_with(':') {
        score -= 10;
    }
    if is_parameter {
        score -= 10;
    }
    if has_pattern_group(segment) {
        score += 5;
    }
    if !is_parameter && has_following_separator {
        score += 3;
    }
    if segment.ends_with(['?', '+', '*']) {
        score -= 3;
    }
    if segment.contains("(.*)") {
        score -= 10;
    }
    score += segment.matches('-').count() as i64;

    score
}

/// True when the segment contains a `( ... )` group.
fn has_pattern_group(segment: &str) -> bool {
    match (segment.find('('), segment.rfind(')')) {
        (Some(open), Some(close)) => open < close,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_segments_score_above_parameters() {
        assert!(resolve_priority("/a/b/c") > resolve_priority("/a/:b/c"));
        assert!(resolve_priority("/a/b") > resolve_priority("/a/:b"));
    }

    #[test]
    fn deeper_paths_score_above_shallower() {
        assert!(resolve_priority("/a/:b/:c+") > resolve_priority("/a/b"));
    }

    #[test]
    fn catch_all_scores_below_plain_parameter() {
        assert!(resolve_priority("/a/:b") > resolve_priority("/a/:b(.*)"));
    }

    #[test]
    fn custom_group_scores_above_bare_quantifier() {
        assert!(resolve_priority("/a/:b/:c(\\d+)?") > resolve_priority("/a/:b/:c+"));
    }

    #[test]
    fn hyphens_add_to_the_score() {
        assert!(resolve_priority("/a-b-c") > resolve_priority("/a"));
    }

    #[test]
    fn exact_arithmetic_is_stable() {
        // These exact values pin the heuristic; ordering tests depend on it.
        assert_eq!(resolve_priority("/a/b/c"), 576);
        assert_eq!(resolve_priority("/a/:b/c"), 521);
        assert_eq!(resolve_priority("/a/:b/:c(\\d+)?"), 471);
        assert_eq!(resolve_priority("/a/:b/:c+"), 466);
        assert_eq!(resolve_priority("/a/b"), 383);
        assert_eq!(resolve_priority("/a/:b"), 331);
        assert_eq!(resolve_priority("/a/:b(.*)"), 326);
    }

    #[test]
    fn spec_ordering_fixture() {
        let expected = [
            "/a/b/c",
            "/a/:b/c",
            "/a/:b/:c(\\d+)?",
            "/a/:b/:c+",
            "/a/b",
            "/a/:b",
            "/a/:b(.*)",
        ];

        let mut sorted = expected.to_vec();
        sorted.sort_by_key(|path| -resolve_priority(path));

        assert_eq!(sorted, expected);
    }

    #[test]
    fn root_path_scores_zero_segments() {
        assert_eq!(resolve_priority("/"), 0);
    }
}
