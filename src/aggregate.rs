//! Groups flat search matches per repository and applies exclusions.

use crate::types::{CodeMatch, RepoGroup};
use std::collections::{HashMap, HashSet};

// ── Reference normalisation ─────────────────────────────────

/// Qualify a short repo name with the org. Names containing `/` pass through.
pub fn normalise_repo(org: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.contains('/') {
        trimmed.to_string()
    } else {
        format!("{}/{}", org, trimmed)
    }
}

/// Normalise the repo part of `repo:path:index`, leaving the rest untouched.
pub fn normalise_extract_ref(org: &str, raw: &str) -> String {
    let trimmed = raw.trim();
    match trimmed.split_once(':') {
        Some((repo, rest)) => format!("{}:{}", normalise_repo(org, repo), rest),
        None => trimmed.to_string(),
    }
}

/// Canonical extract reference: `org/repo:path:index`.
pub fn extract_ref(repo_full_name: &str, path: &str, index: usize) -> String {
    format!("{}:{}:{}", repo_full_name, path, index)
}

/// Split a comma-separated CLI list, normalising each non-empty entry.
pub fn parse_ref_list(org: &str, raw: &str, normalise: fn(&str, &str) -> String) -> HashSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| normalise(org, s))
        .collect()
}

// ── Aggregation ─────────────────────────────────────────────

/// Build one `RepoGroup` per repository, in first-seen order.
///
/// A repository is dropped when it is in `excluded_repos`, or when every one
/// of its matches is archived and `include_archived` is false. Extract
/// exclusions use the match index within that repository's own list.
pub fn aggregate(
    matches: &[CodeMatch],
    excluded_repos: &HashSet<String>,
    excluded_extract_refs: &HashSet<String>,
    include_archived: bool,
) -> Vec<RepoGroup> {
    let mut order: Vec<&str> = Vec::new();
    let mut by_repo: HashMap<&str, Vec<&CodeMatch>> = HashMap::new();

    for m in matches {
        if excluded_repos.contains(&m.repo_full_name) {
            continue;
        }
        let entry = by_repo.entry(m.repo_full_name.as_str()).or_insert_with(|| {
            order.push(m.repo_full_name.as_str());
            Vec::new()
        });
        entry.push(m);
    }

    order
        .into_iter()
        .filter_map(|repo| {
            let repo_matches = by_repo.remove(repo)?;
            if !include_archived && repo_matches.iter().all(|m| m.archived) {
                return None;
            }
            let (source_index, kept): (Vec<usize>, Vec<CodeMatch>) = repo_matches
                .into_iter()
                .enumerate()
                .filter(|(i, m)| !excluded_extract_refs.contains(&extract_ref(repo, &m.path, *i)))
                .map(|(i, m)| (i, m.clone()))
                .unzip();
            let mut group = RepoGroup::new(repo, kept);
            group.source_index = source_index;
            Some(group)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::code_match;

    fn none() -> HashSet<String> {
        HashSet::new()
    }

    fn set(items: &[&str]) -> HashSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn archived(repo: &str, path: &str) -> CodeMatch {
        let mut m = code_match(repo, path);
        m.archived = true;
        m
    }

    #[test]
    fn empty_input_yields_no_groups() {
        assert!(aggregate(&[], &none(), &none(), false).is_empty());
    }

    #[test]
    fn groups_in_first_seen_order() {
        let input = vec![
            code_match("org/b", "1.ts"),
            code_match("org/a", "2.ts"),
            code_match("org/b", "3.ts"),
        ];
        let groups = aggregate(&input, &none(), &none(), false);
        let names: Vec<_> = groups.iter().map(|g| g.repo_full_name.as_str()).collect();
        assert_eq!(names, vec!["org/b", "org/a"]);
        assert_eq!(groups[0].matches.len(), 2);
        assert_eq!(groups[0].matches[1].path, "3.ts");
    }

    #[test]
    fn aggregation_is_idempotent() {
        let input = vec![
            code_match("org/a", "x.ts"),
            code_match("org/b", "y.ts"),
            code_match("org/a", "z.ts"),
        ];
        let excl = set(&["org/a:z.ts:1"]);
        let first = aggregate(&input, &none(), &excl, false);
        let second = aggregate(&input, &none(), &excl, false);
        assert_eq!(first, second);
    }

    #[test]
    fn new_groups_are_folded_and_selected() {
        let groups = aggregate(&[code_match("org/a", "x.ts")], &none(), &none(), false);
        assert!(groups[0].folded);
        assert!(groups[0].repo_selected);
        assert_eq!(groups[0].extract_selected, vec![true]);
    }

    #[test]
    fn excluded_repo_is_dropped() {
        let input = vec![code_match("org/a", "x.ts"), code_match("org/b", "y.ts")];
        let groups = aggregate(&input, &set(&["org/a"]), &none(), false);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].repo_full_name, "org/b");
    }

    #[test]
    fn excluded_extract_uses_index_within_repo() {
        let input = vec![code_match("r", "a"), code_match("r", "b")];
        let groups = aggregate(&input, &none(), &set(&["r:b:1"]), false);
        assert_eq!(groups.len(), 1);
        let paths: Vec<_> = groups[0].matches.iter().map(|m| m.path.as_str()).collect();
        assert_eq!(paths, vec!["a"]);
        assert_eq!(groups[0].extract_selected.len(), 1);
    }

    #[test]
    fn extract_index_ignores_other_repos() {
        // global index of org/a:y.ts is 2, but within org/a it is 1
        let input = vec![
            code_match("org/a", "x.ts"),
            code_match("org/b", "q.ts"),
            code_match("org/a", "y.ts"),
        ];
        let groups = aggregate(&input, &none(), &set(&["org/a:y.ts:1"]), false);
        assert_eq!(groups[0].matches.len(), 1);
        assert_eq!(groups[0].matches[0].path, "x.ts");

        let untouched = aggregate(&input, &none(), &set(&["org/a:y.ts:2"]), false);
        assert_eq!(untouched[0].matches.len(), 2);
    }

    #[test]
    fn kept_matches_remember_their_original_index() {
        let input = vec![
            code_match("org/r", "a"),
            code_match("org/r", "b"),
            code_match("org/r", "c"),
        ];
        let groups = aggregate(&input, &none(), &set(&["org/r:a:0"]), false);
        assert_eq!(groups[0].source_index, vec![1, 2]);
        assert_eq!(groups[0].source_index(1), 2);
    }

    #[test]
    fn fully_archived_repo_depends_on_flag() {
        let input = vec![archived("org/old", "a.ts"), archived("org/old", "b.ts")];
        assert!(aggregate(&input, &none(), &none(), false).is_empty());
        let groups = aggregate(&input, &none(), &none(), true);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].matches.len(), 2);
    }

    #[test]
    fn mixed_archived_repo_keeps_all_matches() {
        let input = vec![archived("org/mix", "a.ts"), code_match("org/mix", "b.ts")];
        for include in [false, true] {
            let groups = aggregate(&input, &none(), &none(), include);
            assert_eq!(groups.len(), 1, "include_archived={}", include);
            assert_eq!(groups[0].matches.len(), 2, "include_archived={}", include);
        }
    }

    #[test]
    fn normalise_repo_prepends_org_for_short_names() {
        assert_eq!(normalise_repo("acme", "api"), "acme/api");
        assert_eq!(normalise_repo("acme", " other/api "), "other/api");
    }

    #[test]
    fn normalise_extract_ref_only_touches_repo_part() {
        assert_eq!(
            normalise_extract_ref("acme", "api:src/a.ts:0"),
            "acme/api:src/a.ts:0"
        );
        assert_eq!(
            normalise_extract_ref("acme", "x/api:src/a.ts:2"),
            "x/api:src/a.ts:2"
        );
        assert_eq!(normalise_extract_ref("acme", "noref"), "noref");
    }

    #[test]
    fn parse_ref_list_skips_blanks() {
        let repos = parse_ref_list("acme", "a, ,b,", normalise_repo);
        assert_eq!(repos, set(&["acme/a", "acme/b"]));
        assert!(parse_ref_list("acme", "", normalise_repo).is_empty());
    }
}
