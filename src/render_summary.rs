//! Count labels: per-repo match counts and the header/selection summaries.

use crate::types::RepoGroup;
use std::collections::HashSet;

/// `"1 repo"` / `"3 repos"`. Nouns here all pluralise with `s` or `es`.
pub fn plural(n: usize, singular: &str) -> String {
    if n == 1 {
        format!("{} {}", n, singular)
    } else if singular.ends_with("ch") {
        format!("{} {}es", n, singular)
    } else {
        format!("{} {}s", n, singular)
    }
}

/// `"3 matches"`, or `"3 matches, 1 selected"` when some extracts are off.
pub fn match_count_label(group: &RepoGroup) -> String {
    let total = group.matches.len();
    let selected = group.selected_count();
    let label = plural(total, "match");
    if selected < total {
        format!("{}, {} selected", label, selected)
    } else {
        label
    }
}

// ── Totals ──────────────────────────────────────────────────

/// Distinct paths across all groups; the same path in several repos counts once.
fn unique_paths(groups: &[RepoGroup]) -> usize {
    groups
        .iter()
        .flat_map(|g| g.matches.iter().map(|m| m.path.as_str()))
        .collect::<HashSet<_>>()
        .len()
}

fn selected_unique_paths(groups: &[RepoGroup]) -> usize {
    groups
        .iter()
        .flat_map(|g| g.selected_matches().map(|(_, m)| m.path.as_str()))
        .collect::<HashSet<_>>()
        .len()
}

fn total_matches(groups: &[RepoGroup]) -> usize {
    groups.iter().map(|g| g.matches.len()).sum()
}

fn selected_matches(groups: &[RepoGroup]) -> usize {
    groups.iter().map(RepoGroup::selected_count).sum()
}

fn annotated(total: usize, selected: usize, noun: &str) -> String {
    if selected < total {
        format!("{} ({} selected)", plural(total, noun), selected)
    } else {
        plural(total, noun)
    }
}

/// Header summary with `(N selected)` annotations where not everything is
/// selected. The matches segment only appears when it differs from files.
pub fn summary_full(groups: &[RepoGroup]) -> String {
    let repos = annotated(
        groups.len(),
        groups.iter().filter(|g| g.repo_selected).count(),
        "repo",
    );
    let total_files = unique_paths(groups);
    let files = annotated(total_files, selected_unique_paths(groups), "file");
    let total = total_matches(groups);
    if total == total_files {
        format!("{} · {}", repos, files)
    } else {
        let matches = annotated(total, selected_matches(groups), "match");
        format!("{} · {} · {}", repos, files, matches)
    }
}

/// Plain summary of what is selected, used at the top of markdown output.
pub fn selection_summary(groups: &[RepoGroup]) -> String {
    let repos = plural(groups.iter().filter(|g| g.repo_selected).count(), "repo");
    let file_count = selected_unique_paths(groups);
    let files = plural(file_count, "file");
    let match_count = selected_matches(groups);
    if match_count == file_count {
        format!("{} · {} selected", repos, files)
    } else {
        format!("{} · {} · {} selected", repos, files, plural(match_count, "match"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::group;

    #[test]
    fn plural_forms() {
        assert_eq!(plural(1, "repo"), "1 repo");
        assert_eq!(plural(0, "repo"), "0 repos");
        assert_eq!(plural(2, "match"), "2 matches");
        assert_eq!(plural(1, "match"), "1 match");
    }

    #[test]
    fn match_count_label_mentions_partial_selection() {
        let mut g = group("org/a", &["a", "b", "c"]);
        assert_eq!(match_count_label(&g), "3 matches");
        g.extract_selected[0] = false;
        assert_eq!(match_count_label(&g), "3 matches, 2 selected");
    }

    #[test]
    fn empty_group_label_is_zero_matches() {
        assert_eq!(match_count_label(&group("org/a", &[])), "0 matches");
    }

    #[test]
    fn summary_hides_matches_when_equal_to_files() {
        let groups = vec![group("org/a", &["a.ts"]), group("org/b", &["b.ts"])];
        assert_eq!(summary_full(&groups), "2 repos · 2 files");
    }

    #[test]
    fn summary_counts_shared_paths_once() {
        let groups = vec![
            group("org/a", &["src/config.ts"]),
            group("org/b", &["src/config.ts"]),
            group("org/c", &["src/config.ts"]),
        ];
        assert_eq!(summary_full(&groups), "3 repos · 1 file · 3 matches");
    }

    #[test]
    fn summary_annotates_partial_selection() {
        let mut groups = vec![group("org/a", &["a.ts", "b.ts"]), group("org/b", &["c.ts"])];
        groups[1].extract_selected[0] = false;
        groups[1].sync_repo_selected();
        assert_eq!(
            summary_full(&groups),
            "2 repos (1 selected) · 3 files (2 selected)"
        );
    }

    #[test]
    fn selection_summary_counts_selected_only() {
        let mut groups = vec![
            group("org/a", &["x.ts", "y.ts"]),
            group("org/b", &["x.ts"]),
        ];
        assert_eq!(selection_summary(&groups), "2 repos · 2 files · 3 matches selected");
        groups[0].extract_selected[1] = false;
        groups[1].extract_selected[0] = false;
        groups[1].sync_repo_selected();
        assert_eq!(selection_summary(&groups), "1 repo · 1 file selected");
    }
}
