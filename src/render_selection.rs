//! Selection mutations: bulk select-all/none and single-row toggles.
//! All functions mutate `groups` in place and leave `repo_selected` in sync.

use crate::types::{RepoGroup, Row};

/// Set every extract of `group` whose path matches `filter` to `value`.
/// Returns false (and leaves the group untouched) when nothing matches.
fn set_filtered(group: &mut RepoGroup, filter: &str, value: bool) -> bool {
    let hits: Vec<usize> = group
        .matches
        .iter()
        .enumerate()
        .filter(|(_, m)| m.path_matches(filter))
        .map(|(i, _)| i)
        .collect();
    if hits.is_empty() {
        return false;
    }
    for i in hits {
        if let Some(slot) = group.extract_selected.get_mut(i) {
            *slot = value;
        }
    }
    group.sync_repo_selected();
    true
}

fn set_group(group: &mut RepoGroup, filter: &str, value: bool) {
    if filter.is_empty() {
        group.repo_selected = value;
        group.extract_selected.iter_mut().for_each(|s| *s = value);
    } else {
        set_filtered(group, filter, value);
    }
}

/// Apply `value` to the scope implied by `context`: every group for a repo
/// row, only the owning group for an extract row. Section rows are a no-op.
fn apply(groups: &mut [RepoGroup], context: &Row, filter: &str, value: bool) {
    let filter = filter.to_lowercase();
    match context {
        Row::Section { .. } => {}
        Row::Repo { .. } => {
            for group in groups.iter_mut() {
                set_group(group, &filter, value);
            }
        }
        Row::Extract { repo, .. } => {
            if let Some(group) = groups.get_mut(*repo) {
                set_group(group, &filter, value);
            }
        }
    }
}

pub fn select_all(groups: &mut [RepoGroup], context: &Row, filter: &str) {
    apply(groups, context, filter, true);
}

pub fn select_none(groups: &mut [RepoGroup], context: &Row, filter: &str) {
    apply(groups, context, filter, false);
}

/// Space-bar toggle. A repo row flips the whole repo; an extract row flips
/// one entry and re-derives the repo checkbox.
pub fn toggle(groups: &mut [RepoGroup], row: &Row) {
    match row {
        Row::Section { .. } => {}
        Row::Repo { repo } => {
            if let Some(group) = groups.get_mut(*repo) {
                let value = !group.repo_selected;
                group.repo_selected = value;
                group.extract_selected.iter_mut().for_each(|s| *s = value);
            }
        }
        Row::Extract { repo, extract } => {
            if let Some(group) = groups.get_mut(*repo) {
                if let Some(slot) = group.extract_selected.get_mut(*extract) {
                    *slot = !*slot;
                }
                group.sync_repo_selected();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::fixtures::group;

    fn deselected(repo: &str, paths: &[&str]) -> RepoGroup {
        let mut g = group(repo, paths);
        g.repo_selected = false;
        g.extract_selected.iter_mut().for_each(|s| *s = false);
        g
    }

    const REPO_CTX: Row = Row::Repo { repo: 0 };

    #[test]
    fn select_all_from_repo_row_covers_every_group() {
        let mut groups = vec![deselected("org/a", &["x"]), deselected("org/b", &["y", "z"])];
        select_all(&mut groups, &REPO_CTX, "");
        for g in &groups {
            assert!(g.repo_selected);
            assert!(g.extract_selected.iter().all(|s| *s));
        }
    }

    #[test]
    fn select_none_from_extract_row_only_touches_its_group() {
        let mut groups = vec![group("org/a", &["x"]), group("org/b", &["y"])];
        select_none(&mut groups, &Row::Extract { repo: 1, extract: 0 }, "");
        assert!(groups[0].repo_selected);
        assert!(!groups[1].repo_selected);
        assert_eq!(groups[1].extract_selected, vec![false]);
    }

    #[test]
    fn filtered_select_all_only_sets_matching_paths() {
        let mut groups = vec![deselected("org/a", &["src/a.ts", "lib/b.ts"])];
        select_all(&mut groups, &REPO_CTX, "src");
        assert_eq!(groups[0].extract_selected, vec![true, false]);
        assert!(groups[0].repo_selected);
    }

    #[test]
    fn filter_is_case_insensitive() {
        let mut groups = vec![deselected("org/a", &["Src/A.ts", "lib/b.ts"])];
        select_all(&mut groups, &REPO_CTX, "SRC");
        assert_eq!(groups[0].extract_selected, vec![true, false]);
    }

    #[test]
    fn filtered_select_leaves_unmatched_groups_untouched() {
        // inconsistent on purpose: an untouched group keeps even repo_selected
        let mut other = deselected("org/b", &["lib/c.ts"]);
        other.repo_selected = true;
        let mut groups = vec![deselected("org/a", &["src/a.ts"]), other];
        select_none(&mut groups, &REPO_CTX, "src");
        assert!(groups[1].repo_selected);
        assert_eq!(groups[1].extract_selected, vec![false]);
    }

    #[test]
    fn filtered_select_none_keeps_partial_repo_selected() {
        let mut groups = vec![group("org/a", &["src/a.ts", "lib/b.ts"])];
        select_none(&mut groups, &REPO_CTX, "src");
        assert_eq!(groups[0].extract_selected, vec![false, true]);
        assert!(groups[0].repo_selected);
    }

    #[test]
    fn reselecting_one_extract_after_select_none() {
        let mut groups = vec![group("org/a", &["a", "b", "c"])];
        select_none(&mut groups, &REPO_CTX, "");
        toggle(&mut groups, &Row::Extract { repo: 0, extract: 1 });
        assert!(groups[0].repo_selected);
        assert_eq!(groups[0].selected_count(), 1);
        assert_eq!(groups[0].extract_selected, vec![false, true, false]);
    }

    #[test]
    fn toggling_last_extract_off_deselects_repo() {
        let mut groups = vec![group("org/a", &["a"])];
        toggle(&mut groups, &Row::Extract { repo: 0, extract: 0 });
        assert!(!groups[0].repo_selected);
    }

    #[test]
    fn repo_toggle_sets_every_extract() {
        let mut groups = vec![group("org/a", &["a", "b"])];
        groups[0].extract_selected[0] = false;
        toggle(&mut groups, &REPO_CTX);
        assert!(!groups[0].repo_selected);
        assert_eq!(groups[0].extract_selected, vec![false, false]);
        toggle(&mut groups, &REPO_CTX);
        assert_eq!(groups[0].extract_selected, vec![true, true]);
    }

    #[test]
    fn section_context_and_bad_indices_are_ignored() {
        let mut groups = vec![group("org/a", &["a"])];
        let before = groups.clone();
        select_none(&mut groups, &Row::Section { label: "s".into() }, "");
        select_none(&mut groups, &Row::Extract { repo: 9, extract: 0 }, "");
        toggle(&mut groups, &Row::Extract { repo: 0, extract: 7 });
        assert_eq!(groups, before);
    }
}
