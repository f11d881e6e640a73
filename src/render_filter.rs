//! Visible/hidden counts for the confirmed path filter.

use crate::types::RepoGroup;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub visible_repos: usize,
    pub hidden_repos: usize,
    pub visible_matches: usize,
    pub hidden_matches: usize,
}

pub fn filter_stats(groups: &[RepoGroup], filter: &str) -> FilterStats {
    let filter = filter.to_lowercase();
    let mut stats = FilterStats::default();
    for group in groups {
        let matching = group.matches.iter().filter(|m| m.path_matches(&filter)).count();
        if matching > 0 {
            stats.visible_repos += 1;
        } else {
            stats.hidden_repos += 1;
        }
        stats.visible_matches += matching;
        stats.hidden_matches += group.matches.len() - matching;
    }
    stats
}
