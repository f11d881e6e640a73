//! Team-prefix grouping: partitions repo groups into labelled sections.

use crate::types::{RepoGroup, TeamSection};
use std::collections::BTreeMap;

/// Label of the trailing section for repos that matched no prefix.
pub const OTHER_SECTION: &str = "other";

fn matching_teams(group: &RepoGroup, prefix_lower: &str) -> Vec<String> {
    group
        .teams
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|t| t.to_lowercase().starts_with(prefix_lower))
        .cloned()
        .collect()
}

/// Partition `groups` into sections, one prefix at a time.
///
/// For each prefix, unassigned repos with at least one team starting with it
/// (case-insensitive) are bucketed by how many of their teams match, buckets
/// ascending. Inside a bucket, repos sharing the same sorted team combination
/// form one section labelled `"a + b"`, labels in alphabetical order. A repo
/// is assigned to the first prefix it matches only. Leftovers go to `other`.
pub fn group_by_team_prefix(groups: &[RepoGroup], prefixes: &[String]) -> Vec<TeamSection> {
    let mut sections = Vec::new();
    let mut assigned = vec![false; groups.len()];

    for prefix in prefixes {
        let prefix_lower = prefix.to_lowercase();
        // count -> label -> groups (BTreeMap gives both orderings for free)
        let mut by_count: BTreeMap<usize, BTreeMap<String, Vec<RepoGroup>>> = BTreeMap::new();

        for (i, group) in groups.iter().enumerate() {
            if assigned[i] {
                continue;
            }
            let mut teams = matching_teams(group, &prefix_lower);
            if teams.is_empty() {
                continue;
            }
            assigned[i] = true;
            teams.sort();
            by_count
                .entry(teams.len())
                .or_default()
                .entry(teams.join(" + "))
                .or_default()
                .push(group.clone());
        }

        for (_, by_label) in by_count {
            for (label, groups) in by_label {
                sections.push(TeamSection { label, groups });
            }
        }
    }

    let other: Vec<RepoGroup> = groups
        .iter()
        .zip(&assigned)
        .filter(|(_, done)| !**done)
        .map(|(g, _)| g.clone())
        .collect();
    if !other.is_empty() {
        sections.push(TeamSection {
            label: OTHER_SECTION.to_string(),
            groups: other,
        });
    }

    sections
}

/// Flatten sections back to one list, stamping `section_label` on the first
/// group of each section and clearing it everywhere else.
pub fn flatten_team_sections(sections: &[TeamSection]) -> Vec<RepoGroup> {
    let mut result = Vec::new();
    for section in sections {
        for (i, group) in section.groups.iter().enumerate() {
            let mut g = group.clone();
            g.section_label = (i == 0).then(|| section.label.clone());
            result.push(g);
        }
    }
    result
}

/// Split a comma-separated prefix list, dropping blanks.
pub fn parse_prefixes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}
