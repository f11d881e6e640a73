//! Shared data model: search matches, per-repository groups and view rows.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Search results ──────────────────────────────────────────

/// One highlighted range inside a fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub text: String,
    /// `[start, end)` character offsets within the fragment.
    pub indices: (usize, usize),
    /// 1-based line. Absolute in the file when the raw file could be fetched,
    /// fragment-relative otherwise.
    pub line: usize,
    /// 1-based column within that line.
    pub col: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextMatch {
    pub fragment: String,
    pub matches: Vec<Segment>,
}

/// One file hit returned by code search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeMatch {
    pub path: String,
    pub repo_full_name: String,
    pub html_url: String,
    pub text_matches: Vec<TextMatch>,
    pub archived: bool,
}

impl CodeMatch {
    /// First segment of the first fragment, used as the match location.
    pub fn location(&self) -> Option<&Segment> {
        self.text_matches.first().and_then(|tm| tm.matches.first())
    }

    /// Case-insensitive path filter. `filter` must already be lowercased.
    pub fn path_matches(&self, filter: &str) -> bool {
        filter.is_empty() || self.path.to_lowercase().contains(filter)
    }
}

// ── Aggregated groups ───────────────────────────────────────

/// All matches of one repository plus its fold and selection state.
///
/// `extract_selected` always has one entry per match, and `repo_selected`
/// is kept equal to "any extract selected" after every mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoGroup {
    pub repo_full_name: String,
    pub matches: Vec<CodeMatch>,
    pub folded: bool,
    pub repo_selected: bool,
    pub extract_selected: Vec<bool>,
    /// Team slugs with access to the repo (only with `--group-by-team-prefix`).
    pub teams: Option<Vec<String>>,
    /// Set on the first group of a team section.
    pub section_label: Option<String>,
    /// Index of each kept match in the repo's list before extract
    /// exclusions, so that extract refs stay stable across replays.
    pub source_index: Vec<usize>,
}

impl RepoGroup {
    pub fn new(repo_full_name: impl Into<String>, matches: Vec<CodeMatch>) -> Self {
        let matches_len = matches.len();
        let extract_selected = vec![true; matches_len];
        Self {
            repo_full_name: repo_full_name.into(),
            matches,
            folded: true,
            repo_selected: true,
            extract_selected,
            teams: None,
            section_label: None,
            source_index: (0..matches_len).collect(),
        }
    }

    /// Original per-repo index of the match at `extract`.
    pub fn source_index(&self, extract: usize) -> usize {
        self.source_index.get(extract).copied().unwrap_or(extract)
    }

    pub fn selected_count(&self) -> usize {
        self.extract_selected.iter().filter(|s| **s).count()
    }

    pub fn selected_matches(&self) -> impl Iterator<Item = (usize, &CodeMatch)> {
        self.matches
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.extract_selected.get(*i).copied().unwrap_or(false))
    }

    /// Re-derive the repo checkbox from its extracts (three-state rule).
    pub fn sync_repo_selected(&mut self) {
        self.repo_selected = self.extract_selected.iter().any(|s| *s);
    }
}

/// One labelled team section produced by team-prefix grouping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamSection {
    pub label: String,
    pub groups: Vec<RepoGroup>,
}

// ── Rows ────────────────────────────────────────────────────

/// One renderable line-item. Indices point into the `RepoGroup` slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Section { label: String },
    Repo { repo: usize },
    Extract { repo: usize, extract: usize },
}

impl Row {
    pub fn is_section(&self) -> bool {
        matches!(self, Row::Section { .. })
    }

    pub fn repo_index(&self) -> Option<usize> {
        match self {
            Row::Section { .. } => None,
            Row::Repo { repo } | Row::Extract { repo, .. } => Some(*repo),
        }
    }
}

// ── Output options ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Markdown,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputType {
    #[default]
    RepoAndMatches,
    RepoOnly,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!(
                "unknown format '{}' (expected markdown or json)",
                other
            )),
        }
    }
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::RepoAndMatches => write!(f, "repo-and-matches"),
            OutputType::RepoOnly => write!(f, "repo-only"),
        }
    }
}

impl FromStr for OutputType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "repo-and-matches" => Ok(OutputType::RepoAndMatches),
            "repo-only" => Ok(OutputType::RepoOnly),
            other => Err(format!(
                "unknown output type '{}' (expected repo-and-matches or repo-only)",
                other
            )),
        }
    }
}

// ── Test fixtures ───────────────────────────────────────────
