//! Final output: markdown or JSON for the selected results, each carrying a
//! replay command that reproduces the selection non-interactively.

use crate::aggregate::extract_ref;
use crate::render_summary::{plural, selection_summary};
use crate::types::{CodeMatch, OutputFormat, OutputType, RepoGroup};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Inputs that must be echoed in the replay command.
#[derive(Debug, Clone, Default)]
pub struct ReplayOptions {
    pub format: OutputFormat,
    pub output_type: OutputType,
    pub include_archived: bool,
    /// Raw `--group-by-team-prefix` value, empty when unused.
    pub group_by_team_prefix: String,
}

/// Everything the builders need besides the groups.
#[derive(Debug, Clone)]
pub struct OutputContext<'a> {
    pub query: &'a str,
    pub org: &'a str,
    pub excluded_repos: &'a HashSet<String>,
    pub excluded_extract_refs: &'a HashSet<String>,
    pub options: ReplayOptions,
}

// ── Short forms ─────────────────────────────────────────────

/// Strip the `org/` prefix.
pub fn short_repo<'a>(full: &'a str, org: &str) -> &'a str {
    full.strip_prefix(org)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(full)
}

/// `org/repo:path:idx` → `repo:path:idx`.
pub fn short_extract_ref(full: &str, org: &str) -> String {
    match full.split_once(':') {
        Some((repo, rest)) => format!("{}:{}", short_repo(repo, org), rest),
        None => full.to_string(),
    }
}

fn sorted(set: &HashSet<String>) -> Vec<&String> {
    let mut items: Vec<&String> = set.iter().collect();
    items.sort();
    items
}

fn push_unique(list: &mut Vec<String>, item: String) {
    if !list.contains(&item) {
        list.push(item);
    }
}

// ── Replay ──────────────────────────────────────────────────

/// `# Replay:` followed by a shell command joined with ` \` continuations.
pub fn replay_command(groups: &[RepoGroup], ctx: &OutputContext) -> String {
    let org = ctx.org;
    let mut parts = vec![format!(
        "github-code-search {} --org {} --no-interactive",
        serde_json::to_string(ctx.query).unwrap_or_else(|_| format!("\"{}\"", ctx.query)),
        org
    )];

    let mut repos: Vec<String> = sorted(ctx.excluded_repos)
        .into_iter()
        .map(|r| short_repo(r, org).to_string())
        .collect();
    for group in groups.iter().filter(|g| !g.repo_selected) {
        push_unique(&mut repos, short_repo(&group.repo_full_name, org).to_string());
    }
    if !repos.is_empty() {
        parts.push(format!("--exclude-repositories {}", repos.join(",")));
    }

    let mut extracts: Vec<String> = sorted(ctx.excluded_extract_refs)
        .into_iter()
        .map(|r| short_extract_ref(r, org))
        .collect();
    for group in groups.iter().filter(|g| g.repo_selected) {
        for (i, m) in group.matches.iter().enumerate() {
            if !group.extract_selected.get(i).copied().unwrap_or(false) {
                let full = extract_ref(&group.repo_full_name, &m.path, group.source_index(i));
                push_unique(&mut extracts, short_extract_ref(&full, org));
            }
        }
    }
    if !extracts.is_empty() {
        parts.push(format!("--exclude-extracts {}", extracts.join(",")));
    }

    let opts = &ctx.options;
    if opts.format != OutputFormat::Markdown {
        parts.push(format!("--format {}", opts.format));
    }
    if opts.output_type != OutputType::RepoAndMatches {
        parts.push(format!("--output-type {}", opts.output_type));
    }
    if opts.include_archived {
        parts.push("--include-archived".to_string());
    }
    if !opts.group_by_team_prefix.is_empty() {
        parts.push(format!("--group-by-team-prefix {}", opts.group_by_team_prefix));
    }

    format!("# Replay:\n{}", parts.join(" \\\n  "))
}

/// Replay command inside a collapsible markdown block.
pub fn replay_details(groups: &[RepoGroup], ctx: &OutputContext) -> String {
    let raw = replay_command(groups, ctx);
    let shell = raw.strip_prefix("# Replay:\n").unwrap_or(&raw);
    [
        "<details>",
        "<summary>replay command</summary>",
        "",
        "```bash",
        shell,
        "```",
        "",
        "</details>",
    ]
    .join("\n")
}

// ── Markdown ────────────────────────────────────────────────

fn selected(group: &RepoGroup) -> Vec<&CodeMatch> {
    group.selected_matches().map(|(_, m)| m).collect()
}

pub fn markdown_output(groups: &[RepoGroup], ctx: &OutputContext) -> String {
    if ctx.options.output_type == OutputType::RepoOnly {
        let repos: Vec<&str> = groups
            .iter()
            .filter(|g| g.repo_selected && g.selected_count() > 0)
            .map(|g| g.repo_full_name.as_str())
            .collect();
        if repos.is_empty() {
            return String::new();
        }
        return format!("{}\n\n{}\n", repos.join("\n"), replay_details(groups, ctx));
    }

    let mut lines = vec![selection_summary(groups), String::new()];
    for group in groups.iter().filter(|g| g.repo_selected) {
        let matches = selected(group);
        if matches.is_empty() {
            continue;
        }
        if let Some(label) = &group.section_label {
            lines.push(format!("## {}", label));
            lines.push(String::new());
        }
        lines.push(format!(
            "- **{}** ({})",
            group.repo_full_name,
            plural(matches.len(), "match")
        ));
        for m in matches {
            match m.location() {
                Some(seg) => lines.push(format!(
                    "  - [ ] [{}:{}:{}]({}#L{})",
                    m.path, seg.line, seg.col, m.html_url, seg.line
                )),
                None => lines.push(format!("  - [ ] [{}]({})", m.path, m.html_url)),
            }
        }
    }
    lines.push(String::new());
    lines.push(replay_details(groups, ctx));
    lines.join("\n")
}

// ── JSON ────────────────────────────────────────────────────

#[derive(Serialize)]
struct JsonMatch<'a> {
    path: &'a str,
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    col: Option<usize>,
}

#[derive(Serialize)]
struct JsonResult<'a> {
    repo: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    matches: Option<Vec<JsonMatch<'a>>>,
}

#[derive(Serialize)]
struct JsonSelection {
    repos: usize,
    matches: usize,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    query: &'a str,
    org: &'a str,
    selection: JsonSelection,
    results: Vec<JsonResult<'a>>,
    replay_command: String,
}

pub fn json_output(groups: &[RepoGroup], ctx: &OutputContext) -> Result<String> {
    let repo_only = ctx.options.output_type == OutputType::RepoOnly;
    let results = groups
        .iter()
        .filter(|g| g.repo_selected)
        .filter_map(|g| {
            if repo_only {
                return Some(JsonResult {
                    repo: &g.repo_full_name,
                    matches: None,
                });
            }
            let matches: Vec<JsonMatch> = selected(g)
                .into_iter()
                .map(|m| {
                    let seg = m.location();
                    JsonMatch {
                        path: &m.path,
                        url: &m.html_url,
                        line: seg.map(|s| s.line),
                        col: seg.map(|s| s.col),
                    }
                })
                .collect();
            (!matches.is_empty()).then_some(JsonResult {
                repo: &g.repo_full_name,
                matches: Some(matches),
            })
        })
        .collect();

    let out = JsonOutput {
        query: ctx.query,
        org: ctx.org,
        selection: JsonSelection {
            repos: groups.iter().filter(|g| g.repo_selected).count(),
            matches: groups.iter().map(RepoGroup::selected_count).sum(),
        },
        results,
        replay_command: replay_command(groups, ctx),
    };
    serde_json::to_string_pretty(&out).context("failed to serialise JSON output")
}

/// Dispatch on the requested format.
pub fn build_output(groups: &[RepoGroup], ctx: &OutputContext) -> Result<String> {
    match ctx.options.format {
        OutputFormat::Json => json_output(groups, ctx),
        OutputFormat::Markdown => Ok(markdown_output(groups, ctx)),
    }
}
