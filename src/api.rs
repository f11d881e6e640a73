//! GitHub REST client: code search with line resolution, and team listing.

use crate::api_utils::{fetch_with_retry, paginated_fetch, HttpResponse};
use crate::config::ApiConfig;
use crate::render_summary::plural;
use crate::types::{CodeMatch, Segment, TextMatch};
use colored::Colorize;
use rayon::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const PAGE_SIZE: usize = 100;
const TEXT_MATCH_ACCEPT: &str = "application/vnd.github.text-match+json";
const JSON_ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";
const USER_AGENT: &str = concat!("github-code-search/", env!("CARGO_PKG_VERSION"));

/// `repo full name → matching team slugs`.
pub type TeamMap = BTreeMap<String, Vec<String>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("GitHub API error {status} ({what}): {body}")]
    Http { status: u16, body: String, what: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("could not decode response: {0}")]
    Decode(String),
}

// ── Raw response shapes ─────────────────────────────────────

#[derive(Debug, Deserialize)]
struct RawSegment {
    #[serde(default)]
    text: String,
    indices: (usize, usize),
}

#[derive(Debug, Deserialize)]
struct RawTextMatch {
    #[serde(default)]
    fragment: Option<String>,
    #[serde(default)]
    matches: Vec<RawSegment>,
}

#[derive(Debug, Deserialize)]
struct RawRepository {
    full_name: String,
    #[serde(default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct RawCodeItem {
    path: String,
    html_url: String,
    repository: RawRepository,
    #[serde(default)]
    text_matches: Vec<RawTextMatch>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<RawCodeItem>,
    #[serde(default)]
    total_count: usize,
}

#[derive(Debug, Deserialize)]
struct RawTeam {
    slug: String,
}

#[derive(Debug, Deserialize)]
struct RawRepo {
    full_name: String,
}

// ── Line resolution ─────────────────────────────────────────

/// `https://github.com/o/r/blob/SHA/p` → `https://raw.githubusercontent.com/o/r/SHA/p`.
/// Other hosts have no raw mirror and yield `None`.
pub fn to_raw_url(html_url: &str) -> Option<String> {
    let rest = html_url.strip_prefix("https://github.com/")?;
    Some(format!(
        "https://raw.githubusercontent.com/{}",
        rest.replacen("/blob/", "/", 1)
    ))
}

/// 1-based line in `content` where `fragment` starts; 1 when not found.
pub fn compute_fragment_start_line(content: &str, fragment: &str) -> usize {
    if fragment.is_empty() {
        return 1;
    }
    match content.find(fragment) {
        Some(idx) => content[..idx].matches('\n').count() + 1,
        None => 1,
    }
}

/// 1-based `(line, col)` of character `offset` inside `fragment`.
pub fn segment_line_col(fragment: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for c in fragment.chars().take(offset) {
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn to_code_match(item: RawCodeItem, file_content: Option<&str>) -> CodeMatch {
    let text_matches = item
        .text_matches
        .into_iter()
        .map(|tm| {
            let fragment = tm.fragment.unwrap_or_default();
            let start_line =
                file_content.map_or(1, |content| compute_fragment_start_line(content, &fragment));
            let matches = tm
                .matches
                .into_iter()
                .map(|seg| {
                    let (frag_line, col) = segment_line_col(&fragment, seg.indices.0);
                    Segment {
                        text: seg.text,
                        indices: seg.indices,
                        line: start_line + frag_line - 1,
                        col,
                    }
                })
                .collect();
            TextMatch { fragment, matches }
        })
        .collect();

    CodeMatch {
        path: item.path,
        repo_full_name: item.repository.full_name,
        html_url: item.html_url,
        text_matches,
        archived: item.repository.archived,
    }
}

// ── Client ──────────────────────────────────────────────────

pub struct GitHubClient {
    agent: ureq::Agent,
    token: String,
    config: ApiConfig,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, config: ApiConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(10))
            .timeout_read(Duration::from_secs(60))
            .user_agent(USER_AGENT)
            .build();
        Self {
            agent,
            token: token.into(),
            config,
        }
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// One GET with retries. Non-2xx statuses come back as responses.
    fn get(&self, url: &str, accept: &str, query: &[(&str, String)]) -> Result<HttpResponse, ApiError> {
        fetch_with_retry(
            || {
                let mut req = self
                    .agent
                    .get(url)
                    .set("Authorization", &format!("Bearer {}", self.token))
                    .set("Accept", accept)
                    .set("X-GitHub-Api-Version", API_VERSION);
                for (k, v) in query {
                    req = req.query(k, v);
                }
                match req.call() {
                    Ok(resp) => read_response(resp),
                    Err(ureq::Error::Status(_, resp)) => read_response(resp),
                    Err(ureq::Error::Transport(t)) => Err(ApiError::Transport(t.to_string())),
                }
            },
            self.config.max_retries,
        )
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        accept: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T, ApiError> {
        let res = self.get(url, accept, query)?;
        if !res.is_success() {
            return Err(ApiError::Http {
                status: res.status,
                body: res.body,
                what: what.to_string(),
            });
        }
        serde_json::from_str(&res.body).map_err(|e| ApiError::Decode(format!("{}: {}", what, e)))
    }

    fn search_code(&self, query: &str, org: &str, page: u32) -> Result<SearchResponse, ApiError> {
        debug!(page, "search/code");
        self.get_json(
            &self.api_url("/search/code"),
            TEXT_MATCH_ACCEPT,
            &[
                ("q", format!("{} org:{}", query, org)),
                ("per_page", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ],
            "search code",
        )
    }

    fn fetch_raw(&self, html_url: &str) -> Option<String> {
        let raw = to_raw_url(html_url)?;
        match self.get(&raw, "*/*", &[]) {
            Ok(res) if res.is_success() => Some(res.body),
            Ok(res) => {
                debug!(status = res.status, url = %raw, "raw file unavailable");
                None
            }
            Err(e) => {
                debug!(error = %e, url = %raw, "raw file fetch failed");
                None
            }
        }
    }

    /// All search results (capped by `max_results`), with segment lines
    /// resolved against the raw files where they can be fetched.
    pub fn fetch_all_results(&self, query: &str, org: &str) -> Result<Vec<CodeMatch>, ApiError> {
        eprintln!("{}", "Fetching results from GitHub…".dimmed());
        let mut items: Vec<RawCodeItem> = Vec::new();
        let mut page = 1;
        loop {
            let res = self.search_code(query, org, page)?;
            let total = res.total_count;
            if res.items.is_empty() {
                break;
            }
            items.extend(res.items);
            if items.len() >= total || items.len() >= self.config.max_results {
                break;
            }
            page += 1;
            std::thread::sleep(Duration::from_millis(self.config.page_delay_ms));
        }
        info!(count = items.len(), "search results fetched");

        let urls: HashSet<&str> = items
            .iter()
            .filter(|i| {
                i.text_matches
                    .iter()
                    .any(|tm| tm.fragment.as_deref().is_some_and(|f| !f.is_empty()))
            })
            .map(|i| i.html_url.as_str())
            .collect();
        let contents: HashMap<String, String> = urls
            .into_par_iter()
            .filter_map(|url| self.fetch_raw(url).map(|body| (url.to_string(), body)))
            .collect();
        debug!(resolved = contents.len(), "raw files fetched");

        Ok(items
            .into_iter()
            .map(|item| {
                let content = contents.get(&item.html_url).map(String::as_str);
                to_code_match(item, content)
            })
            .collect())
    }

    fn list_teams(&self, org: &str) -> Result<Vec<RawTeam>, ApiError> {
        let url = self.api_url(&format!("/orgs/{}/teams", org));
        paginated_fetch(
            |page| {
                self.get_json(
                    &url,
                    JSON_ACCEPT,
                    &[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())],
                    "list teams",
                )
            },
            PAGE_SIZE,
            Duration::ZERO,
        )
    }

    /// Repos of one team. A 404 (nested or secret team) yields nothing;
    /// other failures are reported and stop pagination.
    fn team_repos(&self, org: &str, slug: &str) -> Result<Vec<RawRepo>, ApiError> {
        let url = self.api_url(&format!("/orgs/{}/teams/{}/repos", org, slug));
        paginated_fetch(
            |page| {
                let res = self.get(
                    &url,
                    JSON_ACCEPT,
                    &[("per_page", PAGE_SIZE.to_string()), ("page", page.to_string())],
                )?;
                if !res.is_success() {
                    if res.status != 404 {
                        warn!(team = slug, status = res.status, "could not fetch team repos");
                        eprintln!(
                            "{}",
                            format!(
                                "Warning: could not fetch repos for team \"{}\" (HTTP {})",
                                slug, res.status
                            )
                            .dimmed()
                        );
                    }
                    return Ok(Vec::new());
                }
                serde_json::from_str(&res.body)
                    .map_err(|e| ApiError::Decode(format!("team repos: {}", e)))
            },
            PAGE_SIZE,
            Duration::ZERO,
        )
    }

    /// Map each repo to the org teams (matching any prefix) that can access it.
    pub fn fetch_repo_teams(&self, org: &str, prefixes: &[String]) -> Result<TeamMap, ApiError> {
        let lower: Vec<String> = prefixes.iter().map(|p| p.to_lowercase()).collect();
        let slugs: Vec<String> = self
            .list_teams(org)?
            .into_iter()
            .map(|t| t.slug)
            .filter(|slug| {
                let slug = slug.to_lowercase();
                lower.iter().any(|p| slug.starts_with(p.as_str()))
            })
            .collect();

        eprintln!(
            "{}",
            format!(
                "Fetching repos for {} matching {} [{}]…",
                plural(slugs.len(), "team"),
                if prefixes.len() == 1 { "prefix" } else { "prefixes" },
                prefixes.join(", ")
            )
            .dimmed()
        );

        let per_team: Vec<(String, Vec<RawRepo>)> = slugs
            .into_par_iter()
            .map(|slug| self.team_repos(org, &slug).map(|repos| (slug, repos)))
            .collect::<Result<_, _>>()?;

        Ok(build_team_map(per_team))
    }
}

fn read_response(resp: ureq::Response) -> Result<HttpResponse, ApiError> {
    let status = resp.status();
    let retry_after = resp.header("Retry-After").map(String::from);
    let body = resp
        .into_string()
        .map_err(|e| ApiError::Transport(e.to_string()))?;
    Ok(HttpResponse {
        status,
        retry_after,
        body,
    })
}

fn build_team_map(per_team: Vec<(String, Vec<RawRepo>)>) -> TeamMap {
    let mut map = TeamMap::new();
    for (slug, repos) in per_team {
        for repo in repos {
            let teams = map.entry(repo.full_name).or_default();
            if !teams.contains(&slug) {
                teams.push(slug.clone());
            }
        }
    }
    map
}
