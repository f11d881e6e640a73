//! Full-screen view of the result tree: header, filter bar, sticky repo
//! header, body rows and footer. Rendering is a pure function of the state
//! passed in; the caller clears the screen and writes the returned string.

use crate::render_filter::filter_stats;
use crate::render_highlight::highlight_fragment;
use crate::render_rows::{repo_row_index, visible_end};
use crate::render_summary::{match_count_label, plural, summary_full};
use crate::types::{RepoGroup, Row};
use colored::Colorize;
use lazy_static::lazy_static;
use regex::Regex;

/// Title, summary and blank separator.
pub const HEADER_LINES: usize = 3;
/// Position indicator and key hints.
pub const FOOTER_LINES: usize = 2;
/// Space kept free for the sticky repo header so that the body budget does
/// not depend on scroll position.
pub const STICKY_LINES: usize = 1;

const INDENT: &str = "  ";

lazy_static! {
    static ref ANSI_RE: Regex = Regex::new(r"\x1b\[[\d;]*[A-Za-z]").expect("valid ANSI regex");
}

/// Remove ANSI escape sequences.
pub fn strip_ansi(s: &str) -> String {
    ANSI_RE.replace_all(s, "").into_owned()
}

/// Printed width in characters, ignoring escapes.
pub fn visible_width(s: &str) -> usize {
    strip_ansi(s).chars().count()
}

/// Body lines available for rows at a given terminal height.
pub fn viewport_height(term_height: usize, filter_bar: bool) -> usize {
    term_height
        .saturating_sub(HEADER_LINES + FOOTER_LINES + STICKY_LINES + usize::from(filter_bar))
        .max(1)
}

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions<'a> {
    pub query: &'a str,
    pub org: &'a str,
    /// Confirmed path filter (empty = none).
    pub filter_path: &'a str,
    /// Filter bar is in edit mode.
    pub filter_mode: bool,
    /// Draft filter while editing.
    pub filter_input: &'a str,
    pub show_help: bool,
    pub term_width: usize,
}

impl Default for RenderOptions<'_> {
    fn default() -> Self {
        Self {
            query: "",
            org: "",
            filter_path: "",
            filter_mode: false,
            filter_input: "",
            show_help: false,
            term_width: 80,
        }
    }
}

impl RenderOptions<'_> {
    pub fn has_filter_bar(&self) -> bool {
        self.filter_mode || !self.filter_path.is_empty()
    }
}

// ── Help ────────────────────────────────────────────────────

pub fn render_help_overlay() -> String {
    let bar = "─".repeat(62).dimmed().to_string();
    let k = |s: &str| s.yellow().to_string();
    let lines = vec![
        bar.clone(),
        format!("  {}", "Key bindings".bold()),
        bar.clone(),
        format!(
            "  {} / {}       navigate up            {} / {}       navigate down",
            k("↑"),
            k("k"),
            k("↓"),
            k("j")
        ),
        format!(
            "  {}           fold repo              {}           unfold repo",
            k("←"),
            k("→")
        ),
        format!(
            "  {}       toggle selection       {}       confirm & output",
            k("Space"),
            k("Enter")
        ),
        format!(
            "  {}           select all             {}           select none",
            k("a"),
            k("n")
        ),
        format!("                 {}", "(respects active filter)".dimmed()),
        format!(
            "  {}           enter filter mode      {}           reset filter",
            k("f"),
            k("r")
        ),
        format!(
            "  {} / {}       toggle this help       {} / Ctrl+C  quit",
            k("h"),
            k("?"),
            k("q")
        ),
        bar.clone(),
        format!(
            "  {}  type to filter by path · Enter confirm · Esc cancel",
            "Filter mode:".dimmed()
        ),
        bar,
        format!(
            "  {} {}, {}, {} or {} {}",
            "press".dimmed(),
            k("h"),
            k("?"),
            k("Enter"),
            k("Esc"),
            "to close".dimmed()
        ),
    ];
    lines.join("\n")
}

// ── Rows ────────────────────────────────────────────────────

fn checkbox(selected: bool) -> String {
    if selected {
        "✓".green().to_string()
    } else {
        " ".to_string()
    }
}

fn render_repo_line(group: &RepoGroup, is_cursor: bool, term_width: usize) -> String {
    let arrow = (if group.folded { "▸" } else { "▾" }).magenta();
    let name = if is_cursor {
        format!(" {} ", group.repo_full_name)
            .white()
            .bold()
            .on_magenta()
            .to_string()
    } else {
        group.repo_full_name.bold().to_string()
    };
    let left = format!("{} {} {}", arrow, checkbox(group.repo_selected), name);
    let count = match_count_label(group).dimmed().to_string();
    let pad = term_width.saturating_sub(visible_width(&left) + visible_width(&count));
    format!("{}{}{}", left, " ".repeat(pad), count)
}

fn render_extract_lines(group: &RepoGroup, extract: usize, is_cursor: bool, out: &mut Vec<String>) {
    let Some(m) = group.matches.get(extract) else {
        out.push(String::new());
        return;
    };
    let selected = group.extract_selected.get(extract).copied().unwrap_or(false);
    let loc = m
        .location()
        .map(|seg| format!(":{}:{}", seg.line, seg.col))
        .unwrap_or_default();
    let path = if is_cursor {
        format!(" {}{} ", m.path, loc)
            .white()
            .bold()
            .on_magenta()
            .to_string()
    } else {
        format!("{}{}", m.path.cyan(), loc.dimmed())
    };
    out.push(format!("{}{}{} {}", INDENT, INDENT, checkbox(selected), path));

    if let Some(tm) = m.text_matches.first() {
        for line in highlight_fragment(&tm.fragment, &tm.matches, &m.path) {
            out.push(format!("{}{}{}{}", INDENT, INDENT, INDENT, line));
        }
    }
}

/// Body lines for `rows[scroll_offset..end]`, plus `end`. The line count
/// always equals the summed row heights of the drawn rows.
pub fn render_body(
    groups: &[RepoGroup],
    rows: &[Row],
    cursor: usize,
    scroll_offset: usize,
    viewport: usize,
    term_width: usize,
) -> (Vec<String>, usize) {
    let end = visible_end(rows, groups, scroll_offset, viewport);
    let mut lines = Vec::new();

    for (i, row) in rows.iter().enumerate().take(end).skip(scroll_offset) {
        let is_cursor = i == cursor;
        match row {
            Row::Section { label } => {
                lines.push(String::new());
                lines.push(format!("── {} ", label).magenta().bold().to_string());
            }
            Row::Repo { repo } => match groups.get(*repo) {
                Some(group) => lines.push(render_repo_line(group, is_cursor, term_width)),
                None => lines.push(String::new()),
            },
            Row::Extract { repo, extract } => match groups.get(*repo) {
                Some(group) => render_extract_lines(group, *extract, is_cursor, &mut lines),
                None => lines.push(String::new()),
            },
        }
    }
    (lines, end)
}

// ── Header pieces ───────────────────────────────────────────

fn render_filter_bar(groups: &[RepoGroup], opts: &RenderOptions) -> Option<String> {
    if opts.filter_mode {
        return Some(format!(
            "🔍 {} {}{}  {}",
            "Filter:".bold(),
            opts.filter_input,
            " ".reversed(),
            "Enter confirm · Esc cancel".dimmed()
        ));
    }
    if opts.filter_path.is_empty() {
        return None;
    }
    let stats = filter_stats(groups, opts.filter_path);
    let detail = format!(
        "{} in {} shown · {} hidden in {}  r to reset",
        plural(stats.visible_matches, "match"),
        plural(stats.visible_repos, "repo"),
        stats.hidden_matches,
        plural(stats.hidden_repos, "repo"),
    );
    Some(format!(
        "🔍 {} {}  {}",
        "filter:".bold(),
        opts.filter_path.yellow(),
        detail.dimmed()
    ))
}

/// Pinned header for the repo owning the cursor's extract when that repo's
/// own row has scrolled above the viewport.
fn render_sticky(groups: &[RepoGroup], rows: &[Row], cursor: usize, scroll_offset: usize) -> Option<String> {
    let Some(Row::Extract { repo, .. }) = rows.get(cursor) else {
        return None;
    };
    let group = groups.get(*repo)?;
    let repo_row = repo_row_index(rows, *repo)?;
    if repo_row >= scroll_offset {
        return None;
    }
    Some(
        format!(
            "▲ {} {} {}",
            checkbox(group.repo_selected),
            group.repo_full_name.bold(),
            match_count_label(group)
        )
        .dimmed()
        .to_string(),
    )
}

// ── Screen ──────────────────────────────────────────────────

/// Render the whole screen. `term_height` is in terminal lines.
pub fn render_groups(
    groups: &[RepoGroup],
    cursor: usize,
    rows: &[Row],
    term_height: usize,
    scroll_offset: usize,
    opts: &RenderOptions,
) -> String {
    if opts.show_help {
        return render_help_overlay();
    }

    let mut lines = Vec::new();
    lines.push(format!(
        "{} {} {} {}",
        " github-code-search ".bold().on_magenta(),
        opts.query.cyan().bold(),
        "in".dimmed(),
        opts.org.yellow().bold()
    ));
    lines.push(summary_full(groups).dimmed().to_string());

    let filter_bar = render_filter_bar(groups, opts);
    let has_filter_bar = filter_bar.is_some();
    lines.extend(filter_bar);
    lines.push(String::new());

    if let Some(sticky) = render_sticky(groups, rows, cursor, scroll_offset) {
        lines.push(sticky);
    }

    let viewport = viewport_height(term_height, has_filter_bar);
    let (body, end) = render_body(groups, rows, cursor, scroll_offset, viewport, opts.term_width);
    lines.extend(body);

    let position = if rows.is_empty() {
        "  ↕ no rows".to_string()
    } else {
        format!("  ↕ row {}–{} of {}", scroll_offset + 1, end, rows.len())
    };
    lines.push(position.dimmed().to_string());
    lines.push(
        "  ← / → fold/unfold  ↑ / ↓ navigate  spc select  a all  n none  f filter  h help  ↵ confirm  q quit"
            .dimmed()
            .to_string(),
    );

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_rows::{build_rows, row_height};
    use crate::types::fixtures::{code_match_with_fragment, group, unfolded};

    fn plain(s: &str) -> Vec<String> {
        s.split('\n').map(strip_ansi).collect()
    }

    fn opts() -> RenderOptions<'static> {
        RenderOptions {
            query: "useFeatureFlag",
            org: "acme",
            ..RenderOptions::default()
        }
    }

    fn sample() -> Vec<RepoGroup> {
        let mut a = RepoGroup::new(
            "acme/api",
            vec![
                code_match_with_fragment("acme/api", "src/a.ts", "const a = 1;\nreturn a;"),
                code_match_with_fragment("acme/api", "src/b.rs", "fn main() {}"),
            ],
        );
        a.folded = false;
        a.section_label = Some("squad-core".into());
        vec![a, group("acme/web", &["lib/c.ts"])]
    }

    #[test]
    fn strip_ansi_removes_escapes() {
        assert_eq!(strip_ansi("\x1b[1;35mhi\x1b[0m there"), "hi there");
        assert_eq!(visible_width("\x1b[32m✓\x1b[0m ab"), 4);
    }

    #[test]
    fn help_replaces_whole_screen() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let o = RenderOptions {
            show_help: true,
            ..opts()
        };
        let out = render_groups(&groups, 0, &rows, 40, 0, &o);
        assert_eq!(strip_ansi(&out), strip_ansi(&render_help_overlay()));
        assert!(!strip_ansi(&out).contains("acme/api"));
        assert!(strip_ansi(&out).contains("Key bindings"));
    }

    #[test]
    fn body_line_count_equals_summed_row_heights() {
        let groups = sample();
        for filter in ["", "src", "b.rs", "nothing"] {
            let rows = build_rows(&groups, filter);
            let total: usize = rows.iter().map(|r| row_height(&groups, r)).sum();
            let (body, end) = render_body(&groups, &rows, 0, 0, 1000, 80);
            assert_eq!(end, rows.len(), "filter={}", filter);
            assert_eq!(body.len(), total, "filter={}", filter);
        }
    }

    #[test]
    fn screen_fits_terminal_height() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        for height in [8, 10, 12, 20] {
            let out = render_groups(&groups, 0, &rows, height, 0, &opts());
            let count = out.split('\n').count();
            // header + body + footer, with the sticky line still unused
            assert!(count <= height, "height={} lines={}", height, count);
        }
    }

    #[test]
    fn header_shows_query_org_and_summary() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let lines = plain(&render_groups(&groups, 0, &rows, 40, 0, &opts()));
        assert_eq!(lines[0], " github-code-search  useFeatureFlag in acme");
        assert_eq!(lines[1], "2 repos · 3 files");
        assert_eq!(lines[2], "");
    }

    #[test]
    fn section_row_renders_blank_then_label() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 1, 0, 100, 80);
        assert_eq!(strip_ansi(&body[0]), "");
        assert_eq!(strip_ansi(&body[1]), "── squad-core ");
    }

    #[test]
    fn repo_row_count_is_right_aligned() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 0, 0, 100, 60);
        let repo_line = strip_ansi(&body[2]);
        assert!(repo_line.starts_with("▾ ✓ acme/api"));
        assert!(repo_line.ends_with("2 matches"));
        assert_eq!(repo_line.chars().count(), 60);
    }

    #[test]
    fn extract_row_shows_location_and_fragment() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 0, 0, 100, 80);
        assert_eq!(strip_ansi(&body[3]), "    ✓ src/a.ts:1:1");
        assert_eq!(strip_ansi(&body[4]), "      const a = 1;");
        assert_eq!(strip_ansi(&body[5]), "      return a;");
    }

    #[test]
    fn deselected_extract_has_blank_checkbox() {
        let mut groups = sample();
        groups[0].extract_selected[0] = false;
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 0, 0, 100, 80);
        assert_eq!(strip_ansi(&body[3]), "      src/a.ts:1:1");
        assert!(strip_ansi(&body[2]).ends_with("2 matches, 1 selected"));
    }

    #[test]
    fn cursor_row_is_padded() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 2, 0, 100, 80);
        assert_eq!(strip_ansi(&body[3]), "    ✓  src/a.ts:1:1 ");
    }

    #[test]
    fn sticky_header_appears_when_repo_row_scrolled_off() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        // rows: section, repo, extract, extract, repo
        let lines = plain(&render_groups(&groups, 3, &rows, 40, 2, &opts()));
        assert!(lines[3].starts_with("▲ ✓ acme/api 2 matches"), "{:?}", lines);

        let lines = plain(&render_groups(&groups, 3, &rows, 40, 0, &opts()));
        assert!(!lines.iter().any(|l| l.starts_with('▲')));
    }

    #[test]
    fn no_sticky_header_on_repo_rows() {
        let groups = sample();
        let rows = build_rows(&groups, "");
        let lines = plain(&render_groups(&groups, 4, &rows, 40, 4, &opts()));
        assert!(!lines.iter().any(|l| l.starts_with('▲')));
    }

    #[test]
    fn filter_edit_bar_shows_draft() {
        let groups = sample();
        let rows = build_rows(&groups, "sr");
        let o = RenderOptions {
            filter_mode: true,
            filter_input: "sr",
            ..opts()
        };
        let lines = plain(&render_groups(&groups, 0, &rows, 40, 0, &o));
        assert_eq!(lines[2], "🔍 Filter: sr   Enter confirm · Esc cancel");
    }

    #[test]
    fn confirmed_filter_bar_shows_stats() {
        let groups = sample();
        let rows = build_rows(&groups, "src");
        let o = RenderOptions {
            filter_path: "src",
            ..opts()
        };
        let lines = plain(&render_groups(&groups, 0, &rows, 40, 0, &o));
        assert_eq!(
            lines[2],
            "🔍 filter: src  2 matches in 1 repo shown · 1 hidden in 1 repo  r to reset"
        );
    }

    #[test]
    fn position_indicator_reports_drawn_range() {
        let groups = vec![
            group("acme/a", &["x"]),
            group("acme/b", &["x"]),
            group("acme/c", &["x"]),
            group("acme/d", &["x"]),
        ];
        let rows = build_rows(&groups, "");
        // viewport = 9 - 3 - 2 - 1 = 3 rows
        let lines = plain(&render_groups(&groups, 1, &rows, 9, 1, &opts()));
        assert!(lines.contains(&"  ↕ row 2–4 of 4".to_string()), "{:?}", lines);
    }

    #[test]
    fn empty_rows_render_placeholder_indicator() {
        let groups = sample();
        let rows = build_rows(&groups, "zzz");
        let lines = plain(&render_groups(&groups, 0, &rows, 40, 0, &opts()));
        assert!(lines.contains(&"  ↕ no rows".to_string()));
    }

    #[test]
    fn viewport_height_accounts_for_filter_bar() {
        assert_eq!(viewport_height(40, false), 34);
        assert_eq!(viewport_height(40, true), 33);
        assert_eq!(viewport_height(2, true), 1);
    }

    #[test]
    fn zero_match_group_renders() {
        let groups = vec![unfolded(group("acme/empty", &[]))];
        let rows = build_rows(&groups, "");
        let (body, _) = render_body(&groups, &rows, 0, 0, 10, 40);
        assert_eq!(body.len(), 1);
        assert!(strip_ansi(&body[0]).ends_with("0 matches"));
    }
}
